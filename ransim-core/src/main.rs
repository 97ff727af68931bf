//! RAN simulator binary.
//!
//! Loads a YAML model (or generates a honeycomb topology), assembles the
//! simulation and runs the mobility driver until interrupted.
//!
//! # Usage
//!
//! ```bash
//! ransim --model model.yaml
//! ransim --towers 7 --sectors-per-tower 3 --ue-count 10
//! ```

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};

use ransim_common::logging::{init_logging, LogLevel};
use ransim_common::{Coordinate, PlmnId};
use ransim_core::model::Model;
use ransim_core::topology::{generate_honeycomb_topology, HoneycombOptions};
use ransim_core::{MobilityConfig, Simulation};
use ransim_e2::CodecRegistry;

/// RAN simulator.
#[derive(Parser, Debug)]
#[command(name = "ransim")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML model file; a honeycomb topology is generated when
    /// absent.
    #[arg(short = 'm', long = "model", value_name = "FILE")]
    model_file: Option<String>,

    /// Number of UEs to simulate (overrides the model's ueCount).
    #[arg(long = "ue-count")]
    ue_count: Option<u32>,

    /// Map center latitude for generated topologies.
    #[arg(long, default_value_t = 52.52)]
    center_lat: f64,

    /// Map center longitude for generated topologies.
    #[arg(long, default_value_t = 13.41)]
    center_lng: f64,

    /// Number of towers in a generated topology.
    #[arg(long, default_value_t = 7)]
    towers: u32,

    /// Sectors per tower (1, 3 or 6).
    #[arg(long, default_value_t = 3)]
    sectors_per_tower: u32,

    /// Operator PLMN ID.
    #[arg(long, default_value_t = 314_628)]
    plmn_id: u32,

    /// First eNB ID of generated nodes.
    #[arg(long, default_value_t = 5150)]
    enb_start: u32,

    /// Hex grid pitch in meters.
    #[arg(long, default_value_t = 500.0)]
    pitch: f64,

    /// Neighbor reach distance in meters.
    #[arg(long, default_value_t = 400.0)]
    max_distance: f64,

    /// Upper bound on each cell's neighbor set.
    #[arg(long, default_value_t = 6)]
    max_neighbors: usize,

    /// E2T controller addresses.
    #[arg(long = "controller", value_name = "ADDRESS", default_values_t = [String::from("ran-e2t")])]
    controllers: Vec<String>,

    /// Service-model specs (`name` or `name/id`).
    #[arg(long = "service-model", value_name = "SPEC",
          default_values_t = [String::from("kpm2/2"), String::from("rcpre/3"), String::from("mho/5")])]
    service_models: Vec<String>,

    /// Attach all generated cells to a single node.
    #[arg(long)]
    single_node: bool,

    /// Mobility tick interval in milliseconds.
    #[arg(long, default_value_t = 1000)]
    tick_ms: u64,

    /// Per-tick per-UE probability of an RRC state flip.
    #[arg(long, default_value_t = 0.05)]
    rrc_flip_probability: f64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: LogLevel,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_level);

    match run(args).await {
        Ok(()) => {
            info!("simulator exited");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("simulator failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut model = match &args.model_file {
        Some(path) => {
            info!("loading model from {path}");
            Model::load(path).with_context(|| format!("failed to load model from {path}"))?
        }
        None => {
            info!(towers = args.towers, sectors = args.sectors_per_tower, "generating honeycomb topology");
            let options = HoneycombOptions {
                map_center: Coordinate::new(args.center_lat, args.center_lng),
                num_towers: args.towers,
                sectors_per_tower: args.sectors_per_tower,
                plmn_id: PlmnId::new(args.plmn_id),
                enb_start: args.enb_start,
                pitch: args.pitch,
                max_distance: args.max_distance,
                max_neighbors: args.max_neighbors,
                controller_addresses: args.controllers.clone(),
                service_models: args.service_models.clone(),
                single_node: args.single_node,
            };
            generate_honeycomb_topology(&options).context("failed to generate topology")?
        }
    };
    if let Some(ue_count) = args.ue_count {
        model.ue_count = ue_count;
    }

    let mobility = MobilityConfig {
        tick_interval: Duration::from_millis(args.tick_ms),
        probability_rrc_state_change: args.rrc_flip_probability,
        ..MobilityConfig::default()
    };

    let sim = Simulation::new(&model, Arc::new(CodecRegistry::with_defaults()), mobility)
        .context("failed to assemble simulation")?;
    sim.start();
    info!(
        nodes = sim.node_names().len(),
        cells = sim.cell_store().len(),
        ues = sim.ue_store().len(),
        "simulation running, press Ctrl+C to stop"
    );

    signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    info!("shutting down");
    sim.shutdown();
    Ok(())
}
