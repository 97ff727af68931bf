//! Deterministic honeycomb topology generator.
//!
//! Places towers on a pointy-top hex grid outward from a map center,
//! synthesizes per-tower sector cells, and computes bounded neighbor sets
//! from sector reach points.

use std::collections::HashMap;

use ransim_common::{geo, CellId, Coordinate, Ecgi, EnbId, PlmnId, Result};
use ransim_common::Error;

use crate::model::{
    Cell, Controller, MapLayout, Model, Node, NodeStatus, Sector, ServiceModelInfo,
};

/// Largest tower count the ring table covers.
pub const MAX_TOWERS: u32 = 469;

/// Inputs of the honeycomb generator.
#[derive(Debug, Clone)]
pub struct HoneycombOptions {
    /// Map center the grid grows outward from.
    pub map_center: Coordinate,
    /// Number of towers to place.
    pub num_towers: u32,
    /// Sectors (cells) per tower: 1, 3 or 6.
    pub sectors_per_tower: u32,
    /// Operator identifier stamped into every ECGI.
    pub plmn_id: PlmnId,
    /// First eNB ID; tower `t` gets `enb_start + t + 1`.
    pub enb_start: u32,
    /// Hex grid pitch in meters (both spacing components).
    pub pitch: f64,
    /// Neighbor reach distance in meters.
    pub max_distance: f64,
    /// Upper bound on each cell's neighbor set.
    pub max_neighbors: usize,
    /// E2T controller addresses.
    pub controller_addresses: Vec<String>,
    /// Service-model specs, `name` or `name/id`.
    pub service_models: Vec<String>,
    /// Attach all cells to a single node instead of one node per tower.
    pub single_node: bool,
}

impl Default for HoneycombOptions {
    fn default() -> Self {
        Self {
            map_center: Coordinate::new(52.52, 13.41),
            num_towers: 7,
            sectors_per_tower: 3,
            plmn_id: PlmnId::new(314_628),
            enb_start: 5150,
            pitch: 500.0,
            max_distance: 400.0,
            max_neighbors: 6,
            controller_addresses: vec!["ran-e2t".to_string()],
            service_models: vec![
                "kpm2/2".to_string(),
                "rcpre/3".to_string(),
                "mho/5".to_string(),
            ],
            single_node: false,
        }
    }
}

/// Generates a honeycomb model: towers on a hex grid, sector cells,
/// controllers, service models and bounded neighbor sets.
pub fn generate_honeycomb_topology(options: &HoneycombOptions) -> Result<Model> {
    if !matches!(options.sectors_per_tower, 1 | 3 | 6) {
        return Err(Error::Invalid(format!(
            "sectors per tower must be 1, 3 or 6, got {}",
            options.sectors_per_tower
        )));
    }

    let mut model = Model {
        plmn_id: options.plmn_id,
        layout: MapLayout {
            center: options.map_center,
            locations_scale: 1.25,
            ..MapLayout::default()
        },
        nodes: HashMap::new(),
        cells: HashMap::new(),
        controllers: generate_controllers(&options.controller_addresses),
        service_models: generate_service_models(&options.service_models),
        ue_count: 0,
    };

    let controllers: Vec<String> = model.controllers.keys().cloned().collect();
    let sm_names: Vec<String> = model.service_models.keys().cloned().collect();

    let aspect_ratio = geo::aspect_ratio(options.map_center.lat);
    let points = hex_mesh(options.pitch, options.num_towers)?;
    let sectors = options.sectors_per_tower;
    let arc = (360 / sectors) as i32;

    let mut node_name = String::new();
    let mut node = Node {
        enb_id: EnbId::new(0),
        controllers: Vec::new(),
        service_models: Vec::new(),
        cells: Vec::new(),
        status: NodeStatus::Stopped,
    };

    for t in 0..options.num_towers {
        let az_offset: i32 = if sectors == 6 { ((t % 2) * 30) as i32 } else { 0 };

        if !options.single_node || t == 0 {
            node_name = format!("node{}", t + 1);
            node = Node {
                enb_id: EnbId::new(options.enb_start + t + 1),
                controllers: controllers.clone(),
                service_models: sm_names.clone(),
                cells: Vec::with_capacity(sectors as usize),
                status: NodeStatus::Stopped,
            };
        }

        for s in 0..sectors {
            let cell_id = if options.single_node && sectors == 1 {
                CellId((t + 1) as u8)
            } else {
                CellId((s + 1) as u8)
            };
            let cell_name = format!("cell{}", t * sectors + s + 1);
            let azimuth = ((360 * s / sectors) as i32 + az_offset) % 360;

            let cell = Cell {
                ecgi: Ecgi::from_parts(options.plmn_id, node.enb_id, cell_id),
                sector: Sector {
                    center: Coordinate::new(
                        options.map_center.lat + points[t as usize].lat,
                        options.map_center.lng + points[t as usize].lng / aspect_ratio,
                    ),
                    azimuth,
                    arc,
                },
                color: "green".to_string(),
                max_ues: 99_999,
                neighbors: Vec::with_capacity(sectors as usize),
                tx_power_db: 11.0,
            };

            node.cells.push(cell.ecgi);
            model.cells.insert(cell_name, cell);
        }

        model.nodes.insert(node_name.clone(), node.clone());
    }

    add_neighbors(&mut model, options.max_distance, options.max_neighbors, sectors == 1);
    Ok(model)
}

fn add_neighbors(model: &mut Model, max_distance: f64, max_neighbors: usize, only_distance: bool) {
    let snapshot: Vec<Cell> = model.cells.values().cloned().collect();
    for cell in model.cells.values_mut() {
        for other in &snapshot {
            if cell.ecgi != other.ecgi
                && cell.neighbors.len() < max_neighbors
                && is_neighbor(cell, other, max_distance, only_distance)
            {
                cell.neighbors.push(other.ecgi);
            }
        }
    }
}

/// Cells are neighbors if their sectors share a tower, or (for
/// omnidirectional layouts) their centers are within `max_distance`, or
/// their center-arc reach points fall within `max_distance / 2`.
fn is_neighbor(cell: &Cell, other: &Cell, max_distance: f64, only_distance: bool) -> bool {
    (cell.sector.center.lat == other.sector.center.lat
        && cell.sector.center.lng == other.sector.center.lng)
        || (only_distance
            && geo::distance(cell.sector.center, other.sector.center) <= max_distance)
        || geo::distance(
            reach_point(&cell.sector, max_distance),
            reach_point(&other.sector, max_distance),
        ) <= max_distance / 2.0
}

/// End point of the sector's center-arc vector, `distance` meters out.
fn reach_point(sector: &Sector, distance: f64) -> Coordinate {
    let azimuth = ((sector.azimuth + sector.arc / 2) % 360) as f64;
    geo::target_point(sector.center, azimuth, distance)
}

fn generate_controllers(addresses: &[String]) -> HashMap<String, Controller> {
    addresses
        .iter()
        .enumerate()
        .map(|(i, address)| {
            let name = format!("e2t-{}", i + 1);
            (
                name.clone(),
                Controller {
                    id: name,
                    address: address.clone(),
                    port: 36421,
                },
            )
        })
        .collect()
}

fn generate_service_models(specs: &[String]) -> HashMap<String, ServiceModelInfo> {
    specs
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            let mut fields = spec.splitn(2, '/');
            let name = fields.next().unwrap_or(spec).to_string();
            let id = fields
                .next()
                .and_then(|f| f.parse::<i32>().ok())
                .unwrap_or(i as i32);
            (
                name.clone(),
                ServiceModelInfo {
                    id,
                    version: "1.0.0".to_string(),
                    description: format!("{name} service model"),
                },
            )
        })
        .collect()
}

/// Axial hex coordinates converted to pointy-top pixel offsets, one per
/// tower position.
fn hex_mesh(pitch: f64, num_towers: u32) -> Result<Vec<Coordinate>> {
    let rings = num_rings(num_towers)?;
    let sqrt3 = 3.0_f64.sqrt();
    let mut points = Vec::new();
    for (q, r) in hex_range(rings as i32) {
        let x = pitch * (sqrt3 * q as f64 + sqrt3 / 2.0 * r as f64);
        let y = pitch * (1.5 * r as f64);
        points.push(Coordinate::new(x, y));
    }
    Ok(points)
}

/// All axial coordinates within `radius` rings of the origin, row-major in
/// `q`. Yields `3r^2 + 3r + 1` entries.
fn hex_range(radius: i32) -> Vec<(i32, i32)> {
    let mut hexes = Vec::new();
    for q in -radius..=radius {
        let lo = (-radius).max(-q - radius);
        let hi = radius.min(-q + radius);
        for r in lo..=hi {
            hexes.push((q, r));
        }
    }
    hexes
}

/// Ring count needed to place the given number of towers.
fn num_rings(num_towers: u32) -> Result<u32> {
    match num_towers {
        0..=7 => Ok(1),
        8..=19 => Ok(2),
        20..=37 => Ok(3),
        38..=61 => Ok(4),
        62..=91 => Ok(5),
        92..=127 => Ok(6),
        128..=169 => Ok(7),
        170..=217 => Ok(8),
        218..=271 => Ok(9),
        272..=331 => Ok(10),
        332..=469 => Ok(11),
        _ => Err(Error::Invalid(format!(
            "cannot lay out {num_towers} towers, the limit is {MAX_TOWERS}"
        ))),
    }
}
