//! The mobility driver tick loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use ransim_common::{geo, Ecgi, Imsi};
use tokio::sync::{broadcast, watch};
use tokio::time::interval;
use tracing::{debug, info, warn};

use super::rf;
use super::rrc::RrcCtrl;
use crate::model::{Ue, UeCell};
use crate::store::{CellStore, UeStore};

/// Mobility driver parameters.
#[derive(Debug, Clone)]
pub struct MobilityConfig {
    /// Tick interval.
    pub tick_interval: Duration,
    /// UE ground speed in meters per second.
    pub ue_speed_mps: f64,
    /// Maximum per-tick heading perturbation, degrees either way.
    pub heading_jitter_deg: i32,
    /// Margin a candidate must hold over the serving cell before a
    /// handover, in dB.
    pub hysteresis_db: f64,
    /// Number of consecutive ticks the margin must hold.
    pub handover_dwell_ticks: u32,
    /// Upper bound on a UE's candidate neighbor list.
    pub max_candidate_cells: usize,
    /// Per-tick per-UE probability of an RRC state flip, in [0, 1].
    pub probability_rrc_state_change: f64,
}

impl Default for MobilityConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            ue_speed_mps: 20.0,
            heading_jitter_deg: 10,
            hysteresis_db: 3.0,
            handover_dwell_ticks: 2,
            max_candidate_cells: 3,
            probability_rrc_state_change: 0.05,
        }
    }
}

/// Per-UE handover dwell counters carried across ticks.
#[derive(Debug, Default)]
pub struct HandoverDwell {
    entries: HashMap<Imsi, (Ecgi, u32)>,
}

/// Drives UE movement, measurement, handover and RRC state.
pub struct MobilityDriver {
    cell_store: Arc<CellStore>,
    ue_store: Arc<UeStore>,
    config: MobilityConfig,
    rrc: RrcCtrl,
}

impl MobilityDriver {
    /// Creates a driver over the given stores.
    pub fn new(cell_store: Arc<CellStore>, ue_store: Arc<UeStore>, config: MobilityConfig) -> Self {
        Self {
            cell_store,
            ue_store,
            config,
            rrc: RrcCtrl::new(),
        }
    }

    /// The driver configuration.
    pub fn config(&self) -> &MobilityConfig {
        &self.config
    }

    pub(crate) fn ue_store(&self) -> &UeStore {
        &self.ue_store
    }

    pub(crate) fn rrc_ctrl(&self) -> &RrcCtrl {
        &self.rrc
    }

    /// Subscribes to RRC update snapshots.
    pub fn rrc_updates(&self) -> broadcast::Receiver<Ue> {
        self.rrc.subscribe()
    }

    /// The RRC update sender, for wiring into service-model clients.
    pub fn rrc_update_sender(&self) -> broadcast::Sender<Ue> {
        self.rrc.sender()
    }

    /// Runs the tick loop until the shutdown signal fires.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_ms = self.config.tick_interval.as_millis() as u64,
            "mobility driver starting"
        );
        let mut ticker = interval(self.config.tick_interval);
        // The first tick of a tokio interval fires immediately.
        ticker.tick().await;
        let mut dwell = HandoverDwell::default();
        loop {
            tokio::select! {
                _ = ticker.tick() => self.step(&mut dwell),
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("mobility driver stopped");
    }

    /// Applies one tick to every UE. Handover dwell counters persist
    /// between calls through `dwell`.
    pub fn step(&self, dwell: &mut HandoverDwell) {
        let cells = self.cell_store.list();
        let ues = self.ue_store.list_all();
        dwell
            .entries
            .retain(|imsi, _| ues.iter().any(|ue| ue.imsi == *imsi));

        for ue in ues {
            let location = self.advance(&ue);
            self.measure_and_rank(&ue, location, &cells, dwell);
            self.update_rrc(ue.imsi, self.config.probability_rrc_state_change);
        }
    }

    /// Moves a UE one step along its (possibly perturbed) heading and
    /// returns the new position.
    fn advance(&self, ue: &Ue) -> ransim_common::Coordinate {
        let mut rng = rand::thread_rng();
        let jitter = if self.config.heading_jitter_deg > 0 {
            rng.gen_range(-self.config.heading_jitter_deg..=self.config.heading_jitter_deg)
        } else {
            0
        };
        let heading = (i64::from(ue.heading) + i64::from(jitter)).rem_euclid(360) as u32;
        let step = self.config.ue_speed_mps * self.config.tick_interval.as_secs_f64();
        let location = geo::target_point(ue.location, f64::from(heading), step);
        if let Err(e) = self.ue_store.move_to_coordinate(ue.imsi, location, heading) {
            // The UE can vanish mid-tick when the population shrinks.
            debug!(imsi = %ue.imsi, "skipping moved UE: {e}");
        }
        location
    }

    /// Recomputes cell strengths at `location`, reorders the candidate
    /// list and applies the hysteresis/dwell handover decision.
    fn measure_and_rank(
        &self,
        ue: &Ue,
        location: ransim_common::Coordinate,
        cells: &[crate::model::Cell],
        dwell: &mut HandoverDwell,
    ) {
        let measured: Vec<UeCell> = cells
            .iter()
            .map(|cell| UeCell {
                ecgi: cell.ecgi,
                strength: rf::strength(location, cell),
            })
            .collect();

        let serving_strength = measured
            .iter()
            .find(|m| m.ecgi == ue.cell.ecgi)
            .map(|m| m.strength)
            .unwrap_or(ue.cell.strength);

        if let Err(e) = self.ue_store.update_candidates(
            ue.imsi,
            serving_strength,
            measured.clone(),
            self.config.max_candidate_cells,
        ) {
            debug!(imsi = %ue.imsi, "skipping measurement update: {e}");
            return;
        }

        let best = measured
            .iter()
            .filter(|m| m.ecgi != ue.cell.ecgi)
            .max_by(|a, b| {
                a.strength
                    .partial_cmp(&b.strength)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

        let Some(top) = best else {
            dwell.entries.remove(&ue.imsi);
            return;
        };

        if top.strength > serving_strength + self.config.hysteresis_db {
            let count = match dwell.entries.get(&ue.imsi) {
                Some((target, count)) if *target == top.ecgi => count + 1,
                _ => 1,
            };
            if count >= self.config.handover_dwell_ticks {
                dwell.entries.remove(&ue.imsi);
                if let Err(e) = self.ue_store.move_to_cell(ue.imsi, top.ecgi, top.strength) {
                    warn!(imsi = %ue.imsi, "handover failed: {e}");
                }
            } else {
                dwell.entries.insert(ue.imsi, (top.ecgi, count));
            }
        } else {
            dwell.entries.remove(&ue.imsi);
        }
    }
}
