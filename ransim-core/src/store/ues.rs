//! Inventory of simulated user equipment.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use rand::Rng;
use ransim_common::{geo, Coordinate, Crnti, Ecgi, Error, Imsi, Result, RrcStatus};
use tokio::sync::mpsc;
use tracing::debug;

use super::cells::CellStore;
use super::event::{Event, EventKind};
use super::watchers::{WatchHandle, WatchOptions, Watchers};
use crate::model::{Ue, UeCell};

const MIN_IMSI: u64 = 1_000_000;
const MAX_IMSI: u64 = 9_999_999;

/// Upper bound on re-rolls when a freshly drawn IMSI collides.
const MAX_IMSI_ATTEMPTS: usize = 100;

/// First CRNTI handed out.
const CRNTI_BASE: u32 = 90_125;

/// Radius within which a new UE is dropped around its initial cell, meters.
const INITIAL_SPREAD_M: f64 = 1_000.0;

/// Store of UEs keyed by IMSI.
#[derive(Debug)]
pub struct UeStore {
    ues: RwLock<HashMap<Imsi, Ue>>,
    cell_store: Arc<CellStore>,
    watchers: Arc<Watchers<Imsi, Ue>>,
    next_crnti: AtomicU32,
}

impl UeStore {
    /// Creates an empty registry backed by the given cell store.
    pub fn new(cell_store: Arc<CellStore>) -> Self {
        Self {
            ues: RwLock::new(HashMap::new()),
            cell_store,
            watchers: Arc::new(Watchers::new()),
            next_crnti: AtomicU32::new(CRNTI_BASE),
        }
    }

    /// Creates the specified number of UEs, semi-randomly distributed
    /// around the existing cells.
    pub fn create_ues(&self, count: usize) -> Result<()> {
        let mut ues = self.ues.write().unwrap_or_else(|e| e.into_inner());
        let mut rng = rand::thread_rng();
        for _ in 0..count {
            let mut imsi = Imsi(rng.gen_range(MIN_IMSI..=MAX_IMSI));
            let mut attempts = 0;
            while ues.contains_key(&imsi) {
                attempts += 1;
                if attempts >= MAX_IMSI_ATTEMPTS {
                    return Err(Error::Invalid(
                        "IMSI space exhausted while allocating UEs".to_string(),
                    ));
                }
                imsi = Imsi(rng.gen_range(MIN_IMSI..=MAX_IMSI));
            }

            let cell = self.cell_store.get_random_cell()?;
            let location = geo::target_point(
                cell.sector.center,
                rng.gen_range(0.0..360.0),
                rng.gen_range(0.0..INITIAL_SPREAD_M),
            );
            let ue = Ue {
                imsi,
                ue_type: "phone".to_string(),
                location,
                heading: rng.gen_range(0..360),
                crnti: Crnti(self.next_crnti.fetch_add(1, Ordering::Relaxed)),
                cell: UeCell {
                    ecgi: cell.ecgi,
                    strength: rng.gen_range(0.0..100.0),
                },
                candidate_cells: Vec::new(),
                rrc_state: RrcStatus::Idle,
                is_admitted: false,
            };
            ues.insert(imsi, ue.clone());
            self.watchers.send(Event::new(imsi, ue, EventKind::Created));
        }
        Ok(())
    }

    /// Adjusts the UE population to exactly `count`, creating or deleting
    /// as needed. Idempotent.
    pub fn set_ue_count(&self, count: usize) -> Result<()> {
        let current = self.len();
        if current < count {
            self.create_ues(count - current)?;
        } else if current > count {
            self.remove_some_ues(current - count)?;
        }
        Ok(())
    }

    fn remove_some_ues(&self, count: usize) -> Result<()> {
        let victims: Vec<Imsi> = {
            let ues = self.ues.read().unwrap_or_else(|e| e.into_inner());
            ues.keys().take(count).copied().collect()
        };
        for imsi in victims {
            self.delete(imsi)?;
        }
        Ok(())
    }

    /// Number of UEs.
    pub fn len(&self) -> usize {
        self.ues.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retrieves a UE snapshot.
    pub fn get(&self, imsi: Imsi) -> Result<Ue> {
        let ues = self.ues.read().unwrap_or_else(|e| e.into_inner());
        ues.get(&imsi)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("UE {imsi}")))
    }

    /// Deletes a UE, returning its last snapshot.
    pub fn delete(&self, imsi: Imsi) -> Result<Ue> {
        let mut ues = self.ues.write().unwrap_or_else(|e| e.into_inner());
        let ue = ues
            .remove(&imsi)
            .ok_or_else(|| Error::NotFound(format!("UE {imsi}")))?;
        self.watchers
            .send(Event::new(imsi, ue.clone(), EventKind::Deleted));
        Ok(ue)
    }

    /// Lists all UEs.
    pub fn list_all(&self) -> Vec<Ue> {
        let ues = self.ues.read().unwrap_or_else(|e| e.into_inner());
        ues.values().cloned().collect()
    }

    /// Lists the UEs served by the given cell.
    pub fn list_by_cell(&self, ecgi: Ecgi) -> Vec<Ue> {
        let ues = self.ues.read().unwrap_or_else(|e| e.into_inner());
        ues.values()
            .filter(|ue| ue.cell.ecgi == ecgi)
            .cloned()
            .collect()
    }

    /// Hands the UE over to a new serving cell.
    ///
    /// The new serving cell is dropped from the candidate list so that a
    /// UE's serving cell never appears among its neighbors.
    pub fn move_to_cell(&self, imsi: Imsi, ecgi: Ecgi, strength: f64) -> Result<()> {
        let mut ues = self.ues.write().unwrap_or_else(|e| e.into_inner());
        let ue = ues
            .get_mut(&imsi)
            .ok_or_else(|| Error::NotFound(format!("UE {imsi}")))?;
        debug!(%imsi, from = %ue.cell.ecgi, to = %ecgi, "handover");
        ue.cell = UeCell { ecgi, strength };
        ue.candidate_cells.retain(|c| c.ecgi != ecgi);
        let snapshot = ue.clone();
        self.watchers
            .send(Event::new(imsi, snapshot, EventKind::Updated));
        Ok(())
    }

    /// Updates the UE's geographic position and heading.
    pub fn move_to_coordinate(
        &self,
        imsi: Imsi,
        location: Coordinate,
        heading: u32,
    ) -> Result<()> {
        let mut ues = self.ues.write().unwrap_or_else(|e| e.into_inner());
        let ue = ues
            .get_mut(&imsi)
            .ok_or_else(|| Error::NotFound(format!("UE {imsi}")))?;
        ue.location = location;
        ue.heading = heading;
        let snapshot = ue.clone();
        self.watchers
            .send(Event::new(imsi, snapshot, EventKind::Updated));
        Ok(())
    }

    /// Replaces the UE's measured candidate list and serving strength.
    ///
    /// The serving cell is filtered out, the remainder is sorted by
    /// descending strength and truncated to `max_candidates`.
    pub fn update_candidates(
        &self,
        imsi: Imsi,
        serving_strength: f64,
        mut candidates: Vec<UeCell>,
        max_candidates: usize,
    ) -> Result<()> {
        let mut ues = self.ues.write().unwrap_or_else(|e| e.into_inner());
        let ue = ues
            .get_mut(&imsi)
            .ok_or_else(|| Error::NotFound(format!("UE {imsi}")))?;
        ue.cell.strength = serving_strength;
        candidates.retain(|c| c.ecgi != ue.cell.ecgi);
        candidates.sort_by(|a, b| {
            b.strength
                .partial_cmp(&a.strength)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(max_candidates);
        ue.candidate_cells = candidates;
        let snapshot = ue.clone();
        self.watchers
            .send(Event::new(imsi, snapshot, EventKind::Updated));
        Ok(())
    }

    /// Sets the UE's RRC state, returning the updated snapshot.
    pub fn set_rrc_state(&self, imsi: Imsi, state: RrcStatus) -> Result<Ue> {
        let mut ues = self.ues.write().unwrap_or_else(|e| e.into_inner());
        let ue = ues
            .get_mut(&imsi)
            .ok_or_else(|| Error::NotFound(format!("UE {imsi}")))?;
        ue.rrc_state = state;
        let snapshot = ue.clone();
        self.watchers
            .send(Event::new(imsi, snapshot.clone(), EventKind::Updated));
        Ok(snapshot)
    }

    /// Attaches a watcher.
    pub fn watch(&self, options: WatchOptions) -> WatchHandle<Imsi, Ue> {
        let (tx, rx) = mpsc::channel(options.capacity);
        let ues = self.ues.read().unwrap_or_else(|e| e.into_inner());
        let replay = if options.replay {
            ues.values()
                .map(|ue| Event::new(ue.imsi, ue.clone(), EventKind::None))
                .collect()
        } else {
            Vec::new()
        };
        let id = self.watchers.add(tx, replay);
        WatchHandle::new(id, Arc::clone(&self.watchers), rx)
    }
}
