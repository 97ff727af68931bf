//! Inventory of radio cells.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use rand::Rng;
use ransim_common::{Ecgi, Error, Result};
use tokio::sync::mpsc;

use super::event::{Event, EventKind};
use super::watchers::{WatchHandle, WatchOptions, Watchers};
use crate::model::{Cell, Model};

/// Store of cells keyed by ECGI.
#[derive(Debug)]
pub struct CellStore {
    cells: RwLock<HashMap<Ecgi, Cell>>,
    watchers: Arc<Watchers<Ecgi, Cell>>,
}

impl Default for CellStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CellStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            cells: RwLock::new(HashMap::new()),
            watchers: Arc::new(Watchers::new()),
        }
    }

    /// Creates a store primed with the cells of a model.
    pub fn from_model(model: &Model) -> Self {
        let store = Self::new();
        {
            let mut cells = store.cells.write().unwrap_or_else(|e| e.into_inner());
            for cell in model.cells.values() {
                cells.insert(cell.ecgi, cell.clone());
            }
        }
        store
    }

    /// Adds a cell.
    pub fn add(&self, cell: Cell) -> Result<()> {
        let mut cells = self.cells.write().unwrap_or_else(|e| e.into_inner());
        if cells.contains_key(&cell.ecgi) {
            return Err(Error::AlreadyExists(format!("cell {}", cell.ecgi)));
        }
        let ecgi = cell.ecgi;
        cells.insert(ecgi, cell.clone());
        self.watchers.send(Event::new(ecgi, cell, EventKind::Created));
        Ok(())
    }

    /// Retrieves a cell snapshot.
    pub fn get(&self, ecgi: Ecgi) -> Result<Cell> {
        let cells = self.cells.read().unwrap_or_else(|e| e.into_inner());
        cells
            .get(&ecgi)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("cell {ecgi}")))
    }

    /// Replaces a cell.
    pub fn update(&self, cell: Cell) -> Result<()> {
        let mut cells = self.cells.write().unwrap_or_else(|e| e.into_inner());
        if !cells.contains_key(&cell.ecgi) {
            return Err(Error::NotFound(format!("cell {}", cell.ecgi)));
        }
        let ecgi = cell.ecgi;
        cells.insert(ecgi, cell.clone());
        self.watchers.send(Event::new(ecgi, cell, EventKind::Updated));
        Ok(())
    }

    /// Deletes a cell, returning its last snapshot.
    pub fn delete(&self, ecgi: Ecgi) -> Result<Cell> {
        let mut cells = self.cells.write().unwrap_or_else(|e| e.into_inner());
        let cell = cells
            .remove(&ecgi)
            .ok_or_else(|| Error::NotFound(format!("cell {ecgi}")))?;
        self.watchers
            .send(Event::new(ecgi, cell.clone(), EventKind::Deleted));
        Ok(cell)
    }

    /// Lists all cells.
    pub fn list(&self) -> Vec<Cell> {
        let cells = self.cells.read().unwrap_or_else(|e| e.into_inner());
        cells.values().cloned().collect()
    }

    /// Picks a uniformly random cell, for initial UE attachment.
    pub fn get_random_cell(&self) -> Result<Cell> {
        let cells = self.cells.read().unwrap_or_else(|e| e.into_inner());
        if cells.is_empty() {
            return Err(Error::NotFound("no cells in store".to_string()));
        }
        let index = rand::thread_rng().gen_range(0..cells.len());
        cells
            .values()
            .nth(index)
            .cloned()
            .ok_or_else(|| Error::Internal("cell index out of range".to_string()))
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attaches a watcher.
    pub fn watch(&self, options: WatchOptions) -> WatchHandle<Ecgi, Cell> {
        let (tx, rx) = mpsc::channel(options.capacity);
        let cells = self.cells.read().unwrap_or_else(|e| e.into_inner());
        let replay = if options.replay {
            cells
                .values()
                .map(|c| Event::new(c.ecgi, c.clone(), EventKind::None))
                .collect()
        } else {
            Vec::new()
        };
        let id = self.watchers.add(tx, replay);
        WatchHandle::new(id, Arc::clone(&self.watchers), rx)
    }
}
