//! Inventory of simulated E2 nodes.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use ransim_common::{EnbId, Error, Result};
use tokio::sync::mpsc;

use super::event::{Event, EventKind};
use super::watchers::{WatchHandle, WatchOptions, Watchers};
use crate::model::{Model, Node, NodeStatus};

/// Store of nodes keyed by eNB/gNB ID.
#[derive(Debug)]
pub struct NodeStore {
    nodes: RwLock<HashMap<EnbId, Node>>,
    watchers: Arc<Watchers<EnbId, Node>>,
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
            watchers: Arc::new(Watchers::new()),
        }
    }

    /// Creates a store primed with the nodes of a model.
    pub fn from_model(model: &Model) -> Self {
        let store = Self::new();
        {
            let mut nodes = store.nodes.write().unwrap_or_else(|e| e.into_inner());
            for node in model.nodes.values() {
                nodes.insert(node.enb_id, node.clone());
            }
        }
        store
    }

    /// Adds a node.
    pub fn add(&self, node: Node) -> Result<()> {
        let mut nodes = self.nodes.write().unwrap_or_else(|e| e.into_inner());
        if nodes.contains_key(&node.enb_id) {
            return Err(Error::AlreadyExists(format!("node {}", node.enb_id)));
        }
        let enb_id = node.enb_id;
        nodes.insert(enb_id, node.clone());
        self.watchers.send(Event::new(enb_id, node, EventKind::Created));
        Ok(())
    }

    /// Retrieves a node snapshot.
    pub fn get(&self, enb_id: EnbId) -> Result<Node> {
        let nodes = self.nodes.read().unwrap_or_else(|e| e.into_inner());
        nodes
            .get(&enb_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("node {enb_id}")))
    }

    /// Replaces a node.
    pub fn update(&self, node: Node) -> Result<()> {
        let mut nodes = self.nodes.write().unwrap_or_else(|e| e.into_inner());
        if !nodes.contains_key(&node.enb_id) {
            return Err(Error::NotFound(format!("node {}", node.enb_id)));
        }
        let enb_id = node.enb_id;
        nodes.insert(enb_id, node.clone());
        self.watchers.send(Event::new(enb_id, node, EventKind::Updated));
        Ok(())
    }

    /// Deletes a node, returning its last snapshot.
    pub fn delete(&self, enb_id: EnbId) -> Result<Node> {
        let mut nodes = self.nodes.write().unwrap_or_else(|e| e.into_inner());
        let node = nodes
            .remove(&enb_id)
            .ok_or_else(|| Error::NotFound(format!("node {enb_id}")))?;
        self.watchers
            .send(Event::new(enb_id, node.clone(), EventKind::Deleted));
        Ok(node)
    }

    /// Sets a node's administrative status.
    pub fn set_status(&self, enb_id: EnbId, status: NodeStatus) -> Result<()> {
        let mut nodes = self.nodes.write().unwrap_or_else(|e| e.into_inner());
        let node = nodes
            .get_mut(&enb_id)
            .ok_or_else(|| Error::NotFound(format!("node {enb_id}")))?;
        node.status = status;
        let snapshot = node.clone();
        self.watchers
            .send(Event::new(enb_id, snapshot, EventKind::Updated));
        Ok(())
    }

    /// Lists all nodes.
    pub fn list(&self) -> Vec<Node> {
        let nodes = self.nodes.read().unwrap_or_else(|e| e.into_inner());
        nodes.values().cloned().collect()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attaches a watcher.
    pub fn watch(&self, options: WatchOptions) -> WatchHandle<EnbId, Node> {
        let (tx, rx) = mpsc::channel(options.capacity);
        // Hold the map read lock across registration so replay and live
        // events are totally ordered.
        let nodes = self.nodes.read().unwrap_or_else(|e| e.into_inner());
        let replay = if options.replay {
            nodes
                .values()
                .map(|n| Event::new(n.enb_id, n.clone(), EventKind::None))
                .collect()
        } else {
            Vec::new()
        };
        let id = self.watchers.add(tx, replay);
        WatchHandle::new(id, Arc::clone(&self.watchers), rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(enb_id: u32) -> Node {
        Node {
            enb_id: EnbId::new(enb_id),
            controllers: vec!["e2t-1".to_string()],
            service_models: vec!["kpm2".to_string()],
            cells: Vec::new(),
            status: NodeStatus::Stopped,
        }
    }

    #[test]
    fn test_add_get_delete() {
        let store = NodeStore::new();
        store.add(node(1)).unwrap();
        assert_eq!(store.get(EnbId::new(1)).unwrap().enb_id, EnbId::new(1));
        store.delete(EnbId::new(1)).unwrap();
        assert!(store.get(EnbId::new(1)).unwrap_err().is_not_found());
    }

    #[test]
    fn test_duplicate_add_rejected() {
        let store = NodeStore::new();
        store.add(node(1)).unwrap();
        let err = store.add(node(1)).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_mutations_emit_events() {
        let store = NodeStore::new();
        let mut watch = store.watch(WatchOptions::default());
        store.add(node(1)).unwrap();
        store.set_status(EnbId::new(1), NodeStatus::Running).unwrap();
        store.delete(EnbId::new(1)).unwrap();

        assert_eq!(watch.recv().await.unwrap().kind, EventKind::Created);
        let updated = watch.recv().await.unwrap();
        assert_eq!(updated.kind, EventKind::Updated);
        assert_eq!(updated.value.status, NodeStatus::Running);
        assert_eq!(watch.recv().await.unwrap().kind, EventKind::Deleted);
    }

    #[tokio::test]
    async fn test_watch_replay() {
        let store = NodeStore::new();
        store.add(node(1)).unwrap();
        store.add(node(2)).unwrap();
        let mut watch = store.watch(WatchOptions::replay());
        let first = watch.recv().await.unwrap();
        let second = watch.recv().await.unwrap();
        assert_eq!(first.kind, EventKind::None);
        assert_eq!(second.kind, EventKind::None);
    }

    #[test]
    fn test_dropped_watch_handle_deregisters() {
        let store = NodeStore::new();
        let watch = store.watch(WatchOptions::default());
        drop(watch);
        // A later mutation must not observe any watcher.
        store.add(node(1)).unwrap();
        assert_eq!(store.len(), 1);
    }
}
