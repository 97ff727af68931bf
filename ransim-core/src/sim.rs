//! The simulation façade: wires a model into stores, the mobility driver
//! and one E2 agent per node.

use std::collections::HashMap;
use std::sync::Arc;

use ransim_common::{Error, PlmnId, Result};
use ransim_e2::channel::DEFAULT_CHANNEL_CAPACITY;
use ransim_e2::{CodecRegistry, E2Channel, E2ChannelEnd};
use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::agent::{E2Agent, E2AgentRequest};
use crate::mobility::{MobilityConfig, MobilityDriver};
use crate::model::Model;
use crate::sm::SmContext;
use crate::store::{CellStore, NodeStore, SubscriptionStore, UeStore};

/// Capacity of each agent's dispatch queue.
const AGENT_QUEUE_CAPACITY: usize = 16;

/// A running simulation: stores, driver and agents built from a model.
pub struct Simulation {
    plmn_id: PlmnId,
    node_store: Arc<NodeStore>,
    cell_store: Arc<CellStore>,
    ue_store: Arc<UeStore>,
    subscriptions: Arc<SubscriptionStore>,
    driver: Arc<MobilityDriver>,
    agents: HashMap<String, Arc<E2Agent>>,
    shutdown_tx: watch::Sender<bool>,
}

impl Simulation {
    /// Builds a simulation from a model: primes the stores, creates the
    /// UE population and one agent per node.
    pub fn new(
        model: &Model,
        codecs: Arc<CodecRegistry>,
        mobility: MobilityConfig,
    ) -> Result<Self> {
        model.validate()?;
        let node_store = Arc::new(NodeStore::from_model(model));
        let cell_store = Arc::new(CellStore::from_model(model));
        let ue_store = Arc::new(UeStore::new(Arc::clone(&cell_store)));
        let subscriptions = Arc::new(SubscriptionStore::new());
        if model.ue_count > 0 {
            ue_store.set_ue_count(model.ue_count as usize)?;
        }

        let driver = Arc::new(MobilityDriver::new(
            Arc::clone(&cell_store),
            Arc::clone(&ue_store),
            mobility,
        ));

        let mut agents = HashMap::new();
        for (name, node) in &model.nodes {
            let ctx = SmContext {
                plmn_id: model.plmn_id,
                enb_id: node.enb_id,
                node_store: Arc::clone(&node_store),
                cell_store: Arc::clone(&cell_store),
                ue_store: Arc::clone(&ue_store),
                subscriptions: Arc::clone(&subscriptions),
                codecs: Arc::clone(&codecs),
                rrc_updates: driver.rrc_update_sender(),
            };
            agents.insert(name.clone(), Arc::new(E2Agent::new(node, ctx)));
        }

        let (shutdown_tx, _) = watch::channel(false);
        info!(
            nodes = agents.len(),
            cells = cell_store.len(),
            ues = ue_store.len(),
            "simulation assembled"
        );
        Ok(Self {
            plmn_id: model.plmn_id,
            node_store,
            cell_store,
            ue_store,
            subscriptions,
            driver,
            agents,
            shutdown_tx,
        })
    }

    /// Starts the mobility driver.
    pub fn start(&self) {
        let driver = Arc::clone(&self.driver);
        let shutdown_rx = self.shutdown_tx.subscribe();
        tokio::spawn(async move { driver.run(shutdown_rx).await });
    }

    /// Opens an E2 association to a node's agent: spawns the serving task
    /// and returns the RIC-side channel end plus the request queue.
    pub fn connect(
        &self,
        node_name: &str,
    ) -> Result<(E2ChannelEnd, mpsc::Sender<E2AgentRequest>)> {
        let agent = self
            .agents
            .get(node_name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("node {node_name}")))?;
        let (channel, end) = E2Channel::new(DEFAULT_CHANNEL_CAPACITY);
        let (request_tx, request_rx) = mpsc::channel(AGENT_QUEUE_CAPACITY);
        tokio::spawn(async move { agent.serve(channel, request_rx).await });
        Ok((end, request_tx))
    }

    /// Signals every simulation task to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// The model's operator identifier.
    pub fn plmn_id(&self) -> PlmnId {
        self.plmn_id
    }

    /// The node inventory.
    pub fn node_store(&self) -> &Arc<NodeStore> {
        &self.node_store
    }

    /// The cell inventory.
    pub fn cell_store(&self) -> &Arc<CellStore> {
        &self.cell_store
    }

    /// The UE inventory.
    pub fn ue_store(&self) -> &Arc<UeStore> {
        &self.ue_store
    }

    /// The subscription registry.
    pub fn subscriptions(&self) -> &Arc<SubscriptionStore> {
        &self.subscriptions
    }

    /// The mobility driver.
    pub fn driver(&self) -> &Arc<MobilityDriver> {
        &self.driver
    }

    /// The agent serving the named node.
    pub fn agent(&self, node_name: &str) -> Option<&Arc<E2Agent>> {
        self.agents.get(node_name)
    }

    /// Node names with agents.
    pub fn node_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.keys().cloned().collect();
        names.sort();
        names
    }
}
