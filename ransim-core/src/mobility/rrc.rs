//! RRC state control.

use rand::Rng;
use ransim_common::{Imsi, RrcStatus};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::driver::MobilityDriver;
use crate::model::Ue;

/// Capacity of the RRC update broadcast channel.
const RRC_UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Publishes UE snapshots on RRC state changes.
pub struct RrcCtrl {
    update_tx: broadcast::Sender<Ue>,
}

impl Default for RrcCtrl {
    fn default() -> Self {
        Self::new()
    }
}

impl RrcCtrl {
    /// Creates the controller and its broadcast channel.
    pub fn new() -> Self {
        let (update_tx, _) = broadcast::channel(RRC_UPDATE_CHANNEL_CAPACITY);
        Self { update_tx }
    }

    /// Subscribes to update snapshots.
    pub fn subscribe(&self) -> broadcast::Receiver<Ue> {
        self.update_tx.subscribe()
    }

    /// The underlying sender.
    pub fn sender(&self) -> broadcast::Sender<Ue> {
        self.update_tx.clone()
    }

    /// Publishes a flip. Send errors only mean nobody is listening.
    pub(crate) fn publish(&self, ue: Ue) {
        let _ = self.update_tx.send(ue);
    }
}

impl MobilityDriver {
    /// With the given probability, toggles the UE between IDLE and
    /// CONNECTED and publishes the updated snapshot. Any other observed
    /// state is logged and left unchanged.
    pub(crate) fn update_rrc(&self, imsi: Imsi, probability: f64) {
        let mut rng = rand::thread_rng();
        if !rng.gen_bool(probability.clamp(0.0, 1.0)) {
            return;
        }

        let ue = match self.ue_store().get(imsi) {
            Ok(ue) => ue,
            Err(e) => {
                warn!(%imsi, "unable to find UE for RRC update: {e}");
                return;
            }
        };

        let next = match ue.rrc_state {
            RrcStatus::Idle => {
                debug!(%imsi, "RRC state change from IDLE to CONNECTED");
                RrcStatus::Connected
            }
            RrcStatus::Connected => {
                debug!(%imsi, "RRC state change from CONNECTED to IDLE");
                RrcStatus::Idle
            }
            other => {
                warn!(%imsi, state = %other, "invalid RRC state for toggle");
                return;
            }
        };

        match self.ue_store().set_rrc_state(imsi, next) {
            Ok(snapshot) => self.rrc_ctrl().publish(snapshot),
            Err(e) => warn!(%imsi, "RRC state update failed: {e}"),
        }
    }
}
