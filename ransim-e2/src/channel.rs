//! The E2 channel abstraction.
//!
//! An [`E2Channel`] is the node-side handle of an association with a RIC:
//! it accepts typed [`RicIndication`] PDUs and exposes the association's
//! cancellation state. The RIC side holds the [`E2ChannelEnd`], which
//! receives the indications and can close the association. Transport-level
//! association setup is out of scope; in-process the channel is a bounded
//! `mpsc` plus a `watch`-based closed flag.

use ransim_common::{Error, Result};
use tokio::sync::{mpsc, watch};

use crate::pdu::RicIndication;

/// Default indication buffer capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Node-side handle of an E2 association.
#[derive(Debug, Clone)]
pub struct E2Channel {
    indications: mpsc::Sender<RicIndication>,
    closed_rx: watch::Receiver<bool>,
}

impl E2Channel {
    /// Creates a channel pair with the given indication buffer capacity.
    pub fn new(capacity: usize) -> (E2Channel, E2ChannelEnd) {
        let (tx, rx) = mpsc::channel(capacity);
        let (closed_tx, closed_rx) = watch::channel(false);
        (
            E2Channel {
                indications: tx,
                closed_rx,
            },
            E2ChannelEnd {
                indications: rx,
                closed_tx,
            },
        )
    }

    /// Hands an indication PDU to the association.
    ///
    /// Fails with [`Error::Internal`] once the channel is closed.
    pub async fn ric_indication(&self, pdu: RicIndication) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Internal("E2 channel is closed".to_string()));
        }
        self.indications
            .send(pdu)
            .await
            .map_err(|_| Error::Internal("E2 channel receiver dropped".to_string()))
    }

    /// Returns true once the association is closed.
    pub fn is_closed(&self) -> bool {
        *self.closed_rx.borrow() || self.indications.is_closed()
    }

    /// Resolves when the association is closed.
    pub async fn closed(&self) {
        let mut rx = self.closed_rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            // A send error means the RIC end was dropped entirely.
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// RIC-side end of an E2 association.
pub struct E2ChannelEnd {
    indications: mpsc::Receiver<RicIndication>,
    closed_tx: watch::Sender<bool>,
}

impl E2ChannelEnd {
    /// Receives the next indication, or `None` when all senders are gone.
    pub async fn recv(&mut self) -> Option<RicIndication> {
        self.indications.recv().await
    }

    /// Receives without waiting.
    pub fn try_recv(&mut self) -> Option<RicIndication> {
        self.indications.try_recv().ok()
    }

    /// Closes the association. Emitters observe this within one tick.
    pub fn close(&self) {
        let _ = self.closed_tx.send(true);
    }
}
