//! Registry of active RIC subscriptions.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

use ransim_common::{Error, Result};
use ransim_e2::pdu::{RanFunctionId, RejectedAction, RicActionId, RicRequestId};
use ransim_e2::E2Channel;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

/// Subscription key: the `(ricInstanceID, requesterID, ranFuncID)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    /// RIC instance identifier.
    pub ric_instance_id: i32,
    /// Requester identifier.
    pub requester_id: i32,
    /// RAN function identifier.
    pub ran_function_id: RanFunctionId,
}

impl SubscriptionId {
    /// Creates a subscription identifier.
    pub const fn new(
        ric_instance_id: i32,
        requester_id: i32,
        ran_function_id: RanFunctionId,
    ) -> Self {
        Self {
            ric_instance_id,
            requester_id,
            ran_function_id,
        }
    }

    /// Derives the identifier from an E2AP request-id pair.
    pub const fn from_request(request_id: RicRequestId, ran_function_id: RanFunctionId) -> Self {
        Self::new(request_id.instance_id, request_id.requester_id, ran_function_id)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sub-{}:{}:{}",
            self.ric_instance_id, self.requester_id, self.ran_function_id
        )
    }
}

/// An active subscription.
///
/// Owns the cancellation handle of its emitter task. Cancelling and then
/// joining the emitter guarantees that no further indication is handed to
/// the channel once a delete returns.
#[derive(Debug)]
pub struct Subscription {
    /// Subscription key.
    pub id: SubscriptionId,
    /// Actions accepted at setup.
    pub actions_accepted: Vec<RicActionId>,
    /// Actions rejected at setup, with causes.
    pub actions_rejected: Vec<RejectedAction>,
    /// The owning E2 association.
    pub channel: E2Channel,
    cancel_tx: watch::Sender<bool>,
    cancel_rx: watch::Receiver<bool>,
    emitter: Mutex<Option<JoinHandle<()>>>,
}

impl Subscription {
    /// Creates a subscription bound to the given channel.
    pub fn new(
        id: SubscriptionId,
        actions_accepted: Vec<RicActionId>,
        actions_rejected: Vec<RejectedAction>,
        channel: E2Channel,
    ) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            id,
            actions_accepted,
            actions_rejected,
            channel,
            cancel_tx,
            cancel_rx,
            emitter: Mutex::new(None),
        }
    }

    /// Signals the emitter to stop.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    /// Returns a receiver resolving when the subscription is cancelled.
    pub fn cancel_signal(&self) -> watch::Receiver<bool> {
        self.cancel_rx.clone()
    }

    /// Records the emitter task handle. At most one emitter may exist.
    pub fn attach_emitter(&self, handle: JoinHandle<()>) {
        let mut emitter = self.emitter.lock().unwrap_or_else(|e| e.into_inner());
        debug_assert!(emitter.is_none(), "subscription already has an emitter");
        *emitter = Some(handle);
    }

    /// Waits for the emitter task to finish, if one was attached.
    pub async fn join_emitter(&self) {
        let handle = {
            let mut emitter = self.emitter.lock().unwrap_or_else(|e| e.into_inner());
            emitter.take()
        };
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                // A panicking emitter must not take down its neighbors.
                warn!(id = %self.id, "emitter task ended abnormally: {e}");
            }
        }
    }
}

/// Waits until the given cancel signal fires.
pub async fn cancelled(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Store of active subscriptions keyed by the subscription triple.
#[derive(Debug, Default)]
pub struct SubscriptionStore {
    subs: RwLock<HashMap<SubscriptionId, Arc<Subscription>>>,
}

impl SubscriptionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscription.
    pub fn add(&self, subscription: Subscription) -> Result<Arc<Subscription>> {
        let mut subs = self.subs.write().unwrap_or_else(|e| e.into_inner());
        if subs.contains_key(&subscription.id) {
            return Err(Error::AlreadyExists(subscription.id.to_string()));
        }
        let sub = Arc::new(subscription);
        subs.insert(sub.id, Arc::clone(&sub));
        Ok(sub)
    }

    /// Looks up a subscription.
    pub fn get(&self, id: SubscriptionId) -> Result<Arc<Subscription>> {
        let subs = self.subs.read().unwrap_or_else(|e| e.into_inner());
        subs.get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Removes a subscription, returning it.
    pub fn remove(&self, id: SubscriptionId) -> Result<Arc<Subscription>> {
        let mut subs = self.subs.write().unwrap_or_else(|e| e.into_inner());
        subs.remove(&id).ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Lists active subscriptions.
    pub fn list(&self) -> Vec<Arc<Subscription>> {
        let subs = self.subs.read().unwrap_or_else(|e| e.into_inner());
        subs.values().cloned().collect()
    }

    /// Number of active subscriptions.
    pub fn len(&self) -> usize {
        self.subs.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns true if no subscriptions are active.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
