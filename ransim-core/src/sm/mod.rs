//! Service models and the per-node registry.
//!
//! Each E2 node installs a set of service-model clients keyed by RAN
//! function ID. A client handles `RICSubscription`,
//! `RICSubscriptionDelete` and `RICControl` for its model; dispatch is by
//! the [`SmClient`] enum. Clients receive their dependencies (stores,
//! codec registry, RRC update feed) explicitly at construction.

pub mod kpm2;
pub mod mho;
pub mod rcpre;

use std::collections::HashMap;
use std::sync::Arc;

use ransim_common::{EnbId, Error, PlmnId, Result};
use ransim_e2::pdu::{
    RanFunctionId, RejectedAction, RicActionId, RicActionType, RicCause, RicControlRequest,
    RicSubscriptionDeleteFailure, RicSubscriptionDeleteRequest, RicSubscriptionDeleteResponse,
    RicSubscriptionFailure, RicSubscriptionRequest, RicSubscriptionResponse,
};
use ransim_e2::{CodecRegistry, E2Channel};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::model::Ue;
use crate::store::{CellStore, NodeStore, SubscriptionId, SubscriptionStore, UeStore};

pub use kpm2::Kpm2Client;
pub use mho::MhoClient;
pub use rcpre::RcPreClient;

/// RAN function ID of the KPM v2 service model.
pub const KPM2_RAN_FUNCTION_ID: RanFunctionId = 2;
/// RAN function ID of the RC-PRE service model.
pub const RC_PRE_RAN_FUNCTION_ID: RanFunctionId = 3;
/// RAN function ID of the MHO service model.
pub const MHO_RAN_FUNCTION_ID: RanFunctionId = 5;

/// Dependencies a service-model client is constructed with.
#[derive(Debug, Clone)]
pub struct SmContext {
    /// Operator identifier of the model.
    pub plmn_id: PlmnId,
    /// The owning node.
    pub enb_id: EnbId,
    /// Node inventory, used to resolve the node's cell list per tick.
    pub node_store: Arc<NodeStore>,
    /// Cell inventory.
    pub cell_store: Arc<CellStore>,
    /// UE inventory.
    pub ue_store: Arc<UeStore>,
    /// Active subscriptions.
    pub subscriptions: Arc<SubscriptionStore>,
    /// Codec plugins by OID.
    pub codecs: Arc<CodecRegistry>,
    /// RRC flip snapshots from the mobility driver.
    pub rrc_updates: broadcast::Sender<Ue>,
}

/// Outcome of a subscription request: a response or a failure PDU.
/// Transport-level errors travel separately as `Err`.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionOutcome {
    /// The subscription was accepted.
    Accepted(RicSubscriptionResponse),
    /// The subscription was refused.
    Rejected(RicSubscriptionFailure),
}

/// Outcome of a subscription delete request.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionDeleteOutcome {
    /// The subscription was removed.
    Removed(RicSubscriptionDeleteResponse),
    /// The subscription was unknown.
    Rejected(RicSubscriptionDeleteFailure),
}

/// Outcome of a control request.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlOutcome {
    /// The control action was applied.
    Ack(ransim_e2::pdu::RicControlAcknowledge),
    /// The control action was refused.
    Rejected(ransim_e2::pdu::RicControlFailure),
}

/// A service-model client.
#[derive(Debug)]
pub enum SmClient {
    /// KPM v2: periodic per-cell measurement reports.
    Kpm2(Kpm2Client),
    /// MHO: per-UE measurement reports and RRC state updates.
    Mho(MhoClient),
    /// RC-PRE: cell configuration reports and control.
    RcPre(RcPreClient),
}

impl SmClient {
    /// The RAN function ID this client serves.
    pub fn ran_function_id(&self) -> RanFunctionId {
        match self {
            SmClient::Kpm2(_) => KPM2_RAN_FUNCTION_ID,
            SmClient::Mho(_) => MHO_RAN_FUNCTION_ID,
            SmClient::RcPre(_) => RC_PRE_RAN_FUNCTION_ID,
        }
    }

    /// The RAN function short name.
    pub fn name(&self) -> &'static str {
        match self {
            SmClient::Kpm2(_) => ransim_e2::e2sm::kpm::SHORT_NAME,
            SmClient::Mho(_) => ransim_e2::e2sm::mho::SHORT_NAME,
            SmClient::RcPre(_) => ransim_e2::e2sm::rcpre::SHORT_NAME,
        }
    }

    /// The service-model OID.
    pub fn oid(&self) -> &'static str {
        match self {
            SmClient::Kpm2(_) => ransim_e2::e2sm::kpm::OID,
            SmClient::Mho(_) => ransim_e2::e2sm::mho::OID,
            SmClient::RcPre(_) => ransim_e2::e2sm::rcpre::OID,
        }
    }

    /// Handles a subscription request.
    pub async fn ric_subscription(
        &self,
        channel: &E2Channel,
        request: &RicSubscriptionRequest,
    ) -> Result<SubscriptionOutcome> {
        match self {
            SmClient::Kpm2(client) => client.ric_subscription(channel, request).await,
            SmClient::Mho(client) => client.ric_subscription(channel, request).await,
            SmClient::RcPre(client) => client.ric_subscription(channel, request).await,
        }
    }

    /// Handles a subscription delete request.
    pub async fn ric_subscription_delete(
        &self,
        request: &RicSubscriptionDeleteRequest,
    ) -> Result<SubscriptionDeleteOutcome> {
        match self {
            SmClient::Kpm2(client) => client.ric_subscription_delete(request).await,
            SmClient::Mho(client) => client.ric_subscription_delete(request).await,
            SmClient::RcPre(client) => client.ric_subscription_delete(request).await,
        }
    }

    /// Handles a control request.
    pub async fn ric_control(&self, request: &RicControlRequest) -> Result<ControlOutcome> {
        match self {
            SmClient::Kpm2(_) => Err(Error::NotSupported(
                "KPM does not support control operations".to_string(),
            )),
            SmClient::Mho(_) => Err(Error::NotSupported(
                "MHO does not support control operations".to_string(),
            )),
            SmClient::RcPre(client) => client.ric_control(request).await,
        }
    }
}

/// Per-node table of installed service models.
#[derive(Default)]
pub struct SmRegistry {
    clients: HashMap<RanFunctionId, SmClient>,
}

impl SmRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a client under its RAN function ID.
    pub fn register(&mut self, client: SmClient) {
        info!(
            ran_function_id = client.ran_function_id(),
            name = client.name(),
            "registering service model"
        );
        self.clients.insert(client.ran_function_id(), client);
    }

    /// Looks up the client for a RAN function.
    pub fn get(&self, ran_function_id: RanFunctionId) -> Result<&SmClient> {
        self.clients
            .get(&ran_function_id)
            .ok_or_else(|| Error::NotFound(format!("RAN function {ran_function_id}")))
    }

    /// Installed RAN function IDs.
    pub fn ran_function_ids(&self) -> Vec<RanFunctionId> {
        let mut ids: Vec<RanFunctionId> = self.clients.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of installed service models.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no service model is installed.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

/// Splits requested actions into accepted and rejected sets. REPORT is the
/// only action type the report-style service models admit; INSERT and
/// POLICY are refused with `RIC_ACTION_NOT_SUPPORTED`.
pub(crate) fn partition_report_actions(
    request: &RicSubscriptionRequest,
) -> (Vec<RicActionId>, Vec<RejectedAction>) {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for action in &request.actions {
        match action.action_type {
            RicActionType::Report => accepted.push(action.action_id),
            RicActionType::Insert | RicActionType::Policy => rejected.push(RejectedAction {
                action_id: action.action_id,
                cause: RicCause::ActionNotSupported,
            }),
        }
    }
    (accepted, rejected)
}

/// Builds the failure PDU for a refused subscription.
pub(crate) fn subscription_failure(
    request: &RicSubscriptionRequest,
    cause: RicCause,
    actions_not_admitted: Vec<RejectedAction>,
) -> RicSubscriptionFailure {
    RicSubscriptionFailure {
        request_id: request.request_id,
        ran_function_id: request.ran_function_id,
        cause,
        actions_not_admitted,
    }
}

/// Shared delete path: cancel the emitter, wait for it to finish, drop the
/// subscription from the store and respond. Upon return, no further
/// indication will be handed to the channel for this subscription.
pub(crate) async fn delete_subscription(
    subscriptions: &SubscriptionStore,
    request: &RicSubscriptionDeleteRequest,
) -> Result<SubscriptionDeleteOutcome> {
    let id = SubscriptionId::from_request(request.request_id, request.ran_function_id);
    let sub = match subscriptions.get(id) {
        Ok(sub) => sub,
        Err(e) if e.is_not_found() => {
            debug!(%id, "delete for unknown subscription");
            return Ok(SubscriptionDeleteOutcome::Rejected(
                RicSubscriptionDeleteFailure {
                    request_id: request.request_id,
                    ran_function_id: request.ran_function_id,
                    cause: RicCause::RequestIdUnknown,
                },
            ));
        }
        Err(e) => return Err(e),
    };

    sub.cancel();
    sub.join_emitter().await;
    // The emitter may have raced us here when its channel closed.
    match subscriptions.remove(id) {
        Ok(_) => {}
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e),
    }

    Ok(SubscriptionDeleteOutcome::Removed(
        RicSubscriptionDeleteResponse {
            request_id: request.request_id,
            ran_function_id: request.ran_function_id,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use ransim_e2::pdu::{RicActionToBeSetup, RicRequestId};

    fn request(actions: Vec<(i32, RicActionType)>) -> RicSubscriptionRequest {
        RicSubscriptionRequest {
            request_id: RicRequestId::new(10, 1),
            ran_function_id: KPM2_RAN_FUNCTION_ID,
            event_trigger: Bytes::new(),
            actions: actions
                .into_iter()
                .map(|(id, action_type)| RicActionToBeSetup {
                    action_id: id,
                    action_type,
                    definition: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_partition_accepts_report_only() {
        let req = request(vec![
            (1, RicActionType::Report),
            (2, RicActionType::Insert),
            (3, RicActionType::Policy),
        ]);
        let (accepted, rejected) = partition_report_actions(&req);
        assert_eq!(accepted, vec![1]);
        assert_eq!(rejected.len(), 2);
        assert!(rejected
            .iter()
            .all(|r| r.cause == RicCause::ActionNotSupported));
    }

    #[tokio::test]
    async fn test_delete_unknown_subscription_rejected() {
        let store = SubscriptionStore::new();
        let request = RicSubscriptionDeleteRequest {
            request_id: RicRequestId::new(10, 1),
            ran_function_id: KPM2_RAN_FUNCTION_ID,
        };
        let outcome = delete_subscription(&store, &request).await.unwrap();
        match outcome {
            SubscriptionDeleteOutcome::Rejected(failure) => {
                assert_eq!(failure.cause, RicCause::RequestIdUnknown);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_registry_lookup() {
        let registry = SmRegistry::new();
        assert!(registry.get(KPM2_RAN_FUNCTION_ID).unwrap_err().is_not_found());
        assert!(registry.is_empty());
    }
}
