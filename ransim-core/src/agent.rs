//! Per-node E2 agent.
//!
//! An agent owns the node's service-model registry and dispatches inbound
//! RIC procedures to the installed clients. While serving a channel the
//! node is marked `running`; it reverts to `stopped` when the channel
//! closes or the request stream ends.

use ransim_common::{EnbId, Result};
use ransim_e2::pdu::{
    RicCause, RicControlFailure, RicControlRequest, RicSubscriptionDeleteFailure,
    RicSubscriptionDeleteRequest, RicSubscriptionRequest,
};
use ransim_e2::E2Channel;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::model::{Node, NodeStatus};
use crate::sm::{
    ControlOutcome, Kpm2Client, MhoClient, RcPreClient, SmClient, SmContext, SmRegistry,
    SubscriptionDeleteOutcome, SubscriptionOutcome,
};

/// An inbound RIC procedure.
#[derive(Debug, Clone)]
pub enum RicRequest {
    /// RIC subscription request.
    Subscription(RicSubscriptionRequest),
    /// RIC subscription delete request.
    SubscriptionDelete(RicSubscriptionDeleteRequest),
    /// RIC control request.
    Control(RicControlRequest),
}

/// The reply to an inbound RIC procedure.
#[derive(Debug, Clone, PartialEq)]
pub enum RicReply {
    /// Subscription outcome.
    Subscription(SubscriptionOutcome),
    /// Subscription delete outcome.
    SubscriptionDelete(SubscriptionDeleteOutcome),
    /// Control outcome.
    Control(ControlOutcome),
}

/// A request envelope carried over the agent's dispatch queue.
pub struct E2AgentRequest {
    /// The procedure to run.
    pub pdu: RicRequest,
    /// Where the reply goes.
    pub reply: oneshot::Sender<Result<RicReply>>,
}

/// The E2 agent of one simulated node.
pub struct E2Agent {
    enb_id: EnbId,
    ctx: SmContext,
    registry: SmRegistry,
}

impl E2Agent {
    /// Creates an agent, installing the service models the node advertises.
    pub fn new(node: &Node, ctx: SmContext) -> Self {
        let mut registry = SmRegistry::new();
        for name in &node.service_models {
            match name.to_lowercase().as_str() {
                "kpm" | "kpm2" => registry.register(SmClient::Kpm2(Kpm2Client::new(ctx.clone()))),
                "mho" => registry.register(SmClient::Mho(MhoClient::new(ctx.clone()))),
                "rcpre" | "rcpre2" | "rc.pre" => {
                    registry.register(SmClient::RcPre(RcPreClient::new(ctx.clone())))
                }
                other => warn!(enb_id = %node.enb_id, "unknown service model {other}"),
            }
        }
        Self {
            enb_id: node.enb_id,
            ctx,
            registry,
        }
    }

    /// The node this agent serves.
    pub fn enb_id(&self) -> EnbId {
        self.enb_id
    }

    /// The installed service models.
    pub fn registry(&self) -> &SmRegistry {
        &self.registry
    }

    /// Dispatches one procedure to the client owning its RAN function.
    pub async fn handle(&self, channel: &E2Channel, request: RicRequest) -> Result<RicReply> {
        match request {
            RicRequest::Subscription(req) => match self.registry.get(req.ran_function_id) {
                Ok(client) => Ok(RicReply::Subscription(
                    client.ric_subscription(channel, &req).await?,
                )),
                Err(_) => {
                    warn!(
                        enb_id = %self.enb_id,
                        ran_function_id = req.ran_function_id,
                        "subscription for uninstalled RAN function"
                    );
                    Ok(RicReply::Subscription(SubscriptionOutcome::Rejected(
                        crate::sm::subscription_failure(
                            &req,
                            RicCause::FunctionIdInvalid,
                            Vec::new(),
                        ),
                    )))
                }
            },
            RicRequest::SubscriptionDelete(req) => match self.registry.get(req.ran_function_id) {
                Ok(client) => Ok(RicReply::SubscriptionDelete(
                    client.ric_subscription_delete(&req).await?,
                )),
                Err(_) => Ok(RicReply::SubscriptionDelete(
                    SubscriptionDeleteOutcome::Rejected(RicSubscriptionDeleteFailure {
                        request_id: req.request_id,
                        ran_function_id: req.ran_function_id,
                        cause: RicCause::FunctionIdInvalid,
                    }),
                )),
            },
            RicRequest::Control(req) => match self.registry.get(req.ran_function_id) {
                Ok(client) => Ok(RicReply::Control(client.ric_control(&req).await?)),
                Err(_) => Ok(RicReply::Control(ControlOutcome::Rejected(
                    RicControlFailure {
                        request_id: req.request_id,
                        ran_function_id: req.ran_function_id,
                        cause: RicCause::FunctionIdInvalid,
                    },
                ))),
            },
        }
    }

    /// Serves one E2 association: dispatches queued procedures until the
    /// channel closes or the queue ends.
    pub async fn serve(&self, channel: E2Channel, mut requests: mpsc::Receiver<E2AgentRequest>) {
        info!(enb_id = %self.enb_id, "E2 agent serving");
        if let Err(e) = self.ctx.node_store.set_status(self.enb_id, NodeStatus::Running) {
            warn!(enb_id = %self.enb_id, "cannot mark node running: {e}");
        }
        loop {
            tokio::select! {
                request = requests.recv() => {
                    let Some(request) = request else { break };
                    let result = self.handle(&channel, request.pdu).await;
                    let _ = request.reply.send(result);
                }
                _ = channel.closed() => break,
            }
        }
        if let Err(e) = self.ctx.node_store.set_status(self.enb_id, NodeStatus::Stopped) {
            warn!(enb_id = %self.enb_id, "cannot mark node stopped: {e}");
        }
        info!(enb_id = %self.enb_id, "E2 agent stopped");
    }
}
