//! RC-PRE service-model client: cell configuration reports and TX power
//! control.

use std::sync::Arc;
use std::time::Duration;

use ransim_common::Result;
use ransim_e2::e2sm::rcpre::{
    RcPreIndicationHeader, RcPreIndicationMessage, RcPreNeighborItem, RcPreTriggerType, OID,
};
use ransim_e2::e2sm::timestamp_now;
use ransim_e2::pdu::{
    RanFunctionId, RicActionId, RicCause, RicControlAcknowledge, RicControlFailure,
    RicControlRequest, RicIndication, RicIndicationType, RicRequestId,
    RicSubscriptionDeleteRequest, RicSubscriptionRequest, RicSubscriptionResponse,
};
use ransim_e2::{E2Channel, PayloadClass, SmPayload};
use tokio::time::interval;
use tracing::{debug, info, warn};

use super::{
    delete_subscription, partition_report_actions, subscription_failure, ControlOutcome,
    SmContext, SubscriptionDeleteOutcome, SubscriptionOutcome,
};
use crate::model::Cell;
use crate::store::{EventKind, Subscription, SubscriptionId, WatchOptions};

/// Report period used when a periodic trigger does not carry one.
const DEFAULT_REPORT_PERIOD_MS: u32 = 1000;

/// RC-PRE client.
#[derive(Debug)]
pub struct RcPreClient {
    ctx: SmContext,
}

impl RcPreClient {
    /// Creates a client over the given context.
    pub fn new(ctx: SmContext) -> Self {
        Self { ctx }
    }

    /// Handles a subscription request: periodic triggers drive a ticker,
    /// change triggers follow the cell store's event stream.
    pub async fn ric_subscription(
        &self,
        channel: &E2Channel,
        request: &RicSubscriptionRequest,
    ) -> Result<SubscriptionOutcome> {
        debug!(enb_id = %self.ctx.enb_id, "RC-PRE subscription request received");
        let (accepted, rejected) = partition_report_actions(request);
        if accepted.is_empty() {
            warn!("no RC-PRE action was accepted");
            return Ok(SubscriptionOutcome::Rejected(subscription_failure(
                request,
                RicCause::ActionNotSupported,
                rejected,
            )));
        }

        let codec = self.ctx.codecs.get(OID)?;
        let trigger = match codec
            .decode(PayloadClass::EventTrigger, &request.event_trigger)
            .and_then(SmPayload::into_rcpre_event_trigger)
        {
            Ok(trigger) => trigger,
            Err(e) => {
                warn!("failed to decode RC-PRE event trigger: {e}");
                return Ok(SubscriptionOutcome::Rejected(subscription_failure(
                    request,
                    RicCause::InvalidEventTrigger,
                    rejected,
                )));
            }
        };

        let period_ms = trigger
            .report_period_ms
            .unwrap_or(DEFAULT_REPORT_PERIOD_MS);
        if period_ms == 0 {
            return Ok(SubscriptionOutcome::Rejected(subscription_failure(
                request,
                RicCause::InvalidEventTrigger,
                rejected,
            )));
        }

        let id = SubscriptionId::from_request(request.request_id, request.ran_function_id);
        let sub = self.ctx.subscriptions.add(Subscription::new(
            id,
            accepted.clone(),
            rejected.clone(),
            channel.clone(),
        ))?;

        let response = RicSubscriptionResponse {
            request_id: request.request_id,
            ran_function_id: request.ran_function_id,
            actions_admitted: accepted.clone(),
            actions_not_admitted: rejected,
        };

        let emitter = RcPreEmitter {
            ctx: self.ctx.clone(),
            sub: Arc::clone(&sub),
            request_id: request.request_id,
            ran_function_id: request.ran_function_id,
            action_id: accepted[0],
        };
        let handle = match trigger.trigger_type {
            RcPreTriggerType::Periodic => tokio::spawn(
                emitter.run_periodic(Duration::from_millis(u64::from(period_ms))),
            ),
            RcPreTriggerType::UponChange => tokio::spawn(emitter.run_on_change()),
        };
        sub.attach_emitter(handle);

        Ok(SubscriptionOutcome::Accepted(response))
    }

    /// Handles a subscription delete request.
    pub async fn ric_subscription_delete(
        &self,
        request: &RicSubscriptionDeleteRequest,
    ) -> Result<SubscriptionDeleteOutcome> {
        debug!(enb_id = %self.ctx.enb_id, "RC-PRE subscription delete request received");
        delete_subscription(&self.ctx.subscriptions, request).await
    }

    /// Handles a control request: retunes the target cell's TX power.
    pub async fn ric_control(&self, request: &RicControlRequest) -> Result<ControlOutcome> {
        let codec = self.ctx.codecs.get(OID)?;
        let header = codec
            .decode(PayloadClass::ControlHeader, &request.header)
            .and_then(SmPayload::into_rcpre_control_header)?;
        let message = codec
            .decode(PayloadClass::ControlMessage, &request.message)
            .and_then(SmPayload::into_rcpre_control_message)?;

        let target = self
            .ctx
            .cell_store
            .list()
            .into_iter()
            .find(|cell| cell.ecgi.nci() == header.nr_cell_identity);
        let Some(mut cell) = target else {
            warn!(
                nci = header.nr_cell_identity,
                "RC-PRE control for unknown cell"
            );
            return Ok(ControlOutcome::Rejected(RicControlFailure {
                request_id: request.request_id,
                ran_function_id: request.ran_function_id,
                cause: RicCause::Unspecified,
            }));
        };

        info!(
            ecgi = %cell.ecgi,
            tx_power_db = message.tx_power_db,
            "applying RC-PRE TX power change"
        );
        cell.tx_power_db = message.tx_power_db;
        match self.ctx.cell_store.update(cell) {
            Ok(()) => Ok(ControlOutcome::Ack(RicControlAcknowledge {
                request_id: request.request_id,
                ran_function_id: request.ran_function_id,
                outcome: None,
            })),
            Err(e) => {
                warn!("RC-PRE control update failed: {e}");
                Ok(ControlOutcome::Rejected(RicControlFailure {
                    request_id: request.request_id,
                    ran_function_id: request.ran_function_id,
                    cause: RicCause::Unspecified,
                }))
            }
        }
    }
}

/// Emitter of one RC-PRE subscription.
struct RcPreEmitter {
    ctx: SmContext,
    sub: Arc<Subscription>,
    request_id: RicRequestId,
    ran_function_id: RanFunctionId,
    action_id: RicActionId,
}

impl RcPreEmitter {
    async fn run_periodic(self, period: Duration) {
        let mut ticker = interval(period);
        ticker.tick().await;
        let mut cancel = self.sub.cancel_signal();
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.report_all().await.is_err() {
                        self.sub.cancel();
                        let _ = self.ctx.subscriptions.remove(self.sub.id);
                        break;
                    }
                }
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                }
                _ = self.sub.channel.closed() => {
                    debug!(id = %self.sub.id, "E2 channel closed, stopping RC-PRE emitter");
                    let _ = self.ctx.subscriptions.remove(self.sub.id);
                    break;
                }
            }
        }
        debug!(id = %self.sub.id, "RC-PRE emitter stopped");
    }

    /// Follows the cell store's event stream and reports each change of a
    /// cell belonging to the node.
    async fn run_on_change(self) {
        let mut watch = self.ctx.cell_store.watch(WatchOptions::default());
        let mut cancel = self.sub.cancel_signal();
        loop {
            tokio::select! {
                event = watch.recv() => {
                    let Some(event) = event else { break };
                    if !matches!(event.kind, EventKind::Created | EventKind::Updated) {
                        continue;
                    }
                    let node_owns = self
                        .ctx
                        .node_store
                        .get(self.ctx.enb_id)
                        .map(|node| node.cells.contains(&event.key))
                        .unwrap_or(false);
                    if !node_owns {
                        continue;
                    }
                    if self.report_cell(&event.value).await.is_err() {
                        self.sub.cancel();
                        let _ = self.ctx.subscriptions.remove(self.sub.id);
                        break;
                    }
                }
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                }
                _ = self.sub.channel.closed() => {
                    debug!(id = %self.sub.id, "E2 channel closed, stopping RC-PRE emitter");
                    let _ = self.ctx.subscriptions.remove(self.sub.id);
                    break;
                }
            }
        }
        debug!(id = %self.sub.id, "RC-PRE change emitter stopped");
    }

    async fn report_all(&self) -> Result<()> {
        let node = match self.ctx.node_store.get(self.ctx.enb_id) {
            Ok(node) => node,
            Err(e) => {
                warn!(enb_id = %self.ctx.enb_id, "RC-PRE report without node: {e}");
                return Ok(());
            }
        };
        for ecgi in node.cells {
            let cell = match self.ctx.cell_store.get(ecgi) {
                Ok(cell) => cell,
                Err(e) => {
                    warn!(%ecgi, "RC-PRE report without cell: {e}");
                    continue;
                }
            };
            self.report_cell(&cell).await?;
        }
        Ok(())
    }

    async fn report_cell(&self, cell: &Cell) -> Result<()> {
        let indication = match self.build_indication(cell) {
            Ok(indication) => indication,
            Err(e) => {
                warn!(ecgi = %cell.ecgi, "failed to build RC-PRE indication: {e}");
                return Ok(());
            }
        };
        self.sub.channel.ric_indication(indication).await
    }

    fn build_indication(&self, cell: &Cell) -> Result<RicIndication> {
        let codec = self.ctx.codecs.get(OID)?;
        let header = RcPreIndicationHeader {
            plmn_id: self.ctx.plmn_id,
            nr_cell_identity: cell.ecgi.nci(),
            timestamp: timestamp_now(),
        };
        let message = RcPreIndicationMessage {
            tx_power_db: cell.tx_power_db,
            neighbors: cell
                .neighbors
                .iter()
                .map(|n| RcPreNeighborItem {
                    plmn_id: self.ctx.plmn_id,
                    nr_cell_identity: n.nci(),
                })
                .collect(),
        };
        let header_bytes = codec.encode(&SmPayload::RcPreIndicationHeader(header))?;
        let message_bytes = codec.encode(&SmPayload::RcPreIndicationMessage(message))?;
        Ok(RicIndication {
            request_id: self.request_id,
            ran_function_id: self.ran_function_id,
            action_id: self.action_id,
            indication_type: RicIndicationType::Report,
            indication_sn: None,
            header: header_bytes,
            message: message_bytes,
        })
    }
}
