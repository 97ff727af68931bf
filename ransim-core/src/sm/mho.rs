//! MHO service-model client: per-UE measurement reports (format 1) and
//! RRC state updates (format 2).

use std::sync::Arc;
use std::time::Duration;

use ransim_common::{Ecgi, Result, RrcStatus};
use ransim_e2::e2sm::mho::{
    MhoIndicationHeader, MhoIndicationMessage, MhoMeasReportItem, MhoMeasurementReport,
    MhoRrcStatusUpdate, MhoTriggerType, DEFAULT_REPORT_PERIOD_MS, OID,
};
use ransim_e2::e2sm::timestamp_now;
use ransim_e2::pdu::{
    RanFunctionId, RicActionId, RicCause, RicIndication, RicIndicationType, RicRequestId,
    RicSubscriptionDeleteRequest, RicSubscriptionRequest, RicSubscriptionResponse,
};
use ransim_e2::{E2Channel, PayloadClass, SmPayload};
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, warn};

use super::{
    delete_subscription, partition_report_actions, subscription_failure, SmContext,
    SubscriptionDeleteOutcome, SubscriptionOutcome,
};
use crate::model::Ue;
use crate::store::{Subscription, SubscriptionId};

/// MHO client.
#[derive(Debug)]
pub struct MhoClient {
    ctx: SmContext,
}

impl MhoClient {
    /// Creates a client over the given context.
    pub fn new(ctx: SmContext) -> Self {
        Self { ctx }
    }

    /// Handles a subscription request. The event-trigger definition picks
    /// the emitter: periodic (and measurement-report) triggers drive the
    /// format-1 reporter, the RRC-status trigger drives the format-2
    /// reporter fed by the mobility driver.
    pub async fn ric_subscription(
        &self,
        channel: &E2Channel,
        request: &RicSubscriptionRequest,
    ) -> Result<SubscriptionOutcome> {
        debug!(enb_id = %self.ctx.enb_id, "MHO subscription request received");
        let (accepted, rejected) = partition_report_actions(request);
        if accepted.is_empty() {
            warn!("no MHO action was accepted");
            return Ok(SubscriptionOutcome::Rejected(subscription_failure(
                request,
                RicCause::ActionNotSupported,
                rejected,
            )));
        }

        let codec = self.ctx.codecs.get(OID)?;
        let trigger = match codec
            .decode(PayloadClass::EventTrigger, &request.event_trigger)
            .and_then(SmPayload::into_mho_event_trigger)
        {
            Ok(trigger) => trigger,
            Err(e) => {
                warn!("failed to decode MHO event trigger: {e}");
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
            warn!("MHO event trigger carries a zero report period");
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

        let emitter = MhoEmitter {
            ctx: self.ctx.clone(),
            sub: Arc::clone(&sub),
            request_id: request.request_id,
            ran_function_id: request.ran_function_id,
            action_id: accepted[0],
        };
        let handle = match trigger.trigger_type {
            MhoTriggerType::Periodic | MhoTriggerType::UponRcvMeasReport => tokio::spawn(
                emitter.run_periodic(Duration::from_millis(u64::from(period_ms))),
            ),
            MhoTriggerType::UponChangeRrcStatus => {
                let updates = self.ctx.rrc_updates.subscribe();
                tokio::spawn(emitter.run_rrc(updates))
            }
        };
        sub.attach_emitter(handle);

        Ok(SubscriptionOutcome::Accepted(response))
    }

    /// Handles a subscription delete request.
    pub async fn ric_subscription_delete(
        &self,
        request: &RicSubscriptionDeleteRequest,
    ) -> Result<SubscriptionDeleteOutcome> {
        debug!(enb_id = %self.ctx.enb_id, "MHO subscription delete request received");
        delete_subscription(&self.ctx.subscriptions, request).await
    }
}

/// Emitter of one MHO subscription.
struct MhoEmitter {
    ctx: SmContext,
    sub: Arc<Subscription>,
    request_id: RicRequestId,
    ran_function_id: RanFunctionId,
    action_id: RicActionId,
}

impl MhoEmitter {
    /// Periodic format-1 loop: one measurement report per non-idle UE of
    /// each cell of the node, per tick.
    async fn run_periodic(self, period: Duration) {
        let mut ticker = interval(period);
        ticker.tick().await;
        let mut cancel = self.sub.cancel_signal();
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.report_measurements().await.is_err() {
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
                    debug!(id = %self.sub.id, "E2 channel closed, stopping MHO emitter");
                    let _ = self.ctx.subscriptions.remove(self.sub.id);
                    break;
                }
            }
        }
        debug!(id = %self.sub.id, "MHO report emitter stopped");
    }

    /// Format-2 loop: one indication per RRC flip snapshot.
    async fn run_rrc(self, mut updates: broadcast::Receiver<Ue>) {
        let mut cancel = self.sub.cancel_signal();
        loop {
            tokio::select! {
                update = updates.recv() => match update {
                    Ok(ue) => {
                        if self.report_rrc_status(&ue).await.is_err() {
                            self.sub.cancel();
                            let _ = self.ctx.subscriptions.remove(self.sub.id);
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(id = %self.sub.id, skipped = n, "RRC update stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                }
                _ = self.sub.channel.closed() => {
                    debug!(id = %self.sub.id, "E2 channel closed, stopping MHO RRC emitter");
                    let _ = self.ctx.subscriptions.remove(self.sub.id);
                    break;
                }
            }
        }
        debug!(id = %self.sub.id, "MHO RRC emitter stopped");
    }

    /// One tick of format-1 reporting. Only a channel error is fatal.
    async fn report_measurements(&self) -> Result<()> {
        let node = match self.ctx.node_store.get(self.ctx.enb_id) {
            Ok(node) => node,
            Err(e) => {
                warn!(enb_id = %self.ctx.enb_id, "MHO report without node: {e}");
                return Ok(());
            }
        };
        for ncgi in node.cells {
            for ue in self.ctx.ue_store.list_by_cell(ncgi) {
                if ue.rrc_state == RrcStatus::Idle {
                    continue;
                }
                if ue.candidate_cells.is_empty() {
                    // Nothing to report against; suppress the message.
                    debug!(imsi = %ue.imsi, "no neighbor cells, suppressing report");
                    continue;
                }
                let indication = match self.build_measurement_indication(ncgi, &ue) {
                    Ok(indication) => indication,
                    Err(e) => {
                        warn!(imsi = %ue.imsi, "failed to build MHO indication: {e}");
                        continue;
                    }
                };
                self.sub.channel.ric_indication(indication).await?;
            }
        }
        Ok(())
    }

    async fn report_rrc_status(&self, ue: &Ue) -> Result<()> {
        let indication = match self.build_rrc_indication(ue) {
            Ok(indication) => indication,
            Err(e) => {
                warn!(imsi = %ue.imsi, "failed to build MHO RRC indication: {e}");
                return Ok(());
            }
        };
        self.sub.channel.ric_indication(indication).await
    }

    fn build_measurement_indication(&self, ncgi: Ecgi, ue: &Ue) -> Result<RicIndication> {
        let mut meas_report = Vec::with_capacity(1 + ue.candidate_cells.len());
        meas_report.push(MhoMeasReportItem {
            plmn_id: self.ctx.plmn_id,
            nr_cell_identity: ue.cell.ecgi.nci(),
            rsrp: ue.cell.strength as i32,
        });
        for candidate in &ue.candidate_cells {
            meas_report.push(MhoMeasReportItem {
                plmn_id: self.ctx.plmn_id,
                nr_cell_identity: candidate.ecgi.nci(),
                rsrp: candidate.strength as i32,
            });
        }
        let message = MhoIndicationMessage::MeasurementReport(MhoMeasurementReport {
            ue_id: ue.imsi.to_string(),
            meas_report,
        });
        self.build_indication(ncgi, message)
    }

    fn build_rrc_indication(&self, ue: &Ue) -> Result<RicIndication> {
        let message = MhoIndicationMessage::RrcStatus(MhoRrcStatusUpdate {
            ue_id: ue.imsi.to_string(),
            rrc_status: ue.rrc_state,
        });
        self.build_indication(ue.cell.ecgi, message)
    }

    fn build_indication(&self, ncgi: Ecgi, message: MhoIndicationMessage) -> Result<RicIndication> {
        let codec = self.ctx.codecs.get(OID)?;
        let header = MhoIndicationHeader {
            plmn_id: self.ctx.plmn_id,
            nr_cell_identity: ncgi.nci(),
            timestamp: timestamp_now(),
        };
        let header_bytes = codec.encode(&SmPayload::MhoIndicationHeader(header))?;
        let message_bytes = codec.encode(&SmPayload::MhoIndicationMessage(message))?;
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
