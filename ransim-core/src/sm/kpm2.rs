//! KPM v2 service-model client: periodic per-cell measurement reports.

use std::sync::Arc;
use std::time::Duration;

use ransim_common::{Ecgi, Result};
use ransim_e2::e2sm::kpm::{
    KpmActionDefinition, KpmIndicationHeader, KpmIndicationMessage, KpmMeasDataItem,
    KpmMeasRecord, DEFAULT_GRANULARITY_MS, DEFAULT_SUBSCRIPTION_ID, OID,
};
use ransim_e2::e2sm::timestamp_now;
use ransim_e2::pdu::{
    RanFunctionId, RicActionId, RicCause, RicIndication, RicIndicationType, RicRequestId,
    RicSubscriptionDeleteRequest, RicSubscriptionRequest, RicSubscriptionResponse,
};
use ransim_e2::{E2Channel, PayloadClass, SmPayload};
use tokio::time::interval;
use tracing::{debug, warn};

use super::{
    delete_subscription, partition_report_actions, subscription_failure, SmContext,
    SubscriptionDeleteOutcome, SubscriptionOutcome,
};
use crate::store::{Subscription, SubscriptionId};

/// Measurement types this model declares. Only the connection-count pair
/// carries values; the rest report `NoValue`.
pub const MEAS_TYPES: [&str; 8] = [
    "RRC.ConnEstabAtt.Tot",
    "RRC.ConnEstabSucc.Tot",
    "RRC.ConnReEstabAtt.Tot",
    "RRC.ConnReEstabAtt.reconfigFail",
    "RRC.ConnReEstabAtt.HOFail",
    "RRC.ConnReEstabAtt.Other",
    "RRC.Conn.Avg",
    "RRC.Conn.Max",
];

const FILE_FORMAT_VERSION: &str = "txt";
const SENDER_NAME: &str = "ransim";
const SENDER_TYPE: &str = "sim";
const VENDOR_NAME: &str = "ransim";

/// gNB ID bit length in the indication header.
const GNB_ID_LEN: u8 = 22;

/// KPM v2 client.
#[derive(Debug)]
pub struct Kpm2Client {
    ctx: SmContext,
}

impl Kpm2Client {
    /// Creates a client over the given context.
    pub fn new(ctx: SmContext) -> Self {
        Self { ctx }
    }

    /// Handles a subscription request: admits REPORT actions, extracts the
    /// report period, registers the subscription and spawns its emitter.
    pub async fn ric_subscription(
        &self,
        channel: &E2Channel,
        request: &RicSubscriptionRequest,
    ) -> Result<SubscriptionOutcome> {
        debug!(
            enb_id = %self.ctx.enb_id,
            "KPM subscription request received"
        );
        let (accepted, rejected) = partition_report_actions(request);
        if accepted.is_empty() {
            warn!("no KPM action was accepted");
            return Ok(SubscriptionOutcome::Rejected(subscription_failure(
                request,
                RicCause::ActionNotSupported,
                rejected,
            )));
        }

        let codec = self.ctx.codecs.get(OID)?;
        let period_ms = match codec
            .decode(PayloadClass::EventTrigger, &request.event_trigger)
            .and_then(SmPayload::into_kpm_event_trigger)
        {
            Ok(trigger) if trigger.report_period_ms > 0 => trigger.report_period_ms,
            Ok(_) => {
                warn!("KPM event trigger carries a zero report period");
                return Ok(SubscriptionOutcome::Rejected(subscription_failure(
                    request,
                    RicCause::InvalidEventTrigger,
                    rejected,
                )));
            }
            Err(e) => {
                warn!("failed to decode KPM event trigger: {e}");
                return Ok(SubscriptionOutcome::Rejected(subscription_failure(
                    request,
                    RicCause::InvalidEventTrigger,
                    rejected,
                )));
            }
        };

        let mut action_definitions = Vec::new();
        for action in &request.actions {
            if !accepted.contains(&action.action_id) {
                continue;
            }
            let Some(definition) = &action.definition else {
                continue;
            };
            match codec
                .decode(PayloadClass::ActionDefinition, definition)
                .and_then(SmPayload::into_kpm_action_definition)
            {
                Ok(def) => action_definitions.push(def),
                Err(e) => warn!(action_id = action.action_id, "bad KPM action definition: {e}"),
            }
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

        let emitter = Kpm2Emitter {
            ctx: self.ctx.clone(),
            sub: Arc::clone(&sub),
            request_id: request.request_id,
            ran_function_id: request.ran_function_id,
            action_id: accepted[0],
            period: Duration::from_millis(u64::from(period_ms)),
            action_definitions,
        };
        sub.attach_emitter(tokio::spawn(emitter.run()));

        Ok(SubscriptionOutcome::Accepted(response))
    }

    /// Handles a subscription delete request.
    pub async fn ric_subscription_delete(
        &self,
        request: &RicSubscriptionDeleteRequest,
    ) -> Result<SubscriptionDeleteOutcome> {
        debug!(enb_id = %self.ctx.enb_id, "KPM subscription delete request received");
        delete_subscription(&self.ctx.subscriptions, request).await
    }
}

/// Periodic report emitter of one KPM subscription.
struct Kpm2Emitter {
    ctx: SmContext,
    sub: Arc<Subscription>,
    request_id: RicRequestId,
    ran_function_id: RanFunctionId,
    action_id: RicActionId,
    period: Duration,
    action_definitions: Vec<KpmActionDefinition>,
}

impl Kpm2Emitter {
    async fn run(self) {
        let mut ticker = interval(self.period);
        // The first interval tick completes immediately.
        ticker.tick().await;
        let mut cancel = self.sub.cancel_signal();
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.report().await.is_err() {
                        // The channel itself failed; tear the subscription down.
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
                    debug!(id = %self.sub.id, "E2 channel closed, stopping KPM emitter");
                    let _ = self.ctx.subscriptions.remove(self.sub.id);
                    break;
                }
            }
        }
        debug!(id = %self.sub.id, "KPM emitter stopped");
    }

    /// Sends one indication per cell of the node. Build failures are
    /// logged and skipped; only a channel error is fatal.
    async fn report(&self) -> Result<()> {
        let node = match self.ctx.node_store.get(self.ctx.enb_id) {
            Ok(node) => node,
            Err(e) => {
                warn!(enb_id = %self.ctx.enb_id, "KPM report without node: {e}");
                return Ok(());
            }
        };
        for ecgi in node.cells {
            let indication = match self.build_indication(ecgi) {
                Ok(Some(indication)) => indication,
                Ok(None) => continue,
                Err(e) => {
                    warn!(%ecgi, "failed to build KPM indication: {e}");
                    continue;
                }
            };
            self.sub.channel.ric_indication(indication).await?;
        }
        Ok(())
    }

    fn build_indication(&self, ecgi: Ecgi) -> Result<Option<RicIndication>> {
        let Some(message) = self.build_message(ecgi) else {
            return Ok(None);
        };
        let codec = self.ctx.codecs.get(OID)?;
        let header = KpmIndicationHeader {
            plmn_id: self.ctx.plmn_id,
            gnb_id: self.ctx.enb_id.value(),
            gnb_id_len: GNB_ID_LEN,
            file_format_version: FILE_FORMAT_VERSION.to_string(),
            sender_name: SENDER_NAME.to_string(),
            sender_type: SENDER_TYPE.to_string(),
            vendor_name: VENDOR_NAME.to_string(),
            timestamp: timestamp_now(),
        };
        let header_bytes = codec.encode(&SmPayload::KpmIndicationHeader(header))?;
        let message_bytes = codec.encode(&SmPayload::KpmIndicationMessage(message))?;
        Ok(Some(RicIndication {
            request_id: self.request_id,
            ran_function_id: self.ran_function_id,
            action_id: self.action_id,
            indication_type: RicIndicationType::Report,
            indication_sn: None,
            header: header_bytes,
            message: message_bytes,
        }))
    }

    /// Builds the format-1 message for a cell: the full catalogue when no
    /// action definition was supplied, otherwise the definition matching
    /// this cell's object ID. `None` suppresses the cell.
    fn build_message(&self, ecgi: Ecgi) -> Option<KpmIndicationMessage> {
        let cell_object_id = ecgi.to_string();
        if self.action_definitions.is_empty() {
            let meas_names: Vec<String> = MEAS_TYPES.iter().map(|s| s.to_string()).collect();
            return Some(self.message_for(
                cell_object_id,
                DEFAULT_SUBSCRIPTION_ID,
                DEFAULT_GRANULARITY_MS,
                meas_names,
            ));
        }
        let def = self
            .action_definitions
            .iter()
            .find(|d| d.cell_object_id == cell_object_id)?;
        Some(self.message_for(
            cell_object_id,
            def.subscription_id,
            def.granularity_ms,
            def.meas_names.clone(),
        ))
    }

    fn message_for(
        &self,
        cell_object_id: String,
        subscription_id: i64,
        granularity_ms: u32,
        meas_names: Vec<String>,
    ) -> KpmIndicationMessage {
        let ue_count = self.ctx.ue_store.len() as i64;
        let records: Vec<KpmMeasRecord> = meas_names
            .iter()
            .map(|name| match name.as_str() {
                "RRC.Conn.Max" | "RRC.Conn.Avg" => KpmMeasRecord::Integer(ue_count),
                _ => KpmMeasRecord::NoValue,
            })
            .collect();
        KpmIndicationMessage {
            cell_object_id,
            subscription_id,
            granularity_ms,
            meas_names,
            meas_data: vec![KpmMeasDataItem {
                records,
                incomplete: true,
            }],
        }
    }
}
