//! Shared helpers for the scenario tests.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use ransim_core::model::Model;
use ransim_core::sm;
use ransim_core::topology::{generate_honeycomb_topology, HoneycombOptions};
use ransim_core::{MobilityConfig, Simulation};
use ransim_e2::e2sm::kpm::{KpmEventTriggerDefinition, KpmIndicationHeader, KpmIndicationMessage};
use ransim_e2::e2sm::mho::{MhoEventTriggerDefinition, MhoIndicationMessage, MhoTriggerType};
use ransim_e2::pdu::{
    RicActionToBeSetup, RicActionType, RicIndication, RicRequestId, RicSubscriptionDeleteRequest,
    RicSubscriptionRequest,
};
use ransim_e2::{CodecRegistry, E2ChannelEnd, PayloadClass, SmPayload};

/// Default receive timeout for indications.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(10);

/// Initialize logging for tests; safe to call repeatedly.
pub fn init_test_logging() {
    ransim_common::logging::init_test_logging();
}

/// A codec registry with the JSON reference plugins installed.
pub fn codecs() -> Arc<CodecRegistry> {
    Arc::new(CodecRegistry::with_defaults())
}

/// A honeycomb model with the default generator parameters.
pub fn honeycomb_model(num_towers: u32, sectors_per_tower: u32, ue_count: u32) -> Model {
    let mut model = generate_honeycomb_topology(&HoneycombOptions {
        num_towers,
        sectors_per_tower,
        ..HoneycombOptions::default()
    })
    .expect("topology generation");
    model.ue_count = ue_count;
    model
}

/// A mobility configuration with randomness disabled.
pub fn quiet_mobility() -> MobilityConfig {
    MobilityConfig {
        heading_jitter_deg: 0,
        probability_rrc_state_change: 0.0,
        ..MobilityConfig::default()
    }
}

/// Assembles a simulation over the model, returning the codec registry it
/// shares with the tests.
pub fn simulation(model: &Model) -> (Simulation, Arc<CodecRegistry>) {
    simulation_with(model, quiet_mobility())
}

/// Assembles a simulation with an explicit mobility configuration.
pub fn simulation_with(
    model: &Model,
    mobility: MobilityConfig,
) -> (Simulation, Arc<CodecRegistry>) {
    let codecs = codecs();
    let sim = Simulation::new(model, Arc::clone(&codecs), mobility).expect("simulation");
    (sim, codecs)
}

/// Encodes a payload through the codec registered for `oid`.
pub fn encode(codecs: &CodecRegistry, oid: &str, payload: &SmPayload) -> Bytes {
    codecs.get(oid).expect("codec").encode(payload).expect("encode")
}

/// A KPM subscription request with one REPORT action and the given period.
pub fn kpm_subscription_request(
    codecs: &CodecRegistry,
    requester_id: i32,
    instance_id: i32,
    period_ms: u32,
) -> RicSubscriptionRequest {
    let trigger = encode(
        codecs,
        ransim_e2::e2sm::kpm::OID,
        &SmPayload::KpmEventTrigger(KpmEventTriggerDefinition {
            report_period_ms: period_ms,
        }),
    );
    RicSubscriptionRequest {
        request_id: RicRequestId::new(requester_id, instance_id),
        ran_function_id: sm::KPM2_RAN_FUNCTION_ID,
        event_trigger: trigger,
        actions: vec![RicActionToBeSetup {
            action_id: 10,
            action_type: RicActionType::Report,
            definition: None,
        }],
    }
}

/// An MHO subscription request with one REPORT action.
pub fn mho_subscription_request(
    codecs: &CodecRegistry,
    requester_id: i32,
    instance_id: i32,
    trigger_type: MhoTriggerType,
    report_period_ms: Option<u32>,
) -> RicSubscriptionRequest {
    let trigger = encode(
        codecs,
        ransim_e2::e2sm::mho::OID,
        &SmPayload::MhoEventTrigger(MhoEventTriggerDefinition {
            trigger_type,
            report_period_ms,
        }),
    );
    RicSubscriptionRequest {
        request_id: RicRequestId::new(requester_id, instance_id),
        ran_function_id: sm::MHO_RAN_FUNCTION_ID,
        event_trigger: trigger,
        actions: vec![RicActionToBeSetup {
            action_id: 20,
            action_type: RicActionType::Report,
            definition: None,
        }],
    }
}

/// The delete request matching a subscription request.
pub fn delete_request(request: &RicSubscriptionRequest) -> RicSubscriptionDeleteRequest {
    RicSubscriptionDeleteRequest {
        request_id: request.request_id,
        ran_function_id: request.ran_function_id,
    }
}

/// Receives the next indication, failing the test on timeout.
pub async fn recv_indication(end: &mut E2ChannelEnd) -> RicIndication {
    tokio::time::timeout(RECV_TIMEOUT, end.recv())
        .await
        .expect("timed out waiting for indication")
        .expect("channel ended")
}

/// Drains all buffered indications.
pub fn drain(end: &mut E2ChannelEnd) -> usize {
    let mut count = 0;
    while end.try_recv().is_some() {
        count += 1;
    }
    count
}

/// Decodes a KPM indication header.
pub fn decode_kpm_header(codecs: &CodecRegistry, indication: &RicIndication) -> KpmIndicationHeader {
    let payload = codecs
        .get(ransim_e2::e2sm::kpm::OID)
        .expect("codec")
        .decode(PayloadClass::IndicationHeader, &indication.header)
        .expect("decode header");
    match payload {
        SmPayload::KpmIndicationHeader(header) => header,
        other => panic!("unexpected payload {other:?}"),
    }
}

/// Decodes a KPM format-1 indication message.
pub fn decode_kpm_message(
    codecs: &CodecRegistry,
    indication: &RicIndication,
) -> KpmIndicationMessage {
    let payload = codecs
        .get(ransim_e2::e2sm::kpm::OID)
        .expect("codec")
        .decode(PayloadClass::IndicationMessage, &indication.message)
        .expect("decode message");
    match payload {
        SmPayload::KpmIndicationMessage(message) => message,
        other => panic!("unexpected payload {other:?}"),
    }
}

/// Decodes an MHO indication message.
pub fn decode_mho_message(
    codecs: &CodecRegistry,
    indication: &RicIndication,
) -> MhoIndicationMessage {
    let payload = codecs
        .get(ransim_e2::e2sm::mho::OID)
        .expect("codec")
        .decode(PayloadClass::IndicationMessage, &indication.message)
        .expect("decode message");
    match payload {
        SmPayload::MhoIndicationMessage(message) => message,
        other => panic!("unexpected payload {other:?}"),
    }
}

/// Polls `condition` until it holds or the timeout elapses.
pub async fn wait_for<F, Fut>(mut condition: F, timeout: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let poll = Duration::from_millis(10);
    tokio::time::timeout(timeout, async {
        loop {
            if condition().await {
                return;
            }
            tokio::time::sleep(poll).await;
        }
    })
    .await
    .is_ok()
}
