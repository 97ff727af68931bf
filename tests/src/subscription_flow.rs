//! KPM subscription lifecycle scenarios: periodic reports, mid-flight
//! delete, channel close and setup failures.

use std::time::Duration;

use bytes::Bytes;
use ransim_core::agent::{E2AgentRequest, RicReply, RicRequest};
use ransim_core::sm::{self, SubscriptionDeleteOutcome, SubscriptionOutcome};
use ransim_e2::e2sm::kpm::KpmMeasRecord;
use ransim_e2::e2sm::mho::MhoTriggerType;
use ransim_e2::pdu::{
    RicActionToBeSetup, RicActionType, RicCause, RicRequestId, RicSubscriptionRequest,
};
use ransim_e2::E2Channel;
use tokio::sync::oneshot;

use crate::test_utils::*;

#[tokio::test(start_paused = true)]
async fn test_kpm_periodic_reports_one_cell_three_ues() {
    init_test_logging();
    let model = honeycomb_model(1, 1, 3);
    let (sim, codecs) = simulation(&model);
    let agent = sim.agent("node1").expect("agent");
    let (channel, mut end) = E2Channel::new(64);

    let request = kpm_subscription_request(&codecs, 10, 1, 1000);
    let reply = agent
        .handle(&channel, RicRequest::Subscription(request))
        .await
        .expect("subscription");
    let RicReply::Subscription(SubscriptionOutcome::Accepted(response)) = reply else {
        panic!("expected acceptance, got {reply:?}");
    };
    assert_eq!(response.actions_admitted, vec![10]);
    assert!(response.actions_not_admitted.is_empty());

    let ecgi = model.cells.values().next().expect("cell").ecgi;
    for _ in 0..3 {
        let indication = recv_indication(&mut end).await;
        let header = decode_kpm_header(&codecs, &indication);
        assert_eq!(header.plmn_id, model.plmn_id);
        assert_eq!(header.gnb_id_len, 22);
        assert!(u32::from_be_bytes(header.timestamp) > 0);

        let message = decode_kpm_message(&codecs, &indication);
        assert_eq!(message.cell_object_id, ecgi.to_string());
        let records = &message.meas_data[0].records;
        for name in ["RRC.Conn.Max", "RRC.Conn.Avg"] {
            let index = message
                .meas_names
                .iter()
                .position(|n| n == name)
                .expect("declared measurement");
            assert_eq!(records[index], KpmMeasRecord::Integer(3), "{name}");
        }
    }
    end.close();
}

#[tokio::test(start_paused = true)]
async fn test_kpm_delete_mid_flight_stops_reports() {
    init_test_logging();
    let model = honeycomb_model(1, 1, 3);
    let (sim, codecs) = simulation(&model);
    let agent = sim.agent("node1").expect("agent");
    let (channel, mut end) = E2Channel::new(64);

    let request = kpm_subscription_request(&codecs, 10, 1, 1000);
    agent
        .handle(&channel, RicRequest::Subscription(request.clone()))
        .await
        .expect("subscription");

    recv_indication(&mut end).await;
    recv_indication(&mut end).await;

    let reply = agent
        .handle(&channel, RicRequest::SubscriptionDelete(delete_request(&request)))
        .await
        .expect("delete");
    let RicReply::SubscriptionDelete(SubscriptionDeleteOutcome::Removed(_)) = reply else {
        panic!("expected removal, got {reply:?}");
    };
    assert!(sim.subscriptions().is_empty());

    // Anything still buffered was handed over before the delete returned;
    // after draining, no further indication may arrive.
    drain(&mut end);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(drain(&mut end), 0);
}

#[tokio::test(start_paused = true)]
async fn test_subscription_with_no_report_action_fails() {
    init_test_logging();
    let model = honeycomb_model(1, 1, 0);
    let (sim, codecs) = simulation(&model);
    let agent = sim.agent("node1").expect("agent");
    let (channel, _end) = E2Channel::new(4);

    let mut request = kpm_subscription_request(&codecs, 10, 1, 1000);
    request.actions = vec![
        RicActionToBeSetup {
            action_id: 1,
            action_type: RicActionType::Insert,
            definition: None,
        },
        RicActionToBeSetup {
            action_id: 2,
            action_type: RicActionType::Policy,
            definition: None,
        },
    ];
    let reply = agent
        .handle(&channel, RicRequest::Subscription(request))
        .await
        .expect("dispatch");
    let RicReply::Subscription(SubscriptionOutcome::Rejected(failure)) = reply else {
        panic!("expected failure, got {reply:?}");
    };
    assert_eq!(failure.actions_not_admitted.len(), 2);
    assert!(failure
        .actions_not_admitted
        .iter()
        .all(|r| r.cause == RicCause::ActionNotSupported));
    assert!(sim.subscriptions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_subscription_with_malformed_trigger_fails() {
    init_test_logging();
    let model = honeycomb_model(1, 1, 0);
    let (sim, codecs) = simulation(&model);
    let agent = sim.agent("node1").expect("agent");
    let (channel, _end) = E2Channel::new(4);

    let mut request = kpm_subscription_request(&codecs, 10, 1, 1000);
    request.event_trigger = Bytes::from_static(b"\x00\x01garbage");
    let reply = agent
        .handle(&channel, RicRequest::Subscription(request))
        .await
        .expect("dispatch");
    let RicReply::Subscription(SubscriptionOutcome::Rejected(failure)) = reply else {
        panic!("expected failure, got {reply:?}");
    };
    assert_eq!(failure.cause, RicCause::InvalidEventTrigger);
    assert!(sim.subscriptions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unknown_ran_function_rejected() {
    init_test_logging();
    let model = honeycomb_model(1, 1, 0);
    let (sim, codecs) = simulation(&model);
    let agent = sim.agent("node1").expect("agent");
    let (channel, _end) = E2Channel::new(4);

    let mut request = kpm_subscription_request(&codecs, 10, 1, 1000);
    request.ran_function_id = 99;
    let reply = agent
        .handle(&channel, RicRequest::Subscription(request))
        .await
        .expect("dispatch");
    let RicReply::Subscription(SubscriptionOutcome::Rejected(failure)) = reply else {
        panic!("expected failure, got {reply:?}");
    };
    assert_eq!(failure.cause, RicCause::FunctionIdInvalid);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_subscription_triple_is_an_error() {
    init_test_logging();
    let model = honeycomb_model(1, 1, 0);
    let (sim, codecs) = simulation(&model);
    let agent = sim.agent("node1").expect("agent");
    let (channel, _end) = E2Channel::new(16);

    let request = kpm_subscription_request(&codecs, 10, 1, 1000);
    agent
        .handle(&channel, RicRequest::Subscription(request.clone()))
        .await
        .expect("first subscription");
    let second = agent
        .handle(&channel, RicRequest::Subscription(request))
        .await;
    assert!(second.is_err());
    assert_eq!(sim.subscriptions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_channel_close_terminates_all_emitters() {
    init_test_logging();
    let model = honeycomb_model(1, 1, 1);
    let (sim, codecs) = simulation(&model);
    let agent = sim.agent("node1").expect("agent");
    let (channel, end) = E2Channel::new(64);

    let kpm_request = kpm_subscription_request(&codecs, 10, 1, 1000);
    let mho_request =
        mho_subscription_request(&codecs, 11, 1, MhoTriggerType::Periodic, Some(1000));
    agent
        .handle(&channel, RicRequest::Subscription(kpm_request.clone()))
        .await
        .expect("kpm subscription");
    agent
        .handle(&channel, RicRequest::Subscription(mho_request.clone()))
        .await
        .expect("mho subscription");
    assert_eq!(sim.subscriptions().len(), 2);

    end.close();

    let emptied = wait_for(
        || async { sim.subscriptions().is_empty() },
        Duration::from_secs(5),
    )
    .await;
    assert!(emptied, "emitters must exit within one tick of channel close");

    // Subsequent deletes find nothing.
    for request in [&kpm_request, &mho_request] {
        let reply = agent
            .handle(&channel, RicRequest::SubscriptionDelete(delete_request(request)))
            .await
            .expect("delete dispatch");
        let RicReply::SubscriptionDelete(SubscriptionDeleteOutcome::Rejected(failure)) = reply
        else {
            panic!("expected rejection, got {reply:?}");
        };
        assert_eq!(failure.cause, RicCause::RequestIdUnknown);
    }
}

#[tokio::test(start_paused = true)]
async fn test_agent_dispatch_queue_roundtrip() {
    init_test_logging();
    let model = honeycomb_model(1, 1, 1);
    let (sim, codecs) = simulation(&model);
    let (mut end, requests) = sim.connect("node1").expect("connect");

    let (reply_tx, reply_rx) = oneshot::channel();
    requests
        .send(E2AgentRequest {
            pdu: RicRequest::Subscription(kpm_subscription_request(&codecs, 10, 1, 1000)),
            reply: reply_tx,
        })
        .await
        .expect("queue send");
    let reply = reply_rx.await.expect("reply").expect("dispatch");
    assert!(matches!(
        reply,
        RicReply::Subscription(SubscriptionOutcome::Accepted(_))
    ));

    recv_indication(&mut end).await;
    end.close();
}

#[tokio::test(start_paused = true)]
async fn test_subscription_response_echoes_request_identifiers() {
    init_test_logging();
    let model = honeycomb_model(1, 1, 0);
    let (sim, codecs) = simulation(&model);
    let agent = sim.agent("node1").expect("agent");
    let (channel, _end) = E2Channel::new(4);

    let request = RicSubscriptionRequest {
        request_id: RicRequestId::new(77, 5),
        ..kpm_subscription_request(&codecs, 77, 5, 250)
    };
    let reply = agent
        .handle(&channel, RicRequest::Subscription(request))
        .await
        .expect("subscription");
    let RicReply::Subscription(SubscriptionOutcome::Accepted(response)) = reply else {
        panic!("expected acceptance, got {reply:?}");
    };
    assert_eq!(response.request_id, RicRequestId::new(77, 5));
    assert_eq!(response.ran_function_id, sm::KPM2_RAN_FUNCTION_ID);
}
