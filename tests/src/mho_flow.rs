//! MHO scenarios: measurement-report suppression and per-flip RRC state
//! indications.

use std::time::Duration;

use ransim_core::agent::{RicReply, RicRequest};
use ransim_core::sm::SubscriptionOutcome;
use ransim_core::HandoverDwell;
use ransim_core::model::UeCell;
use ransim_e2::e2sm::mho::{MhoIndicationMessage, MhoTriggerType};
use ransim_e2::E2Channel;
use ransim_common::RrcStatus;

use crate::test_utils::*;

#[tokio::test(start_paused = true)]
async fn test_report_suppressed_for_ue_without_neighbors() {
    init_test_logging();
    let model = honeycomb_model(1, 3, 0);
    let (sim, codecs) = simulation(&model);
    let ue_store = sim.ue_store();
    ue_store.create_ues(2).expect("create UEs");

    let ues = ue_store.list_all();
    let (bare, reported) = (ues[0].imsi, ues[1].imsi);
    ue_store
        .set_rrc_state(bare, RrcStatus::Connected)
        .expect("set RRC");
    ue_store
        .set_rrc_state(reported, RrcStatus::Connected)
        .expect("set RRC");

    // Only one of the two UEs has measured neighbors.
    let neighbor = model
        .cells
        .values()
        .find(|c| c.ecgi != ue_store.get(reported).expect("ue").cell.ecgi)
        .expect("neighbor cell")
        .ecgi;
    ue_store
        .update_candidates(
            reported,
            -30.0,
            vec![UeCell {
                ecgi: neighbor,
                strength: -20.0,
            }],
            3,
        )
        .expect("candidates");

    let agent = sim.agent("node1").expect("agent");
    let (channel, mut end) = E2Channel::new(64);
    let request =
        mho_subscription_request(&codecs, 10, 1, MhoTriggerType::Periodic, Some(1000));
    let reply = agent
        .handle(&channel, RicRequest::Subscription(request))
        .await
        .expect("subscription");
    assert!(matches!(
        reply,
        RicReply::Subscription(SubscriptionOutcome::Accepted(_))
    ));

    // Two report periods: every report must belong to the UE with
    // neighbors, and its serving cell leads the measurement list.
    let reported_ue = ue_store.get(reported).expect("ue");
    for _ in 0..2 {
        let indication = recv_indication(&mut end).await;
        match decode_mho_message(&codecs, &indication) {
            MhoIndicationMessage::MeasurementReport(report) => {
                assert_eq!(report.ue_id, reported.to_string());
                assert_eq!(
                    report.meas_report[0].nr_cell_identity,
                    reported_ue.cell.ecgi.nci()
                );
                assert_eq!(report.meas_report[1].nr_cell_identity, neighbor.nci());
            }
            other => panic!("unexpected message {other:?}"),
        }
        // The emitter keeps running; the bare UE simply produces nothing.
        assert_eq!(drain(&mut end), 0);
        tokio::time::sleep(Duration::from_millis(1000)).await;
    }
    end.close();
}

#[tokio::test(start_paused = true)]
async fn test_idle_ues_produce_no_measurement_report() {
    init_test_logging();
    let model = honeycomb_model(1, 1, 2);
    let (sim, codecs) = simulation(&model);
    // All UEs start IDLE; no format-1 report may appear.
    let agent = sim.agent("node1").expect("agent");
    let (channel, mut end) = E2Channel::new(64);
    let request =
        mho_subscription_request(&codecs, 10, 1, MhoTriggerType::Periodic, Some(1000));
    agent
        .handle(&channel, RicRequest::Subscription(request))
        .await
        .expect("subscription");

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(drain(&mut end), 0);
    end.close();
}

#[tokio::test(start_paused = true)]
async fn test_one_format2_indication_per_flip_per_subscription() {
    init_test_logging();
    let model = honeycomb_model(1, 1, 2);
    let mut mobility = quiet_mobility();
    mobility.probability_rrc_state_change = 1.0;
    mobility.ue_speed_mps = 0.0;
    let (sim, codecs) = simulation_with(&model, mobility);
    let agent = sim.agent("node1").expect("agent");

    // Two independent MHO subscriptions over separate channels.
    let (channel_a, mut end_a) = E2Channel::new(64);
    let (channel_b, mut end_b) = E2Channel::new(64);
    for (channel, requester) in [(&channel_a, 10), (&channel_b, 11)] {
        let request = mho_subscription_request(
            &codecs,
            requester,
            1,
            MhoTriggerType::UponChangeRrcStatus,
            None,
        );
        let reply = agent
            .handle(channel, RicRequest::Subscription(request))
            .await
            .expect("subscription");
        assert!(matches!(
            reply,
            RicReply::Subscription(SubscriptionOutcome::Accepted(_))
        ));
    }

    // Every tick flips every UE once.
    let mut dwell = HandoverDwell::default();
    sim.driver().step(&mut dwell);

    for end in [&mut end_a, &mut end_b] {
        for _ in 0..2 {
            let indication = recv_indication(end).await;
            match decode_mho_message(&codecs, &indication) {
                MhoIndicationMessage::RrcStatus(update) => {
                    assert_eq!(update.rrc_status, RrcStatus::Connected);
                }
                other => panic!("unexpected message {other:?}"),
            }
        }
        // Exactly one indication per flip: nothing further is buffered.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(drain(end), 0);
    }

    // The reverse flip arrives on both subscriptions as well.
    sim.driver().step(&mut dwell);
    for end in [&mut end_a, &mut end_b] {
        for _ in 0..2 {
            let indication = recv_indication(end).await;
            match decode_mho_message(&codecs, &indication) {
                MhoIndicationMessage::RrcStatus(update) => {
                    assert_eq!(update.rrc_status, RrcStatus::Idle);
                }
                other => panic!("unexpected message {other:?}"),
            }
        }
    }
    end_a.close();
    end_b.close();
}
