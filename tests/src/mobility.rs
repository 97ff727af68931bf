//! Mobility scenarios: movement, measurement invariants, handover and RRC
//! transitions under load.

use std::collections::HashMap;

use ransim_common::{geo, Imsi, RrcStatus};
use ransim_core::store::{EventKind, WatchOptions};
use ransim_core::HandoverDwell;

use crate::test_utils::*;

#[tokio::test]
async fn test_ticks_preserve_ue_invariants() {
    init_test_logging();
    let model = honeycomb_model(7, 3, 10);
    let mut mobility = quiet_mobility();
    mobility.probability_rrc_state_change = 0.5;
    let (sim, _codecs) = simulation_with(&model, mobility);

    let mut dwell = HandoverDwell::default();
    for _ in 0..5 {
        sim.driver().step(&mut dwell);
        for ue in sim.ue_store().list_all() {
            assert!(ue.candidate_cells.len() <= 3);
            assert!(ue.candidate_cells.iter().all(|c| c.ecgi != ue.cell.ecgi));
            assert!(ue
                .candidate_cells
                .windows(2)
                .all(|w| w[0].strength >= w[1].strength));
            assert_ne!(ue.rrc_state, RrcStatus::Inactive);
        }
    }
}

#[tokio::test]
async fn test_ues_move_every_tick() {
    init_test_logging();
    let model = honeycomb_model(1, 1, 3);
    let (sim, _codecs) = simulation(&model);

    let before: HashMap<Imsi, _> = sim
        .ue_store()
        .list_all()
        .into_iter()
        .map(|ue| (ue.imsi, ue.location))
        .collect();
    sim.driver().step(&mut HandoverDwell::default());

    for ue in sim.ue_store().list_all() {
        let moved = geo::distance(before[&ue.imsi], ue.location);
        assert!((moved - 20.0).abs() < 1.0, "UE {} moved {moved} m", ue.imsi);
    }
}

#[tokio::test]
async fn test_rrc_transitions_are_only_idle_connected() {
    init_test_logging();
    let model = honeycomb_model(1, 1, 5);
    let mut mobility = quiet_mobility();
    mobility.probability_rrc_state_change = 1.0;
    mobility.ue_speed_mps = 0.0;
    let (sim, _codecs) = simulation_with(&model, mobility);

    let mut dwell = HandoverDwell::default();
    for _ in 0..4 {
        let before: HashMap<Imsi, RrcStatus> = sim
            .ue_store()
            .list_all()
            .into_iter()
            .map(|ue| (ue.imsi, ue.rrc_state))
            .collect();
        sim.driver().step(&mut dwell);
        for ue in sim.ue_store().list_all() {
            match (before[&ue.imsi], ue.rrc_state) {
                (RrcStatus::Idle, RrcStatus::Connected)
                | (RrcStatus::Connected, RrcStatus::Idle) => {}
                transition => panic!("illegal RRC transition {transition:?}"),
            }
        }
    }
}

#[tokio::test]
async fn test_handover_emits_updated_event() {
    init_test_logging();
    // A single far-off serving cell and a strong co-located newcomer force
    // a handover within the dwell window.
    let model = honeycomb_model(1, 1, 0);
    let mut mobility = quiet_mobility();
    mobility.ue_speed_mps = 0.0;
    mobility.handover_dwell_ticks = 1;
    let (sim, _codecs) = simulation_with(&model, mobility);

    let ue_store = sim.ue_store();
    ue_store.create_ues(1).expect("create UE");
    let imsi = ue_store.list_all()[0].imsi;

    let mut strong = model.cells.values().next().expect("cell").clone();
    strong.ecgi = ransim_common::Ecgi::new(strong.ecgi.value() + 1);
    strong.tx_power_db = 40.0;
    strong.sector.center = ue_store.get(imsi).expect("ue").location;
    sim.cell_store().add(strong.clone()).expect("add cell");

    let mut watch = ue_store.watch(WatchOptions::default());
    sim.driver().step(&mut HandoverDwell::default());

    assert_eq!(ue_store.get(imsi).expect("ue").cell.ecgi, strong.ecgi);
    let mut saw_handover = false;
    while let Some(event) = watch.try_recv() {
        if event.kind == EventKind::Updated && event.value.cell.ecgi == strong.ecgi {
            saw_handover = true;
        }
    }
    assert!(saw_handover, "handover must publish an Updated event");
}

#[tokio::test]
async fn test_set_ue_count_twice_is_idempotent() {
    init_test_logging();
    let model = honeycomb_model(1, 1, 0);
    let (sim, _codecs) = simulation(&model);
    sim.ue_store().set_ue_count(7).expect("set count");
    sim.ue_store().set_ue_count(7).expect("set count again");
    assert_eq!(sim.ue_store().len(), 7);
}

#[tokio::test]
async fn test_delete_absent_imsi_is_not_found() {
    init_test_logging();
    let model = honeycomb_model(1, 1, 3);
    let (sim, _codecs) = simulation(&model);
    let err = sim.ue_store().delete(Imsi(1)).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(sim.ue_store().len(), 3);
}
