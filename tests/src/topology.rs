//! Honeycomb topology scenarios.

use ransim_common::{Coordinate, PlmnId};
use ransim_core::topology::{generate_honeycomb_topology, HoneycombOptions};

use crate::test_utils::init_test_logging;

fn spec_options(num_towers: u32, sectors_per_tower: u32) -> HoneycombOptions {
    HoneycombOptions {
        map_center: Coordinate::new(52.52, 13.41),
        num_towers,
        sectors_per_tower,
        plmn_id: PlmnId::new(314_628),
        enb_start: 5150,
        pitch: 500.0,
        max_distance: 400.0,
        max_neighbors: 6,
        ..HoneycombOptions::default()
    }
}

#[test]
fn test_honeycomb_seven_towers_three_sectors() {
    init_test_logging();
    let model = generate_honeycomb_topology(&spec_options(7, 3)).expect("model");

    assert_eq!(model.cells.len(), 21);
    assert_eq!(model.nodes.len(), 7);
    for node in model.nodes.values() {
        assert_eq!(node.cells.len(), 3);
    }

    let cell1 = &model.cells["cell1"];
    assert_eq!(cell1.sector.azimuth, 0);
    assert_eq!(cell1.sector.arc, 120);

    // Each co-located triplet is mutually neighbored, so every cell has at
    // least its two siblings.
    for cell in model.cells.values() {
        assert!(cell.neighbors.len() >= 2, "cell {} has {} neighbors", cell.ecgi, cell.neighbors.len());
        assert!(cell.neighbors.len() <= 6);
        assert!(!cell.neighbors.contains(&cell.ecgi));
        let siblings: Vec<_> = model
            .cells
            .values()
            .filter(|c| {
                c.ecgi != cell.ecgi
                    && c.sector.center.lat == cell.sector.center.lat
                    && c.sector.center.lng == cell.sector.center.lng
            })
            .collect();
        assert_eq!(siblings.len(), 2);
        for sibling in siblings {
            assert!(cell.neighbors.contains(&sibling.ecgi));
        }
    }
}

#[test]
fn test_tower_count_bounds() {
    init_test_logging();
    assert!(generate_honeycomb_topology(&spec_options(469, 1)).is_ok());
    let err = generate_honeycomb_topology(&spec_options(470, 1)).unwrap_err();
    assert!(err.is_invalid());
}

#[test]
fn test_single_tower_produces_colocated_pairwise_neighbors() {
    init_test_logging();
    let model = generate_honeycomb_topology(&spec_options(1, 3)).expect("model");
    assert_eq!(model.cells.len(), 3);
    let centers: Vec<_> = model
        .cells
        .values()
        .map(|c| (c.sector.center.lat, c.sector.center.lng))
        .collect();
    assert!(centers.windows(2).all(|w| w[0] == w[1]));
    for cell in model.cells.values() {
        assert_eq!(cell.neighbors.len(), 2);
    }
}

#[test]
fn test_generated_ecgis_compose_plmn_node_and_cell() {
    init_test_logging();
    let model = generate_honeycomb_topology(&spec_options(2, 3)).expect("model");
    for (name, node) in &model.nodes {
        for ecgi in &node.cells {
            assert_eq!(ecgi.plmn_id(), PlmnId::new(314_628), "{name}");
            assert_eq!(ecgi.enb_id(), node.enb_id, "{name}");
            assert!(ecgi.cell_id().0 >= 1 && ecgi.cell_id().0 <= 3, "{name}");
        }
    }
}
