//! E2SM-RC-PRE payload records (cell configuration report and control).

use ransim_common::PlmnId;
use serde::{Deserialize, Serialize};

/// Service-model OID of E2SM-RC-PRE.
pub const OID: &str = "1.3.6.1.4.1.53148.1.1.2.100";

/// RAN function short name.
pub const SHORT_NAME: &str = "ORAN-E2SM-RC-PRE";

/// RC-PRE event-trigger types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RcPreTriggerType {
    /// Periodic cell configuration reporting.
    Periodic,
    /// Report upon a cell configuration change.
    UponChange,
}

/// RC-PRE event-trigger definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RcPreEventTriggerDefinition {
    /// Trigger type.
    pub trigger_type: RcPreTriggerType,
    /// Report period in milliseconds, for periodic triggers.
    pub report_period_ms: Option<u32>,
}

/// RC-PRE indication header: the reporting cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RcPreIndicationHeader {
    /// Operator identifier.
    pub plmn_id: PlmnId,
    /// NR Cell Identity of the reporting cell (36-bit).
    pub nr_cell_identity: u64,
    /// UNIX seconds, big-endian.
    pub timestamp: [u8; 4],
}

/// One neighbor relation in a cell configuration report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RcPreNeighborItem {
    /// Operator identifier of the neighbor.
    pub plmn_id: PlmnId,
    /// NR Cell Identity of the neighbor (36-bit).
    pub nr_cell_identity: u64,
}

/// RC-PRE indication message: the cell's current radio configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RcPreIndicationMessage {
    /// Transmit power in dB.
    pub tx_power_db: f64,
    /// Neighbor relations.
    pub neighbors: Vec<RcPreNeighborItem>,
}

/// RC-PRE control header: the target cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RcPreControlHeader {
    /// Operator identifier.
    pub plmn_id: PlmnId,
    /// NR Cell Identity of the target cell (36-bit).
    pub nr_cell_identity: u64,
}

/// RC-PRE control message: the requested configuration change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RcPreControlMessage {
    /// New transmit power in dB.
    pub tx_power_db: f64,
}
