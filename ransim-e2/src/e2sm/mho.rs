//! E2SM-MHO payload records (indication header, message formats 1 and 2,
//! event trigger).

use ransim_common::{PlmnId, RrcStatus};
use serde::{Deserialize, Serialize};

/// Service-model OID of E2SM-MHO.
pub const OID: &str = "1.3.6.1.4.1.53148.1.1.2.101";

/// RAN function short name.
pub const SHORT_NAME: &str = "ORAN-E2SM-MHO";

/// Report period used when a trigger that implies one does not carry it.
pub const DEFAULT_REPORT_PERIOD_MS: u32 = 1000;

/// MHO event-trigger types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MhoTriggerType {
    /// Periodic measurement reporting.
    Periodic,
    /// Report upon reception of a measurement report.
    UponRcvMeasReport,
    /// Report upon a UE RRC state change.
    UponChangeRrcStatus,
}

/// MHO event-trigger definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MhoEventTriggerDefinition {
    /// Trigger type.
    pub trigger_type: MhoTriggerType,
    /// Report period in milliseconds, for periodic triggers.
    pub report_period_ms: Option<u32>,
}

/// MHO indication header: PLMN + 36-bit NR Cell Identity of the reporting
/// cell, with a 4-byte big-endian UNIX-second timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MhoIndicationHeader {
    /// Operator identifier.
    pub plmn_id: PlmnId,
    /// NR Cell Identity (36-bit).
    pub nr_cell_identity: u64,
    /// UNIX seconds, big-endian.
    pub timestamp: [u8; 4],
}

/// One entry of a measurement report: a cell and its measured RSRP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MhoMeasReportItem {
    /// Operator identifier of the measured cell.
    pub plmn_id: PlmnId,
    /// NR Cell Identity of the measured cell (36-bit).
    pub nr_cell_identity: u64,
    /// Measured RSRP in dB.
    pub rsrp: i32,
}

/// MHO indication message, format 1: a UE measurement report with the
/// serving cell first, followed by the ranked neighbor cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MhoMeasurementReport {
    /// UE identifier (decimal IMSI).
    pub ue_id: String,
    /// Serving cell followed by neighbors, strongest first.
    pub meas_report: Vec<MhoMeasReportItem>,
}

/// MHO indication message, format 2: a UE RRC state update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MhoRrcStatusUpdate {
    /// UE identifier (decimal IMSI).
    pub ue_id: String,
    /// Current RRC state.
    pub rrc_status: RrcStatus,
}

/// MHO indication message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MhoIndicationMessage {
    /// Format 1: measurement report.
    MeasurementReport(MhoMeasurementReport),
    /// Format 2: RRC state update.
    RrcStatus(MhoRrcStatusUpdate),
}
