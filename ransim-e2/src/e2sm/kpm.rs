//! E2SM-KPM v2 payload records (indication header/message format 1,
//! event trigger, action definition format 1).

use ransim_common::PlmnId;
use serde::{Deserialize, Serialize};

/// Service-model OID of E2SM-KPM v2.
pub const OID: &str = "1.3.6.1.4.1.53148.1.2.2.2";

/// RAN function short name.
pub const SHORT_NAME: &str = "ORAN-E2SM-KPM";

/// Subscription ID reported when the action definition does not supply one.
pub const DEFAULT_SUBSCRIPTION_ID: i64 = 123_456;

/// Granularity period reported when the action definition does not supply
/// one, in milliseconds.
pub const DEFAULT_GRANULARITY_MS: u32 = 21;

/// KPM indication header, format 1.
///
/// Carries the global KPM node ID (PLMN + gNB ID as a 22-bit string),
/// sender/vendor tags and a 4-byte big-endian UNIX-second timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpmIndicationHeader {
    /// Operator identifier.
    pub plmn_id: PlmnId,
    /// gNB identifier value.
    pub gnb_id: u32,
    /// Bit length of the gNB identifier string.
    pub gnb_id_len: u8,
    /// File format tag.
    pub file_format_version: String,
    /// Sender name.
    pub sender_name: String,
    /// Sender type.
    pub sender_type: String,
    /// Vendor name.
    pub vendor_name: String,
    /// UNIX seconds, big-endian.
    pub timestamp: [u8; 4],
}

/// One measurement record within a data item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KpmMeasRecord {
    /// Integer-valued measurement.
    Integer(i64),
    /// Real-valued measurement.
    Real(f64),
    /// Declared measurement with no value available.
    NoValue,
}

/// One measurement data item: a record per declared measurement type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpmMeasDataItem {
    /// Records, positionally matching the declared measurement names.
    pub records: Vec<KpmMeasRecord>,
    /// Incomplete flag.
    pub incomplete: bool,
}

/// KPM indication message, format 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpmIndicationMessage {
    /// Cell object ID: the decimal ECGI of the reported cell.
    pub cell_object_id: String,
    /// Subscription ID copied from the action definition.
    pub subscription_id: i64,
    /// Granularity period in milliseconds.
    pub granularity_ms: u32,
    /// Declared measurement type names.
    pub meas_names: Vec<String>,
    /// Measurement data.
    pub meas_data: Vec<KpmMeasDataItem>,
}

/// KPM event-trigger definition: the report period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpmEventTriggerDefinition {
    /// Report period in milliseconds.
    pub report_period_ms: u32,
}

/// KPM action definition, format 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpmActionDefinition {
    /// Cell object ID this action applies to (decimal ECGI).
    pub cell_object_id: String,
    /// Subscription ID to echo in indications.
    pub subscription_id: i64,
    /// Granularity period in milliseconds.
    pub granularity_ms: u32,
    /// Requested measurement type names.
    pub meas_names: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_serde_roundtrip() {
        let hdr = KpmIndicationHeader {
            plmn_id: PlmnId::new(314_628),
            gnb_id: 5152,
            gnb_id_len: 22,
            file_format_version: "txt".to_string(),
            sender_name: "ransim".to_string(),
            sender_type: "sim".to_string(),
            vendor_name: "ransim".to_string(),
            timestamp: 1_700_000_000u32.to_be_bytes(),
        };
        let json = serde_json::to_vec(&hdr).unwrap();
        let back: KpmIndicationHeader = serde_json::from_slice(&json).unwrap();
        assert_eq!(hdr, back);
    }

    #[test]
    fn test_message_records_match_names() {
        let msg = KpmIndicationMessage {
            cell_object_id: "17660905537537".to_string(),
            subscription_id: DEFAULT_SUBSCRIPTION_ID,
            granularity_ms: DEFAULT_GRANULARITY_MS,
            meas_names: vec!["RRC.Conn.Max".to_string(), "RRC.Conn.Avg".to_string()],
            meas_data: vec![KpmMeasDataItem {
                records: vec![KpmMeasRecord::Integer(3), KpmMeasRecord::Integer(3)],
                incomplete: true,
            }],
        };
        assert_eq!(msg.meas_names.len(), msg.meas_data[0].records.len());
    }
}
