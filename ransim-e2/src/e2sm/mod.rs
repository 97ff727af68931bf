//! E2SM payload records for the supported service models.
//!
//! Each submodule defines the header, message, event-trigger and action
//! records of one service model, together with its OID and short name.
//! The records are serde-serializable so any codec plugin can carry them;
//! the ASN.1 layout itself is the codec's concern.

pub mod kpm;
pub mod mho;
pub mod rcpre;

/// Returns the current UNIX time as the 4-byte big-endian second counter
/// carried in indication headers.
pub fn timestamp_now() -> [u8; 4] {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0);
    secs.to_be_bytes()
}
