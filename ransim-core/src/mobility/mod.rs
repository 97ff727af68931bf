//! UE mobility and RRC driver.
//!
//! A single periodic task advances every UE along its heading, recomputes
//! serving and candidate cell strengths, performs hysteresis-gated
//! handovers and probabilistically flips RRC state. RRC flips are published
//! as full UE snapshots on a broadcast channel consumed by the MHO
//! subscription emitters.

pub mod driver;
pub mod rf;
pub mod rrc;

pub use driver::{HandoverDwell, MobilityConfig, MobilityDriver};
pub use rrc::RrcCtrl;
