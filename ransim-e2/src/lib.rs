//! E2 interface building blocks for the RAN simulator.
//!
//! This crate defines the typed E2AP PDU records exchanged with a RIC, the
//! E2SM payload records for the supported service models (KPM v2, MHO,
//! RC-PRE), the codec-plugin boundary that turns payload records into wire
//! bytes, and the E2 channel abstraction that delivers indication PDUs.
//!
//! Bit-exact ASN.1 PER encoding is deliberately out of scope: payloads cross
//! the [`codec::SmCodec`] trait as opaque bytes, and the in-tree
//! [`codec::JsonSmCodec`] is the reference plugin used by the simulator and
//! its tests.

pub mod channel;
pub mod codec;
pub mod e2sm;
pub mod pdu;

pub use channel::{E2Channel, E2ChannelEnd};
pub use codec::{CodecRegistry, JsonSmCodec, PayloadClass, SmCodec, SmPayload};
