//! Integration test framework for the RAN simulator.
//!
//! Scenario coverage:
//!
//! 1. **Topology** - honeycomb layouts, ring bounds, neighbor relations
//! 2. **Subscription flow** - KPM periodic reports, mid-flight delete,
//!    channel close, failure PDUs
//! 3. **MHO flow** - measurement-report suppression and per-flip RRC
//!    state indications
//! 4. **Mobility** - movement, handover and RRC invariants under load

pub mod test_utils;

#[cfg(test)]
mod mho_flow;
#[cfg(test)]
mod mobility;
#[cfg(test)]
mod subscription_flow;
#[cfg(test)]
mod topology;
