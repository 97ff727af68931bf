//! Shared building blocks for the RAN simulator.
//!
//! This crate carries the identifier types used across the workspace
//! (PLMN, ECGI, IMSI, CRNTI), geographic coordinates with great-circle
//! geodesy helpers, the common error taxonomy, and the logging bootstrap.

pub mod error;
pub mod geo;
pub mod logging;
pub mod types;

pub use error::{Error, Result};
pub use types::{CellId, Coordinate, Crnti, Ecgi, EnbId, Imsi, PlmnId, RrcStatus};
