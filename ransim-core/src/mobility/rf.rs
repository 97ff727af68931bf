//! Signal-strength model.
//!
//! Strength is deterministic in the UE position and the cell geometry:
//! free-space log-distance decay inside the sector arc with a linear
//! penalty towards the arc edges, and a negative distance-proportional
//! value outside the arc.

use ransim_common::{geo, Coordinate};

use crate::model::Cell;

/// Penalty applied at the edge of the sector arc, in dB.
const EDGE_ATTENUATION_DB: f64 = 3.0;

/// Computes the strength of `cell` as measured at `point`, in dB.
///
/// Strictly decreasing in distance, and `<= 0` outside the sector arc.
pub fn strength(point: Coordinate, cell: &Cell) -> f64 {
    let dist = geo::distance(point, cell.sector.center);
    let arc = if cell.sector.arc <= 0 {
        360.0
    } else {
        f64::from(cell.sector.arc)
    };
    let half_arc = arc / 2.0;

    // The sector spans [azimuth, azimuth + arc]; its center line sits at
    // azimuth + arc/2.
    let center_line = (f64::from(cell.sector.azimuth) + half_arc) % 360.0;
    let bearing = geo::initial_bearing(cell.sector.center, point);
    let off = geo::angle_diff(bearing, center_line);

    if arc < 360.0 && off > half_arc {
        return -dist;
    }
    let edge_penalty = if arc >= 360.0 {
        0.0
    } else {
        EDGE_ATTENUATION_DB * (off / half_arc).min(1.0)
    };
    cell.tx_power_db - 20.0 * (1.0 + dist).log10() - edge_penalty
}
