//! Great-circle geodesy helpers for cell layout and mobility.

use crate::types::Coordinate;

/// Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_378_100.0;

/// Haversine distance between two coordinates, in meters.
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let la1 = a.lat.to_radians();
    let lo1 = a.lng.to_radians();
    let la2 = b.lat.to_radians();
    let lo2 = b.lng.to_radians();

    let h = hsin(la2 - la1) + la1.cos() * la2.cos() * hsin(lo2 - lo1);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Destination point reached by travelling `dist_m` meters from `start` on
/// the given initial azimuth (degrees clockwise from north).
pub fn target_point(start: Coordinate, azimuth_deg: f64, dist_m: f64) -> Coordinate {
    let la1 = start.lat.to_radians();
    let lo1 = start.lng.to_radians();
    let az = azimuth_deg.to_radians();
    let d = dist_m / EARTH_RADIUS_M;

    let la2 = (la1.sin() * d.cos() + la1.cos() * d.sin() * az.cos()).asin();
    let lo2 = lo1 + (az.sin() * d.sin() * la1.cos()).atan2(d.cos() - la1.sin() * la2.sin());

    Coordinate::new(la2.to_degrees(), lo2.to_degrees())
}

/// Initial bearing from `from` towards `to`, in degrees [0, 360).
pub fn initial_bearing(from: Coordinate, to: Coordinate) -> f64 {
    let la1 = from.lat.to_radians();
    let la2 = to.lat.to_radians();
    let dlo = (to.lng - from.lng).to_radians();

    let y = dlo.sin() * la2.cos();
    let x = la1.cos() * la2.sin() - la1.sin() * la2.cos() * dlo.cos();
    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Longitude compression factor at the given latitude.
///
/// Longitude offsets are divided by this when laying out towers so east-west
/// spacing matches north-south spacing on the ground.
pub fn aspect_ratio(lat_deg: f64) -> f64 {
    lat_deg.to_radians().cos()
}

/// Absolute angular difference between two bearings, in degrees [0, 180].
pub fn angle_diff(a_deg: f64, b_deg: f64) -> f64 {
    let d = (a_deg - b_deg).rem_euclid(360.0);
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}

fn hsin(theta: f64) -> f64 {
    (theta / 2.0).sin().powi(2)
}
