use crate::error::CoreError;
use crate::models::Coordinate;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points, haversine formula.
///
/// Coordinates outside the usual latitude/longitude ranges are not
/// rejected; the result is mathematically defined but meaningless.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Minutes until the vehicle reaches `to`, assuming it travels the
/// straight line between the points at `speed_kmh`. As-the-crow-flies:
/// the route polyline is not followed.
pub fn eta_minutes(from: Coordinate, to: Coordinate, speed_kmh: f64) -> Result<i64, CoreError> {
    if speed_kmh <= 0.0 {
        return Err(CoreError::InvalidSpeed(speed_kmh));
    }
    Ok((distance_km(from, to) / speed_kmh * 60.0).round() as i64)
}
