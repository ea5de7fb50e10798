//! Great-circle distance on a spherical Earth.

/// Mean Earth radius in miles.
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Calculates the haversine distance between two points, in miles.
///
/// Pure and total: `distance_miles(p, p) == 0.0` and the result is symmetric in
/// its two points.
///
/// # Examples
///
/// ```
/// use nearcity::distance_miles;
///
/// // Houston to Sugar Land, TX
/// let miles = distance_miles(29.76328, -95.36327, 29.61968, -95.63495);
/// assert!((miles - 19.09).abs() < 0.05);
/// ```
#[inline]
pub fn distance_miles(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_MILES * c
}
