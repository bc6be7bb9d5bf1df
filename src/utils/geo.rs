const EARTH_RADIUS_KM: f64 = 6371.0;

/// A point on the globe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Coordinate { latitude, longitude }
    }
}

/// Great-circle distance in kilometers, the spherical approximation of the
/// WGS-84 geodesic §4.2 calls for — close enough at the scales this feature
/// cares about (tens to thousands of km) that the ellipsoid correction is
/// not worth the extra dependency.
pub fn distance_km(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_between_identical_points() {
        let p = Coordinate::new(40.7128, -74.0060);
        assert!(distance_km(p, p) < 1e-9);
    }

    #[test]
    fn ny_to_london_is_roughly_correct() {
        let ny = Coordinate::new(40.7128, -74.0060);
        let london = Coordinate::new(51.5074, -0.1278);
        let d = distance_km(ny, london);
        assert!((5400.0..5600.0).contains(&d), "got {d}");
    }
}
