//! Great-circle distance and bearing over WGS-84 coordinates.
//!
//! Points are `geo::Point<f64>` with x = longitude and y = latitude, in degrees.

use geo::Point;

use crate::models::Compass;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two points, in kilometers.
pub fn distance_km(a: Point<f64>, b: Point<f64>) -> f64 {
    let phi1 = a.y().to_radians();
    let phi2 = b.y().to_radians();
    let d_phi = (b.y() - a.y()).to_radians();
    let d_lambda = (b.x() - a.x()).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);

    // Rounding can push h a hair above 1 for antipodal points.
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Initial bearing from `from` to `to`, in degrees within `[0, 360)`.
pub fn bearing_deg(from: Point<f64>, to: Point<f64>) -> f64 {
    let phi1 = from.y().to_radians();
    let phi2 = to.y().to_radians();
    let d_lambda = (to.x() - from.x()).to_radians();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();

    normalize_deg(y.atan2(x).to_degrees())
}

/// Wraps any finite angle into `[0, 360)`.
pub fn normalize_deg(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Rounds to 3 decimal places.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

impl Compass {
    /// Maps a bearing in `[0, 360)` to its compass quartile.
    ///
    /// Lower bounds are inclusive: 45 is EAST, 135 SOUTH, 225 WEST, 315 NORTH.
    pub fn from_bearing(bearing: f64) -> Self {
        debug_assert!(
            (0.0..360.0).contains(&bearing),
            "bearing {bearing} outside [0, 360)"
        );
        let bearing = normalize_deg(bearing);
        if bearing < 45.0 || bearing >= 315.0 {
            Compass::North
        } else if bearing < 135.0 {
            Compass::East
        } else if bearing < 225.0 {
            Compass::South
        } else {
            Compass::West
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::Fake;

    const PUNE: (f64, f64) = (73.8567, 18.5204);
    const MUMBAI: (f64, f64) = (72.8777, 19.0760);

    fn pt((lon, lat): (f64, f64)) -> Point<f64> {
        Point::new(lon, lat)
    }

    fn random_point() -> Point<f64> {
        Point::new((-180.0..180.0).fake::<f64>(), (-90.0..90.0).fake::<f64>())
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        assert_eq!(distance_km(pt(PUNE), pt(PUNE)), 0.0);
        for _ in 0..100 {
            let p = random_point();
            assert_eq!(distance_km(p, p), 0.0);
        }
    }

    #[test]
    fn test_distance_is_symmetric() {
        for _ in 0..100 {
            let a = random_point();
            let b = random_point();
            let ab = distance_km(a, b);
            let ba = distance_km(b, a);
            assert!((ab - ba).abs() < 1e-9, "{ab} != {ba}");
        }
    }

    #[test]
    fn test_distance_pune_mumbai() {
        let d = distance_km(pt(PUNE), pt(MUMBAI));
        assert!((d - 120.1).abs() < 1.0, "got {d}");
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        let d = distance_km(Point::new(0.0, 0.0), Point::new(0.0, 1.0));
        let expected = EARTH_RADIUS_KM * 1f64.to_radians();
        assert!((d - expected).abs() < 1e-9);
    }

    #[test]
    fn test_distance_antipodal() {
        let d = distance_km(Point::new(0.0, 0.0), Point::new(180.0, 0.0));
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = Point::new(0.0, 0.0);
        assert!((bearing_deg(origin, Point::new(0.0, 1.0)) - 0.0).abs() < 1e-9);
        assert!((bearing_deg(origin, Point::new(1.0, 0.0)) - 90.0).abs() < 1e-9);
        assert!((bearing_deg(origin, Point::new(0.0, -1.0)) - 180.0).abs() < 1e-9);
        assert!((bearing_deg(origin, Point::new(-1.0, 0.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_bearing_in_range() {
        for _ in 0..200 {
            let b = bearing_deg(random_point(), random_point());
            assert!((0.0..360.0).contains(&b), "bearing {b}");
        }
    }

    #[test]
    fn test_normalize_deg() {
        assert_eq!(normalize_deg(0.0), 0.0);
        assert_eq!(normalize_deg(360.0), 0.0);
        assert_eq!(normalize_deg(-90.0), 270.0);
        assert_eq!(normalize_deg(725.0), 5.0);
        assert!((0.0..360.0).contains(&normalize_deg(-1e-20)));
    }

    #[test]
    fn test_round3() {
        assert_eq!(round3(0.4), 0.4);
        assert_eq!(round3(1.23456), 1.235);
        assert_eq!(round3(0.0004), 0.0);
    }

    #[test]
    fn test_compass_boundaries() {
        assert_eq!(Compass::from_bearing(0.0), Compass::North);
        assert_eq!(Compass::from_bearing(44.999), Compass::North);
        assert_eq!(Compass::from_bearing(45.0), Compass::East);
        assert_eq!(Compass::from_bearing(134.999), Compass::East);
        assert_eq!(Compass::from_bearing(135.0), Compass::South);
        assert_eq!(Compass::from_bearing(224.999), Compass::South);
        assert_eq!(Compass::from_bearing(225.0), Compass::West);
        assert_eq!(Compass::from_bearing(314.999), Compass::West);
        assert_eq!(Compass::from_bearing(315.0), Compass::North);
        assert_eq!(Compass::from_bearing(359.999), Compass::North);
    }

    #[test]
    fn test_compass_partitions_full_circle() {
        let mut counts = std::collections::HashMap::new();
        for tenth in 0..3600 {
            let bearing = tenth as f64 / 10.0;
            *counts.entry(Compass::from_bearing(bearing)).or_insert(0) += 1;
        }
        assert_eq!(counts.len(), 4);
        assert!(counts.values().all(|&c| c == 900));
    }
}
