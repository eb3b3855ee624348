//! Great-circle geometry on a spherical Earth.
//!
//! Distances are in meters on a sphere of radius 6,371,000 m.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Mean Earth radius used for all distance computations, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Meters in one statute mile.
pub const METERS_PER_MILE: f64 = 1609.34;

/// A WGS84 latitude/longitude pair in decimal degrees.
///
/// No bounds are enforced on construction; position samples are taken as
/// delivered by the location source. Use [`Coordinates::validate`] where input
/// comes from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Coordinates {
    /// Creates a coordinate pair.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Checks that latitude and longitude are within their valid ranges.
    ///
    /// # Errors
    ///
    /// Returns `LatitudeOutOfRange` or `LongitudeOutOfRange`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ValidationError::LatitudeOutOfRange {
                value: self.latitude,
            });
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ValidationError::LongitudeOutOfRange {
                value: self.longitude,
            });
        }
        Ok(())
    }

    /// Haversine distance to `other`, in meters.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        haversine_distance(self, other)
    }
}

/// Great-circle distance between two points using the haversine formula.
///
/// # Examples
///
/// ```
/// use quicksilver::geo::{haversine_distance, Coordinates};
///
/// let p = Coordinates::new(37.8199, -122.4783);
/// assert_eq!(haversine_distance(&p, &p), 0.0);
/// ```
#[must_use]
pub fn haversine_distance(a: &Coordinates, b: &Coordinates) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Point reached by travelling `distance_meters` from `origin` along the
/// initial `bearing_degrees` (clockwise from north).
#[must_use]
pub fn destination_point(origin: &Coordinates, bearing_degrees: f64, distance_meters: f64) -> Coordinates {
    let delta = distance_meters / EARTH_RADIUS_METERS;
    let theta = bearing_degrees.to_radians();
    let phi1 = origin.latitude.to_radians();
    let lambda1 = origin.longitude.to_radians();

    let sin_phi2 = phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos();
    let phi2 = sin_phi2.asin();
    let y = theta.sin() * delta.sin() * phi1.cos();
    let x = delta.cos() - phi1.sin() * sin_phi2;
    let lambda2 = lambda1 + y.atan2(x);

    // Normalise longitude to [-180, 180).
    let lon = (lambda2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0;
    Coordinates::new(phi2.to_degrees(), lon)
}

/// Converts meters to statute miles.
#[must_use]
pub fn meters_to_miles(meters: f64) -> f64 {
    meters / METERS_PER_MILE
}

/// Distance in miles rounded to one decimal place, as shown to the driver.
#[must_use]
pub fn format_miles(meters: f64) -> String {
    format!("{:.1}", meters_to_miles(meters))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOLDEN_GATE: Coordinates = Coordinates::new(37.8199, -122.4783);

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(haversine_distance(&GOLDEN_GATE, &GOLDEN_GATE), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let other = Coordinates::new(37.8255, -122.3107);
        let ab = haversine_distance(&GOLDEN_GATE, &other);
        let ba = haversine_distance(&other, &GOLDEN_GATE);
        assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn one_degree_of_latitude() {
        let a = Coordinates::new(0.0, 0.0);
        let b = Coordinates::new(1.0, 0.0);
        let d = haversine_distance(&a, &b);
        // 2 * pi * R / 360
        assert!((d - 111_194.93).abs() < 1.0, "got {d}");
    }

    #[test]
    fn distance_grows_monotonically_along_every_bearing() {
        for bearing in [0.0, 45.0, 90.0, 135.0, 180.0, 225.0, 270.0, 315.0] {
            let mut previous = 0.0;
            for step in 1..=40 {
                let p = destination_point(&GOLDEN_GATE, bearing, f64::from(step) * 100.0);
                let d = haversine_distance(&GOLDEN_GATE, &p);
                assert!(d > previous, "bearing {bearing} step {step}: {d} <= {previous}");
                previous = d;
            }
        }
    }

    #[test]
    fn destination_point_round_trips_distance() {
        let p = destination_point(&GOLDEN_GATE, 72.0, 1700.0);
        let d = haversine_distance(&GOLDEN_GATE, &p);
        assert!((d - 1700.0).abs() < 0.01, "got {d}");
    }

    #[test]
    fn miles_are_rounded_to_one_decimal() {
        assert_eq!(format_miles(1700.0), "1.1");
        assert_eq!(format_miles(1600.0), "1.0");
        assert_eq!(format_miles(3200.0), "2.0");
    }

    #[test]
    fn validate_rejects_out_of_range() {
        assert!(Coordinates::new(91.0, 0.0).validate().is_err());
        assert!(Coordinates::new(0.0, -180.5).validate().is_err());
        assert!(GOLDEN_GATE.validate().is_ok());
    }
}
