//! Toll points and the compiled-in toll catalog.
//!
//! Toll points are static reference data: they are never created, updated or
//! destroyed while a monitor is running.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::geo::Coordinates;

/// Stable identifier of a toll point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TollPointId(String);

impl TollPointId {
    /// Wraps an identifier string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TollPointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TollPointId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A named toll location with a circular geofence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TollPoint {
    /// Stable identifier.
    pub id: TollPointId,
    /// Display name ("Golden Gate Bridge").
    pub name: String,
    /// Road the toll sits on.
    pub road: String,
    /// Geofence center.
    pub location: Coordinates,
    /// Toll amount in US cents.
    pub amount_cents: u32,
    /// Geofence radius in meters.
    pub radius_meters: f64,
}

impl TollPoint {
    /// Creates a toll point.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        road: impl Into<String>,
        location: Coordinates,
        amount_cents: u32,
        radius_meters: f64,
    ) -> Self {
        Self {
            id: TollPointId::new(id),
            name: name.into(),
            road: road.into(),
            location,
            amount_cents,
            radius_meters,
        }
    }

    /// Toll amount formatted as dollars, e.g. `$8.75`.
    #[must_use]
    pub fn amount_display(&self) -> String {
        format_usd(self.amount_cents)
    }

    /// Checks coordinates and radius.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for out-of-range coordinates or a
    /// non-positive radius.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.as_str().trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "id".to_string(),
            });
        }
        self.location.validate()?;
        if !(self.radius_meters > 0.0) || !self.radius_meters.is_finite() {
            return Err(ValidationError::InvalidRadius {
                value: self.radius_meters,
            });
        }
        Ok(())
    }
}

/// Formats a cent amount as dollars with two decimals.
#[must_use]
pub fn format_usd(cents: u32) -> String {
    format!("${}.{:02}", cents / 100, cents % 100)
}

/// Immutable, validated set of toll points.
#[derive(Debug, Clone, PartialEq)]
pub struct TollCatalog {
    points: Vec<TollPoint>,
}

impl TollCatalog {
    /// Builds a catalog, validating every point and rejecting duplicate ids.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure encountered.
    pub fn new(points: Vec<TollPoint>) -> Result<Self, ValidationError> {
        let mut seen = HashSet::with_capacity(points.len());
        for p in &points {
            p.validate()?;
            if !seen.insert(p.id.clone()) {
                return Err(ValidationError::DuplicateTollPoint {
                    id: p.id.to_string(),
                });
            }
        }
        Ok(Self { points })
    }

    /// The toll points shipped with the application.
    #[must_use]
    pub fn builtin() -> Self {
        let points = BUILTIN
            .iter()
            .map(|&(id, name, road, lat, lon, cents, radius)| {
                TollPoint::new(id, name, road, Coordinates::new(lat, lon), cents, radius)
            })
            .collect();
        Self { points }
    }

    /// All toll points, in catalog order.
    #[must_use]
    pub fn points(&self) -> &[TollPoint] {
        &self.points
    }

    /// Looks up a toll point by id.
    #[must_use]
    pub fn get(&self, id: &TollPointId) -> Option<&TollPoint> {
        self.points.iter().find(|p| &p.id == id)
    }

    /// Number of toll points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the catalog has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

type BuiltinRow = (&'static str, &'static str, &'static str, f64, f64, u32, f64);

const BUILTIN: &[BuiltinRow] = &[
    ("golden-gate", "Golden Gate Bridge", "US-101", 37.8077, -122.4750, 875, 500.0),
    ("bay-bridge", "Bay Bridge Toll Plaza", "I-80", 37.8255, -122.3107, 800, 400.0),
    ("richmond-san-rafael", "Richmond-San Rafael Bridge", "I-580", 37.9346, -122.4094, 800, 400.0),
    ("san-mateo", "San Mateo-Hayward Bridge", "SR-92", 37.6009, -122.1594, 800, 400.0),
    ("dumbarton", "Dumbarton Bridge", "SR-84", 37.5086, -122.1186, 800, 400.0),
    ("carquinez", "Carquinez Bridge", "I-80", 38.0594, -122.2262, 800, 350.0),
    ("benicia-martinez", "Benicia-Martinez Bridge", "I-680", 38.0380, -122.1224, 800, 350.0),
    ("antioch", "Antioch Bridge", "SR-160", 38.0183, -121.7525, 800, 300.0),
    ("george-washington", "George Washington Bridge", "I-95", 40.8517, -73.9527, 1606, 600.0),
    ("lincoln-tunnel", "Lincoln Tunnel", "NJ-495", 40.7620, -74.0110, 1606, 300.0),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = TollCatalog::builtin();
        assert!(!catalog.is_empty());
        let rebuilt = TollCatalog::new(catalog.points().to_vec()).unwrap();
        assert_eq!(rebuilt.len(), catalog.len());
    }

    #[test]
    fn lookup_by_id() {
        let catalog = TollCatalog::builtin();
        let p = catalog.get(&TollPointId::from("golden-gate")).unwrap();
        assert_eq!(p.road, "US-101");
        assert!(catalog.get(&TollPointId::from("nope")).is_none());
    }

    #[test]
    fn rejects_duplicates_and_bad_radius() {
        let p = TollPoint::new("a", "A", "R", Coordinates::new(1.0, 1.0), 100, 100.0);
        let err = TollCatalog::new(vec![p.clone(), p.clone()]).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateTollPoint { .. }));

        let mut bad = p;
        bad.radius_meters = 0.0;
        let err = TollCatalog::new(vec![bad]).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidRadius { .. }));
    }

    #[test]
    fn usd_formatting() {
        assert_eq!(format_usd(875), "$8.75");
        assert_eq!(format_usd(1606), "$16.06");
        assert_eq!(format_usd(5), "$0.05");
    }
}
