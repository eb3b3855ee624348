//! Monitor configuration.
//!
//! Every key is optional; missing keys take the defaults below. Files are
//! TOML:
//!
//! ```toml
//! cooldown_ms = 3600000
//! log_level = "debug"
//!
//! [band]
//! min_meters = 1600.0
//! max_meters = 3200.0
//!
//! [watch]
//! maximum_age_ms = 30000
//! timeout_ms = 27000
//! ```

use std::path::Path;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::clock::SystemClock;
use crate::error::{QuickSilverError, QuickSilverResult, ValidationError};
use crate::suppression::DEFAULT_COOLDOWN_MS;

/// Predictive "toll ahead" band, in meters from the toll point center.
///
/// Both bounds are inclusive. A point is only in the band when it is also
/// outside its own geofence radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityBand {
    /// Inner bound (about one mile).
    pub min_meters: f64,
    /// Outer bound (about two miles).
    pub max_meters: f64,
}

impl Default for ProximityBand {
    fn default() -> Self {
        Self {
            min_meters: 1600.0,
            max_meters: 3200.0,
        }
    }
}

impl ProximityBand {
    /// True if `distance` is within `[min_meters, max_meters]`.
    #[must_use]
    pub fn contains(&self, distance: f64) -> bool {
        distance >= self.min_meters && distance <= self.max_meters
    }
}

/// Location acquisition settings handed to the position source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchOptions {
    /// Oldest acceptable sample age.
    pub maximum_age_ms: u64,
    /// Silence after which a missing fix is reported.
    pub timeout_ms: u64,
    /// Request GPS-grade accuracy.
    pub enable_high_accuracy: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            maximum_age_ms: 30_000,
            timeout_ms: 27_000,
            enable_high_accuracy: true,
        }
    }
}

/// Configuration for the proximity monitor and its session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Minimum time between alerts of one kind for one toll point.
    pub cooldown_ms: i64,
    /// Predictive band.
    pub band: ProximityBand,
    /// Location acquisition settings.
    pub watch: WatchOptions,
    /// Capacity of the incoming sample queue.
    pub sample_queue_capacity: usize,
    /// Capacity of the emitted action stream.
    pub action_queue_capacity: usize,
    /// Fixed local UTC offset in minutes; `None` uses host local time.
    pub utc_offset_minutes: Option<i32>,
    /// Log level for binaries embedding the monitor.
    pub log_level: Option<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            band: ProximityBand::default(),
            watch: WatchOptions::default(),
            sample_queue_capacity: 256,
            action_queue_capacity: 1024,
            utc_offset_minutes: None,
            log_level: Some("info".to_string()),
        }
    }
}

impl MonitorConfig {
    /// Loads and validates a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns `QuickSilverError::Io` if the file cannot be read and a
    /// validation error if it cannot be parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> QuickSilverResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| QuickSilverError::io(path, e))?;
        Ok(Self::from_toml_str(&text)?)
    }

    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` on parse or validation failure.
    pub fn from_toml_str(text: &str) -> Result<Self, ValidationError> {
        let config: Self = toml::from_str(text).map_err(|e| ValidationError::InvalidConfig {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks internal consistency.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.cooldown_ms < 0 {
            return Err(ValidationError::InvalidConfig {
                reason: format!("cooldown_ms must not be negative, got {}", self.cooldown_ms),
            });
        }
        let band = self.band;
        if !(band.min_meters >= 0.0) || !(band.min_meters < band.max_meters) || !band.max_meters.is_finite() {
            return Err(ValidationError::InvalidBand {
                min_meters: band.min_meters,
                max_meters: band.max_meters,
            });
        }
        if self.sample_queue_capacity == 0 || self.action_queue_capacity == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "queue capacities must be at least 1".to_string(),
            });
        }
        if self.watch.timeout_ms == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "watch.timeout_ms must be at least 1".to_string(),
            });
        }
        if self.local_offset().is_none() && self.utc_offset_minutes.is_some() {
            return Err(ValidationError::InvalidConfig {
                reason: format!("utc_offset_minutes out of range: {:?}", self.utc_offset_minutes),
            });
        }
        Ok(())
    }

    /// The configured fixed offset, if any and valid.
    #[must_use]
    pub fn local_offset(&self) -> Option<FixedOffset> {
        self.utc_offset_minutes
            .and_then(|m| m.checked_mul(60))
            .and_then(FixedOffset::east_opt)
    }

    /// A system clock honoring `utc_offset_minutes`.
    #[must_use]
    pub fn system_clock(&self) -> SystemClock {
        self.local_offset()
            .map_or_else(SystemClock::local, SystemClock::with_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_constants() {
        let c = MonitorConfig::default();
        assert_eq!(c.cooldown_ms, 3_600_000);
        assert_eq!(c.band.min_meters, 1600.0);
        assert_eq!(c.band.max_meters, 3200.0);
        assert_eq!(c.watch.maximum_age_ms, 30_000);
        assert_eq!(c.watch.timeout_ms, 27_000);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(MonitorConfig::from_toml_str("").unwrap(), MonitorConfig::default());
    }

    #[test]
    fn partial_toml_overrides() {
        let c = MonitorConfig::from_toml_str(
            r#"
            cooldown_ms = 60000
            utc_offset_minutes = -420

            [band]
            max_meters = 4000.0
            "#,
        )
        .unwrap();
        assert_eq!(c.cooldown_ms, 60_000);
        assert_eq!(c.band.min_meters, 1600.0);
        assert_eq!(c.band.max_meters, 4000.0);
        assert_eq!(c.local_offset(), FixedOffset::west_opt(7 * 3600));
    }

    #[test]
    fn inverted_band_rejected() {
        let err = MonitorConfig::from_toml_str("[band]\nmin_meters = 5000.0\n").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidBand { .. }));
    }

    #[test]
    fn bad_offset_rejected() {
        let err = MonitorConfig::from_toml_str("utc_offset_minutes = 100000").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidConfig { .. }));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "sample_queue_capacity = 8").unwrap();
        drop(f);

        let c = MonitorConfig::load(&path).unwrap();
        assert_eq!(c.sample_queue_capacity, 8);

        let missing = MonitorConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(missing.is_io(), "{missing}");
        assert!(missing.to_string().contains("missing.toml"));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "cooldown_ms = \"soon\"").unwrap();
        assert!(MonitorConfig::load(&bad).unwrap_err().is_validation());
    }

    #[test]
    fn band_bounds_are_inclusive() {
        let band = ProximityBand::default();
        assert!(band.contains(1600.0));
        assert!(band.contains(3200.0));
        assert!(!band.contains(1599.9));
        assert!(!band.contains(3200.1));
    }
}
