//! Engine tuning loaded from JSON with per-field defaults.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DAY_ZERO_BASELINE_LOCATIONS, DAY_ZERO_CLEAR_LOCATIONS, DAY_ZERO_LOCATIONS_PER_EXTRA,
    DEFAULT_DUST_CHANCE_PERCENT, DEFAULT_ECLIPSE_CHANCE_PERCENT, DEFAULT_KIND_WEIGHT,
    DEFAULT_MAX_INTENSITY, DEFAULT_SEED_OFFSET, PERCENT_ROLL_SPAN,
};
use crate::weather::BaseWeather;

/// Errors raised when configuration documents are malformed or out of range.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} must be a percentage between 0 and 100 (got {value})")]
    PercentOutOfRange { field: &'static str, value: u8 },
    #[error("max_intensity must be finite and non-negative (got {value})")]
    InvalidIntensity { value: f32 },
    #[error("day_zero.locations_per_extra must be at least 1")]
    ZeroExtraStep,
    #[error("weight for {candidate} after {previous} must not be negative (got {weight})")]
    NegativeWeight {
        previous: BaseWeather,
        candidate: BaseWeather,
        weight: i32,
    },
    #[error("{name}: weight modifier must be finite and non-negative (got {value})")]
    InvalidModifier { name: String, value: f32 },
    #[error("{name}: {reason}")]
    InvalidDefinition { name: String, reason: String },
}

/// Day-zero exclusion rule parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayZeroConfig {
    /// Locations that never get weather on the first day.
    #[serde(default = "DayZeroConfig::default_clear_locations")]
    pub clear_locations: Vec<String>,
    /// Location count above which extra clear locations are drawn.
    #[serde(default = "DayZeroConfig::default_baseline_location_count")]
    pub baseline_location_count: usize,
    /// One extra clear location per this many locations above the baseline.
    #[serde(default = "DayZeroConfig::default_locations_per_extra")]
    pub locations_per_extra: usize,
}

impl DayZeroConfig {
    fn default_clear_locations() -> Vec<String> {
        DAY_ZERO_CLEAR_LOCATIONS
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    const fn default_baseline_location_count() -> usize {
        DAY_ZERO_BASELINE_LOCATIONS
    }

    const fn default_locations_per_extra() -> usize {
        DAY_ZERO_LOCATIONS_PER_EXTRA
    }

    /// Number of randomly drawn clear locations for a session of `location_count`.
    ///
    /// Zero at or below the baseline; above it, one per full step plus one more.
    #[must_use]
    pub fn extra_clear_count(&self, location_count: usize) -> usize {
        if location_count <= self.baseline_location_count || self.locations_per_extra == 0 {
            return 0;
        }
        (location_count - self.baseline_location_count) / self.locations_per_extra + 1
    }
}

impl Default for DayZeroConfig {
    fn default() -> Self {
        Self {
            clear_locations: Self::default_clear_locations(),
            baseline_location_count: Self::default_baseline_location_count(),
            locations_per_extra: Self::default_locations_per_extra(),
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Scale the none weight down by how many alternatives a location has.
    #[serde(default = "EngineConfig::default_scale_down_clear_weather")]
    pub scale_down_clear_weather: bool,
    /// Upper clamp for the intensity scalar.
    #[serde(default = "EngineConfig::default_max_intensity")]
    pub max_intensity: f32,
    /// Added to the session map seed before deriving the day stream.
    #[serde(default = "EngineConfig::default_seed_offset")]
    pub seed_offset: i64,
    #[serde(default = "EngineConfig::default_eclipse_chance_percent")]
    pub eclipse_chance_percent: u8,
    #[serde(default = "EngineConfig::default_dust_chance_percent")]
    pub dust_chance_percent: u8,
    /// Default weight of every normal kind.
    #[serde(default = "EngineConfig::default_default_weight")]
    pub default_weight: i32,
    #[serde(default)]
    pub day_zero: DayZeroConfig,
}

impl EngineConfig {
    const fn default_scale_down_clear_weather() -> bool {
        true
    }

    const fn default_max_intensity() -> f32 {
        DEFAULT_MAX_INTENSITY
    }

    const fn default_seed_offset() -> i64 {
        DEFAULT_SEED_OFFSET
    }

    const fn default_eclipse_chance_percent() -> u8 {
        DEFAULT_ECLIPSE_CHANCE_PERCENT
    }

    const fn default_dust_chance_percent() -> u8 {
        DEFAULT_DUST_CHANCE_PERCENT
    }

    const fn default_default_weight() -> i32 {
        DEFAULT_KIND_WEIGHT
    }

    /// Load configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or if validation fails.
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("eclipse_chance_percent", self.eclipse_chance_percent),
            ("dust_chance_percent", self.dust_chance_percent),
        ] {
            if value > PERCENT_ROLL_SPAN {
                return Err(ConfigError::PercentOutOfRange { field, value });
            }
        }
        if !self.max_intensity.is_finite() || self.max_intensity < 0.0 {
            return Err(ConfigError::InvalidIntensity {
                value: self.max_intensity,
            });
        }
        if self.day_zero.locations_per_extra == 0 {
            return Err(ConfigError::ZeroExtraStep);
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scale_down_clear_weather: Self::default_scale_down_clear_weather(),
            max_intensity: Self::default_max_intensity(),
            seed_offset: Self::default_seed_offset(),
            eclipse_chance_percent: Self::default_eclipse_chance_percent(),
            dust_chance_percent: Self::default_dust_chance_percent(),
            default_weight: Self::default_default_weight(),
            day_zero: DayZeroConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = EngineConfig::from_json("{}").unwrap();
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.seed_offset, 31);
        assert_eq!(cfg.eclipse_chance_percent, 5);
        assert_eq!(cfg.dust_chance_percent, 25);
        assert_eq!(cfg.day_zero.clear_locations.len(), 2);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = EngineConfig::from_json(r#"{"dust_chance_percent": 140}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::PercentOutOfRange {
                field: "dust_chance_percent",
                value: 140
            }
        ));

        let err = EngineConfig::from_json(r#"{"max_intensity": -0.5}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidIntensity { .. }));

        let err =
            EngineConfig::from_json(r#"{"day_zero": {"locations_per_extra": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroExtraStep));

        assert!(matches!(
            EngineConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn extra_clear_count_follows_step_rule() {
        let day_zero = DayZeroConfig::default();
        assert_eq!(day_zero.extra_clear_count(5), 0);
        assert_eq!(day_zero.extra_clear_count(9), 0);
        assert_eq!(day_zero.extra_clear_count(10), 1);
        assert_eq!(day_zero.extra_clear_count(12), 1);
        assert_eq!(day_zero.extra_clear_count(13), 2);
        assert_eq!(day_zero.extra_clear_count(17), 3);
    }
}
