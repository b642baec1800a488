//! Declarative combined and progressing kind definitions.
use serde::{Deserialize, Serialize};

use crate::catalog::{ProgressionStage, WeatherKind};
use crate::config::ConfigError;
use crate::constants::DEFAULT_WEIGHT_MODIFIER;
use crate::error::ForecastError;
use crate::weather::BaseWeather;

const DEFAULT_KINDS_DATA: &str = include_str!("../assets/kinds.json");

const fn default_enabled() -> bool {
    true
}

const fn default_weight_modifier() -> f32 {
    DEFAULT_WEIGHT_MODIFIER
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedDefinition {
    pub name: String,
    pub members: Vec<BaseWeather>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_weight_modifier")]
    pub weight_modifier: f32,
    /// Falls back to the engine-wide default weight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_weight: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressingDefinition {
    pub name: String,
    pub starting: BaseWeather,
    pub stages: Vec<ProgressionStage>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_weight_modifier")]
    pub weight_modifier: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_weight: Option<i32>,
}

/// Static definition set for the derived kinds of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct KindDefinitions {
    #[serde(default)]
    pub combined: Vec<CombinedDefinition>,
    #[serde(default)]
    pub progressing: Vec<ProgressingDefinition>,
}

impl KindDefinitions {
    /// Load definitions from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or a definition is invalid.
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        let definitions: Self = serde_json::from_str(json_str)?;
        definitions.validate()?;
        Ok(definitions)
    }

    /// Embedded default definitions.
    #[must_use]
    pub fn default_definitions() -> Self {
        serde_json::from_str(DEFAULT_KINDS_DATA).unwrap_or_default()
    }

    /// Check modifiers, member lists, and stage ranges.
    ///
    /// # Errors
    ///
    /// Returns the first invalid definition.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for def in &self.combined {
            check_modifier(&def.name, def.weight_modifier)?;
            if def.members.len() < 2 {
                return Err(invalid(&def.name, "combined kinds need at least two members"));
            }
            if def.members.iter().any(|base| !base.is_random_candidate()) {
                return Err(invalid(&def.name, "members must be real weather conditions"));
            }
        }
        for def in &self.progressing {
            check_modifier(&def.name, def.weight_modifier)?;
            if def.stages.is_empty() {
                return Err(invalid(&def.name, "progressing kinds need at least one stage"));
            }
            for stage in &def.stages {
                if !(0.0..=1.0).contains(&stage.at) {
                    return Err(invalid(&def.name, "stage times must lie within 0.0..=1.0"));
                }
                if !(0.0..=1.0).contains(&stage.chance) {
                    return Err(invalid(&def.name, "stage chances must lie within 0.0..=1.0"));
                }
            }
        }
        Ok(())
    }

    /// Turn every definition into a catalog entry, combined kinds first.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when validation fails.
    pub fn to_kinds(&self, default_weight: i32) -> Result<Vec<WeatherKind>, ForecastError> {
        self.validate()
            .map_err(|err| ForecastError::InvalidConfiguration(err.to_string()))?;
        let combined = self.combined.iter().map(|def| {
            WeatherKind::combined(
                def.name.clone(),
                def.members.iter().copied(),
                def.default_weight.unwrap_or(default_weight),
                def.weight_modifier,
            )
            .with_enabled(def.enabled)
        });
        let progressing = self.progressing.iter().map(|def| {
            WeatherKind::progressing(
                def.name.clone(),
                def.starting,
                def.stages.clone(),
                def.default_weight.unwrap_or(default_weight),
                def.weight_modifier,
            )
            .with_enabled(def.enabled)
        });
        Ok(combined.chain(progressing).collect())
    }
}

fn check_modifier(name: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidModifier {
            name: name.to_string(),
            value,
        })
    }
}

fn invalid(name: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidDefinition {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
