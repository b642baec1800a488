use serde::{Deserialize, Serialize};

use crate::eligibility::legal_base_kinds;
use crate::weather::BaseWeather;

/// A place that receives one weather condition per day.
///
/// Supplied by the host each session. Only `forced` is expected to change
/// while a session runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    /// Base kinds the location's static configuration allows, in declared order.
    #[serde(default)]
    pub random_weathers: Vec<BaseWeather>,
    /// Host-forced condition that bypasses the weighted draw.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forced: Option<BaseWeather>,
    /// Externally derived flag: the location never gets random weather.
    #[serde(default)]
    pub no_random_weather: bool,
}

impl Location {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        random_weathers: impl IntoIterator<Item = BaseWeather>,
    ) -> Self {
        Self {
            name: name.into(),
            random_weathers: random_weathers.into_iter().collect(),
            forced: None,
            no_random_weather: false,
        }
    }

    #[must_use]
    pub const fn with_forced(mut self, forced: BaseWeather) -> Self {
        self.forced = Some(forced);
        self
    }

    #[must_use]
    pub const fn without_random_weather(mut self) -> Self {
        self.no_random_weather = true;
        self
    }

    /// Whether `base` is in the location's legal base set.
    #[must_use]
    pub fn allows(&self, base: BaseWeather) -> bool {
        legal_base_kinds(self).contains(&base)
    }

    /// Whether a drawn none may be swapped for dust clouds here.
    #[must_use]
    pub fn can_be_dust(&self) -> bool {
        !self.no_random_weather && self.random_weathers.contains(&BaseWeather::DustClouds)
    }
}
