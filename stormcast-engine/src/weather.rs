//! Base weather conditions recognised natively by the simulation.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Underlying condition a location can host.
///
/// `None` is the explicit "no weather" kind. `DustClouds` is a low-weight
/// secondary condition that never enters a weighted pool directly; it only
/// replaces a drawn `None` on locations that list it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum BaseWeather {
    #[default]
    None,
    DustClouds,
    Rainy,
    Stormy,
    Foggy,
    Flooded,
    Eclipsed,
}

impl BaseWeather {
    /// Every base kind in catalog registration order.
    pub const ALL: [Self; 7] = [
        Self::None,
        Self::DustClouds,
        Self::Rainy,
        Self::Stormy,
        Self::Foggy,
        Self::Flooded,
        Self::Eclipsed,
    ];

    #[must_use]
    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }

    #[must_use]
    pub const fn is_dust(self) -> bool {
        matches!(self, Self::DustClouds)
    }

    /// Whether the kind can be drawn as a "real" condition (not none, not dust).
    #[must_use]
    pub const fn is_random_candidate(self) -> bool {
        !matches!(self, Self::None | Self::DustClouds)
    }

    /// Dust carried over from yesterday counts as a clear day for weight lookup.
    #[must_use]
    pub const fn normalized_previous(self) -> Self {
        match self {
            Self::DustClouds => Self::None,
            other => other,
        }
    }

    /// Display name, also used as the catalog name of the matching normal kind.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::DustClouds => "DustClouds",
            Self::Rainy => "Rainy",
            Self::Stormy => "Stormy",
            Self::Foggy => "Foggy",
            Self::Flooded => "Flooded",
            Self::Eclipsed => "Eclipsed",
        }
    }
}

impl fmt::Display for BaseWeather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dust_normalizes_to_none_for_previous_lookup() {
        assert_eq!(
            BaseWeather::DustClouds.normalized_previous(),
            BaseWeather::None
        );
        assert_eq!(BaseWeather::Rainy.normalized_previous(), BaseWeather::Rainy);
    }

    #[test]
    fn random_candidates_exclude_none_and_dust() {
        let candidates: Vec<_> = BaseWeather::ALL
            .into_iter()
            .filter(|w| w.is_random_candidate())
            .collect();
        assert_eq!(candidates.len(), 5);
        assert!(!candidates.contains(&BaseWeather::None));
        assert!(!candidates.contains(&BaseWeather::DustClouds));
    }

    #[test]
    fn serde_uses_snake_case_names() {
        let json = serde_json::to_string(&BaseWeather::DustClouds).unwrap();
        assert_eq!(json, "\"dust_clouds\"");
        let parsed: BaseWeather = serde_json::from_str("\"eclipsed\"").unwrap();
        assert_eq!(parsed, BaseWeather::Eclipsed);
    }
}
