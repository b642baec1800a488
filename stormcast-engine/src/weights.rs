//! History-dependent weight table: previous condition → candidate → weight.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::ConfigError;
use crate::weather::BaseWeather;

const DEFAULT_WEIGHTS_DATA: &str = include_str!("../assets/weights.json");

/// Candidate weights for a single previous condition.
pub type WeightRow = HashMap<BaseWeather, i32>;

/// Weight table keyed by yesterday's base kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct WeightTable {
    rows: HashMap<BaseWeather, WeightRow>,
}

impl WeightTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a weight table from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or a weight is negative.
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        let table: Self = serde_json::from_str(json_str)?;
        table.validate()?;
        Ok(table)
    }

    /// Embedded default table.
    #[must_use]
    pub fn default_table() -> Self {
        serde_json::from_str(DEFAULT_WEIGHTS_DATA).unwrap_or_default()
    }

    /// Reject negative weights.
    ///
    /// # Errors
    ///
    /// Returns the first negative entry found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (previous, row) in &self.rows {
            for (candidate, weight) in row {
                if *weight < 0 {
                    return Err(ConfigError::NegativeWeight {
                        previous: *previous,
                        candidate: *candidate,
                        weight: *weight,
                    });
                }
            }
        }
        Ok(())
    }

    /// Set a single entry, creating the row if needed.
    pub fn set(&mut self, previous: BaseWeather, candidate: BaseWeather, weight: i32) {
        self.rows
            .entry(previous)
            .or_default()
            .insert(candidate, weight);
    }

    /// Builder form of [`WeightTable::set`].
    #[must_use]
    pub fn with(mut self, previous: BaseWeather, candidate: BaseWeather, weight: i32) -> Self {
        self.set(previous, candidate, weight);
        self
    }

    /// Weights to use when yesterday's condition was `previous`.
    ///
    /// A missing row yields an empty lookup; every candidate then falls back
    /// to its kind's default weight.
    #[must_use]
    pub fn row(&self, previous: BaseWeather) -> WeightLookup<'_> {
        WeightLookup {
            row: self.rows.get(&previous),
        }
    }
}

/// Borrowed view over one row of a [`WeightTable`].
#[derive(Debug, Clone, Copy)]
pub struct WeightLookup<'a> {
    row: Option<&'a WeightRow>,
}

impl WeightLookup<'_> {
    #[must_use]
    pub fn get(&self, candidate: BaseWeather) -> Option<i32> {
        self.row.and_then(|row| row.get(&candidate).copied())
    }

    /// Configured weight, or `default` when the entry is absent.
    #[must_use]
    pub fn weight_or(&self, candidate: BaseWeather, default: i32) -> i32 {
        self.get(candidate).unwrap_or(default)
    }

    /// Sum of every weight in the row.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.row
            .map_or(0, |row| row.values().map(|w| i64::from(*w)).sum())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row.is_none_or(HashMap::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_falls_back_to_default() {
        let table = WeightTable::new()
            .with(BaseWeather::None, BaseWeather::Rainy, 40)
            .with(BaseWeather::None, BaseWeather::None, 60);
        let row = table.row(BaseWeather::None);
        assert_eq!(row.weight_or(BaseWeather::Rainy, 100), 40);
        assert_eq!(row.weight_or(BaseWeather::Foggy, 100), 100);
        assert_eq!(row.total(), 100);

        let missing = table.row(BaseWeather::Stormy);
        assert!(missing.is_empty());
        assert_eq!(missing.total(), 0);
        assert_eq!(missing.weight_or(BaseWeather::Rainy, 7), 7);
    }

    #[test]
    fn json_parses_and_rejects_negative_weights() {
        let table = WeightTable::from_json(r#"{"rainy": {"none": 10, "stormy": 30}}"#).unwrap();
        assert_eq!(table.row(BaseWeather::Rainy).get(BaseWeather::Stormy), Some(30));

        let err = WeightTable::from_json(r#"{"none": {"foggy": -3}}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NegativeWeight {
                previous: BaseWeather::None,
                candidate: BaseWeather::Foggy,
                weight: -3
            }
        ));
    }

    #[test]
    fn default_table_covers_every_previous_kind() {
        let table = WeightTable::default_table();
        assert!(table.validate().is_ok());
        for previous in BaseWeather::ALL
            .into_iter()
            .filter(|w| !w.is_dust())
        {
            assert!(
                !table.row(previous).is_empty(),
                "missing default row for {previous}"
            );
        }
    }
}
