//! Stormcast Forecast Engine
//!
//! Seeded, weighted, history-dependent daily weather selection for
//! session-based simulations. The crate is pure data in, data out: display,
//! network sync, and effect toggling belong to the host.

pub mod catalog;
pub mod config;
pub mod constants;
pub mod definitions;
pub mod eligibility;
pub mod error;
pub mod location;
pub mod numbers;
pub mod pool;
pub mod progression;
pub mod rng;
pub mod selector;
pub mod session;
pub mod state;
pub mod weather;
pub mod weights;

pub use catalog::{Applicability, Catalog, EffectSet, KindCategory, KindId, KindTag, WeatherKind};
pub use config::{ConfigError, DayZeroConfig, EngineConfig};
pub use definitions::{CombinedDefinition, KindDefinitions, ProgressingDefinition};
pub use eligibility::{legal_base_kinds, legal_kinds, random_base_kinds};
pub use error::ForecastError;
pub use location::Location;
pub use pool::{PoolBuilder, PoolRequest, SamplingPool, WeightFactor, WeightedCandidate};
pub use progression::{ProgressionTimeline, StageTracker};
pub use rng::{CountingRng, day_rng, progression_rng};
pub use selector::{
    Assignment, DayForecast, DayInput, DayPhase, DaySelector, ForecastStatus, Role, SelectionRule,
};
pub use session::ForecastSession;
pub use state::{SessionState, StateSnapshot};
pub use weather::BaseWeather;
pub use weights::{WeightLookup, WeightTable};

/// Trait for loading the engine's documents from a host-specific source.
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the previous → candidate weight table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be loaded or parsed.
    fn load_weight_table(&self) -> Result<WeightTable, Self::Error>;

    /// Load combined and progressing kind definitions.
    ///
    /// # Errors
    ///
    /// Returns an error if the definitions cannot be loaded or parsed.
    fn load_definitions(&self) -> Result<KindDefinitions, Self::Error>;

    /// Load engine tuning.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or parsed.
    fn load_config(&self) -> Result<EngineConfig, Self::Error>;
}

/// Loader serving the embedded default assets.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticAssets;

impl DataLoader for StaticAssets {
    type Error = ConfigError;

    fn load_weight_table(&self) -> Result<WeightTable, Self::Error> {
        Ok(WeightTable::default_table())
    }

    fn load_definitions(&self) -> Result<KindDefinitions, Self::Error> {
        Ok(KindDefinitions::default_definitions())
    }

    fn load_config(&self) -> Result<EngineConfig, Self::Error> {
        Ok(EngineConfig::default())
    }
}

/// Entry point that turns loaded documents into ready sessions.
pub struct ForecastEngine<L>
where
    L: DataLoader,
{
    data_loader: L,
}

impl<L> ForecastEngine<L>
where
    L: DataLoader,
{
    pub const fn new(data_loader: L) -> Self {
        Self { data_loader }
    }

    /// Build a session with a fresh catalog for the given role.
    ///
    /// # Errors
    ///
    /// Returns an error if a document cannot be loaded, fails validation,
    /// or defines a duplicate kind.
    pub fn create_session(&self, role: Role) -> anyhow::Result<ForecastSession> {
        let config = self.data_loader.load_config()?;
        config.validate()?;
        let weights = self.data_loader.load_weight_table()?;
        weights.validate()?;
        let definitions = self.data_loader.load_definitions()?;
        let catalog = Catalog::build(&config, &definitions)?;
        log::debug!(
            "Built catalog with {} kinds ({} enabled)",
            catalog.len(),
            catalog.all().count()
        );
        Ok(ForecastSession::new(catalog, weights, config, role))
    }

    #[must_use]
    pub const fn data_loader(&self) -> &L {
        &self.data_loader
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixtureLoader {
        weights: &'static str,
    }

    impl DataLoader for FixtureLoader {
        type Error = ConfigError;

        fn load_weight_table(&self) -> Result<WeightTable, Self::Error> {
            WeightTable::from_json(self.weights)
        }

        fn load_definitions(&self) -> Result<KindDefinitions, Self::Error> {
            KindDefinitions::from_json(
                r#"{"combined": [{"name": "Wet", "members": ["rainy", "flooded"]}]}"#,
            )
        }

        fn load_config(&self) -> Result<EngineConfig, Self::Error> {
            EngineConfig::from_json(r#"{"seed_offset": 0}"#)
        }
    }

    #[test]
    fn static_assets_build_a_session() {
        let engine = ForecastEngine::new(StaticAssets);
        let session = engine.create_session(Role::Authority).unwrap();
        assert_eq!(session.role(), Role::Authority);
        assert!(session.catalog().by_name("Stormy + Rainy").is_ok());
        assert_eq!(session.config().seed_offset, 31);
    }

    #[test]
    fn custom_loader_feeds_the_session() {
        let engine = ForecastEngine::new(FixtureLoader {
            weights: r#"{"none": {"none": 10, "rainy": 5}}"#,
        });
        let session = engine.create_session(Role::Participant).unwrap();
        assert_eq!(session.config().seed_offset, 0);
        assert_eq!(session.catalog().len(), BaseWeather::ALL.len() + 1);
        assert_eq!(session.weights().row(BaseWeather::None).get(BaseWeather::Rainy), Some(5));
    }

    #[test]
    fn loader_errors_surface_through_anyhow() {
        let engine = ForecastEngine::new(FixtureLoader {
            weights: r#"{"none": {"rainy": -1}}"#,
        });
        let err = engine.create_session(Role::Authority).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }
}
