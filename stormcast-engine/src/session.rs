//! Session facade that owns the catalog and drives the selector.
use rand::RngCore;
use std::collections::BTreeMap;

use crate::catalog::{Catalog, EffectSet, KindCategory, KindId, WeatherKind};
use crate::config::EngineConfig;
use crate::error::ForecastError;
use crate::location::Location;
use crate::progression::{ProgressionTimeline, StageTracker};
use crate::selector::{DayForecast, DayInput, DaySelector, ForecastStatus, Role};
use crate::state::SessionState;
use crate::weather::BaseWeather;
use crate::weights::WeightTable;

/// Owned engine context for one session: catalog, weights, tuning, and state.
#[derive(Debug)]
pub struct ForecastSession {
    catalog: Catalog,
    weights: WeightTable,
    config: EngineConfig,
    role: Role,
    state: SessionState,
}

impl ForecastSession {
    #[must_use]
    pub fn new(catalog: Catalog, weights: WeightTable, config: EngineConfig, role: Role) -> Self {
        Self {
            catalog,
            weights,
            config,
            role,
            state: SessionState::new(),
        }
    }

    /// Run the day selector and refresh the local kind.
    ///
    /// # Errors
    ///
    /// Propagates catalog defects reported by the selector.
    pub fn advance_day(&mut self, input: &DayInput<'_>) -> Result<DayForecast, ForecastError> {
        let forecast = DaySelector::new(&self.catalog, &self.weights, &self.config).select(
            &mut self.state,
            self.role,
            input,
        )?;
        if forecast.status == ForecastStatus::Selected {
            self.refresh_local(true);
        }
        Ok(forecast)
    }

    /// Set the vantage point whose kind drives effects and stage tracking.
    ///
    /// Re-selecting the current location keeps an in-progress stage.
    pub fn set_active_location(&mut self, location: Option<&str>) {
        let moved = self.state.active_location() != location;
        self.state
            .set_active_location(location.map(ToString::to_string));
        self.refresh_local(moved);
    }

    /// Assign a kind to the active location, bypassing the weighted draw.
    ///
    /// Returns the base kinds whose effects have to be switched on.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveLocation` without an active location, and
    /// `KindNotFound`/`AmbiguousKind` when the name does not resolve.
    pub fn force_weather(&mut self, kind_name: &str) -> Result<EffectSet, ForecastError> {
        let location = self
            .state
            .active_location()
            .map(ToString::to_string)
            .ok_or(ForecastError::NoActiveLocation)?;
        let id = self.catalog.find(kind_name)?;
        let kind = self.catalog.resolve(id)?;
        let effects = kind.effects();
        log::info!("{location}: weather forced to {}", kind.name());

        self.state.record(&location, id);
        self.refresh_local(true);
        Ok(effects)
    }

    /// Install a forecast received from the authority for `day_index`.
    ///
    /// Every kind name is resolved before anything changes. A forecast for a
    /// new day first moves today's kinds into yesterday's, as the authority
    /// does before selecting. Locations missing from `forecast` keep their
    /// current kind.
    ///
    /// # Errors
    ///
    /// Returns `KindNotFound`/`AmbiguousKind` for a name the catalog cannot
    /// resolve. The state is left untouched in that case.
    pub fn apply_remote(
        &mut self,
        day_index: u32,
        locations: &[Location],
        forecast: &BTreeMap<String, String>,
    ) -> Result<usize, ForecastError> {
        let mut resolved = Vec::with_capacity(locations.len());
        for location in locations {
            let id = match forecast.get(&location.name) {
                Some(kind_name) => self.catalog.find(kind_name)?,
                None => {
                    log::warn!(
                        "Weather data for {} not found in remote forecast, skipping",
                        location.name
                    );
                    match self.state.current_kind(&location.name) {
                        Some(kept) => kept,
                        None => continue,
                    }
                }
            };
            resolved.push((location.name.as_str(), id, forecast.contains_key(&location.name)));
        }

        let new_day = self.state.day_index() != Some(day_index);
        if new_day {
            self.state.begin_day(day_index, &self.catalog);
        }
        let mut applied = 0;
        for (location, id, remote) in &resolved {
            self.state.record(location, *id);
            if *remote {
                applied += 1;
                log::debug!(
                    "{location}: remote weather {}",
                    self.catalog.get(*id).map_or("?", WeatherKind::name)
                );
            }
        }
        self.refresh_local(new_day);
        Ok(applied)
    }

    /// Name of the location's current kind, or the none kind's name.
    ///
    /// # Errors
    ///
    /// Returns an error when the catalog has no none kind.
    pub fn weather_name(&self, location: &str) -> Result<&str, ForecastError> {
        let id = match self.state.current_kind(location) {
            Some(id) => id,
            None => self.catalog.none_kind()?,
        };
        self.catalog.resolve(id).map(WeatherKind::name)
    }

    /// Whether `base` is part of the location's current kind at any point of the day.
    #[must_use]
    pub fn has_weather(&self, location: &str, base: BaseWeather) -> bool {
        self.current_kind_of(location)
            .map_or(base.is_none(), |kind| kind.has_weather(base))
    }

    /// Base condition active at the vantage point right now.
    ///
    /// For a progressing kind this is the tracker's current stage.
    #[must_use]
    pub fn active_weather(&self) -> Option<BaseWeather> {
        let kind = self.state.local_kind().and_then(|id| self.catalog.get(id))?;
        if !matches!(kind.category(), KindCategory::Progressing(_)) {
            return Some(kind.base());
        }
        match self.state.stage() {
            Some(stage) => Some(stage.current_stage_kind()),
            None => {
                log::warn!("{}: progressing kind without a stage tracker", kind.name());
                Some(kind.base())
            }
        }
    }

    /// Report elapsed day time to the local progressing kind, if any.
    pub fn advance_progression(
        &mut self,
        day_fraction: f32,
        rng: &mut dyn RngCore,
    ) -> Option<BaseWeather> {
        let stage = self.state.stage_mut()?;
        let changed = stage.advance(day_fraction, rng);
        if let Some(base) = changed {
            log::info!("{}: progressed to {base}", stage.kind_name());
        }
        changed
    }

    /// Toggle a combined or progressing kind between days.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown name or a normal kind.
    pub fn set_kind_enabled(&mut self, name: &str, enabled: bool) -> Result<(), ForecastError> {
        self.catalog.set_enabled(name, enabled)
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn weights(&self) -> &WeightTable {
        &self.weights
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    fn current_kind_of(&self, location: &str) -> Option<&WeatherKind> {
        self.state
            .current_kind(location)
            .and_then(|id| self.catalog.get(id))
    }

    /// Point the local kind at the active location's assignment.
    ///
    /// The stage tracker survives while the local kind stays the same, unless
    /// `restart_stage` asks for a fresh one.
    fn refresh_local(&mut self, restart_stage: bool) {
        let local: Option<KindId> = self
            .state
            .active_location()
            .and_then(|location| self.state.current_kind(location));
        if !restart_stage && local == self.state.local_kind() {
            return;
        }
        let stage = local
            .and_then(|id| self.catalog.get(id))
            .and_then(ProgressionTimeline::for_kind)
            .map(|timeline| Box::new(timeline) as Box<dyn StageTracker>);
        self.state.set_local(local, stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProgressionStage;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn session(role: Role) -> ForecastSession {
        let mut catalog = Catalog::with_base_kinds(100);
        catalog
            .register(WeatherKind::combined(
                "Stormy + Rainy",
                [BaseWeather::Stormy, BaseWeather::Rainy],
                100,
                0.4,
            ))
            .unwrap();
        catalog
            .register(WeatherKind::progressing(
                "Rainy > Stormy",
                BaseWeather::Rainy,
                vec![ProgressionStage {
                    at: 0.5,
                    weather: BaseWeather::Stormy,
                    chance: 1.0,
                }],
                100,
                0.5,
            ))
            .unwrap();
        ForecastSession::new(
            catalog,
            WeightTable::default_table(),
            EngineConfig::default(),
            role,
        )
    }

    fn locations() -> Vec<Location> {
        vec![
            Location::new("85 Rend", [BaseWeather::Rainy, BaseWeather::Stormy]),
            Location::new("8 Titan", [BaseWeather::Foggy]),
        ]
    }

    #[test]
    fn force_weather_needs_an_active_location() {
        let mut session = session(Role::Authority);
        assert_eq!(
            session.force_weather("Rainy").unwrap_err(),
            ForecastError::NoActiveLocation
        );
    }

    #[test]
    fn force_weather_sets_local_kind_and_returns_effects() {
        let mut session = session(Role::Authority);
        session.set_active_location(Some("85 Rend"));

        let effects = session.force_weather("stormy + rainy").unwrap();
        assert_eq!(effects.as_slice(), &[BaseWeather::Stormy, BaseWeather::Rainy]);
        assert_eq!(session.weather_name("85 Rend").unwrap(), "Stormy + Rainy");
        assert!(session.has_weather("85 Rend", BaseWeather::Rainy));
        assert!(!session.has_weather("85 Rend", BaseWeather::Foggy));
        assert_eq!(session.active_weather(), Some(BaseWeather::Stormy));
        assert!(session.state().stage().is_none());

        assert!(session.force_weather("None").unwrap().is_empty());
        assert!(matches!(
            session.force_weather("Hail"),
            Err(ForecastError::KindNotFound(_))
        ));
    }

    #[test]
    fn progressing_local_kind_tracks_stages() {
        let mut session = session(Role::Authority);
        session.set_active_location(Some("85 Rend"));
        session.force_weather("Rainy > Stormy").unwrap();
        assert_eq!(session.active_weather(), Some(BaseWeather::Rainy));

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        assert_eq!(session.advance_progression(0.2, &mut rng), None);
        assert_eq!(
            session.advance_progression(0.6, &mut rng),
            Some(BaseWeather::Stormy)
        );
        assert_eq!(session.active_weather(), Some(BaseWeather::Stormy));
        assert!(session.has_weather("85 Rend", BaseWeather::Stormy));
    }

    #[test]
    fn stage_survives_refreshing_the_same_local_kind() {
        let locations = locations();
        let mut forecast = BTreeMap::new();
        forecast.insert("85 Rend".to_string(), "Rainy > Stormy".to_string());
        forecast.insert("8 Titan".to_string(), "Foggy".to_string());

        let mut participant = session(Role::Participant);
        participant.set_active_location(Some("85 Rend"));
        participant.apply_remote(1, &locations, &forecast).unwrap();
        assert_eq!(participant.active_weather(), Some(BaseWeather::Rainy));

        let mut rng = ChaCha8Rng::seed_from_u64(5);
        participant.advance_progression(0.6, &mut rng);
        assert_eq!(participant.active_weather(), Some(BaseWeather::Stormy));

        participant.set_active_location(Some("85 Rend"));
        assert_eq!(participant.active_weather(), Some(BaseWeather::Stormy));
        participant.apply_remote(1, &locations, &forecast).unwrap();
        assert_eq!(participant.active_weather(), Some(BaseWeather::Stormy));

        participant.force_weather("Rainy > Stormy").unwrap();
        assert_eq!(participant.active_weather(), Some(BaseWeather::Rainy));
    }

    #[test]
    fn next_day_remote_forecast_rotates_history() {
        let locations = locations();
        let mut forecast = BTreeMap::new();
        forecast.insert("85 Rend".to_string(), "Rainy > Stormy".to_string());
        forecast.insert("8 Titan".to_string(), "Foggy".to_string());

        let mut participant = session(Role::Participant);
        participant.set_active_location(Some("85 Rend"));
        participant.apply_remote(1, &locations, &forecast).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        participant.advance_progression(0.6, &mut rng);
        assert_eq!(participant.state().previous_base("8 Titan"), None);

        forecast.remove("8 Titan");
        assert_eq!(participant.apply_remote(2, &locations, &forecast).unwrap(), 1);
        assert_eq!(participant.state().day_index(), Some(2));
        assert_eq!(
            participant.state().previous_base("8 Titan"),
            Some(BaseWeather::Foggy)
        );
        assert_eq!(
            participant.state().previous_base("85 Rend"),
            Some(BaseWeather::Rainy)
        );
        assert_eq!(participant.weather_name("8 Titan").unwrap(), "Foggy");
        assert_eq!(participant.active_weather(), Some(BaseWeather::Rainy));
    }

    #[test]
    fn unassigned_locations_report_none() {
        let session = session(Role::Participant);
        assert_eq!(session.weather_name("8 Titan").unwrap(), "None");
        assert!(session.has_weather("8 Titan", BaseWeather::None));
        assert!(!session.has_weather("8 Titan", BaseWeather::Foggy));
        assert_eq!(session.active_weather(), None);
    }

    #[test]
    fn participant_installs_the_authority_forecast() {
        let locations = locations();
        let mut authority = session(Role::Authority);
        let forecast = authority
            .advance_day(&DayInput {
                day_index: 1,
                map_seed: 77,
                locations: &locations,
                intensity: 0.0,
            })
            .unwrap();

        let mut participant = session(Role::Participant);
        participant.set_active_location(Some("8 Titan"));
        let skipped = participant
            .advance_day(&DayInput {
                day_index: 1,
                map_seed: 77,
                locations: &locations,
                intensity: 0.0,
            })
            .unwrap();
        assert_eq!(skipped.status, ForecastStatus::NotAuthoritative);

        let applied = participant
            .apply_remote(forecast.day_index, &locations, &forecast.kind_names())
            .unwrap();
        assert_eq!(applied, 2);
        for location in &locations {
            assert_eq!(
                participant.weather_name(&location.name).unwrap(),
                authority.weather_name(&location.name).unwrap()
            );
        }
        assert_eq!(
            participant.state().local_kind(),
            participant.state().current_kind("8 Titan")
        );
    }

    #[test]
    fn apply_remote_is_all_or_nothing() {
        let mut participant = session(Role::Participant);
        let mut forecast = BTreeMap::new();
        forecast.insert("85 Rend".to_string(), "Rainy".to_string());
        forecast.insert("8 Titan".to_string(), "Hail".to_string());
        let before = participant.state().snapshot();
        assert!(participant.apply_remote(1, &locations(), &forecast).is_err());
        assert_eq!(participant.state().snapshot(), before);

        forecast.remove("8 Titan");
        assert_eq!(participant.apply_remote(1, &locations(), &forecast).unwrap(), 1);
        assert_eq!(participant.weather_name("85 Rend").unwrap(), "Rainy");
    }

    #[test]
    fn kinds_can_be_toggled_between_days() {
        let mut session = session(Role::Authority);
        session.set_kind_enabled("Stormy + Rainy", false).unwrap();
        assert!(!session.catalog().by_name("Stormy + Rainy").unwrap().is_enabled());
        assert!(session.set_kind_enabled("Rainy", false).is_err());
    }
}
