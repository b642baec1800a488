use anyhow::{Context, Result};
use std::collections::BTreeMap;

use stormcast_engine::{
    DayForecast, DayInput, ForecastEngine, ForecastSession, Location, Role,
};

use crate::fixtures::{FileLoader, locations};

/// Map seeds advance by this stride from one day to the next.
const DAY_SEED_STRIDE: i64 = 7_919;

/// Shape of a simulated multi-day session.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignPlan {
    pub location_count: usize,
    pub days: u32,
    pub intensity: f32,
}

impl CampaignPlan {
    #[must_use]
    pub fn locations(&self) -> Vec<Location> {
        locations(self.location_count)
    }
}

impl Default for CampaignPlan {
    fn default() -> Self {
        Self {
            location_count: 13,
            days: 12,
            intensity: 0.0,
        }
    }
}

/// Everything a campaign produced, day by day.
#[derive(Debug, Clone)]
pub struct CampaignSummary {
    pub seed: i64,
    pub forecasts: Vec<DayForecast>,
    /// Kind name to number of location-days it was assigned.
    pub distribution: BTreeMap<String, usize>,
    /// Selection rule to number of location-days it decided.
    pub rules: BTreeMap<String, usize>,
    pub draws: u64,
}

impl CampaignSummary {
    fn new(seed: i64) -> Self {
        Self {
            seed,
            forecasts: Vec::new(),
            distribution: BTreeMap::new(),
            rules: BTreeMap::new(),
            draws: 0,
        }
    }

    fn absorb(&mut self, forecast: DayForecast) {
        for assignment in &forecast.assignments {
            *self
                .distribution
                .entry(assignment.kind_name.clone())
                .or_default() += 1;
            *self
                .rules
                .entry(format!("{:?}", assignment.rule))
                .or_default() += 1;
        }
        self.draws += forecast.draws;
        self.forecasts.push(forecast);
    }

    #[must_use]
    pub fn location_days(&self) -> usize {
        self.distribution.values().sum()
    }
}

/// Map seed the host would hand the engine on `day_index`.
#[must_use]
pub fn day_seed(seed: i64, day_index: u32) -> i64 {
    seed.wrapping_add(i64::from(day_index).wrapping_mul(DAY_SEED_STRIDE))
}

/// Drives engine sessions for the scenarios.
pub struct Simulator {
    engine: ForecastEngine<FileLoader>,
    verbose: bool,
}

impl Simulator {
    #[must_use]
    pub const fn new(loader: FileLoader, verbose: bool) -> Self {
        Self {
            engine: ForecastEngine::new(loader),
            verbose,
        }
    }

    pub fn session(&self, role: Role) -> Result<ForecastSession> {
        self.engine
            .create_session(role)
            .context("failed to create forecast session")
    }

    /// Run one authority session for `plan.days` days.
    pub fn run_campaign(&self, plan: &CampaignPlan, seed: i64) -> Result<CampaignSummary> {
        let locations = plan.locations();
        let mut session = self.session(Role::Authority)?;
        let mut summary = CampaignSummary::new(seed);

        for day_index in 0..plan.days {
            let forecast = session
                .advance_day(&DayInput {
                    day_index,
                    map_seed: day_seed(seed, day_index),
                    locations: &locations,
                    intensity: plan.intensity,
                })
                .with_context(|| format!("day {day_index} failed for seed {seed}"))?;
            if self.verbose {
                println!(
                    "   day {day_index}: {} clear of {} ({} draws)",
                    forecast.clear_count(),
                    forecast.assignments.len(),
                    forecast.draws
                );
            }
            summary.absorb(forecast);
        }

        log::debug!(
            "Campaign seed {}: {} days, {} draws, rules {:?}",
            summary.seed,
            plan.days,
            summary.draws,
            summary.rules
        );
        Ok(summary)
    }
}
