use anyhow::{Context, Result};
use std::collections::BTreeMap;

use stormcast_engine::{
    BaseWeather, DayForecast, DayInput, ForecastStatus, KindCategory, Role, SelectionRule,
    progression_rng,
};

use super::simulation::{CampaignPlan, CampaignSummary, Simulator, day_seed};

/// What a single scenario run observed.
#[derive(Debug, Clone, Default)]
pub struct ScenarioOutcome {
    pub days_run: u32,
    pub failures: Vec<String>,
    pub distribution: BTreeMap<String, usize>,
}

impl ScenarioOutcome {
    fn from_summary(summary: &CampaignSummary) -> Self {
        Self {
            days_run: u32::try_from(summary.forecasts.len()).unwrap_or(u32::MAX),
            failures: Vec::new(),
            distribution: summary.distribution.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    Determinism,
    DayZero,
    Campaign,
    RemoteSync,
    Progression,
    Distribution,
}

#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub kind: ScenarioKind,
}

const SCENARIOS: [(&str, &str, ScenarioKind); 6] = [
    (
        "determinism",
        "Two sessions fed the same seeds produce identical forecasts",
        ScenarioKind::Determinism,
    ),
    (
        "day-zero",
        "First-day exclusion count and draws stay within the rules",
        ScenarioKind::DayZero,
    ),
    (
        "campaign",
        "Every location gets a legal kind each day and history carries over",
        ScenarioKind::Campaign,
    ),
    (
        "remote-sync",
        "A participant applying broadcast kind names mirrors the authority",
        ScenarioKind::RemoteSync,
    ),
    (
        "progression",
        "Forced progressing kinds only ever move through their own stages",
        ScenarioKind::Progression,
    ),
    (
        "distribution",
        "Tally assigned kinds across a campaign",
        ScenarioKind::Distribution,
    ),
];

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    SCENARIOS
        .iter()
        .map(|(key, description, _)| (*key, *description))
        .collect()
}

pub fn scenario_keys() -> Vec<String> {
    SCENARIOS.iter().map(|(key, _, _)| (*key).to_string()).collect()
}

pub fn get_scenario(name: &str) -> Option<Scenario> {
    SCENARIOS
        .iter()
        .find(|(key, _, _)| key.eq_ignore_ascii_case(name.trim()))
        .map(|(key, _, kind)| Scenario {
            name: (*key).to_string(),
            kind: *kind,
        })
}

impl ScenarioKind {
    pub fn run(
        self,
        simulator: &Simulator,
        plan: &CampaignPlan,
        seed: i64,
    ) -> Result<ScenarioOutcome> {
        match self {
            Self::Determinism => check_determinism(simulator, plan, seed),
            Self::DayZero => check_day_zero(simulator, plan, seed),
            Self::Campaign => check_campaign(simulator, plan, seed),
            Self::RemoteSync => check_remote_sync(simulator, plan, seed),
            Self::Progression => check_progression(simulator, plan, seed),
            Self::Distribution => check_distribution(simulator, plan, seed),
        }
    }
}

fn check_determinism(
    simulator: &Simulator,
    plan: &CampaignPlan,
    seed: i64,
) -> Result<ScenarioOutcome> {
    let first = simulator.run_campaign(plan, seed)?;
    let second = simulator.run_campaign(plan, seed)?;
    let mut outcome = ScenarioOutcome::from_summary(&first);

    for (a, b) in first.forecasts.iter().zip(&second.forecasts) {
        if a != b {
            outcome.failures.push(format!(
                "day {} diverged: {:?} vs {:?}",
                a.day_index,
                a.kind_names(),
                b.kind_names()
            ));
        }
    }
    if first.draws != second.draws {
        outcome.failures.push(format!(
            "draw counts differ: {} vs {}",
            first.draws, second.draws
        ));
    }
    Ok(outcome)
}

fn check_day_zero(
    simulator: &Simulator,
    plan: &CampaignPlan,
    seed: i64,
) -> Result<ScenarioOutcome> {
    let locations = plan.locations();
    let mut session = simulator.session(Role::Authority)?;
    let day_zero = session.config().day_zero.clone();
    let forecast = session.advance_day(&DayInput {
        day_index: 0,
        map_seed: day_seed(seed, 0),
        locations: &locations,
        intensity: plan.intensity,
    })?;

    let mut outcome = ScenarioOutcome {
        days_run: 1,
        ..ScenarioOutcome::default()
    };
    for assignment in &forecast.assignments {
        *outcome
            .distribution
            .entry(assignment.kind_name.clone())
            .or_default() += 1;
    }

    let drawable = |name: &str| {
        locations
            .iter()
            .any(|l| l.name == name && l.random_weathers.iter().any(|w| w.is_random_candidate()))
    };
    let fixed = day_zero
        .clear_locations
        .iter()
        .filter(|name| drawable(name))
        .count();
    let eligible = locations
        .iter()
        .filter(|l| drawable(&l.name) && !day_zero.clear_locations.contains(&l.name))
        .count();
    let expected = fixed + day_zero.extra_clear_count(locations.len()).min(eligible);
    let predetermined = forecast
        .assignments
        .iter()
        .filter(|a| a.rule == SelectionRule::PredeterminedClear)
        .count();
    if predetermined != expected {
        outcome.failures.push(format!(
            "expected {expected} predetermined clear locations for {} locations, got {predetermined}",
            locations.len()
        ));
    }

    for assignment in &forecast.assignments {
        let drew = matches!(
            assignment.rule,
            SelectionRule::DayZeroDraw | SelectionRule::EclipseOverride
        );
        if drew && !assignment.base.is_random_candidate() {
            outcome.failures.push(format!(
                "{} drew {} on day zero",
                assignment.location, assignment.kind_name
            ));
        }
    }
    Ok(outcome)
}

fn check_campaign(
    simulator: &Simulator,
    plan: &CampaignPlan,
    seed: i64,
) -> Result<ScenarioOutcome> {
    let locations = plan.locations();
    let summary = simulator.run_campaign(plan, seed)?;
    let catalog_session = simulator.session(Role::Authority)?;
    let catalog = catalog_session.catalog();
    let mut outcome = ScenarioOutcome::from_summary(&summary);

    let mut yesterday: Option<&DayForecast> = None;
    for forecast in &summary.forecasts {
        if forecast.status != ForecastStatus::Selected {
            outcome
                .failures
                .push(format!("day {} was not selected", forecast.day_index));
        }
        if forecast.assignments.len() != locations.len() {
            outcome.failures.push(format!(
                "day {} assigned {} of {} locations",
                forecast.day_index,
                forecast.assignments.len(),
                locations.len()
            ));
        }
        for (location, assignment) in locations.iter().zip(&forecast.assignments) {
            let kind = catalog
                .by_name(&assignment.kind_name)
                .with_context(|| format!("unknown kind {}", assignment.kind_name))?;
            if !kind.is_enabled() {
                outcome.failures.push(format!(
                    "day {}: disabled kind {} at {}",
                    forecast.day_index, assignment.kind_name, location.name
                ));
            }
            let legal = assignment.base.is_none()
                || location.allows(assignment.base)
                || (assignment.base == BaseWeather::DustClouds && location.can_be_dust());
            if !legal {
                outcome.failures.push(format!(
                    "day {}: {} is not legal at {}",
                    forecast.day_index, assignment.kind_name, location.name
                ));
            }
            if let Some(previous_day) = yesterday {
                let expected = previous_day
                    .assignment(&location.name)
                    .map(|a| a.base.normalized_previous());
                let needs_history = matches!(
                    assignment.rule,
                    SelectionRule::WeightedDraw
                        | SelectionRule::DustOverride
                        | SelectionRule::EmptyPool
                );
                if needs_history && assignment.previous != expected {
                    outcome.failures.push(format!(
                        "day {}: {} used history {:?}, expected {:?}",
                        forecast.day_index, location.name, assignment.previous, expected
                    ));
                }
            }
        }
        yesterday = Some(forecast);
    }
    Ok(outcome)
}

fn check_remote_sync(
    simulator: &Simulator,
    plan: &CampaignPlan,
    seed: i64,
) -> Result<ScenarioOutcome> {
    let locations = plan.locations();
    let mut host = simulator.session(Role::Authority)?;
    let mut guest = simulator.session(Role::Participant)?;
    let mut outcome = ScenarioOutcome::default();

    for day_index in 0..plan.days {
        let input = DayInput {
            day_index,
            map_seed: day_seed(seed, day_index),
            locations: &locations,
            intensity: plan.intensity,
        };
        let forecast = host.advance_day(&input)?;
        let local = guest.advance_day(&input)?;
        if local.status != ForecastStatus::NotAuthoritative || !local.is_empty() {
            outcome
                .failures
                .push(format!("day {day_index}: participant selected on its own"));
        }

        let applied = guest.apply_remote(day_index, &locations, &forecast.kind_names())?;
        if applied != locations.len() {
            outcome.failures.push(format!(
                "day {day_index}: applied {applied} of {} locations",
                locations.len()
            ));
        }
        for location in &locations {
            let hosted = host.weather_name(&location.name)?;
            let mirrored = guest.weather_name(&location.name)?;
            if hosted != mirrored {
                outcome.failures.push(format!(
                    "day {day_index}: {} is {hosted} on the host but {mirrored} on the participant",
                    location.name
                ));
            }
            if guest.state().previous_base(&location.name)
                != host.state().previous_base(&location.name)
            {
                outcome.failures.push(format!(
                    "day {day_index}: {} history differs between host and participant",
                    location.name
                ));
            }
            *outcome.distribution.entry(mirrored.to_string()).or_default() += 1;
        }
        outcome.days_run += 1;
    }
    Ok(outcome)
}

fn check_progression(
    simulator: &Simulator,
    plan: &CampaignPlan,
    seed: i64,
) -> Result<ScenarioOutcome> {
    const STEPS: u8 = 10;
    let locations = plan.locations();
    let mut session = simulator.session(Role::Authority)?;
    let seed_offset = session.config().seed_offset;
    let mut outcome = ScenarioOutcome::default();

    let progressing: Vec<_> = session
        .catalog()
        .all()
        .filter_map(|(_, kind)| match kind.category() {
            KindCategory::Progressing(progressing) => {
                let host = locations.iter().find(|l| progressing.can_apply(l))?;
                Some((
                    kind.name().to_string(),
                    progressing.stage_kinds(),
                    host.name.clone(),
                ))
            }
            _ => None,
        })
        .collect();

    for (name, stage_kinds, host) in progressing {
        session.set_active_location(Some(&host));
        session.force_weather(&name)?;
        let mut rng = progression_rng(seed, seed_offset);

        for step in 1..=STEPS {
            let fraction = f32::from(step) / f32::from(STEPS);
            session.advance_progression(fraction, &mut rng);
            match session.active_weather() {
                Some(base) if stage_kinds.contains(&base) => {}
                other => outcome.failures.push(format!(
                    "{name} at {host}: {other:?} is not one of its stages at {fraction:.1}"
                )),
            }
        }

        let settled = session
            .active_weather()
            .map_or_else(|| "?".to_string(), |base| base.to_string());
        *outcome
            .distribution
            .entry(format!("{name} -> {settled}"))
            .or_default() += 1;
        outcome.days_run += 1;
    }
    Ok(outcome)
}

fn check_distribution(
    simulator: &Simulator,
    plan: &CampaignPlan,
    seed: i64,
) -> Result<ScenarioOutcome> {
    let summary = simulator.run_campaign(plan, seed)?;
    let mut outcome = ScenarioOutcome::from_summary(&summary);
    let expected = plan.location_count * usize::try_from(plan.days).unwrap_or(usize::MAX);
    if summary.location_days() != expected {
        outcome.failures.push(format!(
            "tallied {} location-days, expected {expected}",
            summary.location_days()
        ));
    }
    if expected >= 40 && summary.distribution.len() < 2 {
        outcome.failures.push(format!(
            "only {:?} was ever assigned",
            summary.distribution.keys().collect::<Vec<_>>()
        ));
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::FileLoader;

    fn simulator() -> Simulator {
        Simulator::new(FileLoader::default(), false)
    }

    #[test]
    fn scenario_lookup_is_case_insensitive() {
        assert_eq!(get_scenario("Day-Zero").unwrap().kind, ScenarioKind::DayZero);
        assert!(get_scenario("nope").is_none());
        assert_eq!(list_scenarios().len(), scenario_keys().len());
    }

    #[test]
    fn every_scenario_passes_on_stock_data() {
        let plan = CampaignPlan {
            location_count: 14,
            days: 6,
            intensity: 0.3,
        };
        let simulator = simulator();
        for key in scenario_keys() {
            let scenario = get_scenario(&key).unwrap();
            for seed in [1, 1337, -9] {
                let outcome = scenario.kind.run(&simulator, &plan, seed).unwrap();
                assert!(
                    outcome.failures.is_empty(),
                    "{key} seed {seed}: {:?}",
                    outcome.failures
                );
                assert!(outcome.days_run >= 1);
            }
        }
    }
}
