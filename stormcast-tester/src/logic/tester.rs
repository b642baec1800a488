use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use super::scenarios::Scenario;
use super::seeds::SeedInfo;
use super::simulation::{CampaignPlan, Simulator};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: i64,
    pub passed: bool,
    pub days_run: u32,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Kind name to location-days assigned.
    #[serde(default)]
    pub distribution: BTreeMap<String, usize>,
}

pub struct ScenarioRunner {
    simulator: Simulator,
    verbose: bool,
}

impl ScenarioRunner {
    pub const fn new(simulator: Simulator, verbose: bool) -> Self {
        Self { simulator, verbose }
    }

    pub fn run_scenario(
        &self,
        scenario: &Scenario,
        seeds: &[SeedInfo],
        plan: &CampaignPlan,
    ) -> Vec<ScenarioResult> {
        seeds
            .iter()
            .map(|seed_info| {
                if self.verbose {
                    println!(
                        "🧪 Testing scenario: {} (seed: {})",
                        scenario.name.bright_white(),
                        seed_info.source
                    );
                }
                self.run_single_scenario(scenario, seed_info.seed, plan)
            })
            .collect()
    }

    fn run_single_scenario(
        &self,
        scenario: &Scenario,
        seed: i64,
        plan: &CampaignPlan,
    ) -> ScenarioResult {
        let start_time = Instant::now();
        let outcome = scenario.kind.run(&self.simulator, plan, seed);
        let duration = start_time.elapsed();

        let result = match outcome {
            Ok(outcome) => ScenarioResult {
                scenario_name: scenario.name.clone(),
                seed,
                passed: outcome.failures.is_empty(),
                days_run: outcome.days_run,
                failures: outcome.failures,
                duration,
                distribution: outcome.distribution,
            },
            Err(err) => ScenarioResult {
                scenario_name: scenario.name.clone(),
                seed,
                passed: false,
                days_run: 0,
                failures: vec![format!("{err:#}")],
                duration,
                distribution: BTreeMap::new(),
            },
        };

        if result.passed {
            println!(
                "✅ [seed {}] {} - {:?}",
                seed,
                scenario.name.green(),
                result.duration
            );
        } else {
            log::warn!("{} failed for seed {seed}", scenario.name);
            eprintln!(
                "❌ [seed {}] {} - {} failure(s)",
                seed,
                scenario.name.red(),
                result.failures.len()
            );
        }
        result
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}
