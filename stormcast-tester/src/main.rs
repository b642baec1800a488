mod fixtures;
mod logic;
mod util;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use fixtures::FileLoader;
use logic::{
    CampaignPlan, ScenarioResult, ScenarioRunner, SeedInfo, Simulator, get_scenario,
    list_scenarios, resolve_seed_inputs, scenario_keys,
};
use util::split_csv;

#[derive(Debug, Parser)]
#[command(name = "stormcast-tester", version)]
#[command(about = "Scenario runner for the Stormcast forecast engine")]
struct Args {
    /// Scenarios to run (comma-separated, or `all`)
    #[arg(long, default_value = "determinism,day-zero,campaign")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Map seeds to run (comma-separated; `a..b` and `a..=b` ranges allowed)
    #[arg(long, default_value = "1337", allow_hyphen_values = true)]
    seeds: String,

    /// Days to simulate per campaign
    #[arg(long, default_value_t = 12)]
    days: u32,

    /// Number of locations in the session (stock locations padded with generated ones)
    #[arg(long, default_value_t = 13)]
    locations: usize,

    /// Weather intensity handed to the engine each day (0.0 to 1.0)
    #[arg(long, default_value_t = 0.0)]
    intensity: f32,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Weight table JSON replacing the embedded one
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Kind definitions JSON replacing the embedded one
    #[arg(long)]
    kinds: Option<PathBuf>,

    /// Engine config JSON replacing the embedded one
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let plan = build_plan(&args)?;
    let scenarios = expand_scenarios(&args.scenarios);
    let seed_infos = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let loader = FileLoader {
        weights: args.weights.clone(),
        kinds: args.kinds.clone(),
        config: args.config.clone(),
    };
    let runner = ScenarioRunner::new(Simulator::new(loader, args.verbose), args.verbose);

    let results = run_scenarios(&runner, &scenarios, &seed_infos, &plan);

    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:15} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🌩️  Stormcast Forecast Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn build_plan(args: &Args) -> Result<CampaignPlan> {
    if !(0.0..=1.0).contains(&args.intensity) {
        bail!("--intensity must be between 0.0 and 1.0, got {}", args.intensity);
    }
    if args.days == 0 {
        bail!("--days must be at least 1");
    }
    Ok(CampaignPlan {
        location_count: args.locations,
        days: args.days,
        intensity: args.intensity,
    })
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s.eq_ignore_ascii_case("all")) {
        scenarios.retain(|s| !s.eq_ignore_ascii_case("all"));
        for key in scenario_keys() {
            if !scenarios.contains(&key) {
                scenarios.push(key);
            }
        }
    }
    scenarios
}

fn run_scenarios(
    runner: &ScenarioRunner,
    scenarios: &[String],
    seeds: &[SeedInfo],
    plan: &CampaignPlan,
) -> Vec<ScenarioResult> {
    println!("{}", "🧠 Running Forecast Scenarios".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let mut results = Vec::new();
    for scenario_name in scenarios {
        if let Some(scenario) = get_scenario(scenario_name) {
            results.extend(runner.run_scenario(&scenario, seeds, plan));
        } else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
        }
    }
    results
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => {
            if results.is_empty() {
                writeln!(&mut output_target, "[]")?;
            } else {
                logic::reports::generate_json_report(&mut output_target, results)?;
            }
        }
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Stormcast Forecast Test Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        _ => {
            if results.is_empty() {
                writeln!(&mut output_target, "No scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    start_time.elapsed(),
                )?;
            }
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {:?}", start_time.elapsed())?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
