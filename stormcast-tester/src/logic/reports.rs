use anyhow::Result;
use colored::Colorize;
use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

use super::ScenarioResult;

fn success_rate(results: &[ScenarioResult]) -> f64 {
    let total = u32::try_from(results.len()).unwrap_or(u32::MAX);
    if total == 0 {
        return 0.0;
    }
    let passed = u32::try_from(results.iter().filter(|r| r.passed).count()).unwrap_or(u32::MAX);
    f64::from(passed) / f64::from(total) * 100.0
}

/// Kind tallies merged across every result.
fn merged_distribution(results: &[ScenarioResult]) -> BTreeMap<&str, usize> {
    let mut merged = BTreeMap::new();
    for result in results {
        for (kind, count) in &result.distribution {
            *merged.entry(kind.as_str()).or_default() += count;
        }
    }
    merged
}

fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let count = u32::try_from(count).unwrap_or(u32::MAX);
    let total = u32::try_from(total).unwrap_or(u32::MAX);
    f64::from(count) / f64::from(total) * 100.0
}

pub fn generate_console_report<W: Write + ?Sized>(
    writer: &mut W,
    results: &[ScenarioResult],
    total_duration: Duration,
) -> Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{}", "📊 Forecast Test Results Summary".bright_cyan().bold())?;
    writeln!(writer, "{}", "================================".cyan())?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(writer, "Total scenario runs: {total_tests}")?;
    writeln!(writer, "Passed: {}", passed_tests.to_string().green())?;
    writeln!(writer, "Failed: {}", failed_tests.to_string().red())?;
    writeln!(writer, "Success rate: {:.1}%", success_rate(results))?;
    writeln!(writer, "Total time: {total_duration:?}")?;
    writeln!(writer)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(
            writer,
            "{} {} (seed {})",
            status,
            result.scenario_name.bold(),
            result.seed
        )?;
        writeln!(writer, "   Days simulated: {}", result.days_run)?;
        writeln!(writer, "   Time: {:?}", result.duration)?;
        if !result.failures.is_empty() {
            writeln!(writer, "   Failures:")?;
            for failure in &result.failures {
                writeln!(writer, "     • {}", failure.red())?;
            }
        }
        writeln!(writer)?;
    }

    let distribution = merged_distribution(results);
    if !distribution.is_empty() {
        writeln!(writer, "{}", "🌦️  Weather Distribution".bright_yellow().bold())?;
        writeln!(writer, "{}", "======================".yellow())?;
        let total: usize = distribution.values().sum();
        for (kind, count) in &distribution {
            writeln!(writer, "{kind:20} {count:>7} ({:.1}%)", share(*count, total))?;
        }
    }

    if let (Some(fastest), Some(slowest)) = (
        results.iter().min_by_key(|r| r.duration),
        results.iter().max_by_key(|r| r.duration),
    ) {
        writeln!(writer)?;
        writeln!(writer, "{}", "⚡ Performance Summary".bright_yellow().bold())?;
        writeln!(writer, "{}", "=====================".yellow())?;
        writeln!(
            writer,
            "Fastest: {} ({:?})",
            fastest.scenario_name.green(),
            fastest.duration
        )?;
        writeln!(
            writer,
            "Slowest: {} ({:?})",
            slowest.scenario_name.yellow(),
            slowest.duration
        )?;
    }
    Ok(())
}

pub fn generate_json_report<W: Write + ?Sized>(
    writer: &mut W,
    results: &[ScenarioResult],
) -> Result<()> {
    let json_output = serde_json::to_string_pretty(results)?;
    writeln!(writer, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report<W: Write + ?Sized>(
    writer: &mut W,
    results: &[ScenarioResult],
) -> Result<()> {
    writeln!(writer, "# Stormcast Forecast Test Results\n")?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();

    writeln!(writer, "## Summary\n")?;
    writeln!(writer, "- **Total scenario runs**: {total_tests}")?;
    writeln!(writer, "- **Passed**: {passed_tests}")?;
    writeln!(writer, "- **Failed**: {}", total_tests - passed_tests)?;
    writeln!(writer, "- **Success rate**: {:.1}%\n", success_rate(results))?;

    writeln!(writer, "## Detailed Results\n")?;
    for result in results {
        let status = if result.passed { "✅" } else { "❌" };
        writeln!(writer, "### {} {} (seed {})\n", status, result.scenario_name, result.seed)?;
        writeln!(writer, "- **Days simulated**: {}", result.days_run)?;
        writeln!(writer, "- **Time**: {:?}", result.duration)?;
        if !result.failures.is_empty() {
            writeln!(writer, "- **Failures**:")?;
            for failure in &result.failures {
                writeln!(writer, "  - {failure}")?;
            }
        }
        writeln!(writer)?;
    }

    let distribution = merged_distribution(results);
    if !distribution.is_empty() {
        let total: usize = distribution.values().sum();
        writeln!(writer, "## Weather Distribution\n")?;
        writeln!(writer, "| Kind | Location-days | Share |")?;
        writeln!(writer, "| --- | ---: | ---: |")?;
        for (kind, count) in &distribution {
            writeln!(writer, "| {kind} | {count} | {:.1}% |", share(*count, total))?;
        }
    }
    Ok(())
}
