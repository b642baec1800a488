use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "stormcast-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_scenarios_writes_output() {
    let exe = env!("CARGO_BIN_EXE_stormcast-tester");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-scenarios", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Available scenarios"));
    assert!(content.contains("remote-sync"));
}

#[test]
fn cli_runs_all_scenarios_with_json_report() {
    let exe = env!("CARGO_BIN_EXE_stormcast-tester");
    let output_path = temp_path("run");
    let output = Command::new(exe)
        .args([
            "--scenarios",
            "all",
            "--seeds",
            "-5,10..12",
            "--days",
            "4",
            "--locations",
            "12",
            "--report",
            "json",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let content = std::fs::read_to_string(output_path).expect("read output");
    let results: Vec<serde_json::Value> = serde_json::from_str(&content).expect("json report");
    // Six scenarios over three seeds.
    assert_eq!(results.len(), 18);
    assert!(results.iter().all(|r| r["passed"] == true));
    assert!(results.iter().any(|r| r["seed"] == -5));
}

#[test]
fn cli_rejects_unreadable_weight_file() {
    let exe = env!("CARGO_BIN_EXE_stormcast-tester");
    let output = Command::new(exe)
        .args([
            "--scenarios",
            "campaign",
            "--days",
            "2",
            "--report",
            "markdown",
            "--weights",
            "/nonexistent/weights.json",
        ])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("❌"));
    assert!(stdout.contains("failed to read"));
}

#[test]
fn cli_rejects_bad_seed_tokens() {
    let exe = env!("CARGO_BIN_EXE_stormcast-tester");
    let output = Command::new(exe)
        .args(["--seeds", "soon"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid seed"));
}
