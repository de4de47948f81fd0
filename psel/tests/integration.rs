//! Integration tests for psel CLI.

use std::io::Write;
use std::process::{Command, Output, Stdio};

use serde_json::Value;
use tempfile::TempDir;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

fn psel_cmd(root: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_psel"));
    cmd.env("PSEL_ROOT", root);
    cmd.env_remove("PSEL_LOG");
    cmd
}

fn write_config(root: &std::path::Path, contents: &str) {
    std::fs::write(root.join("config.toml"), contents).unwrap();
}

fn run_session(root: &std::path::Path, args: &[&str], input: &str) -> Output {
    let mut child = psel_cmd(root)
        .arg("session")
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn psel session");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();

    child.wait_with_output().expect("failed to wait for session")
}

fn emitted(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("session line is not JSON"))
        .collect()
}

#[test]
fn test_init_writes_config() {
    let tmp = TempDir::new().unwrap();
    let output = psel_cmd(tmp.path()).arg("init").output().unwrap();
    assert!(output.status.success(), "psel init failed: {:?}", output);

    let contents = std::fs::read_to_string(tmp.path().join("config.toml")).unwrap();
    assert!(contents.contains("default_time_selection = \"lasthour\""));

    // Second init leaves it alone
    let output = psel_cmd(tmp.path()).arg("init").output().unwrap();
    assert!(String::from_utf8_lossy(&output.stdout).contains("already exists"));
}

#[test]
fn test_parse_json() {
    let tmp = TempDir::new().unwrap();
    let output = psel_cmd(tmp.path())
        .args(["parse", "-f", "json", r#"cpu{ job = "api", env!~"dev.*" }"#])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["expression"], r#"cpu{job="api", env!~"dev.*"}"#);
    assert_eq!(value["profileName"], "cpu");
    assert_eq!(value["matchers"][1]["op"], "!~");
    assert_eq!(value["searchDisabled"], false);
}

#[test]
fn test_parse_lenient_vs_strict() {
    let tmp = TempDir::new().unwrap();
    let malformed = r#"cpu{job="api", env="#;

    let output = psel_cmd(tmp.path())
        .args(["parse", "-f", "json", malformed])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["expression"], r#"{job="api"}"#);
    assert_eq!(value["profileName"], "");

    let output = psel_cmd(tmp.path())
        .args(["parse", "--strict", malformed])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Parse error"));
}

#[test]
fn test_set_matcher_reports_change() {
    let tmp = TempDir::new().unwrap();
    let output = psel_cmd(tmp.path())
        .args(["set-matcher", "-f", "json", "cpu{}", "job", "api"])
        .output()
        .unwrap();
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["expression"], r#"cpu{job="api"}"#);
    assert_eq!(value["changed"], true);

    let output = psel_cmd(tmp.path())
        .args(["set-matcher", "-f", "json", r#"cpu{job="api"}"#, "job", "api"])
        .output()
        .unwrap();
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["changed"], false);
}

#[test]
fn test_set_matcher_invalid_label_unchanged() {
    let tmp = TempDir::new().unwrap();
    let output = psel_cmd(tmp.path())
        .args(["set-matcher", "-f", "json", "cpu{}", "my-label", "x"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["expression"], "cpu{}");
    assert_eq!(value["changed"], false);
}

#[test]
fn test_set_profile_invalid_name_unchanged() {
    let tmp = TempDir::new().unwrap();
    let output = psel_cmd(tmp.path())
        .args(["set-profile", r#"cpu{job="a"}"#, "process cpu"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), r#"cpu{job="a"}"#);
    assert!(String::from_utf8_lossy(&output.stderr).contains("unchanged"));
}

#[test]
fn test_set_profile_unchanged() {
    let tmp = TempDir::new().unwrap();
    let output = psel_cmd(tmp.path())
        .args(["set-profile", "cpu{}", "cpu"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "cpu{}");
    assert!(String::from_utf8_lossy(&output.stderr).contains("unchanged"));
}

#[test]
fn test_range_preset() {
    let tmp = TempDir::new().unwrap();
    let output = psel_cmd(tmp.path())
        .args(["range", "last7days", "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["timeSelection"], "last7days");
    assert_eq!(value["label"], "Last 7 days");
    let from = value["from"].as_i64().unwrap();
    let to = value["to"].as_i64().unwrap();
    assert_eq!(to - from, 7 * DAY_MS);
}

#[test]
fn test_range_explicit_bounds() {
    let tmp = TempDir::new().unwrap();
    let output = psel_cmd(tmp.path())
        .args([
            "range",
            "--from",
            "1970-01-01T00:00:00Z",
            "--to",
            "86400000",
            "-f",
            "json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["timeSelection"], "custom");
    assert_eq!(value["from"], 0);
    assert_eq!(value["to"], DAY_MS);
    assert_eq!(value["label"], "1970-01-01 00:00 \u{21d2} 1970-01-02 00:00");
}

#[test]
fn test_range_rejects_inverted_bounds() {
    let tmp = TempDir::new().unwrap();
    let output = psel_cmd(tmp.path())
        .args(["range", "--from", "200", "--to", "100"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid time range"));
}

#[test]
fn test_range_uses_config_default() {
    let tmp = TempDir::new().unwrap();
    write_config(tmp.path(), "default_time_selection = \"lastday\"\n");
    let output = psel_cmd(tmp.path())
        .args(["range", "-f", "json"])
        .output()
        .unwrap();
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["timeSelection"], "lastday");
}

#[test]
fn test_range_selection_conflicts_with_bounds() {
    let tmp = TempDir::new().unwrap();
    let output = psel_cmd(tmp.path())
        .args(["range", "last7days", "--from", "1", "--to", "2"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot be used with"));
}

#[test]
fn test_range_rejects_bad_time_format() {
    let tmp = TempDir::new().unwrap();
    write_config(tmp.path(), "time_format = \"%Q\"\n");
    let output = psel_cmd(tmp.path())
        .args(["range", "--from", "0", "--to", "1000"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid time_format"));
    assert!(!stderr.contains("panicked"));
}

#[test]
fn test_presets_list_relative_only() {
    let tmp = TempDir::new().unwrap();
    let output = psel_cmd(tmp.path()).arg("presets").output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    let keys: Vec<&str> = stdout
        .lines()
        .filter_map(|l| l.split_whitespace().next())
        .collect();
    assert_eq!(keys, ["lasthour", "lastday", "last3days", "last7days", "last14days"]);
}

#[test]
fn test_profiles_from_config() {
    let tmp = TempDir::new().unwrap();
    write_config(
        tmp.path(),
        "[labels]\n__name__ = [\"process_cpu\", \"heap\"]\n",
    );
    let output = psel_cmd(tmp.path())
        .args(["profiles", "-f", "json"])
        .output()
        .unwrap();
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value, serde_json::json!(["process_cpu", "heap"]));
}

#[test]
fn test_profiles_missing_label_degrades_to_empty() {
    let tmp = TempDir::new().unwrap();
    let output = psel_cmd(tmp.path())
        .args(["profiles", "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value, serde_json::json!([]));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Not found"));
}

#[test]
fn test_session_profile_search_merge() {
    let tmp = TempDir::new().unwrap();
    let input = "\
# merge is not available before a search
profile process_cpu
merge
search
merge
";
    let output = run_session(tmp.path(), &[], input);
    assert!(output.status.success(), "session failed: {:?}", output);

    let lines = emitted(&output);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["expression"], "process_cpu{}");
    assert_eq!(lines[0]["merge"], false);
    assert_eq!(lines[0]["timeSelection"], "lasthour");
    assert_eq!(lines[1]["merge"], true);
}

#[test]
fn test_session_search_disabled_without_profile() {
    let tmp = TempDir::new().unwrap();
    let output = run_session(tmp.path(), &[], "search\n");
    assert!(output.status.success());
    assert!(emitted(&output).is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unchanged"));
}

#[test]
fn test_session_custom_range_and_label() {
    let tmp = TempDir::new().unwrap();
    let input = "\
profile heap
time last14days
range 1000 2000
search
label pod web-1
adjust 5 10
";
    let output = run_session(tmp.path(), &[], input);
    let lines = emitted(&output);
    assert_eq!(lines.len(), 3);

    assert_eq!(lines[0]["timeSelection"], "custom");
    assert_eq!(lines[0]["from"], 1000);
    assert_eq!(lines[0]["to"], 2000);

    assert_eq!(lines[1]["expression"], r#"heap{pod="web-1"}"#);
    assert_eq!(lines[1]["from"], 1000);

    assert_eq!(lines[2]["from"], 5);
    assert_eq!(lines[2]["to"], 10);
    assert_eq!(lines[2]["expression"], r#"heap{pod="web-1"}"#);
}

#[test]
fn test_session_enforced_profile() {
    let tmp = TempDir::new().unwrap();
    let input = "\
profile cpu
matchers job=\"api\"
search
";
    let output = run_session(tmp.path(), &["--enforce", "heap"], input);
    let lines = emitted(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["expression"], r#"heap{job="api"}"#);
}

#[test]
fn test_session_custom_without_bounds_keeps_last_range() {
    let tmp = TempDir::new().unwrap();
    let input = "\
profile cpu
search
time custom
search
";
    let output = run_session(tmp.path(), &[], input);
    let lines = emitted(&output);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1]["timeSelection"], "custom");
    assert_eq!(lines[1]["from"], lines[0]["from"]);
    assert_eq!(lines[1]["to"], lines[0]["to"]);
}

#[test]
fn test_session_resume() {
    let tmp = TempDir::new().unwrap();
    let previous = r#"{"expression":"cpu{}","from":10,"to":20,"merge":false,"timeSelection":"custom"}"#;
    let output = run_session(tmp.path(), &["--resume", previous], "merge\n");
    let lines = emitted(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["merge"], true);
    assert_eq!(lines[0]["from"], 10);
    assert_eq!(lines[0]["to"], 20);
}

#[test]
fn test_session_continues_after_bad_action() {
    let tmp = TempDir::new().unwrap();
    let input = "\
explode
time yesterday
range 9 1
profile cpu
search
";
    let output = run_session(tmp.path(), &[], input);
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown action: explode"));
    assert!(stderr.contains("Unknown time selection: yesterday"));
    assert!(stderr.contains("Invalid time range"));
    assert_eq!(emitted(&output).len(), 1);
}

#[test]
fn test_session_status_reports_state() {
    let tmp = TempDir::new().unwrap();
    write_config(tmp.path(), "[labels]\n__name__ = [\"process_cpu\"]\n");
    let output = run_session(tmp.path(), &[], "profile process_cpu\nstatus\n");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("expression: process_cpu{}"));
    assert!(stderr.contains("search:     enabled"));
    assert!(stderr.contains("merge:      disabled"));
    assert!(stderr.contains("profiles:   process_cpu"));
}
