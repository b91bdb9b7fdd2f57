//! Binary-level smoke tests for the `asw` CLI.

mod common;

use common::{Workspace, run_cli_case, run_cli_case_with_env};

const HOUR: i64 = 3600;

fn env_for(ws: &Workspace) -> Vec<(&'static str, String)> {
    vec![
        ("HOME", ws.scratch.path().display().to_string()),
        ("ASW_AUDIT_LOG_PATH", ws.audit_path().display().to_string()),
        ("ASW_TREND_HISTORY_PATH", ws.trends_path().display().to_string()),
    ]
}

fn borrowed<'a>(env: &'a [(&'static str, String)]) -> Vec<(&'static str, &'a str)> {
    env.iter().map(|(k, v)| (*k, v.as_str())).collect()
}

#[test]
fn help_lists_subcommands() {
    let result = run_cli_case("help_lists_subcommands", &["--help"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("Usage: asw [OPTIONS] <COMMAND>"));
    for sub in ["run", "config", "history"] {
        assert!(result.stdout.contains(sub), "missing {sub}");
    }
}

#[test]
fn version_flag_prints_package_version() {
    let result = run_cli_case("version_flag", &["--version"]);
    assert!(result.status.success());
    assert!(result.stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn json_run_emits_metrics_and_deletes() {
    let ws = Workspace::new();
    let artifact = ws.file(".a!b", b"payload", HOUR);
    ws.file("keep.txt", b"keep", HOUR);
    let target = ws.root().display().to_string();
    let env = env_for(&ws);

    let result = run_cli_case_with_env(
        "json_run",
        &["--json", "run", &target, "--min-age", "0"],
        &borrowed(&env),
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let payload: serde_json::Value =
        serde_json::from_str(result.stdout.trim()).expect("stdout is one JSON document");
    assert_eq!(payload["command"], "run");
    assert_eq!(payload["exit_code"], 0);
    assert_eq!(payload["metrics"]["status"], "SUCCESS");
    assert_eq!(payload["metrics"]["files_found"], 1);
    assert_eq!(payload["metrics"]["files_deleted"], 1);
    assert!(!artifact.exists());
    assert!(ws.root().join("keep.txt").exists());
    assert!(ws.audit_path().exists());
}

#[test]
fn dry_run_prints_human_report() {
    let ws = Workspace::new();
    let artifact = ws.file(".a!b.swp", b"payload", HOUR);
    let target = ws.root().display().to_string();
    let env = env_for(&ws);

    let result = run_cli_case_with_env(
        "dry_run_human",
        &["--no-color", "run", &target, "--min-age", "0", "--dry-run"],
        &borrowed(&env),
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("Sweep finished: SUCCESS"));
    assert!(result.stdout.contains("== Summary =="));
    assert!(result.stdout.contains("(dry run)"));
    assert!(artifact.exists());
}

#[test]
fn failed_run_exits_non_zero_only_with_flag() {
    let ws = Workspace::new();
    ws.file(".young!a", b"x", 0);
    let target = ws.root().display().to_string();
    let env = env_for(&ws);

    let lenient = run_cli_case_with_env(
        "failed_run_lenient",
        &["--json", "run", &target, "--min-age", "3600"],
        &borrowed(&env),
    );
    assert_eq!(lenient.status.code(), Some(0), "log: {}", lenient.log_path.display());

    let strict = run_cli_case_with_env(
        "failed_run_strict",
        &["--json", "run", &target, "--min-age", "3600", "--exit-on-failure"],
        &borrowed(&env),
    );
    assert_eq!(strict.status.code(), Some(1), "log: {}", strict.log_path.display());
    let payload: serde_json::Value = serde_json::from_str(strict.stdout.trim()).unwrap();
    assert_eq!(payload["metrics"]["status"], "FAILED");
}

#[test]
fn config_path_reports_default_location() {
    let ws = Workspace::new();
    let env = env_for(&ws);
    let result = run_cli_case_with_env("config_path", &["config", "path"], &borrowed(&env));
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("config.toml"));
}

#[test]
fn config_validate_rejects_bad_env() {
    let ws = Workspace::new();
    let mut env = env_for(&ws);
    env.push(("ASW_ENABLE_HASHING", "sometimes".to_string()));
    let result = run_cli_case_with_env(
        "config_validate_bad_env",
        &["config", "validate"],
        &borrowed(&env),
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
}

#[test]
fn history_lists_previous_runs() {
    let ws = Workspace::new();
    ws.file(".a!b", b"x", HOUR);
    let target = ws.root().display().to_string();
    let env = env_for(&ws);

    let run = run_cli_case_with_env(
        "history_seed_run",
        &["--json", "run", &target, "--min-age", "0"],
        &borrowed(&env),
    );
    assert!(run.status.success(), "log: {}", run.log_path.display());

    let history = run_cli_case_with_env("history_list", &["--json", "history"], &borrowed(&env));
    assert!(history.status.success(), "log: {}", history.log_path.display());
    let payload: serde_json::Value = serde_json::from_str(history.stdout.trim()).unwrap();
    assert_eq!(payload["command"], "history");
    assert_eq!(payload["runs"].as_array().map(Vec::len), Some(1));
    assert_eq!(payload["runs"][0]["file_count"], 1);
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    let result = run_cli_case("unknown_subcommand", &["sweep-everything"]);
    assert!(!result.status.success());
    assert!(result.stderr.contains("unrecognized subcommand"));
}
