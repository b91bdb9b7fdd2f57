//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use artifact_sweeper::core::config::{ConfigOverrides, SweepConfig};
use artifact_sweeper::engine::metrics::RunStatus;
use artifact_sweeper::engine::orchestrator::{RunOutcome, SweepEngine};
use artifact_sweeper::trends::history::load_history;

/// Artifact sweeper: finds, verifies, backs up and removes editor/tool artifacts.
#[derive(Debug, Parser)]
#[command(
    name = "asw",
    author,
    version,
    about = "Artifact Sweeper - integrity-checked cleanup of transient files",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run one sweep against the target directory.
    Run(RunArgs),
    /// Inspect configuration.
    Config(ConfigArgs),
    /// Show recorded trend history.
    History(HistoryArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct RunArgs {
    /// Directory to sweep (defaults to the configured target).
    #[arg(value_name = "DIR")]
    target: Option<PathBuf>,
    /// Artifact file-name glob.
    #[arg(long, value_name = "GLOB")]
    pattern: Option<String>,
    /// Maximum traversal depth (direct children are depth 1).
    #[arg(long, value_name = "N")]
    max_depth: Option<usize>,
    /// Report what would be deleted without touching the filesystem.
    #[arg(long)]
    dry_run: bool,
    /// Create a verified backup before deleting each file.
    #[arg(long)]
    backup: bool,
    /// Skip content hashing.
    #[arg(long)]
    no_hash: bool,
    /// Do not write the audit log.
    #[arg(long)]
    no_audit: bool,
    /// Audit log path.
    #[arg(long, value_name = "PATH")]
    audit_log: Option<PathBuf>,
    /// Largest file (bytes) that may be deleted.
    #[arg(long, value_name = "BYTES")]
    max_size: Option<u64>,
    /// Youngest file (seconds since modification) that may be deleted.
    #[arg(long, value_name = "SECS")]
    min_age: Option<u64>,
    /// Process candidates one at a time.
    #[arg(long)]
    sequential: bool,
    /// Candidates processed concurrently per batch.
    #[arg(long, value_name = "N")]
    parallel_limit: Option<usize>,
    /// Skip pattern classification and trend analysis.
    #[arg(long)]
    no_analysis: bool,
    /// Skip risk scoring.
    #[arg(long)]
    no_risk: bool,
    /// Exit non-zero when the run ends FAILED.
    #[arg(long)]
    exit_on_failure: bool,
    /// Native walker worker threads.
    #[arg(long, value_name = "N")]
    scan_threads: Option<usize>,
    /// External enumeration program.
    #[arg(long, value_name = "PATH")]
    find_program: Option<PathBuf>,
    /// Trend history file.
    #[arg(long, value_name = "PATH")]
    trend_history: Option<PathBuf>,
    /// Past runs kept in the trend history.
    #[arg(long, value_name = "N")]
    trend_history_limit: Option<usize>,
}

impl RunArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            target_dir: self.target.clone(),
            file_pattern: self.pattern.clone(),
            max_depth: self.max_depth,
            dry_run: self.dry_run.then_some(true),
            backup_before_delete: self.backup.then_some(true),
            enable_hashing: self.no_hash.then_some(false),
            enable_audit_log: self.no_audit.then_some(false),
            audit_log_path: self.audit_log.clone(),
            max_file_size: self.max_size,
            min_file_age_secs: self.min_age,
            enable_parallel: self.sequential.then_some(false),
            parallel_limit: self.parallel_limit,
            enable_pattern_analysis: self.no_analysis.then_some(false),
            enable_risk_assessment: self.no_risk.then_some(false),
            exit_on_failure: self.exit_on_failure.then_some(true),
            scan_threads: self.scan_threads,
            find_program: self.find_program.clone(),
            trend_history_path: self.trend_history.clone(),
            trend_history_limit: self.trend_history_limit,
        }
    }
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
    /// Validate configuration and exit.
    Validate,
}

#[derive(Debug, Clone, Args, Default)]
struct HistoryArgs {
    /// Number of most recent runs to show.
    #[arg(long, default_value_t = 10, value_name = "N")]
    limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
        }
    }
}

impl Cli {
    /// Default tracing filter for the verbosity flags; `ASW_LOG` wins.
    pub const fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }
}

/// Dispatch CLI commands; returns the process exit code.
pub fn run(cli: &Cli) -> Result<i32, CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Run(args) => run_sweep(cli, args),
        Command::Config(args) => run_config(cli, args).map(|()| 0),
        Command::History(args) => run_history(cli, args).map(|()| 0),
    }
}

fn load_config(cli: &Cli) -> Result<SweepConfig, CliError> {
    SweepConfig::load(cli.config.as_deref()).map_err(|e| CliError::User(e.to_string()))
}

fn run_sweep(cli: &Cli, args: &RunArgs) -> Result<i32, CliError> {
    let config = load_config(cli)?
        .with_overrides(&args.overrides())
        .map_err(|e| CliError::User(e.to_string()))?;

    let outcome = SweepEngine::new(config).run();

    match output_mode(cli) {
        OutputMode::Human => print_outcome_human(&outcome)?,
        OutputMode::Json => {
            let payload = json!({
                "command": "run",
                "exit_code": outcome.exit_code(),
                "metrics": serde_json::to_value(&outcome.metrics)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(outcome.exit_code())
}

fn print_outcome_human(outcome: &RunOutcome) -> Result<(), CliError> {
    let status = outcome.status().label();
    let status = match outcome.status() {
        RunStatus::Success => status.green().bold(),
        RunStatus::Partial => status.yellow().bold(),
        RunStatus::Failed => status.red().bold(),
    };
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{} {status}", "Sweep finished:".bold())?;
    writeln!(stdout)?;
    write!(stdout, "{}", outcome.report())?;
    Ok(())
}

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(SweepConfig::default_path);
            let exists = path.exists();
            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => write_json_line(&json!({
                    "command": "config path",
                    "path": path.to_string_lossy(),
                    "exists": exists,
                }))?,
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = load_config(cli)?;
            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str = config
                        .to_toml()
                        .map_err(|e| CliError::Runtime(e.to_string()))?;
                    println!("{toml_str}");
                }
                OutputMode::Json => write_json_line(&json!({
                    "command": "config show",
                    "config": serde_json::to_value(&config)?,
                }))?,
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => match SweepConfig::load(cli.config.as_deref()) {
            Ok(config) => {
                let hash = config
                    .stable_hash()
                    .map_err(|e| CliError::Runtime(e.to_string()))?;
                match output_mode(cli) {
                    OutputMode::Human => {
                        println!("Configuration is valid.");
                        println!("  Hash: {hash}");
                    }
                    OutputMode::Json => write_json_line(&json!({
                        "command": "config validate",
                        "valid": true,
                        "hash": hash,
                    }))?,
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => eprintln!("Configuration is INVALID: {e}"),
                    OutputMode::Json => write_json_line(&json!({
                        "command": "config validate",
                        "valid": false,
                        "error": e.to_string(),
                    }))?,
                }
                Err(CliError::User(format!("invalid config: {e}")))
            }
        },
    }
}

fn run_history(cli: &Cli, args: &HistoryArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let runs = load_history(&config.trend_history_path)
        .map_err(|e| CliError::Runtime(e.to_string()))?;
    let recent = &runs[runs.len().saturating_sub(args.limit)..];

    match output_mode(cli) {
        OutputMode::Human => {
            if recent.is_empty() {
                println!("No recorded runs in {}", config.trend_history_path.display());
            }
            for run in recent {
                println!(
                    "{}  {:<10} files={:<5} bytes={:<10} errors={}",
                    run.timestamp, run.method, run.file_count, run.total_bytes, run.error_count
                );
            }
        }
        OutputMode::Json => write_json_line(&json!({
            "command": "history",
            "runs": serde_json::to_value(recent)?,
        }))?,
    }
    Ok(())
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("ASW_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
