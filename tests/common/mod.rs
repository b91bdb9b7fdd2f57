#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

use artifact_sweeper::core::config::SweepConfig;
use tempfile::TempDir;

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_asw") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "asw.exe" } else { "asw" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve asw binary path for integration test"),
    }
}

/// Run the CLI with `args`, keeping a transcript under the temp dir.
pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    run_cli_case_with_env(case_name, args, &[])
}

pub fn run_cli_case_with_env(case_name: &str, args: &[&str], env: &[(&str, &str)]) -> CmdResult {
    let root = std::env::temp_dir().join("asw-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let output = Command::new(&bin_path)
        .args(args)
        .envs(env.iter().copied())
        .env("RUST_BACKTRACE", "1")
        .output()
        .expect("execute asw command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

/// A target directory to sweep plus a separate scratch directory for the
/// audit log and trend history, so neither shows up in the target.
pub struct Workspace {
    pub target: TempDir,
    pub scratch: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            target: tempfile::tempdir().expect("target tempdir"),
            scratch: tempfile::tempdir().expect("scratch tempdir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.target.path()
    }

    pub fn audit_path(&self) -> PathBuf {
        self.scratch.path().join("audit.jsonl")
    }

    pub fn trends_path(&self) -> PathBuf {
        self.scratch.path().join("trends.json")
    }

    /// Live, no age floor, sequential, audit and trends in scratch.
    pub fn config(&self) -> SweepConfig {
        SweepConfig {
            target_dir: self.root().to_path_buf(),
            min_file_age_secs: 0,
            audit_log_path: self.audit_path(),
            trend_history_path: self.trends_path(),
            ..SweepConfig::default()
        }
    }

    /// Write `contents` at `rel` (creating parents) with mtime `age_secs` ago.
    pub fn file(&self, rel: &str, contents: &[u8], age_secs: i64) -> PathBuf {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fixture parent");
        }
        fs::write(&path, contents).expect("write fixture");
        let now = filetime::FileTime::now();
        let then = filetime::FileTime::from_unix_time(now.unix_seconds() - age_secs, 0);
        filetime::set_file_mtime(&path, then).expect("set fixture mtime");
        path
    }
}

/// Relative path → (contents, mtime) for every regular file under `root`.
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, (Vec<u8>, SystemTime)> {
    let mut out = BTreeMap::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).expect("read_dir").flatten() {
            let path = entry.path();
            let meta = fs::symlink_metadata(&path).expect("metadata");
            if meta.is_dir() {
                stack.push(path);
            } else if meta.is_file() {
                let rel = path.strip_prefix(root).expect("under root").to_path_buf();
                out.insert(
                    rel,
                    (fs::read(&path).expect("read"), meta.modified().expect("mtime")),
                );
            }
        }
    }
    out
}
