//! Configuration system: TOML file + env var overrides + per-invocation overrides.
//!
//! A [`SweepConfig`] is immutable for the duration of one run. Defaults are
//! loaded once with [`SweepConfig::load`]; callers then layer a
//! [`ConfigOverrides`] on top for each invocation.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SweepError};
use crate::scanner::patterns::ArtifactMatcher;

/// Default artifact naming convention: hidden file with an embedded `!` sentinel.
pub const DEFAULT_FILE_PATTERN: &str = ".*!*";

/// Flat run configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SweepConfig {
    pub target_dir: PathBuf,
    pub file_pattern: String,
    pub max_depth: usize,
    pub dry_run: bool,
    pub backup_before_delete: bool,
    pub enable_hashing: bool,
    pub enable_audit_log: bool,
    pub audit_log_path: PathBuf,
    pub max_file_size: u64,
    pub min_file_age_secs: u64,
    pub enable_parallel: bool,
    pub parallel_limit: usize,
    pub enable_pattern_analysis: bool,
    pub enable_risk_assessment: bool,
    pub exit_on_failure: bool,
    /// Worker threads used by the native directory walker.
    pub scan_threads: usize,
    /// Program used by the external enumeration strategy.
    pub find_program: PathBuf,
    /// Where the default trend store keeps cross-run history.
    pub trend_history_path: PathBuf,
    /// Number of past runs retained in the trend history.
    pub trend_history_limit: usize,
}

/// Per-invocation overrides. `None` leaves the loaded value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub target_dir: Option<PathBuf>,
    pub file_pattern: Option<String>,
    pub max_depth: Option<usize>,
    pub dry_run: Option<bool>,
    pub backup_before_delete: Option<bool>,
    pub enable_hashing: Option<bool>,
    pub enable_audit_log: Option<bool>,
    pub audit_log_path: Option<PathBuf>,
    pub max_file_size: Option<u64>,
    pub min_file_age_secs: Option<u64>,
    pub enable_parallel: Option<bool>,
    pub parallel_limit: Option<usize>,
    pub enable_pattern_analysis: Option<bool>,
    pub enable_risk_assessment: Option<bool>,
    pub exit_on_failure: Option<bool>,
    pub scan_threads: Option<usize>,
    pub find_program: Option<PathBuf>,
    pub trend_history_path: Option<PathBuf>,
    pub trend_history_limit: Option<usize>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        let data = data_dir();
        Self {
            target_dir: PathBuf::from("."),
            file_pattern: DEFAULT_FILE_PATTERN.to_string(),
            max_depth: 3,
            dry_run: false,
            backup_before_delete: false,
            enable_hashing: true,
            enable_audit_log: true,
            audit_log_path: data.join("audit.jsonl"),
            max_file_size: 100 * 1024 * 1024,
            min_file_age_secs: 5,
            enable_parallel: true,
            parallel_limit: 4,
            enable_pattern_analysis: true,
            enable_risk_assessment: true,
            exit_on_failure: false,
            scan_threads: 4,
            find_program: PathBuf::from("find"),
            trend_history_path: data.join("trends.json"),
            trend_history_limit: 50,
        }
    }
}

fn home_dir() -> PathBuf {
    env::var_os("HOME").map_or_else(
        || {
            eprintln!("[ASW-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    )
}

fn data_dir() -> PathBuf {
    home_dir().join(".local").join("share").join("asw")
}

impl SweepConfig {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        home_dir().join(".config").join("asw").join("config.toml")
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| SweepError::Io {
                path: path_buf.clone(),
                source,
            })?;
            toml::from_str::<Self>(&raw)?
        } else if path.is_some() {
            return Err(SweepError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.apply_env_overrides_from(env_var)?;
        cfg.normalize_paths();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Layer per-invocation overrides on top of this config and re-validate.
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Result<Self> {
        let o = overrides.clone();
        override_slot(&mut self.target_dir, o.target_dir);
        override_slot(&mut self.file_pattern, o.file_pattern);
        override_slot(&mut self.max_depth, o.max_depth);
        override_slot(&mut self.dry_run, o.dry_run);
        override_slot(&mut self.backup_before_delete, o.backup_before_delete);
        override_slot(&mut self.enable_hashing, o.enable_hashing);
        override_slot(&mut self.enable_audit_log, o.enable_audit_log);
        override_slot(&mut self.audit_log_path, o.audit_log_path);
        override_slot(&mut self.max_file_size, o.max_file_size);
        override_slot(&mut self.min_file_age_secs, o.min_file_age_secs);
        override_slot(&mut self.enable_parallel, o.enable_parallel);
        override_slot(&mut self.parallel_limit, o.parallel_limit);
        override_slot(&mut self.enable_pattern_analysis, o.enable_pattern_analysis);
        override_slot(&mut self.enable_risk_assessment, o.enable_risk_assessment);
        override_slot(&mut self.exit_on_failure, o.exit_on_failure);
        override_slot(&mut self.scan_threads, o.scan_threads);
        override_slot(&mut self.find_program, o.find_program);
        override_slot(&mut self.trend_history_path, o.trend_history_path);
        override_slot(&mut self.trend_history_limit, o.trend_history_limit);
        self.normalize_paths();
        self.validate()?;
        Ok(self)
    }

    /// Deterministic hash of the effective config for the audit trail.
    ///
    /// FNV-1a keeps the value stable across processes and toolchains.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    /// Render the effective config as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("ASW_TARGET_DIR") {
            self.target_dir = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("ASW_FILE_PATTERN") {
            self.file_pattern = raw;
        }
        if let Some(raw) = lookup("ASW_AUDIT_LOG_PATH") {
            self.audit_log_path = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("ASW_FIND_PROGRAM") {
            self.find_program = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("ASW_TREND_HISTORY_PATH") {
            self.trend_history_path = PathBuf::from(raw);
        }

        for (name, slot) in [
            ("ASW_MAX_DEPTH", &mut self.max_depth),
            ("ASW_PARALLEL_LIMIT", &mut self.parallel_limit),
            ("ASW_SCAN_THREADS", &mut self.scan_threads),
            ("ASW_TREND_HISTORY_LIMIT", &mut self.trend_history_limit),
        ] {
            if let Some(raw) = lookup(name) {
                *slot = parse_env(name, &raw)?;
            }
        }

        for (name, slot) in [
            ("ASW_MAX_FILE_SIZE", &mut self.max_file_size),
            ("ASW_MIN_FILE_AGE_SECS", &mut self.min_file_age_secs),
        ] {
            if let Some(raw) = lookup(name) {
                *slot = parse_env(name, &raw)?;
            }
        }

        for (name, slot) in [
            ("ASW_DRY_RUN", &mut self.dry_run),
            ("ASW_BACKUP_BEFORE_DELETE", &mut self.backup_before_delete),
            ("ASW_ENABLE_HASHING", &mut self.enable_hashing),
            ("ASW_ENABLE_AUDIT_LOG", &mut self.enable_audit_log),
            ("ASW_ENABLE_PARALLEL", &mut self.enable_parallel),
            (
                "ASW_ENABLE_PATTERN_ANALYSIS",
                &mut self.enable_pattern_analysis,
            ),
            ("ASW_ENABLE_RISK_ASSESSMENT", &mut self.enable_risk_assessment),
            ("ASW_EXIT_ON_FAILURE", &mut self.exit_on_failure),
        ] {
            if let Some(raw) = lookup(name) {
                *slot = parse_env(name, &raw)?;
            }
        }

        Ok(())
    }

    /// Strip trailing slashes so path comparisons and log output stay stable.
    fn normalize_paths(&mut self) {
        let s = self.target_dir.to_string_lossy();
        if s.len() > 1
            && let Some(stripped) = s.strip_suffix('/')
        {
            self.target_dir = PathBuf::from(stripped);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.target_dir.as_os_str().is_empty() {
            return Err(SweepError::InvalidConfig {
                details: "target_dir must not be empty".to_string(),
            });
        }
        if self.max_depth == 0 {
            return Err(SweepError::InvalidConfig {
                details: "max_depth must be >= 1".to_string(),
            });
        }
        if self.parallel_limit == 0 {
            return Err(SweepError::InvalidConfig {
                details: "parallel_limit must be >= 1".to_string(),
            });
        }
        if self.scan_threads == 0 {
            return Err(SweepError::InvalidConfig {
                details: "scan_threads must be >= 1".to_string(),
            });
        }
        if self.trend_history_limit == 0 {
            return Err(SweepError::InvalidConfig {
                details: "trend_history_limit must be >= 1".to_string(),
            });
        }
        if self.enable_audit_log && self.audit_log_path.as_os_str().is_empty() {
            return Err(SweepError::InvalidConfig {
                details: "audit_log_path must be set when the audit log is enabled".to_string(),
            });
        }
        ArtifactMatcher::new(&self.file_pattern)?;
        Ok(())
    }
}

fn override_slot<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|error| SweepError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

#[cfg(test)]
mod tests {
    use super::{ConfigOverrides, SweepConfig, SweepError};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn default_config_is_valid() {
        let cfg = SweepConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.file_pattern, ".*!*");
    }

    #[test]
    fn zero_parallel_limit_rejected() {
        let mut cfg = SweepConfig::default();
        cfg.parallel_limit = 0;
        let err = cfg.validate().expect_err("expected invalid parallel_limit");
        match err {
            SweepError::InvalidConfig { details } => assert!(details.contains("parallel_limit")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_max_depth_rejected() {
        let cfg = SweepConfig::default().with_overrides(&ConfigOverrides {
            max_depth: Some(0),
            ..ConfigOverrides::default()
        });
        assert!(matches!(cfg, Err(SweepError::InvalidConfig { .. })));
    }

    #[test]
    fn empty_pattern_rejected() {
        let mut cfg = SweepConfig::default();
        cfg.file_pattern = String::new();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn overrides_replace_only_set_fields() {
        let base = SweepConfig::default();
        let cfg = base
            .clone()
            .with_overrides(&ConfigOverrides {
                target_dir: Some(PathBuf::from("/srv/work/")),
                dry_run: Some(true),
                parallel_limit: Some(8),
                trend_history_limit: Some(7),
                ..ConfigOverrides::default()
            })
            .expect("overrides should validate");

        assert_eq!(cfg.target_dir, Path::new("/srv/work"));
        assert!(cfg.dry_run);
        assert_eq!(cfg.parallel_limit, 8);
        assert_eq!(cfg.trend_history_limit, 7);
        assert_eq!(cfg.max_depth, base.max_depth);
        assert_eq!(cfg.trend_history_path, base.trend_history_path);
        assert_eq!(cfg.file_pattern, base.file_pattern);
        assert_eq!(cfg.enable_hashing, base.enable_hashing);
    }

    #[test]
    fn env_overrides_parse_typed_values() {
        let env = vars(&[
            ("ASW_DRY_RUN", "true"),
            ("ASW_PARALLEL_LIMIT", "2"),
            ("ASW_MIN_FILE_AGE_SECS", "120"),
            ("ASW_FILE_PATTERN", ".*~*"),
        ]);
        let mut cfg = SweepConfig::default();
        cfg.apply_env_overrides_from(|name| env.get(name).cloned())
            .expect("env overrides should parse");
        assert!(cfg.dry_run);
        assert_eq!(cfg.parallel_limit, 2);
        assert_eq!(cfg.min_file_age_secs, 120);
        assert_eq!(cfg.file_pattern, ".*~*");
    }

    #[test]
    fn env_invalid_boolean_rejected() {
        let env = vars(&[("ASW_ENABLE_HASHING", "sometimes")]);
        let mut cfg = SweepConfig::default();
        let err = cfg
            .apply_env_overrides_from(|name| env.get(name).cloned())
            .expect_err("invalid bool should fail");
        match err {
            SweepError::ConfigParse { context, details } => {
                assert_eq!(context, "env");
                assert!(details.contains("ASW_ENABLE_HASHING"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_reads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "target_dir = \"/data/scratch\"\nmax_depth = 7\nbackup_before_delete = true\n",
        )
        .unwrap();

        let cfg = SweepConfig::load(Some(&path)).expect("config should load");
        assert_eq!(cfg.target_dir, Path::new("/data/scratch"));
        assert_eq!(cfg.max_depth, 7);
        assert!(cfg.backup_before_delete);
        assert_eq!(cfg.parallel_limit, 4);
    }

    #[test]
    fn load_returns_error_for_explicit_missing_path() {
        let err = SweepConfig::load(Some(Path::new("/definitely/not/here/asw.toml")))
            .expect_err("missing explicit path should fail");
        assert_eq!(err.code(), "ASW-1002");
    }

    #[test]
    fn stable_hash_changes_when_config_changes() {
        let cfg = SweepConfig::default();
        let before = cfg.stable_hash().expect("hash should compute");
        assert_eq!(before, cfg.stable_hash().unwrap());

        let mut changed = cfg;
        changed.dry_run = !changed.dry_run;
        assert_ne!(before, changed.stable_hash().unwrap());
    }

    #[test]
    fn toml_roundtrip_preserves_config() {
        let cfg = SweepConfig::default();
        let rendered = cfg.to_toml().unwrap();
        let parsed: SweepConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, cfg);
    }
}
