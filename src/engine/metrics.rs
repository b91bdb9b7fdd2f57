//! Per-run counters, error ledger and terminal status.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::backup::manager::BackupRecord;
use crate::core::errors::SweepError;
use crate::scanner::discovery::StrategyReport;
use crate::scanner::patterns::PatternCategory;
use crate::scanner::scoring::RiskHistogram;
use crate::trends::TrendSummary;

/// Failure taxonomy. Only the last two can fail a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    DiscoveryFailure,
    ValidationRejection,
    HashFailure,
    BackupFailure,
    BackupIntegrityFailure,
    DeleteFailure,
    FinalValidationFailure,
    FatalRunException,
}

impl FailureKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::DiscoveryFailure => "DiscoveryFailure",
            Self::ValidationRejection => "ValidationRejection",
            Self::HashFailure => "HashFailure",
            Self::BackupFailure => "BackupFailure",
            Self::BackupIntegrityFailure => "BackupIntegrityFailure",
            Self::DeleteFailure => "DeleteFailure",
            Self::FinalValidationFailure => "FinalValidationFailure",
            Self::FatalRunException => "FatalRunException",
        }
    }

    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::FinalValidationFailure | Self::FatalRunException)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// One entry in the error or warning list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunError {
    pub kind: FailureKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub code: &'static str,
    pub message: String,
}

impl RunError {
    #[must_use]
    pub fn new(kind: FailureKind, error: &SweepError, path: Option<&Path>) -> Self {
        Self {
            kind,
            path: path.map(Path::to_path_buf),
            code: error.code(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Success,
    Partial,
    Failed,
}

impl RunStatus {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Partial => "PARTIAL",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Everything one run produced. Zeroed at run start.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetrics {
    pub run_id: String,
    pub target_dir: PathBuf,
    pub dry_run: bool,
    pub execution_mode: &'static str,
    pub files_found: u64,
    pub files_deleted: u64,
    pub files_backed_up: u64,
    pub files_skipped: u64,
    pub bytes_processed: u64,
    pub hashes_generated: u64,
    pub parallel_operations: u64,
    pub audit_entries: u64,
    /// Peak concurrent delete operations.
    pub max_in_flight: usize,
    pub strategies: Vec<StrategyReport>,
    pub errors: Vec<RunError>,
    /// Non-fatal, strategy-scoped problems that do not affect status.
    pub warnings: Vec<RunError>,
    pub skipped: Vec<SkippedFile>,
    pub pattern_counts: BTreeMap<PatternCategory, u64>,
    pub risk: RiskHistogram,
    pub risk_scored_files: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trends: Option<TrendSummary>,
    pub recommendations: Vec<String>,
    pub backups: Vec<BackupRecord>,
    pub remaining_artifacts: Vec<PathBuf>,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    pub status: RunStatus,
}

impl RunMetrics {
    #[must_use]
    pub fn new(run_id: String, target_dir: PathBuf, dry_run: bool) -> Self {
        Self {
            run_id,
            target_dir,
            dry_run,
            execution_mode: "sequential",
            files_found: 0,
            files_deleted: 0,
            files_backed_up: 0,
            files_skipped: 0,
            bytes_processed: 0,
            hashes_generated: 0,
            parallel_operations: 0,
            audit_entries: 0,
            max_in_flight: 0,
            strategies: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            skipped: Vec::new(),
            pattern_counts: BTreeMap::new(),
            risk: RiskHistogram::default(),
            risk_scored_files: 0,
            trends: None,
            recommendations: Vec::new(),
            backups: Vec::new(),
            remaining_artifacts: Vec::new(),
            start_time: Utc::now(),
            end_time: None,
            duration_ms: 0,
            status: RunStatus::Success,
        }
    }

    /// FAILED on a fatal failure, PARTIAL on any other error, else SUCCESS.
    #[must_use]
    pub fn derive_status(&self) -> RunStatus {
        if self.errors.iter().any(|e| e.kind.is_fatal()) {
            RunStatus::Failed
        } else if self.errors.is_empty() {
            RunStatus::Success
        } else {
            RunStatus::Partial
        }
    }

    pub fn finalize(&mut self) {
        let end = Utc::now();
        self.duration_ms = u64::try_from((end - self.start_time).num_milliseconds()).unwrap_or(0);
        self.end_time = Some(end);
        self.status = self.derive_status();
    }

    #[must_use]
    pub fn errors_of(&self, kind: FailureKind) -> usize {
        self.errors.iter().filter(|e| e.kind == kind).count()
    }
}
