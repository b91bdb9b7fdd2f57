//! JSON-file trend store: keeps the last N run samples and compares the
//! current run against their mean.
//!
//! A metric moving more than 20% above or below the historical mean is
//! `increasing` / `decreasing`; anything closer is `stable`. Without history
//! every label is `insufficient-data`.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SweepError};
use crate::scanner::patterns::PatternCategory;
use crate::scanner::scoring::RiskLevel;
use crate::trends::{
    FileMetrics, OperationId, TrendAnalysis, TrendCollector, TrendDirection, TrendSummary,
};

/// Relative change from the historical mean that counts as a trend.
pub const TREND_THRESHOLD: f64 = 0.20;

const HISTORY_SCHEMA_VERSION: u32 = 1;

/// One persisted run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSample {
    pub timestamp: String,
    pub kind: String,
    pub method: String,
    pub success: bool,
    pub error_count: usize,
    pub file_count: u64,
    pub total_bytes: u64,
    pub mean_size_bytes: f64,
    pub mean_age_secs: f64,
    pub high_risk: u64,
    /// Keyed by category label.
    pub categories: BTreeMap<String, u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    schema_version: u32,
    runs: Vec<RunSample>,
}

#[derive(Debug, Default)]
struct CurrentRun {
    next_id: u64,
    operation: Option<(OperationId, String, String)>,
    outcome: Option<(bool, usize)>,
    files: Vec<FileMetrics>,
}

pub struct HistoryStore {
    path: PathBuf,
    limit: usize,
    history: Mutex<Vec<RunSample>>,
    current: Mutex<CurrentRun>,
}

impl HistoryStore {
    /// Open the store at `path`. A missing file starts an empty history; an
    /// unreadable or corrupt one is logged and also starts empty.
    #[must_use]
    pub fn open(path: &Path, limit: usize) -> Self {
        let history = match load_history(path) {
            Ok(runs) => runs,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable trend history");
                Vec::new()
            }
        };
        Self {
            path: path.to_path_buf(),
            limit: limit.max(1),
            history: Mutex::new(history),
            current: Mutex::new(CurrentRun::default()),
        }
    }

    /// Runs persisted so far, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<RunSample> {
        self.history.lock().clone()
    }

    fn current_sample(&self) -> RunSample {
        let current = self.current.lock();
        let (kind, method) = current
            .operation
            .as_ref()
            .map(|(_, k, m)| (k.clone(), m.clone()))
            .unwrap_or_default();
        let (success, error_count) = current.outcome.unwrap_or((true, 0));
        summarize(&current.files, kind, method, success, error_count)
    }
}

impl TrendCollector for HistoryStore {
    fn start_operation(&self, kind: &str, method: &str) -> OperationId {
        let mut current = self.current.lock();
        current.next_id += 1;
        let id = OperationId(current.next_id);
        current.operation = Some((id, kind.to_string(), method.to_string()));
        current.outcome = None;
        current.files.clear();
        id
    }

    fn complete_operation(&self, id: OperationId, success: bool, errors: &[String]) {
        let mut current = self.current.lock();
        if current.operation.as_ref().is_some_and(|(op, _, _)| *op == id) {
            current.outcome = Some((success, errors.len()));
        } else {
            tracing::debug!(id = id.0, "completion for unknown trend operation ignored");
        }
    }

    fn record_file_metrics(&self, metrics: &FileMetrics) {
        self.current.lock().files.push(metrics.clone());
    }

    fn analyze_patterns(&self) -> TrendAnalysis {
        let sample = self.current_sample();
        let summary = compare(&sample, &self.history.lock());
        let recommendations = recommend(&sample, &summary);
        TrendAnalysis {
            summary,
            recommendations,
        }
    }

    fn save_metrics(&self) -> Result<()> {
        let sample = self.current_sample();
        let mut history = self.history.lock();
        let mut runs = history.clone();
        runs.push(sample);
        let excess = runs.len().saturating_sub(self.limit);
        runs.drain(..excess);
        let file = HistoryFile {
            schema_version: HISTORY_SCHEMA_VERSION,
            runs,
        };
        write_history_atomic(&self.path, &file)?;
        *history = file.runs;
        Ok(())
    }
}

/// Read the persisted runs; a missing file is an empty history.
pub fn load_history(path: &Path) -> Result<Vec<RunSample>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(path).map_err(|e| SweepError::io(path, e))?;
    let file: HistoryFile = serde_json::from_str(&raw)?;
    Ok(file.runs)
}

fn write_history_atomic(path: &Path, file: &HistoryFile) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| SweepError::io(parent, e))?;
    }
    let tmp_path = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(file)?;

    let result = (|| -> std::io::Result<()> {
        let mut out = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        out.write_all(json.as_bytes())?;
        out.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if let Err(err) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(SweepError::io(path, err));
    }
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn summarize(
    files: &[FileMetrics],
    kind: String,
    method: String,
    success: bool,
    error_count: usize,
) -> RunSample {
    let file_count = files.len() as u64;
    let total_bytes: u64 = files.iter().map(|f| f.size_bytes).sum();
    let total_age: u64 = files.iter().map(|f| f.age_secs).sum();
    let (mean_size_bytes, mean_age_secs) = if file_count == 0 {
        (0.0, 0.0)
    } else {
        (
            total_bytes as f64 / file_count as f64,
            total_age as f64 / file_count as f64,
        )
    };
    let mut categories = BTreeMap::new();
    for f in files {
        *categories.entry(f.category.label().to_string()).or_insert(0) += 1;
    }
    RunSample {
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        kind,
        method,
        success,
        error_count,
        file_count,
        total_bytes,
        mean_size_bytes,
        mean_age_secs,
        high_risk: files
            .iter()
            .filter(|f| f.risk_level == Some(RiskLevel::High))
            .count() as u64,
        categories,
    }
}

#[allow(clippy::cast_precision_loss)]
fn compare(sample: &RunSample, history: &[RunSample]) -> TrendSummary {
    if history.is_empty() {
        return TrendSummary::default();
    }
    let with_files: Vec<&RunSample> = history.iter().filter(|r| r.file_count > 0).collect();
    let per_file = |value: fn(&RunSample) -> f64| {
        if sample.file_count == 0 || with_files.is_empty() {
            TrendDirection::InsufficientData
        } else {
            let mean = with_files.iter().map(|r| value(r)).sum::<f64>() / with_files.len() as f64;
            direction(value(sample), mean)
        }
    };
    let mean_count =
        history.iter().map(|r| r.file_count as f64).sum::<f64>() / history.len() as f64;

    TrendSummary {
        size_trend: per_file(|r| r.mean_size_bytes),
        age_trend: per_file(|r| r.mean_age_secs),
        frequency_trend: direction(sample.file_count as f64, mean_count),
    }
}

fn direction(current: f64, mean: f64) -> TrendDirection {
    if mean <= f64::EPSILON {
        return if current > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Stable
        };
    }
    let ratio = current / mean;
    if ratio > 1.0 + TREND_THRESHOLD {
        TrendDirection::Increasing
    } else if ratio < 1.0 - TREND_THRESHOLD {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}

fn recommend(sample: &RunSample, summary: &TrendSummary) -> Vec<String> {
    let mut out = Vec::new();
    if summary.frequency_trend == TrendDirection::InsufficientData {
        out.push(
            "Not enough run history for trend analysis yet; keep sweeping to build a baseline."
                .to_string(),
        );
    }
    if summary.frequency_trend == TrendDirection::Increasing {
        out.push(
            "Artifacts are appearing more often than usual; consider sweeping more frequently."
                .to_string(),
        );
    }
    if summary.size_trend == TrendDirection::Increasing {
        out.push(
            "Artifact sizes are growing; check which tools leave large temporary files behind."
                .to_string(),
        );
    }
    if sample.high_risk > 0 {
        out.push(format!(
            "{} high-risk artifact(s) seen; enable backup_before_delete for this target.",
            sample.high_risk
        ));
    }
    let count = |category: PatternCategory| {
        sample
            .categories
            .get(category.label())
            .copied()
            .unwrap_or(0)
    };
    if count(PatternCategory::SwapFile) * 2 > sample.file_count && sample.file_count > 0 {
        out.push("Swap files dominate; look for crashed or abandoned editor sessions.".to_string());
    }
    if count(PatternCategory::LockFile) > 0 {
        out.push("Lock files were found; make sure no running tool still holds them.".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(category: PatternCategory, size_bytes: u64, risk: Option<RiskLevel>) -> FileMetrics {
        FileMetrics {
            path: PathBuf::from("/w/.a!b"),
            category,
            size_bytes,
            age_secs: 600,
            risk_level: risk,
            risk_score: None,
        }
    }

    fn run_with(store: &HistoryStore, sizes: &[u64]) {
        let id = store.start_operation("cleanup", "sequential");
        for size in sizes {
            store.record_file_metrics(&metrics(PatternCategory::Unknown, *size, None));
        }
        store.complete_operation(id, true, &[]);
    }

    #[test]
    fn first_run_has_insufficient_data() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::open(&dir.path().join("trends.json"), 10);
        run_with(&store, &[100, 200]);
        let analysis = store.analyze_patterns();
        assert_eq!(analysis.summary, TrendSummary::default());
        assert!(analysis.recommendations[0].contains("Not enough run history"));
    }

    #[test]
    fn saved_history_drives_next_comparison() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trends.json");

        let store = HistoryStore::open(&path, 10);
        run_with(&store, &[100, 100]);
        store.save_metrics().unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let store = HistoryStore::open(&path, 10);
        assert_eq!(store.history().len(), 1);
        run_with(&store, &[1000, 1000, 1000, 1000]);
        let summary = store.analyze_patterns().summary;
        assert_eq!(summary.size_trend, TrendDirection::Increasing);
        assert_eq!(summary.frequency_trend, TrendDirection::Increasing);
        assert_eq!(summary.age_trend, TrendDirection::Stable);

        run_with(&store, &[]);
        let summary = store.analyze_patterns().summary;
        assert_eq!(summary.frequency_trend, TrendDirection::Decreasing);
        assert_eq!(summary.size_trend, TrendDirection::InsufficientData);
    }

    #[test]
    fn history_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trends.json");
        for _ in 0..5 {
            let store = HistoryStore::open(&path, 3);
            run_with(&store, &[1]);
            store.save_metrics().unwrap();
        }
        assert_eq!(load_history(&path).unwrap().len(), 3);
    }

    #[test]
    fn corrupt_history_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trends.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(load_history(&path).is_err());
        let store = HistoryStore::open(&path, 3);
        assert!(store.history().is_empty());
    }

    #[test]
    fn high_risk_and_lock_files_produce_advice() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::open(&dir.path().join("trends.json"), 3);
        store.start_operation("cleanup", "parallel");
        store.record_file_metrics(&metrics(PatternCategory::LockFile, 10, Some(RiskLevel::High)));
        let recs = store.analyze_patterns().recommendations;
        assert!(recs.iter().any(|r| r.starts_with("1 high-risk")));
        assert!(recs.iter().any(|r| r.contains("Lock files")));
    }

    #[test]
    fn direction_thresholds() {
        assert_eq!(direction(121.0, 100.0), TrendDirection::Increasing);
        assert_eq!(direction(119.0, 100.0), TrendDirection::Stable);
        assert_eq!(direction(81.0, 100.0), TrendDirection::Stable);
        assert_eq!(direction(79.0, 100.0), TrendDirection::Decreasing);
        assert_eq!(direction(0.0, 0.0), TrendDirection::Stable);
        assert_eq!(direction(3.0, 0.0), TrendDirection::Increasing);
    }
}
