//! Cross-run trend analysis, injected into the engine as a capability.
//!
//! The engine only calls [`TrendCollector`]; where history lives and how
//! trends are computed is the collector's business. [`HistoryStore`] keeps a
//! JSON file of recent runs, [`NoopTrendCollector`] keeps nothing.

#![allow(missing_docs)]

pub mod history;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::errors::Result;
use crate::scanner::patterns::PatternCategory;
use crate::scanner::scoring::RiskLevel;

pub use history::HistoryStore;

/// Handle returned by [`TrendCollector::start_operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(pub u64);

/// What the analyzer learned about one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetrics {
    pub path: PathBuf,
    pub category: PatternCategory,
    pub size_bytes: u64,
    pub age_secs: u64,
    pub risk_level: Option<RiskLevel>,
    pub risk_score: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

impl TrendDirection {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
            Self::InsufficientData => "insufficient-data",
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub size_trend: TrendDirection,
    pub age_trend: TrendDirection,
    pub frequency_trend: TrendDirection,
}

impl Default for TrendSummary {
    fn default() -> Self {
        Self {
            size_trend: TrendDirection::InsufficientData,
            age_trend: TrendDirection::InsufficientData,
            frequency_trend: TrendDirection::InsufficientData,
        }
    }
}

/// Trend labels plus free-text advice, embedded verbatim in the report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub summary: TrendSummary,
    pub recommendations: Vec<String>,
}

/// Historical trend store consumed by the engine.
pub trait TrendCollector: Send + Sync {
    fn start_operation(&self, kind: &str, method: &str) -> OperationId;

    fn complete_operation(&self, id: OperationId, success: bool, errors: &[String]);

    fn record_file_metrics(&self, metrics: &FileMetrics);

    fn analyze_patterns(&self) -> TrendAnalysis;

    /// Persist what this run recorded.
    fn save_metrics(&self) -> Result<()>;
}

/// Collector that records nothing and always reports insufficient data.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTrendCollector;

impl TrendCollector for NoopTrendCollector {
    fn start_operation(&self, _kind: &str, _method: &str) -> OperationId {
        OperationId(0)
    }

    fn complete_operation(&self, _id: OperationId, _success: bool, _errors: &[String]) {}

    fn record_file_metrics(&self, _metrics: &FileMetrics) {}

    fn analyze_patterns(&self) -> TrendAnalysis {
        TrendAnalysis::default()
    }

    fn save_metrics(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_labels_match_serde() {
        for dir in [
            TrendDirection::Increasing,
            TrendDirection::Decreasing,
            TrendDirection::Stable,
            TrendDirection::InsufficientData,
        ] {
            let json = serde_json::to_string(&dir).unwrap();
            assert_eq!(json, format!("\"{}\"", dir.label()));
        }
        assert_eq!(format!("{:<8}|", TrendDirection::Stable), "stable  |");
    }

    #[test]
    fn noop_reports_insufficient_data() {
        let noop = NoopTrendCollector;
        let id = noop.start_operation("cleanup", "parallel");
        noop.complete_operation(id, true, &[]);
        let analysis = noop.analyze_patterns();
        assert_eq!(analysis.summary, TrendSummary::default());
        assert!(analysis.recommendations.is_empty());
        noop.save_metrics().unwrap();
    }
}
