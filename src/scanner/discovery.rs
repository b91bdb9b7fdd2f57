//! Pluggable discovery: the `DiscoveryStrategy` seam, the session-scoped
//! seen-path set, and the merge step that turns raw strategy output into
//! deduplicated candidates.

#![allow(missing_docs)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;

use crate::core::errors::{Result, SweepError};
use crate::core::paths::canonical_key;
use crate::scanner::patterns::{ArtifactMatcher, PatternCategory};
use crate::scanner::scoring::RiskScore;

/// Inputs shared by every strategy for one scan.
#[derive(Debug, Clone, Copy)]
pub struct ScanRequest<'a> {
    pub root: &'a Path,
    /// Files directly under `root` are depth 1.
    pub max_depth: usize,
    pub matcher: &'a ArtifactMatcher,
}

/// Raw output of one strategy: paths plus problems that did not stop it.
#[derive(Debug, Default)]
pub struct Discovered {
    pub paths: Vec<PathBuf>,
    pub warnings: Vec<SweepError>,
}

impl From<Vec<PathBuf>> for Discovered {
    fn from(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            warnings: Vec::new(),
        }
    }
}

/// One way of enumerating artifact paths under a root.
///
/// Implementations return raw paths; filtering against the backup marker and
/// deduplication happen in [`Scanner::scan`]. A missing root must yield an
/// empty list rather than an error.
pub trait DiscoveryStrategy: Send + Sync {
    /// Stable short name used in logs, audit records and candidate provenance.
    fn name(&self) -> &'static str;

    fn discover(&self, request: &ScanRequest<'_>) -> Result<Discovered>;
}

/// Session-scoped set of canonical paths already turned into candidates.
#[derive(Debug, Default)]
pub struct SeenPaths {
    inner: HashSet<PathBuf>,
}

impl SeenPaths {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `path`; returns its canonical key when it was not seen before.
    pub fn insert(&mut self, path: &Path) -> Option<PathBuf> {
        let key = canonical_key(path);
        if self.inner.insert(key.clone()) {
            Some(key)
        } else {
            None
        }
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.inner.contains(&canonical_key(path))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Stat snapshot taken by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatSnapshot {
    pub size_bytes: u64,
    pub modified: SystemTime,
}

/// Where a candidate is in the per-file state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateState {
    Discovered,
    Validating,
    Skipped { reason: String },
    Hashing,
    BackingUp,
    Deleting,
    Done,
    Failed { reason: String },
}

/// A file discovered this run, mutated as it moves through the pipeline.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Canonical absolute path.
    pub path: PathBuf,
    /// Name of the strategy that surfaced it first.
    pub strategy: &'static str,
    pub stat: Option<StatSnapshot>,
    pub hash: Option<String>,
    pub category: Option<PatternCategory>,
    pub risk: Option<RiskScore>,
    pub state: CandidateState,
}

impl Candidate {
    #[must_use]
    pub fn new(path: PathBuf, strategy: &'static str) -> Self {
        Self {
            path,
            strategy,
            stat: None,
            hash: None,
            category: None,
            risk: None,
            state: CandidateState::Discovered,
        }
    }
}

/// Per-strategy counts for the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyReport {
    pub strategy: &'static str,
    /// Paths the strategy returned that carry the artifact name.
    pub discovered: usize,
    /// Of those, how many were not already seen.
    pub new_candidates: usize,
}

/// Merged result of one scan across every strategy.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub candidates: Vec<Candidate>,
    pub reports: Vec<StrategyReport>,
    /// Strategy-scoped failures; never fatal.
    pub failures: Vec<SweepError>,
}

/// Runs every configured strategy and merges their output through one
/// deduplicating step.
pub struct Scanner {
    strategies: Vec<Box<dyn DiscoveryStrategy>>,
}

impl Scanner {
    #[must_use]
    pub fn new(strategies: Vec<Box<dyn DiscoveryStrategy>>) -> Self {
        Self { strategies }
    }

    #[must_use]
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Scan with every strategy, in order. Candidates come out in discovery
    /// order: strategy order first, then path order within a strategy.
    pub fn scan(&self, request: &ScanRequest<'_>, seen: &mut SeenPaths) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();

        for strategy in &self.strategies {
            let Discovered {
                mut paths,
                warnings,
            } = match strategy.discover(request) {
                Ok(discovered) => discovered,
                Err(err) => {
                    tracing::warn!(strategy = strategy.name(), error = %err, "discovery strategy failed");
                    outcome.failures.push(err);
                    continue;
                }
            };
            for warning in warnings {
                tracing::warn!(strategy = strategy.name(), error = %warning, "discovery incomplete");
                outcome.failures.push(warning);
            }
            paths.sort();

            let mut report = StrategyReport {
                strategy: strategy.name(),
                discovered: 0,
                new_candidates: 0,
            };
            for path in paths {
                if !request.matcher.is_artifact(&path) {
                    continue;
                }
                report.discovered += 1;
                if let Some(key) = seen.insert(&path) {
                    report.new_candidates += 1;
                    outcome.candidates.push(Candidate::new(key, strategy.name()));
                }
            }
            tracing::debug!(
                strategy = report.strategy,
                discovered = report.discovered,
                new = report.new_candidates,
                "strategy finished"
            );
            outcome.reports.push(report);
        }

        outcome
    }
}
