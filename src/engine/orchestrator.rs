//! One sweep, end to end:
//!
//! INIT → SCANNING → per-candidate {VALIDATING → SKIPPED | HASHING →
//! BACKING-UP → DELETING → DONE | FAILED} → PATTERN-ANALYSIS →
//! FINAL-VALIDATION → REPORT.
//!
//! Per-file failures accumulate in the run's error list and never abort the
//! run. Only a failed final validation or an error or panic escaping the
//! phases above marks the run FAILED.
//!
//! There is no run lock. Two runs against the same target at the same time
//! is a caller error.

#![allow(missing_docs)]

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde_json::json;

use crate::backup::hasher::sha256_file;
use crate::backup::manager::{BackupManager, CopyStrategy, FsCopy};
use crate::core::config::SweepConfig;
use crate::core::errors::{Result, SweepError};
use crate::engine::bulkhead::{self, ExecutionMode};
use crate::engine::context::{RunContext, RunPhase};
use crate::engine::metrics::{FailureKind, RunMetrics, RunStatus};
use crate::engine::report;
use crate::scanner::command::FindCommandStrategy;
use crate::scanner::deletion::{DeleteOutcome, DeletionExecutor};
use crate::scanner::discovery::{
    Candidate, CandidateState, DiscoveryStrategy, ScanRequest, Scanner, SeenPaths,
};
use crate::scanner::patterns::{ArtifactMatcher, classify};
use crate::scanner::scoring::assess;
use crate::scanner::validation::{Validator, age_of};
use crate::scanner::walker::NativeWalkStrategy;
use crate::trends::{FileMetrics, HistoryStore, TrendCollector};

/// Result of [`SweepEngine::run`].
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub metrics: RunMetrics,
    exit_on_failure: bool,
}

impl RunOutcome {
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.metrics.status
    }

    #[must_use]
    pub fn report(&self) -> String {
        report::render(&self.metrics)
    }

    /// Process exit code: non-zero only for a FAILED run with
    /// `exit_on_failure` set.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(self.exit_on_failure && self.metrics.status == RunStatus::Failed)
    }
}

/// The external enumeration strategy followed by the native walker.
#[must_use]
pub fn default_strategies(config: &SweepConfig) -> Vec<Box<dyn DiscoveryStrategy>> {
    vec![
        Box::new(FindCommandStrategy::new(config.find_program.clone())),
        Box::new(NativeWalkStrategy::new(config.scan_threads)),
    ]
}

pub struct SweepEngine {
    config: SweepConfig,
    scanner: Scanner,
    copier: Arc<dyn CopyStrategy>,
    trends: Arc<dyn TrendCollector>,
}

impl SweepEngine {
    /// Engine with both discovery strategies, plain filesystem copies and the
    /// JSON-file trend store at `trend_history_path`.
    #[must_use]
    pub fn new(config: SweepConfig) -> Self {
        let scanner = Scanner::new(default_strategies(&config));
        let trends = Arc::new(HistoryStore::open(
            &config.trend_history_path,
            config.trend_history_limit,
        ));
        Self {
            config,
            scanner,
            copier: Arc::new(FsCopy),
            trends,
        }
    }

    #[must_use]
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn DiscoveryStrategy>>) -> Self {
        self.scanner = Scanner::new(strategies);
        self
    }

    #[must_use]
    pub fn with_copier(mut self, copier: Arc<dyn CopyStrategy>) -> Self {
        self.copier = copier;
        self
    }

    #[must_use]
    pub fn with_trend_collector(mut self, trends: Arc<dyn TrendCollector>) -> Self {
        self.trends = trends;
        self
    }

    #[must_use]
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Execute one run with a fresh context. Never returns an error: failures
    /// are folded into the returned metrics and status.
    pub fn run(&self) -> RunOutcome {
        let ctx = RunContext::new(self.config.clone(), Arc::clone(&self.trends));
        let run_id = ctx.metrics().run_id.clone();
        tracing::info!(
            run_id = %run_id,
            target = %self.config.target_dir.display(),
            dry_run = self.config.dry_run,
            "sweep started"
        );
        ctx.info(
            "run started",
            json!({
                "run_id": run_id,
                "target_dir": self.config.target_dir.display().to_string(),
                "file_pattern": self.config.file_pattern,
                "dry_run": self.config.dry_run,
                "strategies": self.scanner.strategy_names(),
                "config_hash": self.config.stable_hash().ok(),
                "audit_log": ctx.audit().path().map(|p| p.display().to_string()),
            }),
        );

        match panic::catch_unwind(AssertUnwindSafe(|| self.drive(&ctx))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => ctx.fail(FailureKind::FatalRunException, &err, None),
            Err(payload) => ctx.fail(
                FailureKind::FatalRunException,
                &SweepError::Runtime {
                    details: format!("run panicked: {}", panic_message(payload.as_ref())),
                },
                None,
            ),
        }

        ctx.enter_phase(RunPhase::Report);
        let metrics = ctx.finish();
        tracing::info!(
            run_id = %metrics.run_id,
            status = metrics.status.label(),
            found = metrics.files_found,
            deleted = metrics.files_deleted,
            errors = metrics.errors.len(),
            "sweep finished"
        );
        RunOutcome {
            metrics,
            exit_on_failure: self.config.exit_on_failure,
        }
    }

    fn drive(&self, ctx: &RunContext) -> Result<()> {
        let config = ctx.config();
        let matcher = ArtifactMatcher::new(&config.file_pattern)?;
        let request = ScanRequest {
            root: &config.target_dir,
            max_depth: config.max_depth,
            matcher: &matcher,
        };

        ctx.enter_phase(RunPhase::Scanning);
        let scan = self.scanner.scan(&request, &mut ctx.seen());
        for failure in &scan.failures {
            ctx.warn(FailureKind::DiscoveryFailure, failure);
        }
        let mut candidates = scan.candidates;
        {
            let mut m = ctx.metrics();
            m.files_found = candidates.len() as u64;
            m.strategies = scan.reports;
        }

        ctx.enter_phase(RunPhase::Processing);
        let now = SystemTime::now();
        let mode = ExecutionMode::select(
            config.enable_parallel,
            config.parallel_limit,
            candidates.len(),
        );
        let operation = ctx.trends().start_operation("cleanup", mode.label());
        let pipeline = Pipeline {
            validator: Validator::new(
                matcher.clone(),
                config.max_file_size,
                Duration::from_secs(config.min_file_age_secs),
            ),
            backups: BackupManager::new(Arc::clone(&self.copier)),
            deleter: DeletionExecutor::new(config.dry_run),
            now,
        };
        let issued = bulkhead::run(&mut candidates, mode, |c| pipeline.process(ctx, c));
        let errors: Vec<String> = {
            let mut m = ctx.metrics();
            m.execution_mode = mode.label();
            m.parallel_operations = issued;
            m.max_in_flight = pipeline.deleter.peak_in_flight();
            m.hashes_generated += pipeline.backups.hashes_computed();
            m.errors.iter().map(|e| e.message.clone()).collect()
        };
        ctx.trends()
            .complete_operation(operation, errors.is_empty(), &errors);

        if config.enable_pattern_analysis || config.enable_risk_assessment {
            ctx.enter_phase(RunPhase::PatternAnalysis);
            analyze(ctx, &mut candidates, now);
        }

        if !config.dry_run {
            ctx.enter_phase(RunPhase::FinalValidation);
            self.final_validation(ctx, &request);
        }
        Ok(())
    }

    /// Re-scan with a fresh seen set; anything still matching is a failure.
    fn final_validation(&self, ctx: &RunContext, request: &ScanRequest<'_>) {
        let scan = self.scanner.scan(request, &mut SeenPaths::new());
        for failure in &scan.failures {
            ctx.warn(FailureKind::DiscoveryFailure, failure);
        }

        if scan.reports.is_empty() && !self.scanner.strategy_names().is_empty() {
            ctx.fail(
                FailureKind::FinalValidationFailure,
                &SweepError::Runtime {
                    details: "no discovery strategy could re-scan the target".to_string(),
                },
                None,
            );
            return;
        }

        let remaining: Vec<PathBuf> = scan.candidates.into_iter().map(|c| c.path).collect();
        if remaining.is_empty() {
            ctx.info("final validation passed", json!({}));
            return;
        }
        ctx.fail(
            FailureKind::FinalValidationFailure,
            &SweepError::FinalValidation {
                remaining: remaining.len(),
            },
            None,
        );
        ctx.metrics().remaining_artifacts = remaining;
    }
}

/// Per-candidate stages, shared by every worker in a batch.
struct Pipeline {
    validator: Validator,
    backups: BackupManager,
    deleter: DeletionExecutor,
    now: SystemTime,
}

impl Pipeline {
    fn process(&self, ctx: &RunContext, c: &mut Candidate) {
        let config = ctx.config();

        c.state = CandidateState::Validating;
        let stat = match self.validator.validate(c, self.now) {
            Ok(stat) => stat,
            Err(reason) => {
                ctx.skip(&c.path, &reason);
                c.state = CandidateState::Skipped {
                    reason: reason.to_string(),
                };
                return;
            }
        };

        if config.enable_hashing {
            c.state = CandidateState::Hashing;
            match sha256_file(&c.path) {
                Ok(hash) => {
                    ctx.metrics().hashes_generated += 1;
                    c.hash = Some(hash);
                }
                // Backup below goes ahead unverified.
                Err(err) => ctx.fail(FailureKind::HashFailure, &err, Some(&c.path)),
            }
        }

        if config.backup_before_delete {
            c.state = CandidateState::BackingUp;
            if config.dry_run {
                ctx.info(
                    "would back up",
                    json!({ "path": c.path.display().to_string(), "hash": c.hash }),
                );
            } else {
                match self.backups.create_backup(&c.path, c.hash.as_deref()) {
                    Ok(record) => {
                        ctx.info(
                            "backup created",
                            json!({
                                "path": c.path.display().to_string(),
                                "backup_path": record.backup_path.display().to_string(),
                                "verification_hash": record.verification_hash,
                            }),
                        );
                        let mut m = ctx.metrics();
                        m.files_backed_up += 1;
                        m.backups.push(record);
                    }
                    Err(err) => {
                        let kind = if matches!(err, SweepError::BackupIntegrity { .. }) {
                            FailureKind::BackupIntegrityFailure
                        } else {
                            FailureKind::BackupFailure
                        };
                        ctx.fail(kind, &err, Some(&c.path));
                        c.state = CandidateState::Failed {
                            reason: err.to_string(),
                        };
                        return;
                    }
                }
            }
        }

        c.state = CandidateState::Deleting;
        match self.deleter.delete(&c.path, stat.size_bytes) {
            Ok(outcome) => {
                let message = match outcome {
                    DeleteOutcome::Deleted { .. } => "deleted",
                    DeleteOutcome::WouldDelete { .. } => "would delete",
                };
                ctx.info(
                    message,
                    json!({
                        "path": c.path.display().to_string(),
                        "bytes": outcome.bytes(),
                        "hash": c.hash,
                        "strategy": c.strategy,
                    }),
                );
                let mut m = ctx.metrics();
                m.files_deleted += 1;
                m.bytes_processed += outcome.bytes();
                c.state = CandidateState::Done;
            }
            Err(err) => {
                ctx.fail(FailureKind::DeleteFailure, &err, Some(&c.path));
                c.state = CandidateState::Failed {
                    reason: err.to_string(),
                };
            }
        }
    }
}

/// Classify and score every candidate that has a stat snapshot, feed the
/// trend collector, and embed its verdict in the metrics.
fn analyze(ctx: &RunContext, candidates: &mut [Candidate], now: SystemTime) {
    let config = ctx.config();
    let trends = ctx.trends();

    for c in candidates.iter_mut() {
        let Some(stat) = c.stat else {
            continue;
        };
        let category = classify(&c.path);
        let age = age_of(stat.modified, now);
        let risk = config
            .enable_risk_assessment
            .then(|| assess(category, stat.size_bytes, age));
        c.category = Some(category);
        c.risk = risk;

        {
            let mut m = ctx.metrics();
            if config.enable_pattern_analysis {
                *m.pattern_counts.entry(category).or_insert(0) += 1;
            }
            if let Some(risk) = risk {
                m.risk.record(risk.level);
                m.risk_scored_files += 1;
            }
        }

        // Every stat'd file reaches the collector, whichever analyses are on.
        trends.record_file_metrics(&FileMetrics {
            path: c.path.clone(),
            category,
            size_bytes: stat.size_bytes,
            age_secs: age.as_secs(),
            risk_level: risk.map(|r| r.level),
            risk_score: risk.map(|r| r.score),
        });
    }

    let analysis = trends.analyze_patterns();
    {
        let mut m = ctx.metrics();
        ctx.info(
            "pattern analysis",
            json!({
                "patterns": m.pattern_counts,
                "risk": m.risk,
                "trends": analysis.summary,
            }),
        );
        m.trends = Some(analysis.summary);
        m.recommendations = analysis.recommendations;
    }

    if let Err(err) = trends.save_metrics() {
        tracing::warn!(code = err.code(), "trend history not saved: {err}");
        ctx.audit().warn(
            "trend history not saved",
            json!({ "code": err.code(), "message": err.to_string() }),
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
