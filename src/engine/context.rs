//! Explicit per-run state: config, counters, seen-path set, audit log and the
//! injected trend collector. A fresh context is built for every run, so
//! counters never leak between runs and concurrent runs against different
//! targets share nothing.

#![allow(missing_docs)]

use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use serde_json::json;

use crate::core::config::SweepConfig;
use crate::core::errors::SweepError;
use crate::engine::metrics::{FailureKind, RunError, RunMetrics, SkippedFile};
use crate::logger::audit::AuditLog;
use crate::scanner::discovery::SeenPaths;
use crate::scanner::validation::SkipReason;
use crate::trends::TrendCollector;

/// Run-level state machine position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Init,
    Scanning,
    Processing,
    PatternAnalysis,
    FinalValidation,
    Report,
}

impl RunPhase {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Scanning => "scanning",
            Self::Processing => "processing",
            Self::PatternAnalysis => "pattern-analysis",
            Self::FinalValidation => "final-validation",
            Self::Report => "report",
        }
    }
}

pub struct RunContext {
    config: SweepConfig,
    metrics: Mutex<RunMetrics>,
    seen: Mutex<SeenPaths>,
    phase: Mutex<RunPhase>,
    audit: AuditLog,
    trends: Arc<dyn TrendCollector>,
}

impl RunContext {
    #[must_use]
    pub fn new(config: SweepConfig, trends: Arc<dyn TrendCollector>) -> Self {
        let run_id = format!(
            "{}-{}",
            chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ"),
            std::process::id()
        );
        let audit = if config.enable_audit_log {
            AuditLog::open(&config.audit_log_path)
        } else {
            AuditLog::disabled()
        };
        if let Some(path) = audit.path()
            && !audit.is_active()
        {
            tracing::warn!(path = %path.display(), "audit log unavailable, run continues without it");
        }
        let metrics = RunMetrics::new(run_id, config.target_dir.clone(), config.dry_run);
        Self {
            config,
            metrics: Mutex::new(metrics),
            seen: Mutex::new(SeenPaths::new()),
            phase: Mutex::new(RunPhase::Init),
            audit,
            trends,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    #[must_use]
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    #[must_use]
    pub fn trends(&self) -> &dyn TrendCollector {
        self.trends.as_ref()
    }

    #[must_use]
    pub fn phase(&self) -> RunPhase {
        *self.phase.lock()
    }

    pub fn enter_phase(&self, phase: RunPhase) {
        *self.phase.lock() = phase;
        tracing::debug!(phase = phase.label(), "run phase");
        self.audit.info("phase", json!({ "phase": phase.label() }));
    }

    /// Lock the counters. Keep the guard short; workers share it.
    pub fn metrics(&self) -> MutexGuard<'_, RunMetrics> {
        self.metrics.lock()
    }

    pub fn seen(&self) -> MutexGuard<'_, SeenPaths> {
        self.seen.lock()
    }

    /// Audit an informational event.
    pub fn info(&self, message: &str, payload: serde_json::Value) {
        self.audit.info(message, payload);
    }

    /// Record a per-file or run-level error.
    pub fn fail(&self, kind: FailureKind, error: &SweepError, path: Option<&Path>) {
        tracing::error!(kind = kind.label(), code = error.code(), "{error}");
        self.audit.error(
            kind.label(),
            json!({
                "code": error.code(),
                "path": path.map(|p| p.display().to_string()),
                "message": error.to_string(),
            }),
        );
        self.metrics.lock().errors.push(RunError::new(kind, error, path));
    }

    /// Record a non-fatal, strategy-scoped problem.
    pub fn warn(&self, kind: FailureKind, error: &SweepError) {
        tracing::warn!(kind = kind.label(), code = error.code(), "{error}");
        self.audit.warn(
            kind.label(),
            json!({ "code": error.code(), "message": error.to_string() }),
        );
        self.metrics.lock().warnings.push(RunError::new(kind, error, None));
    }

    pub fn skip(&self, path: &Path, reason: &SkipReason) {
        tracing::info!(path = %path.display(), %reason, "skipped");
        self.audit.info(
            FailureKind::ValidationRejection.label(),
            json!({ "path": path.display().to_string(), "reason": reason.to_string() }),
        );
        let mut metrics = self.metrics.lock();
        metrics.files_skipped += 1;
        metrics.skipped.push(SkippedFile {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        });
    }

    /// Close the books: sync the audit count, derive status, hand back the
    /// metrics.
    pub fn finish(self) -> RunMetrics {
        let mut metrics = self.metrics.into_inner();
        metrics.finalize();
        self.audit.info(
            "run finished",
            json!({
                "run_id": metrics.run_id,
                "status": metrics.status.label(),
                "files_found": metrics.files_found,
                "files_deleted": metrics.files_deleted,
                "errors": metrics.errors.len(),
            }),
        );
        metrics.audit_entries = self.audit.entries_written();
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::metrics::RunStatus;
    use crate::logger::audit::read_entries;
    use crate::trends::NoopTrendCollector;

    fn context(audit_path: &Path) -> RunContext {
        let config = SweepConfig {
            audit_log_path: audit_path.to_path_buf(),
            ..SweepConfig::default()
        };
        RunContext::new(config, Arc::new(NoopTrendCollector))
    }

    #[test]
    fn events_reach_metrics_and_audit() {
        let dir = tempfile::tempdir().unwrap();
        let audit_path = dir.path().join("audit.jsonl");
        let ctx = context(&audit_path);

        ctx.enter_phase(RunPhase::Scanning);
        assert_eq!(ctx.phase(), RunPhase::Scanning);
        ctx.warn(
            FailureKind::DiscoveryFailure,
            &SweepError::Discovery {
                strategy: "find-command",
                details: "spawn failed".into(),
            },
        );
        ctx.skip(
            Path::new("/w/.young!b"),
            &SkipReason::Vanished,
        );
        ctx.fail(
            FailureKind::DeleteFailure,
            &SweepError::Runtime {
                details: "boom".into(),
            },
            Some(Path::new("/w/.a!b")),
        );

        let metrics = ctx.finish();
        assert_eq!(metrics.status, RunStatus::Partial);
        assert_eq!(metrics.files_skipped, 1);
        assert_eq!(metrics.warnings.len(), 1);
        assert_eq!(metrics.audit_entries, 5);

        let entries = read_entries(&audit_path).unwrap();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[1].message, "DiscoveryFailure");
        assert_eq!(entries[3].payload["code"], "ASW-3900");
        assert_eq!(entries[4].message, "run finished");
    }

    #[test]
    fn fresh_context_starts_zeroed() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir.path().join("audit.jsonl"));
        {
            let m = ctx.metrics();
            assert_eq!(m.files_found, 0);
            assert!(m.errors.is_empty());
        }
        assert!(ctx.seen().is_empty());
        assert_eq!(ctx.phase(), RunPhase::Init);
    }
}
