//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use artifact_sweeper::prelude::*;
//! ```

// Core
pub use crate::core::config::{ConfigOverrides, SweepConfig};
pub use crate::core::errors::{Result, SweepError};

// Scanner
pub use crate::scanner::command::FindCommandStrategy;
pub use crate::scanner::deletion::DeletionExecutor;
pub use crate::scanner::discovery::{Candidate, DiscoveryStrategy, ScanRequest, Scanner, SeenPaths};
pub use crate::scanner::patterns::{ArtifactMatcher, PatternCategory};
pub use crate::scanner::scoring::{RiskLevel, RiskScore};
pub use crate::scanner::validation::{SkipReason, Validator};
pub use crate::scanner::walker::NativeWalkStrategy;

// Backup
pub use crate::backup::manager::{BackupManager, BackupRecord, CopyStrategy, FsCopy};

// Engine
pub use crate::engine::metrics::{FailureKind, RunMetrics, RunStatus};
pub use crate::engine::orchestrator::{RunOutcome, SweepEngine};

// Trends
pub use crate::trends::{HistoryStore, NoopTrendCollector, TrendAnalysis, TrendCollector};
