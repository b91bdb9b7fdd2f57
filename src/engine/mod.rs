//! Run orchestration: per-run context, bulkhead batching, metrics and report.

pub mod bulkhead;
pub mod context;
pub mod metrics;
pub mod orchestrator;
pub mod report;
