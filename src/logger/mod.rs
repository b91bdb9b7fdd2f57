//! Append-only JSONL audit trail.

pub mod audit;
