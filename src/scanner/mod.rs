//! Artifact scanner: discovery strategies, pattern matching, validation,
//! risk scoring and deletion.

pub mod command;
pub mod deletion;
pub mod discovery;
pub mod patterns;
pub mod scoring;
pub mod validation;
pub mod walker;
