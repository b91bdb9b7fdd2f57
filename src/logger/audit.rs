//! Audit trail: append-only line-delimited JSON, one object per event.
//!
//! Each line is assembled in memory and written with a single `write_all`
//! under the writer lock, so lines from concurrent workers never interleave.
//! The trail is best-effort: an unopenable path or a failed write drops the
//! entry, logs at debug level, and never fails the run.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SweepError};

/// Bumped whenever a field is renamed or removed.
pub const AUDIT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    Info,
    Warn,
    Error,
}

/// One line of the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// RFC 3339 UTC with millisecond precision.
    pub timestamp: String,
    pub level: AuditLevel,
    pub message: String,
    pub payload: serde_json::Value,
    pub pid: u32,
    pub schema_version: u32,
}

impl AuditEntry {
    #[must_use]
    pub fn new(level: AuditLevel, message: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            timestamp: format_utc_now(),
            level,
            message: message.into(),
            payload,
            pid: std::process::id(),
            schema_version: AUDIT_SCHEMA_VERSION,
        }
    }
}

/// Shared JSONL writer. A disabled log accepts and drops every entry.
pub struct AuditLog {
    path: Option<PathBuf>,
    writer: Mutex<Option<BufWriter<File>>>,
    entries_written: AtomicU64,
}

impl AuditLog {
    /// Log that records nothing.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            path: None,
            writer: Mutex::new(None),
            entries_written: AtomicU64::new(0),
        }
    }

    /// Open `path` for appending, creating parent directories. An open failure
    /// leaves the log in a dropping state.
    #[must_use]
    pub fn open(path: &Path) -> Self {
        let writer = match open_append(path) {
            Ok(file) => Some(BufWriter::new(file)),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "audit log unavailable");
                None
            }
        };
        Self {
            path: Some(path.to_path_buf()),
            writer: Mutex::new(writer),
            entries_written: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.writer.lock().is_some()
    }

    /// Entries successfully written by this handle.
    #[must_use]
    pub fn entries_written(&self) -> u64 {
        self.entries_written.load(Ordering::Acquire)
    }

    pub fn info(&self, message: &str, payload: serde_json::Value) {
        self.record(&AuditEntry::new(AuditLevel::Info, message, payload));
    }

    pub fn warn(&self, message: &str, payload: serde_json::Value) {
        self.record(&AuditEntry::new(AuditLevel::Warn, message, payload));
    }

    pub fn error(&self, message: &str, payload: serde_json::Value) {
        self.record(&AuditEntry::new(AuditLevel::Error, message, payload));
    }

    /// Append one entry; returns whether it reached the file.
    pub fn record(&self, entry: &AuditEntry) -> bool {
        let mut guard = self.writer.lock();
        let Some(writer) = guard.as_mut() else {
            return false;
        };

        let line = match serde_json::to_string(entry) {
            Ok(json) => format!("{json}\n"),
            Err(err) => {
                tracing::debug!(error = %err, "audit entry not serializable");
                return false;
            }
        };

        let written = writer.write_all(line.as_bytes());
        if let Err(err) = written.and_then(|()| writer.flush()) {
            tracing::debug!(error = %err, "audit write failed; disabling audit log");
            *guard = None;
            return false;
        }
        self.entries_written.fetch_add(1, Ordering::AcqRel);
        true
    }
}

/// Read every parseable entry back from an audit file.
pub fn read_entries(path: &Path) -> Result<Vec<AuditEntry>> {
    let raw = fs::read_to_string(path).map_err(|e| SweepError::io(path, e))?;
    Ok(raw
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}

fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| SweepError::io(parent, e))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| SweepError::io(path, e))
}

fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entries_are_separate_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("audit.jsonl");
        let log = AuditLog::open(&path);
        assert!(log.is_active());

        log.info("run started", json!({"target": "/w"}));
        log.warn("strategy failed", json!({"strategy": "find-command"}));
        log.error("delete failed", json!({"path": "/w/.a!b"}));
        assert_eq!(log.entries_written(), 3);

        let raw = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 3);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["level"], "info");
        assert_eq!(first["message"], "run started");
        assert_eq!(first["payload"]["target"], "/w");
        assert_eq!(first["schema_version"], AUDIT_SCHEMA_VERSION);
        assert_eq!(first["pid"], std::process::id());
        assert!(first["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn appends_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        AuditLog::open(&path).info("one", json!({}));
        AuditLog::open(&path).info("two", json!({}));

        let entries = read_entries(&path).unwrap();
        let messages: Vec<_> = entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["one", "two"]);
    }

    #[test]
    fn disabled_log_drops_entries() {
        let log = AuditLog::disabled();
        assert!(!log.record(&AuditEntry::new(AuditLevel::Info, "x", json!(null))));
        assert_eq!(log.entries_written(), 0);
        assert!(log.path().is_none());
    }

    #[test]
    fn unopenable_path_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        // Parent is a regular file, so the directory cannot be created.
        let log = AuditLog::open(&blocker.join("audit.jsonl"));
        assert!(!log.is_active());
        log.error("lost", json!({}));
        assert_eq!(log.entries_written(), 0);
    }

    #[test]
    fn concurrent_writers_keep_lines_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let log = AuditLog::open(&path);
        std::thread::scope(|s| {
            for t in 0..4 {
                let log = &log;
                s.spawn(move || {
                    for i in 0..25 {
                        log.info("tick", json!({"thread": t, "i": i}));
                    }
                });
            }
        });
        assert_eq!(read_entries(&path).unwrap().len(), 100);
    }
}
