//! Safety policy applied to every candidate before anything destructive.
//!
//! Rejections are per-file and non-fatal: the candidate is marked skipped
//! with a reason and the run moves on.

#![allow(missing_docs)]

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::time::{Duration, SystemTime};

use crate::core::paths::file_name_lossy;
use crate::scanner::discovery::{Candidate, StatSnapshot};
use crate::scanner::patterns::{ArtifactMatcher, is_backup_name};

/// Why a candidate was not processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    TooLarge { size_bytes: u64, limit: u64 },
    TooYoung { age: Duration, min_age: Duration },
    PatternDrift { name: String },
    NotRegularFile,
    Vanished,
    StatFailed { details: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge { size_bytes, limit } => {
                write!(f, "size {size_bytes} B exceeds max_file_size {limit} B")
            }
            Self::TooYoung { age, min_age } => write!(
                f,
                "age {}s is below min_file_age {}s",
                age.as_secs(),
                min_age.as_secs()
            ),
            Self::PatternDrift { name } => {
                write!(f, "name {name:?} no longer matches the artifact pattern")
            }
            Self::NotRegularFile => f.write_str("not a regular file"),
            Self::Vanished => f.write_str("file vanished before validation"),
            Self::StatFailed { details } => write!(f, "stat failed: {details}"),
        }
    }
}

/// Size / age / name policy.
#[derive(Debug, Clone)]
pub struct Validator {
    matcher: ArtifactMatcher,
    max_file_size: u64,
    min_file_age: Duration,
}

impl Validator {
    #[must_use]
    pub fn new(matcher: ArtifactMatcher, max_file_size: u64, min_file_age: Duration) -> Self {
        Self {
            matcher,
            max_file_size,
            min_file_age,
        }
    }

    /// Stat `candidate` and apply the policy.
    ///
    /// The stat snapshot is stored on the candidate whenever the stat itself
    /// succeeded, including for size and age rejections, so the analyzer can
    /// still score the file.
    pub fn validate(
        &self,
        candidate: &mut Candidate,
        now: SystemTime,
    ) -> std::result::Result<StatSnapshot, SkipReason> {
        let name = file_name_lossy(&candidate.path).into_owned();
        if !self.matcher.matches_name(&name) || is_backup_name(&name) {
            return Err(SkipReason::PatternDrift { name });
        }

        let meta = match fs::symlink_metadata(&candidate.path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == ErrorKind::NotFound => return Err(SkipReason::Vanished),
            Err(err) => {
                return Err(SkipReason::StatFailed {
                    details: err.to_string(),
                });
            }
        };
        if !meta.file_type().is_file() {
            return Err(SkipReason::NotRegularFile);
        }

        let modified = meta.modified().map_err(|err| SkipReason::StatFailed {
            details: err.to_string(),
        })?;
        let snapshot = StatSnapshot {
            size_bytes: meta.len(),
            modified,
        };
        candidate.stat = Some(snapshot);

        if snapshot.size_bytes > self.max_file_size {
            return Err(SkipReason::TooLarge {
                size_bytes: snapshot.size_bytes,
                limit: self.max_file_size,
            });
        }

        let age = age_of(modified, now);
        if age < self.min_file_age {
            return Err(SkipReason::TooYoung {
                age,
                min_age: self.min_file_age,
            });
        }

        Ok(snapshot)
    }
}

/// `now - modified`, clamped at zero for files stamped in the future.
#[must_use]
pub fn age_of(modified: SystemTime, now: SystemTime) -> Duration {
    now.duration_since(modified).unwrap_or(Duration::ZERO)
}
