//! Deletion executor: dry-run simulation or verified unlink, with an
//! in-flight gauge so callers can prove the concurrency bound held.
//!
//! Batching lives in [`crate::engine::bulkhead`]; this type is shared by
//! every worker in a batch and only owns the per-file operation.

#![allow(missing_docs)]

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crate::core::errors::{Result, SweepError};

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted { bytes: u64, duration_ms: u64 },
    WouldDelete { bytes: u64 },
}

impl DeleteOutcome {
    #[must_use]
    pub const fn bytes(&self) -> u64 {
        match self {
            Self::Deleted { bytes, .. } | Self::WouldDelete { bytes } => *bytes,
        }
    }
}

/// Per-file delete with dry-run support.
#[derive(Debug)]
pub struct DeletionExecutor {
    dry_run: bool,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl DeletionExecutor {
    #[must_use]
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Highest number of delete operations observed in flight at once.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Acquire)
    }

    /// Remove `path`, or only report what would be removed in dry-run mode.
    pub fn delete(&self, path: &Path, size_bytes: u64) -> Result<DeleteOutcome> {
        if self.dry_run {
            tracing::info!(path = %path.display(), size_bytes, "dry-run: would delete");
            return Ok(DeleteOutcome::WouldDelete { bytes: size_bytes });
        }

        let _guard = InFlightGuard::enter(&self.in_flight, &self.peak_in_flight);
        let start = Instant::now();
        fs::remove_file(path).map_err(|e| SweepError::io(path, e))?;

        // Post-deletion verification: path should be gone.
        if fs::symlink_metadata(path).is_ok() {
            return Err(SweepError::Runtime {
                details: format!("path still exists after deletion: {}", path.display()),
            });
        }

        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = start.elapsed().as_millis() as u64;
        Ok(DeleteOutcome::Deleted {
            bytes: size_bytes,
            duration_ms,
        })
    }
}

struct InFlightGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> InFlightGuard<'a> {
    fn enter(counter: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::AcqRel) + 1;
        peak.fetch_max(now, Ordering::AcqRel);
        Self { counter }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}
