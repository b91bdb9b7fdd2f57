//! Backup manager: hash-tagged copies verified against the original digest.
//!
//! Naming: `<original>.backup.<epoch-ms>[.hash-<short>]`. The scanner's
//! backup-marker exclusion keeps these copies out of every future scan.
//!
//! A copy is accepted only when its digest equals the original's. On a
//! mismatch the copy is removed and a [`SweepError::BackupIntegrity`] is
//! returned; the caller must then leave the original in place.

#![allow(missing_docs)]

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::backup::hasher::{sha256_file, short_hash};
use crate::core::errors::{Result, SweepError};

/// How bytes get from the original to the backup path.
///
/// The default is a plain filesystem copy; tests substitute a corrupting
/// copier to exercise the integrity check.
pub trait CopyStrategy: Send + Sync {
    /// Copy `from` to `to`, returning the number of bytes written.
    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;
}

/// `std::fs::copy`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsCopy;

impl CopyStrategy for FsCopy {
    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        fs::copy(from, to)
    }
}

/// An accepted backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupRecord {
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
    /// Digest of the copy; `None` when hashing was disabled or the original
    /// could not be hashed (best-effort backup).
    pub verification_hash: Option<String>,
}

pub struct BackupManager {
    copier: Arc<dyn CopyStrategy>,
    hashes_computed: AtomicU64,
}

impl Default for BackupManager {
    fn default() -> Self {
        Self::new(Arc::new(FsCopy))
    }
}

impl BackupManager {
    #[must_use]
    pub fn new(copier: Arc<dyn CopyStrategy>) -> Self {
        Self {
            copier,
            hashes_computed: AtomicU64::new(0),
        }
    }

    /// Digests computed while verifying copies.
    #[must_use]
    pub fn hashes_computed(&self) -> u64 {
        self.hashes_computed.load(Ordering::Acquire)
    }

    /// Copy `original` next to itself and verify the copy.
    ///
    /// `original_hash` is the digest taken before any destructive step. When
    /// it is `None` the copy is accepted unverified.
    pub fn create_backup(
        &self,
        original: &Path,
        original_hash: Option<&str>,
    ) -> Result<BackupRecord> {
        let backup_path = free_backup_path(original, epoch_millis(), original_hash);
        self.copier
            .copy(original, &backup_path)
            .map_err(|e| SweepError::io(&backup_path, e))?;

        let Some(expected) = original_hash else {
            return Ok(BackupRecord {
                original_path: original.to_path_buf(),
                backup_path,
                verification_hash: None,
            });
        };

        let actual = match sha256_file(&backup_path) {
            Ok(actual) => {
                self.hashes_computed.fetch_add(1, Ordering::AcqRel);
                actual
            }
            Err(err) => format!("unreadable ({err})"),
        };

        if actual != expected {
            discard(&backup_path);
            return Err(SweepError::BackupIntegrity {
                path: original.to_path_buf(),
                expected: expected.to_string(),
                actual,
            });
        }

        Ok(BackupRecord {
            original_path: original.to_path_buf(),
            backup_path,
            verification_hash: Some(actual),
        })
    }
}

/// `<original>.backup.<epoch-ms>[.hash-<short>]`.
#[must_use]
pub fn backup_path_for(original: &Path, epoch_ms: u128, hash: Option<&str>) -> PathBuf {
    let mut name: OsString = original.as_os_str().to_owned();
    name.push(format!(".backup.{epoch_ms}"));
    if let Some(hash) = hash {
        name.push(format!(".hash-{}", short_hash(hash)));
    }
    PathBuf::from(name)
}

fn free_backup_path(original: &Path, mut epoch_ms: u128, hash: Option<&str>) -> PathBuf {
    loop {
        let candidate = backup_path_for(original, epoch_ms, hash);
        if fs::symlink_metadata(&candidate).is_err() {
            return candidate;
        }
        epoch_ms += 1;
    }
}

fn discard(backup_path: &Path) {
    if let Err(err) = fs::remove_file(backup_path) {
        tracing::error!(
            path = %backup_path.display(),
            error = %err,
            "[ASW-2003] failed to remove unverified backup"
        );
    }
}

fn epoch_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}
