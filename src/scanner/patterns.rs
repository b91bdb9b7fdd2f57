//! Artifact naming convention: glob matching, backup-marker exclusion, and
//! filename-shape classification.

#![allow(missing_docs)]

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SweepError};
use crate::core::paths::file_name_lossy;

/// Matches names produced by the backup manager:
/// `<original>.backup.<epoch-ms>` with an optional `.hash-<hex>` tag.
static BACKUP_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.backup\.\d+(?:\.hash-[0-9a-f]+)?$").expect("backup marker regex is valid")
});

/// Returns true when `name` carries the backup marker.
#[must_use]
pub fn is_backup_name(name: &str) -> bool {
    BACKUP_MARKER.is_match(name)
}

/// Compiled artifact naming convention.
///
/// The pattern is a shell-style glob applied to the file name only: `*`
/// matches any run of characters, `?` one character, and everything else is
/// literal. Bracket classes and backslash escapes are rejected, because
/// `find -name` would read them differently from the native walker.
#[derive(Debug, Clone)]
pub struct ArtifactMatcher {
    glob: String,
    compiled: Regex,
}

impl ArtifactMatcher {
    pub fn new(glob: &str) -> Result<Self> {
        if glob.trim().is_empty() {
            return Err(SweepError::InvalidConfig {
                details: "file_pattern must not be empty".to_string(),
            });
        }
        if glob.contains('/') {
            return Err(SweepError::InvalidConfig {
                details: format!("file_pattern {glob:?} must match a file name, not a path"),
            });
        }
        if let Some(bad) = glob.chars().find(|c| matches!(c, '[' | ']' | '\\')) {
            return Err(SweepError::InvalidConfig {
                details: format!("file_pattern {glob:?} uses unsupported glob syntax {bad:?}"),
            });
        }
        Ok(Self {
            glob: glob.to_string(),
            compiled: glob_to_regex(glob)?,
        })
    }

    /// The original glob, as handed to external enumeration commands.
    #[must_use]
    pub fn glob(&self) -> &str {
        &self.glob
    }

    /// True when the file name matches the convention.
    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        self.compiled.is_match(name)
    }

    /// True when `path` names an artifact: matches the glob and is not a backup copy.
    #[must_use]
    pub fn is_artifact(&self, path: &Path) -> bool {
        let name = file_name_lossy(path);
        !name.is_empty() && self.matches_name(&name) && !is_backup_name(&name)
    }
}

fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut regex_str = String::with_capacity(pattern.len() * 2 + 2);
    regex_str.push('^');
    for c in pattern.chars() {
        match c {
            '*' => regex_str.push_str(".*"),
            '?' => regex_str.push('.'),
            c => {
                let mut buf = [0u8; 4];
                regex_str.push_str(&regex::escape(c.encode_utf8(&mut buf)));
            }
        }
    }
    regex_str.push('$');

    Regex::new(&regex_str).map_err(|err| SweepError::InvalidConfig {
        details: format!("invalid file_pattern {pattern:?}: {err}"),
    })
}

/// Category derived from the shape of an artifact's file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    SwapFile,
    LockFile,
    CacheFile,
    Unknown,
}

impl PatternCategory {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SwapFile => "swap-file",
            Self::LockFile => "lock-file",
            Self::CacheFile => "cache-file",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

const SWAP_SUFFIXES: &[&str] = &[".swp", ".swo", ".swx", "~"];
const LOCK_SUFFIXES: &[&str] = &[".lock", ".lck"];
const CACHE_SUFFIXES: &[&str] = &[".tmp", ".temp", ".bun-build"];

/// Classify one artifact by its file name.
///
/// Lock markers are checked before swap suffixes so that `.main.rs!.swp.lock`
/// reads as a lock on a swap file rather than a swap file.
#[must_use]
pub fn classify(path: &Path) -> PatternCategory {
    let name = file_name_lossy(path).to_lowercase();
    if LOCK_SUFFIXES.iter().any(|s| name.ends_with(s)) || name.starts_with(".#") {
        return PatternCategory::LockFile;
    }
    if SWAP_SUFFIXES.iter().any(|s| name.ends_with(s)) {
        return PatternCategory::SwapFile;
    }
    if CACHE_SUFFIXES.iter().any(|s| name.ends_with(s)) || name.contains("cache") {
        return PatternCategory::CacheFile;
    }
    PatternCategory::Unknown
}
