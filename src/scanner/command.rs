//! External-command discovery strategy: delegates enumeration to `find`.
//!
//! Output is requested NUL-delimited (`-print0`) so names containing
//! newlines survive intact.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::core::errors::{Result, SweepError};
use crate::scanner::discovery::{Discovered, DiscoveryStrategy, ScanRequest};

/// Runs `<program> -H <root> -maxdepth N -type f -name <glob> -print0`.
#[derive(Debug, Clone)]
pub struct FindCommandStrategy {
    program: PathBuf,
}

impl FindCommandStrategy {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn build_command(&self, request: &ScanRequest<'_>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-H")
            .arg(root_arg(request.root))
            .arg("-maxdepth")
            .arg(request.max_depth.to_string())
            .args(["-type", "f", "-name"])
            .arg(request.matcher.glob())
            .arg("-print0");
        cmd
    }
}

impl Default for FindCommandStrategy {
    fn default() -> Self {
        Self::new("find")
    }
}

impl DiscoveryStrategy for FindCommandStrategy {
    fn name(&self) -> &'static str {
        "find-command"
    }

    fn discover(&self, request: &ScanRequest<'_>) -> Result<Discovered> {
        if !request.root.is_dir() {
            return Ok(Discovered::default());
        }

        let output = self
            .build_command(request)
            .output()
            .map_err(|err| SweepError::Discovery {
                strategy: self.name(),
                details: format!("failed to run {}: {err}", self.program.display()),
            })?;

        let paths = split_nul_paths(&output.stdout);
        if output.status.success() {
            return Ok(paths.into());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let problem = SweepError::Discovery {
            strategy: self.name(),
            details: format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            ),
        };
        // `find` exits non-zero after skipping an unreadable subdirectory but
        // still prints everything it could reach.
        if paths.is_empty() {
            return Err(problem);
        }
        Ok(Discovered {
            paths,
            warnings: vec![problem],
        })
    }
}

/// Keep a relative root starting with `-` from being read as an option.
fn root_arg(root: &Path) -> PathBuf {
    if root.is_relative() && root.as_os_str().to_string_lossy().starts_with('-') {
        Path::new(".").join(root)
    } else {
        root.to_path_buf()
    }
}

/// Split a `-print0` buffer into paths, ignoring empty records.
fn split_nul_paths(buf: &[u8]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let mut start = 0;
    for end in memchr::memchr_iter(0, buf).chain(std::iter::once(buf.len())) {
        if end > start {
            paths.push(bytes_to_path(&buf[start..end]));
        }
        start = end + 1;
    }
    paths
}

#[cfg(unix)]
fn bytes_to_path(bytes: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn bytes_to_path(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}
