//! ASW-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, SweepError>;

/// Top-level error type for the artifact sweeper.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("[ASW-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[ASW-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[ASW-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[ASW-2001] discovery strategy {strategy} failed: {details}")]
    Discovery {
        strategy: &'static str,
        details: String,
    },

    #[error("[ASW-2002] digest failure for {path}: {source}")]
    Hash {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[ASW-2003] backup integrity failure for {path}: expected {expected}, got {actual}")]
    BackupIntegrity {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("[ASW-2004] {remaining} artifact(s) remain after cleanup")]
    FinalValidation { remaining: usize },

    #[error("[ASW-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[ASW-3001] permission denied for {path}")]
    PermissionDenied { path: PathBuf },

    #[error("[ASW-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[ASW-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[ASW-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl SweepError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "ASW-1001",
            Self::MissingConfig { .. } => "ASW-1002",
            Self::ConfigParse { .. } => "ASW-1003",
            Self::Discovery { .. } => "ASW-2001",
            Self::Hash { .. } => "ASW-2002",
            Self::BackupIntegrity { .. } => "ASW-2003",
            Self::FinalValidation { .. } => "ASW-2004",
            Self::Serialization { .. } => "ASW-2101",
            Self::PermissionDenied { .. } => "ASW-3001",
            Self::Io { .. } => "ASW-3002",
            Self::ChannelClosed { .. } => "ASW-3003",
            Self::Runtime { .. } => "ASW-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. }
                | Self::Hash { .. }
                | Self::Discovery { .. }
                | Self::ChannelClosed { .. }
                | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    ///
    /// `PermissionDenied` IO errors are promoted to their own variant so the
    /// report can tell them apart from transient failures.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            return Self::PermissionDenied { path };
        }
        Self::Io { path, source }
    }
}

impl From<serde_json::Error> for SweepError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for SweepError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<toml::ser::Error> for SweepError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Serialization {
            context: "toml",
            details: value.to_string(),
        }
    }
}
