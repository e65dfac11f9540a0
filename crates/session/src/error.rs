use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SessionError>;

/// Why a single detection did not produce a label.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectionError {
    /// Resource missing, permission denied or read error
    #[error("sample unavailable for {path}: {reason}")]
    SampleUnavailable { path: String, reason: String },

    /// Inference ran but no candidate cleared the confidence threshold
    #[error("indeterminate")]
    Indeterminate,

    /// Deadline exceeded; the in-flight work was cancelled
    #[error("detection timed out after {0:?}")]
    DetectionTimeout(Duration),

    /// The backend could not start at all
    #[error("detection backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend started but reported a failure
    #[error("detection backend failed: {0}")]
    BackendFailed(String),
}

impl DetectionError {
    pub fn sample_unavailable(path: &Path, reason: impl ToString) -> Self {
        Self::SampleUnavailable {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn backend_failed(msg: impl Into<String>) -> Self {
        Self::BackendFailed(msg.into())
    }

    pub fn backend_unavailable(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable(msg.into())
    }
}

/// Failure category carried by a terminal `Failed` outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    SampleUnavailable,
    Indeterminate,
    BackendUnavailable,
    BackendFailed,
    /// The resource was deactivated while its detection was in flight
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    pub kind: FailureKind,
    pub message: String,
}

impl FailureReason {
    pub fn indeterminate() -> Self {
        Self {
            kind: FailureKind::Indeterminate,
            message: "indeterminate".to_string(),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            kind: FailureKind::Cancelled,
            message: "cancelled".to_string(),
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Errors from building or configuring a session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Settings parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

impl SessionError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
