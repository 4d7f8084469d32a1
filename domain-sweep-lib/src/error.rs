//! Error handling for sweep operations.
//!
//! Errors fall into two groups: fatal ones that stop a run before (or while)
//! tasks are dispatched, and per-task ones that are converted into a failed
//! record and never reach the scheduler's control flow.

use std::fmt;
use std::time::Duration;

/// Main error type for sweep operations.
#[derive(Debug, Clone)]
pub enum SweepError {
    /// No registrar route matches the suffix
    UnknownSuffix { suffix: String },

    /// The word list could not be read or is not a JSON array of strings
    WordListUnavailable { path: String, message: String },

    /// The persisted store could not be parsed
    CorruptStore {
        path: String,
        line: usize,
        reason: String,
    },

    /// The persisted store could not be written
    StoreWrite { path: String, message: String },

    /// Network or response-parsing failure for a single lookup
    Transport { message: String },

    /// Invalid name generation pattern
    InvalidPattern { pattern: String, reason: String },

    /// Configuration errors (invalid settings, etc.)
    ConfigError { message: String },

    /// File I/O errors other than the store and word list
    FileError { path: String, message: String },

    /// An operation exceeded its deadline
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl SweepError {
    pub fn unknown_suffix<S: Into<String>>(suffix: S) -> Self {
        Self::UnknownSuffix {
            suffix: suffix.into(),
        }
    }

    pub fn word_list<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::WordListUnavailable {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn corrupt_store<P: Into<String>, R: Into<String>>(path: P, line: usize, reason: R) -> Self {
        Self::CorruptStore {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    pub fn store_write<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::StoreWrite {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn transport<M: Into<String>>(message: M) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn invalid_pattern<P: Into<String>, R: Into<String>>(pattern: P, reason: R) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error must abort the whole run.
    ///
    /// Transport failures and timeouts belong to a single task and are
    /// recorded instead of propagated.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }
}

impl fmt::Display for SweepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSuffix { suffix } => {
                write!(f, "No registrar route for suffix '{}'", suffix)
            }
            Self::WordListUnavailable { path, message } => {
                write!(f, "Word list '{}' unavailable: {}", path, message)
            }
            Self::CorruptStore { path, line, reason } => {
                write!(f, "Corrupt store '{}' at line {}: {}", path, line, reason)
            }
            Self::StoreWrite { path, message } => {
                write!(f, "Failed to write store '{}': {}", path, message)
            }
            Self::Transport { message } => write!(f, "{}", message),
            Self::InvalidPattern { pattern, reason } => {
                write!(f, "Invalid pattern '{}': {}", pattern, reason)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Timeout {
                operation,
                duration,
            } => {
                write!(f, "Timeout after {:?} during: {}", duration, operation)
            }
            Self::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for SweepError {}

impl From<reqwest::Error> for SweepError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::transport(format!("request timed out: {}", err))
        } else if err.is_connect() {
            Self::transport(format!("connection failed: {}", err))
        } else {
            Self::transport(format!("request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for SweepError {
    fn from(err: serde_json::Error) -> Self {
        Self::transport(format!("invalid JSON: {}", err))
    }
}

impl From<std::io::Error> for SweepError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(format!("I/O error: {}", err))
    }
}

impl From<toml::de::Error> for SweepError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("Failed to parse TOML configuration: {}", err))
    }
}
