//! Error types for the loop controller.
//!
//! None of these ever reach the user: storage errors are swallowed by
//! [`crate::store::LoopStore`], time-parse errors revert the edited field.

use std::path::PathBuf;

/// Failure of the backing key-value store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage payload is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("storage quota exceeded ({needed} bytes needed, quota {quota})")]
    QuotaExceeded { needed: usize, quota: usize },
}

/// Failure to load or validate a [`crate::config::LoopConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Rejected time text from a panel input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeParseError {
    #[error("time text is empty")]
    Empty,

    #[error("too many `:` separated fields in {0:?}")]
    TooManyFields(String),

    #[error("not a number: {0:?}")]
    NotANumber(String),
}
