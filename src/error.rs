//! Error Types
//!
//! Runtime failures raised by quest and perk logic, plus loading errors for
//! the TOML catalog and scenario files.

use std::path::PathBuf;

/// Failure raised by template callbacks, perk effects or definition checks.
///
/// Runtime variants never escape the manager; they are wrapped in a
/// [`QuestFault`](crate::quest::QuestFault) and handed to the observer.
#[derive(Debug, thiserror::Error)]
pub enum QuestError {
    /// A quest or perk callback failed
    #[error("{0}")]
    Callback(String),

    /// A timed effect was applied outside of a tokio runtime
    #[error("no timer runtime available for timed effect")]
    NoTimer,

    /// A quest definition references a perk that is not registered
    #[error("unknown perk '{0}'")]
    UnknownPerk(String),

    /// A raw definition failed validation
    #[error("invalid definition '{name}': {reason}")]
    InvalidDefinition { name: String, reason: String },
}

impl QuestError {
    pub fn callback(reason: impl Into<String>) -> Self {
        QuestError::Callback(reason.into())
    }

    pub fn invalid(name: &str, reason: impl Into<String>) -> Self {
        QuestError::InvalidDefinition {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while reading data files from disk
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{path:?}: {source}")]
    Definition {
        path: PathBuf,
        #[source]
        source: QuestError,
    },
}

impl LoadError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        LoadError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn parse(path: &std::path::Path, source: toml::de::Error) -> Self {
        LoadError::Parse {
            path: path.to_path_buf(),
            source,
        }
    }
}
