//! RQM-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::api::ApiError;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, RqmError>;

/// Top-level error type for the request manager client.
#[derive(Debug, Error)]
pub enum RqmError {
    #[error("[RQM-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[RQM-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[RQM-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[RQM-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[RQM-2102] SQL failure in {context}: {details}")]
    Sql {
        context: &'static str,
        details: String,
    },

    #[error("[RQM-2201] {0}")]
    Api(#[from] ApiError),

    #[error("[RQM-2301] {message}")]
    Validation { message: String },

    #[error("[RQM-2302] not logged in")]
    NotLoggedIn,

    #[error("[RQM-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[RQM-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl RqmError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "RQM-1001",
            Self::MissingConfig { .. } => "RQM-1002",
            Self::ConfigParse { .. } => "RQM-1003",
            Self::Serialization { .. } => "RQM-2101",
            Self::Sql { .. } => "RQM-2102",
            Self::Api(_) => "RQM-2201",
            Self::Validation { .. } => "RQM-2301",
            Self::NotLoggedIn => "RQM-2302",
            Self::Io { .. } => "RQM-3002",
            Self::Runtime { .. } => "RQM-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    ///
    /// Nothing in the client retries automatically; this only informs the
    /// operator-facing message.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Api(err) => err.is_transient(),
            Self::Io { .. } | Self::Sql { .. } | Self::Runtime { .. } => true,
            _ => false,
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for RqmError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql {
            context: "rusqlite",
            details: value.to_string(),
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for RqmError {
    fn from(value: reqwest::Error) -> Self {
        Self::Api(ApiError::Network {
            details: value.to_string(),
        })
    }
}

impl From<serde_json::Error> for RqmError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for RqmError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
