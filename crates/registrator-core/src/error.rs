//! Error types for registrator-core

use std::path::PathBuf;

use crate::adapter::AdapterError;

/// Result type for registrator-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in registrator-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Registry URI could not be parsed
    #[error("Bad adapter URI {uri}: {source}")]
    InvalidAdapterUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    /// No backend registered under the URI scheme
    #[error("Unrecognized adapter: {uri} (known schemes: {known})")]
    UnknownAdapter { uri: String, known: String },

    /// Definition file could not be read
    #[error("Failed to read service definition {path}: {source}")]
    DefinitionRead {
        path: PathBuf,
        #[source]
        source: registrator_fs::Error,
    },

    /// Definition file is not a valid service document
    #[error("Failed to parse service definition {path}: {source}")]
    DefinitionParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Ledger file exists but is not a valid ledger document
    #[error("Ledger at {path} is corrupt: {source}")]
    LedgerCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Process options rejected before startup
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Startup ping never succeeded
    #[error("Backend unreachable after {attempts} attempt(s): {source}")]
    BackendUnreachable {
        attempts: u64,
        #[source]
        source: AdapterError,
    },

    /// Local host identity could not be resolved
    #[error("Failed to resolve host identity: {message}")]
    HostIdentity { message: String },

    /// Filesystem error from registrator-fs
    #[error(transparent)]
    Fs(#[from] registrator_fs::Error),

    /// Backend error from an adapter
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// JSON serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
