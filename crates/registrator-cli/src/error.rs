//! Error types for registrator-cli

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] registrator_core::Error),

    #[error(transparent)]
    Fs(#[from] registrator_fs::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The config directory could not be watched
    #[error("failed to watch {path}: {source}")]
    Watch {
        path: std::path::PathBuf,
        #[source]
        source: notify::Error,
    },

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
