//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure `main` and the operator console can
//! run into, so both can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: vocation_core::ConfigError,
    },

    /// A registry or job operation failed.
    #[error("{source}")]
    Jobs {
        /// The underlying core error.
        #[from]
        source: vocation_core::JobsError,
    },

    /// Reading input or installing a signal handler failed.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {message}")]
    Task {
        /// Description of the failure.
        message: String,
    },

    /// An operator command could not be understood.
    #[error("{message}")]
    Command {
        /// What was wrong with the command.
        message: String,
    },
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task {
            message: err.to_string(),
        }
    }
}
