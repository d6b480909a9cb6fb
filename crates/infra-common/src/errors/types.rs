use thiserror::Error;

/// Infrastructure errors shared by every callflow crate
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Logging subscriber could not be installed
    #[error("Logging error: {0}")]
    Logging(String),

    /// A task manager refused to spawn a task
    #[error("Task rejected by layer '{layer}': {reason}")]
    TaskRejected {
        layer: String,
        reason: String,
    },

    /// No tokio runtime available on the calling thread
    #[error("No async runtime available: {0}")]
    NoRuntime(String),
}

impl Error {
    /// Create a new Config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new TaskRejected error
    pub fn task_rejected<L: Into<String>, R: Into<String>>(layer: L, reason: R) -> Self {
        Self::TaskRejected {
            layer: layer.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for infrastructure operations
pub type Result<T> = std::result::Result<T, Error>;
