use thiserror::Error;

use crate::ivr::tone::DtmfTone;

/// Call automation errors
#[derive(Error, Debug)]
pub enum AutomationError {
    /// The caller pressed a tone with no registered choice.
    ///
    /// Signals that no further menu processing should happen on this branch.
    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    /// The caller entered nothing before the recognizer gave up
    #[error("No input received: {0}")]
    NoInput(String),

    /// An IVR menu could not be constructed
    #[error("Menu construction error: {0}")]
    MenuConstruction(String),

    /// The same tone was bound twice in one menu
    #[error("Tone {tone} is already bound in menu '{menu}'")]
    DuplicateTone {
        menu: String,
        tone: DtmfTone,
    },

    /// The same menu name was registered twice
    #[error("Menu '{0}' is already registered")]
    DuplicateMenu(String),

    /// A calling operation failed downstream
    #[error("Calling operation error: {0}")]
    Calling(String),

    /// The operation was cancelled by its caller
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Infrastructure errors
    #[error("Infrastructure error: {0}")]
    Infra(#[from] callflow_infra_common::Error),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AutomationError {
    /// Create a new InvalidEntry error
    pub fn invalid_entry<S: Into<String>>(msg: S) -> Self {
        Self::InvalidEntry(msg.into())
    }

    /// Create a new NoInput error
    pub fn no_input<S: Into<String>>(msg: S) -> Self {
        Self::NoInput(msg.into())
    }

    /// Create a new MenuConstruction error
    pub fn menu_construction<S: Into<String>>(msg: S) -> Self {
        Self::MenuConstruction(msg.into())
    }

    /// Create a new Calling error
    pub fn calling<S: Into<String>>(msg: S) -> Self {
        Self::Calling(msg.into())
    }

    /// Create a new Cancelled error
    pub fn cancelled<S: Into<String>>(msg: S) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Create a new Config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this is the invalid-entry control signal
    pub fn is_invalid_entry(&self) -> bool {
        matches!(self, Self::InvalidEntry(_))
    }
}

/// Result type for call automation operations
pub type Result<T> = std::result::Result<T, AutomationError>;
