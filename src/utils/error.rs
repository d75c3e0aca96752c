//! Error types for playctl
//!
//! This module defines the error taxonomy used by the control surface.
//! We use thiserror for the library error type; the demo binary wraps
//! everything in anyhow.

use thiserror::Error;

use crate::player::{CommandKind, PlayerState};

/// Main error type for playctl
#[derive(Error, Debug)]
pub enum PlayerError {
    /// The media processor cannot resolve or open the requested media
    #[error("Invalid media: {0}")]
    InvalidMedia(String),

    /// A command asked for a transition that is not valid from the current state
    #[error("Transition rejected: {command:?} while {state:?}")]
    TransitionRejected {
        command: CommandKind,
        state: PlayerState,
    },

    /// The media processor failed mid-operation
    #[error("Pipeline failure: {0}")]
    PipelineFailure(String),

    /// Texture requested before the scene graph was initialized
    #[error("Render context not ready")]
    RenderContextNotReady,

    /// Texture provider errors
    #[error("Texture error: {0}")]
    Texture(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File error: {0}")]
    FileIO(#[from] std::io::Error),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error for unexpected situations
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlayerError {
    /// Create a pipeline failure from string
    pub fn pipeline<S: Into<String>>(msg: S) -> Self {
        PlayerError::PipelineFailure(msg.into())
    }

    /// Create an invalid media error from string
    pub fn invalid_media<S: Into<String>>(msg: S) -> Self {
        PlayerError::InvalidMedia(msg.into())
    }
}

/// Convenience type alias for Results in playctl
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Extension trait for converting other errors to PlayerError
pub trait IntoPlayerError<T> {
    /// Convert this error into a PlayerError with the given context
    fn pipeline_err(self, context: &str) -> Result<T>;
    fn texture_err(self, context: &str) -> Result<T>;
    fn config_err(self, context: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> IntoPlayerError<T> for std::result::Result<T, E> {
    fn pipeline_err(self, context: &str) -> Result<T> {
        self.map_err(|e| PlayerError::PipelineFailure(format!("{}: {}", context, e)))
    }

    fn texture_err(self, context: &str) -> Result<T> {
        self.map_err(|e| PlayerError::Texture(format!("{}: {}", context, e)))
    }

    fn config_err(self, context: &str) -> Result<T> {
        self.map_err(|e| PlayerError::Config(format!("{}: {}", context, e)))
    }
}

/// Helper macro for creating internal errors with file and line information
#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::utils::error::PlayerError::Internal(
            format!("{} at {}:{}", $msg, file!(), line!())
        )
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::utils::error::PlayerError::Internal(
            format!("{} at {}:{}", format!($fmt, $($arg)*), file!(), line!())
        )
    };
}
