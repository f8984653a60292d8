//! Error types for the frame loop and its audio device

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Presentation error: {0}")]
    Present(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Audio subsystem errors
///
/// Only [`AudioError::DeviceUnavailable`] is ever produced while the loop is
/// running. The remaining variants come out of backend construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open stream: {0}")]
    StreamError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl AudioError {
    /// Shorthand for the runtime failure every device operation can report.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        AudioError::DeviceUnavailable(reason.into())
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, AudioError::DeviceUnavailable(_))
    }
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;
