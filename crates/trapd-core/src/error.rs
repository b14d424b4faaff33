//! Error types for the trap pipeline
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for trap pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the trap pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Listener setup or receive-path errors (bind, spawn, stream closed)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed payload or unparsable capture line
    #[error("Decode error: {0}")]
    Decode(String),

    /// Persistence sink errors
    #[error("Sink error: {0}")]
    Sink(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a sink error
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the error only affects the unit being processed.
    ///
    /// Transport and configuration errors stop a listener; everything else is
    /// logged by the engine and the loop moves on to the next unit.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Transport(_) | Self::Config(_))
    }
}
