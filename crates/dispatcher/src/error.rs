//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Dispatcher has shut down, no more jobs are accepted
    #[error("dispatcher is closed")]
    Closed,

    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Whether the error means the pipeline is shutting down
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
