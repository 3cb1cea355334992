//! Layered error definitions
//!
//! Categorized by source: config / probe / sink

use std::time::Duration;

use thiserror::Error;

/// Unified error type for configuration and sink failures
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}

/// Errors reported by a probe executor.
///
/// `Resolve`, `Socket` and `InvalidRequest` happen while constructing a probe,
/// the others while it runs. `Cancelled` is not a failure: it is the result of
/// a stop request during shutdown.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProbeError {
    /// Address could not be resolved to an IP
    #[error("cannot resolve '{address}': {message}")]
    Resolve { address: String, message: String },

    /// ICMP socket could not be opened
    #[error("failed to open probe socket: {message}")]
    Socket { message: String },

    /// Request parameters rejected by the executor
    #[error("invalid probe request: {message}")]
    InvalidRequest { message: String },

    /// No echo reply came back
    #[error("all {sent} packets lost (per-packet timeout {timeout:?})")]
    AllPacketsLost { sent: u32, timeout: Duration },

    /// Probe aborted while running
    #[error("probe run failed: {message}")]
    Run { message: String },

    /// Probe stopped on request
    #[error("probe cancelled")]
    Cancelled,
}

impl ProbeError {
    /// Create resolve error
    pub fn resolve(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolve {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Create run error
    pub fn run(message: impl Into<String>) -> Self {
        Self::Run {
            message: message.into(),
        }
    }

    /// Whether this error is a stop request rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
