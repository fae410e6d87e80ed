//! Error types shared across the crate

use thiserror::Error;

/// Configuration errors raised by the event transport.
///
/// These are fatal for the caller: they signal a wiring mistake, not a
/// runtime condition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("SSE transport is already attached to an HTTP router")]
    AlreadyAttached,

    #[error("replay buffer size must be non-negative, got {0}")]
    InvalidBufferSize(i64),
}

/// A single write to a connected client failed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WriteError {
    #[error("client stream is closed")]
    Closed,

    #[error("client queue is full")]
    Full,
}

/// Errors while reading configuration from the environment
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has an invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            var,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors resolving an automation provider from the registry
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown {category} provider {kind:?}")]
    Unknown {
        category: &'static str,
        kind: String,
    },

    #[error("{category} provider {kind:?} is unavailable: {source}")]
    Unavailable {
        category: &'static str,
        kind: String,
        #[source]
        source: anyhow::Error,
    },
}

/// A tool parameter failed validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}
