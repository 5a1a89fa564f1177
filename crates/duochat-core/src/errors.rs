//! Error types for the duochat engine
//!
//! This module contains all error types used throughout the engine, including
//! storage errors, wire protocol errors, and the main DuochatError type that
//! unifies them all.

use crate::types::UserId;

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Failures reported by a `MessageStore` or `UserDirectory` collaborator
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("User already exists: {user_id}")]
    UserExists { user_id: UserId },
    #[error("Message id space exhausted")]
    IdsExhausted,
}

/// Wire-level protocol errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Event '{event}' is missing required field '{field}'")]
    MissingField { event: String, field: String },
    #[error("Status update carries neither messageId nor messageIds")]
    EmptyStatusUpdate,
    #[error("Malformed frame: {0}")]
    MalformedFrame(#[from] serde_json::Error),
}

// ----------------------------------------------------------------------------
// Unified Error
// ----------------------------------------------------------------------------

/// Core error types for the duochat engine
#[derive(Debug, thiserror::Error)]
pub enum DuochatError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },
}

// ----------------------------------------------------------------------------
// Convenience Error Constructors
// ----------------------------------------------------------------------------

impl DuochatError {
    /// Create a missing-field protocol error
    pub fn missing_field<E: Into<String>, F: Into<String>>(event: E, field: F) -> Self {
        DuochatError::Protocol(ProtocolError::MissingField {
            event: event.into(),
            field: field.into(),
        })
    }

    /// Create a configuration error with a reason
    pub fn config_error<T: Into<String>>(reason: T) -> Self {
        DuochatError::Configuration {
            reason: reason.into(),
        }
    }

    /// Create a store-unavailable error with a reason
    pub fn store_unavailable<T: Into<String>>(reason: T) -> Self {
        DuochatError::Store(StoreError::Unavailable {
            reason: reason.into(),
        })
    }

    /// Malformed input is dropped silently; everything else is worth surfacing
    pub fn is_malformed(&self) -> bool {
        matches!(self, DuochatError::Protocol(_))
    }

    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, DuochatError::Store(_))
    }
}

// ----------------------------------------------------------------------------
// Type Aliases
// ----------------------------------------------------------------------------

pub type DuochatResult<T> = core::result::Result<T, DuochatError>;
pub type StoreResult<T> = core::result::Result<T, StoreError>;
