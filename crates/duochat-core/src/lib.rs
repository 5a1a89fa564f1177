//! Duochat Core
//!
//! This crate provides the foundational types, wire protocol and collaborator contracts
//! for the duochat presence-aware delivery engine:
//! - Identity, session and message identifiers plus the time source abstraction
//! - The JSON event protocol spoken at the transport boundary, including the three
//!   generations of status-update shapes
//! - The `MessageStore` and `UserDirectory` traits with in-memory implementations
//! - Centralized configuration and the unified error type

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod config;
pub mod errors;
pub mod protocol;
pub mod store;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::{ChannelConfig, DirectoryConfig, DuochatConfig, TypingConfig};
pub use errors::{DuochatError, DuochatResult, ProtocolError, StoreError, StoreResult};
pub use protocol::{
    CanonicalStatus, InboundEvent, Message, MessageStatus, OutboundEvent, Payload, StatusUpdate,
    TypingNotice,
};
pub use store::{
    InMemoryMessageStore, InMemoryUserDirectory, MessageMutator, MessageStore, NewMessage,
    UserDirectory, UserRecord,
};
pub use types::{
    ManualTimeSource, MessageId, SessionId, SystemTimeSource, TimeSource, Timestamp, UserId,
};
