//! Duochat Runtime Engine
//!
//! This crate contains the presence-aware delivery engine, including:
//! - `ConnectionRegistry`: live session per identity plus observer sessions
//! - `TypingCoordinator`: per-sender typing state with inactivity expiry
//! - `DeliveryStatusTracker`: monotonic delivered/read merge over every
//!   status protocol generation
//! - `DispatchRouter`: routes inbound events and fans out outbound ones
//!
//! Wire types, configuration and storage seams live in `duochat-core`; any
//! transport that can carry JSON frames can drive the router.

pub mod builder;
pub mod logic;
pub mod managers;

pub use builder::RouterBuilder;
pub use logic::{DispatchRouter, Fanout, RouterStatistics};
pub use managers::*;

// Re-export core types for convenience
pub use duochat_core::{
    DuochatConfig, DuochatError, DuochatResult, InboundEvent, Message, MessageId, MessageStatus,
    OutboundEvent, Payload, SessionId, StatusUpdate, TypingNotice, UserId,
};
