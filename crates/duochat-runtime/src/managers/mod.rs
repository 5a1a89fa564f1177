//! Stateful managers for the duochat runtime
//!
//! This module contains manager structs that own the engine's shared state:
//! live sessions, per-sender typing countdowns and message status.

pub mod connection;
pub mod delivery;
pub mod session;
pub mod typing;

pub use connection::{ConnectionRegistry, ConnectionStats, Registration, Unregistration};
pub use delivery::{
    merge_status, DeliveryStatusTracker, StatusChange, StatusOutcome, StatusStatistics,
};
pub use session::{SessionHandle, SessionInbox, SessionOutbox, SessionRole};
pub use typing::{TypingCoordinator, TypingSink, TypingState, TypingStatistics, TypingTransition};
