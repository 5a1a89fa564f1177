//! Duochat wire protocol
//!
//! Inbound and outbound events exchanged at the transport boundary, the persisted
//! message model, and the status-update shapes clients have used over time.

pub mod events;
pub mod message;
pub mod status;

pub use events::{HistoryRequest, InboundEvent, OutboundEvent, SendFrame, TypingFrame, TypingNotice};
pub use message::{Message, MessageStatus, Payload};
pub use status::{CanonicalStatus, StatusUpdate};
