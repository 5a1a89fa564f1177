//! Transport boundary events
//!
//! Frames are JSON objects of the form `{"event": "<name>", "data": ...}`.
//! Required fields are optional at the serde level so that a frame missing
//! them can be recognised and dropped as malformed rather than failing to parse.

use serde::{Deserialize, Serialize};

use super::message::{Message, MessageStatus, Payload};
use super::status::StatusUpdate;
use crate::errors::ProtocolError;
use crate::types::UserId;

// ----------------------------------------------------------------------------
// Inbound
// ----------------------------------------------------------------------------

/// Raw typing frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingFrame {
    #[serde(default)]
    pub from: Option<UserId>,
    #[serde(default)]
    pub to: Option<UserId>,
    /// Absent text is the same as an explicit clear
    #[serde(default)]
    pub text: String,
}

impl TypingFrame {
    /// Validate required fields
    pub fn into_notice(self) -> Result<TypingNotice, ProtocolError> {
        let from = required(self.from, "typing", "from")?;
        let to = required(self.to, "typing", "to")?;
        Ok(TypingNotice {
            from,
            to,
            text: self.text,
        })
    }
}

/// Raw send frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendFrame {
    #[serde(default)]
    pub from: Option<UserId>,
    #[serde(default)]
    pub to: Option<UserId>,
    #[serde(default)]
    pub payload: Option<Payload>,
}

impl SendFrame {
    /// Validate required fields
    pub fn validate(self) -> Result<(UserId, UserId, Payload), ProtocolError> {
        let from = required(self.from, "message-sent", "from")?;
        let to = required(self.to, "message-sent", "to")?;
        let payload = self.payload.ok_or_else(|| missing("message-sent", "payload"))?;
        Ok((from, to, payload))
    }
}

/// Conversation history request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRequest {
    #[serde(default)]
    pub with: Option<UserId>,
}

/// Events a session can hand the dispatch router
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum InboundEvent {
    Register(UserId),
    RegisterObserver,
    Typing(TypingFrame),
    MessageSent(SendFrame),
    StatusUpdate(StatusUpdate),
    FetchHistory(HistoryRequest),
}

impl InboundEvent {
    /// Parse a JSON text frame
    pub fn from_frame(frame: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(frame)?)
    }

    pub fn name(&self) -> &'static str {
        match self {
            InboundEvent::Register(_) => "register",
            InboundEvent::RegisterObserver => "register-observer",
            InboundEvent::Typing(_) => "typing",
            InboundEvent::MessageSent(_) => "message-sent",
            InboundEvent::StatusUpdate(_) => "status-update",
            InboundEvent::FetchHistory(_) => "fetch-history",
        }
    }
}

// ----------------------------------------------------------------------------
// Outbound
// ----------------------------------------------------------------------------

/// Typing indicator as forwarded to recipients and observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingNotice {
    pub from: UserId,
    pub to: UserId,
    pub text: String,
}

impl TypingNotice {
    /// The synthetic indicator emitted when a countdown expires
    pub fn cleared(from: UserId, to: UserId) -> Self {
        Self {
            from,
            to,
            text: String::new(),
        }
    }

    pub fn is_clear(&self) -> bool {
        self.text.is_empty()
    }
}

/// Events the router addresses to sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum OutboundEvent {
    OnlineSnapshot { users: Vec<UserId> },
    Typing(TypingNotice),
    Message(Message),
    StatusUpdate(MessageStatus),
    History { with: UserId, messages: Vec<Message> },
}

impl OutboundEvent {
    /// Encode as a JSON text frame
    pub fn to_frame(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::OnlineSnapshot { .. } => "online-snapshot",
            OutboundEvent::Typing(_) => "typing",
            OutboundEvent::Message(_) => "message",
            OutboundEvent::StatusUpdate(_) => "status-update",
            OutboundEvent::History { .. } => "history",
        }
    }
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

fn missing(event: &str, field: &str) -> ProtocolError {
    ProtocolError::MissingField {
        event: event.to_string(),
        field: field.to_string(),
    }
}

fn required(value: Option<UserId>, event: &str, field: &str) -> Result<UserId, ProtocolError> {
    match value {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(missing(event, field)),
    }
}
