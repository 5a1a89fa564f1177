//! Transport session handles
//!
//! A `SessionHandle` is the router's only way to reach a live connection. The
//! transport owns the receiving half of the outbox and drains it onto the wire.

use duochat_core::{OutboundEvent, SessionId};
use tokio::sync::mpsc;
use tracing::trace;

/// Sender half of a session's outbound queue
pub type SessionOutbox = mpsc::UnboundedSender<OutboundEvent>;

/// Receiver half, held by the transport writer
pub type SessionInbox = mpsc::UnboundedReceiver<OutboundEvent>;

/// Role a session plays once it has announced itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    User,
    Observer,
}

/// Cheaply cloneable handle addressing one live transport connection
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    outbox: SessionOutbox,
}

impl SessionHandle {
    pub fn new(id: SessionId, outbox: SessionOutbox) -> Self {
        Self { id, outbox }
    }

    /// Create a handle together with the inbox the transport drains
    pub fn channel() -> (Self, SessionInbox) {
        let (outbox, inbox) = mpsc::unbounded_channel();
        (Self::new(SessionId::generate(), outbox), inbox)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Queue an event for this session
    ///
    /// Returns false when the transport side has already gone away; the
    /// registry entry is cleaned up by the disconnect that follows.
    pub fn send(&self, event: OutboundEvent) -> bool {
        let name = event.name();
        match self.outbox.send(event) {
            Ok(()) => true,
            Err(_) => {
                trace!(session = %self.id, event = name, "session outbox closed, dropping event");
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.outbox.is_closed()
    }
}

impl PartialEq for SessionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SessionHandle {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_after_receiver_dropped() {
        let (handle, inbox) = SessionHandle::channel();
        assert!(handle.send(OutboundEvent::OnlineSnapshot { users: vec![] }));

        drop(inbox);
        assert!(handle.is_closed());
        assert!(!handle.send(OutboundEvent::OnlineSnapshot { users: vec![] }));
    }

    #[test]
    fn test_handles_compare_by_session_id() {
        let (a, _inbox_a) = SessionHandle::channel();
        let (b, _inbox_b) = SessionHandle::channel();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
