//! Outbound fan-out
//!
//! Helpers that turn a routing decision into sends on session handles. Every
//! helper snapshots its targets from the registry first and sends after the
//! registry lock is released.

use std::sync::Arc;

use duochat_core::{Message, MessageStatus, OutboundEvent, TypingNotice, UserId};
use tracing::trace;

use crate::managers::{ConnectionRegistry, SessionHandle, TypingSink};

/// Addresses outbound events to identities and observers
pub struct Fanout {
    registry: Arc<ConnectionRegistry>,
}

impl Fanout {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Send to the live session of `identity`, returning whether one existed
    pub fn send_to_identity(&self, identity: &UserId, event: OutboundEvent) -> bool {
        match self.registry.lookup(identity) {
            Some(session) => session.send(event),
            None => {
                trace!(to = %identity, event = event.name(), "no live session");
                false
            }
        }
    }

    /// Send a copy to every observer, returning how many were reached
    pub fn broadcast_to_observers(&self, event: &OutboundEvent) -> usize {
        self.registry
            .observers()
            .iter()
            .filter(|observer| observer.send(event.clone()))
            .count()
    }

    /// Current online snapshot as an event
    pub fn online_snapshot(&self) -> OutboundEvent {
        OutboundEvent::OnlineSnapshot {
            users: self.registry.online_identities().into_iter().collect(),
        }
    }

    /// Rendezvous snapshot for one newly registered observer
    pub fn send_snapshot_to(&self, session: &SessionHandle) -> bool {
        session.send(self.online_snapshot())
    }

    /// Presence changed: every observer gets the new snapshot
    pub fn broadcast_snapshot(&self) -> usize {
        self.broadcast_to_observers(&self.online_snapshot())
    }

    /// Typing indicator to the recipient and to observers
    pub fn forward_typing(&self, notice: &TypingNotice) -> bool {
        let event = OutboundEvent::Typing(notice.clone());
        self.broadcast_to_observers(&event);
        self.send_to_identity(&notice.to, event)
    }

    /// New message to its recipient if online, and always to observers
    pub fn deliver_message(&self, message: &Message) -> bool {
        let event = OutboundEvent::Message(message.clone());
        self.broadcast_to_observers(&event);
        self.send_to_identity(&message.to, event)
    }

    /// Merged status back to the original sender and to observers
    pub fn notify_status(&self, status: &MessageStatus) -> bool {
        let event = OutboundEvent::StatusUpdate(status.clone());
        self.broadcast_to_observers(&event);
        self.send_to_identity(&status.from, event)
    }
}

impl TypingSink for Fanout {
    fn typing_forwarded(&self, notice: &TypingNotice) {
        self.forward_typing(notice);
    }

    fn typing_expired(&self, notice: TypingNotice) {
        self.forward_typing(&notice);
    }
}
