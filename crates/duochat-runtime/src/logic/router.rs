//! Dispatch Router
//!
//! Contains the DispatchRouter, the only component that touches session
//! handles. It feeds inbound events into the registry, the typing coordinator
//! and the status tracker, then decides who receives which outbound event.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use duochat_core::{
    DuochatConfig, DuochatError, DuochatResult, InboundEvent, Message, MessageStatus,
    MessageStore, NewMessage, OutboundEvent, Payload, ProtocolError, SessionId, StatusUpdate,
    TimeSource, TypingNotice, UserDirectory, UserId,
};
use tracing::{debug, info, warn};

use super::fanout::Fanout;
use crate::managers::{
    ConnectionRegistry, DeliveryStatusTracker, SessionHandle, SessionInbox, SessionOutbox,
    StatusOutcome, TypingCoordinator,
};

// ----------------------------------------------------------------------------
// Dispatch Router
// ----------------------------------------------------------------------------

/// Composes registry, typing and status state behind one event entry point
///
/// Shared between connection tasks behind an `Arc`; every operation takes
/// `&self` and the only suspension points are collaborator calls.
pub struct DispatchRouter {
    config: DuochatConfig,
    registry: Arc<ConnectionRegistry>,
    fanout: Arc<Fanout>,
    typing: TypingCoordinator,
    status: DeliveryStatusTracker,
    store: Arc<dyn MessageStore>,
    directory: Arc<dyn UserDirectory>,
    time_source: Arc<dyn TimeSource>,
    stats: RouterCounters,
}

impl DispatchRouter {
    /// Create a router over the given collaborators
    pub fn new(
        config: DuochatConfig,
        store: Arc<dyn MessageStore>,
        directory: Arc<dyn UserDirectory>,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let fanout = Arc::new(Fanout::new(Arc::clone(&registry)));
        let typing = TypingCoordinator::new(&config.typing, fanout.clone());
        let status = DeliveryStatusTracker::new(Arc::clone(&store), Arc::clone(&time_source));

        Self {
            config,
            registry,
            fanout,
            typing,
            status,
            store,
            directory,
            time_source,
            stats: RouterCounters::default(),
        }
    }

    // ------------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------------

    /// A transport connected: hand out an unbound session handle
    pub fn connect(&self, outbox: SessionOutbox) -> SessionHandle {
        let session = SessionHandle::new(SessionId::generate(), outbox);
        debug!(session = %session.id(), "session connected");
        session
    }

    /// Connect with a fresh channel, returning the inbox the transport drains
    pub fn open_session(&self) -> (SessionHandle, SessionInbox) {
        let (outbox, inbox) = tokio::sync::mpsc::unbounded_channel();
        (self.connect(outbox), inbox)
    }

    /// The transport closed
    pub fn disconnect(&self, session: &SessionHandle) {
        let removed = self.registry.unregister(session.id());

        if let Some(identity) = &removed.identity {
            self.typing.on_disconnect(identity);
            info!(session = %session.id(), user = %identity, "user went offline");
        }
        if removed.was_observer {
            info!(session = %session.id(), "observer disconnected");
        }
        if removed.changed_presence() {
            self.fanout.broadcast_snapshot();
        }
    }

    // ------------------------------------------------------------------------
    // Inbound dispatch
    // ------------------------------------------------------------------------

    /// Route one inbound event from `session`
    ///
    /// Malformed events are dropped without error. Collaborator failures are
    /// returned after any in-memory and broadcast effects have happened.
    pub async fn handle(&self, session: &SessionHandle, event: InboundEvent) -> DuochatResult<()> {
        self.stats.events.fetch_add(1, Ordering::Relaxed);

        match event {
            InboundEvent::Register(identity) => {
                if identity.is_empty() {
                    self.drop_malformed(
                        session,
                        ProtocolError::MissingField {
                            event: "register".into(),
                            field: "userId".into(),
                        },
                    );
                    return Ok(());
                }
                self.register(session, identity).await.map(|_| ())
            }
            InboundEvent::RegisterObserver => {
                self.register_observer(session);
                Ok(())
            }
            InboundEvent::Typing(frame) => {
                match frame.into_notice() {
                    Ok(notice) => self.typing(notice),
                    Err(err) => self.drop_malformed(session, err),
                }
                Ok(())
            }
            InboundEvent::MessageSent(frame) => match frame.validate() {
                Ok((from, to, payload)) => self.send_message(from, to, payload).await.map(|_| ()),
                Err(err) => {
                    self.drop_malformed(session, err);
                    Ok(())
                }
            },
            InboundEvent::StatusUpdate(update) => self.update_status(update).await.map(|_| ()),
            InboundEvent::FetchHistory(request) => match request.with {
                Some(with) if !with.is_empty() => self.send_history(session, with).await,
                _ => {
                    self.drop_malformed(
                        session,
                        ProtocolError::MissingField {
                            event: "fetch-history".into(),
                            field: "with".into(),
                        },
                    );
                    Ok(())
                }
            },
        }
    }

    /// Parse and route a raw JSON frame
    pub async fn handle_frame(&self, session: &SessionHandle, frame: &str) -> DuochatResult<()> {
        match InboundEvent::from_frame(frame) {
            Ok(event) => self.handle(session, event).await,
            Err(err) => {
                self.stats.events.fetch_add(1, Ordering::Relaxed);
                self.drop_malformed(session, err);
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    /// Bind `identity` to `session` and broadcast the online snapshot
    ///
    /// Returns false when the directory does not know the identity and the
    /// router is configured to require known users.
    pub async fn register(&self, session: &SessionHandle, identity: UserId) -> DuochatResult<bool> {
        if self.config.directory.require_known_users && !self.directory.exists(&identity).await? {
            debug!(session = %session.id(), user = %identity, "register for unknown user dropped");
            return Ok(false);
        }

        let registration = self.registry.register(identity.clone(), session.clone());
        if let Some(previous) = &registration.released {
            self.typing.on_disconnect(previous);
        }
        if let Some(old) = registration.superseded {
            debug!(user = %identity, old_session = %old, new_session = %session.id(), "session superseded");
        }

        if registration.changed_presence() {
            info!(session = %session.id(), user = %identity, "user registered");
        } else {
            debug!(session = %session.id(), user = %identity, "user re-registered");
        }
        self.fanout.broadcast_snapshot();
        Ok(true)
    }

    /// Mark `session` as an observer and give it the current snapshot
    pub fn register_observer(&self, session: &SessionHandle) {
        if self.registry.register_observer(session.clone()) {
            info!(session = %session.id(), "observer registered");
        }
        self.fanout.send_snapshot_to(session);
    }

    /// Record and forward a typing indicator
    ///
    /// Forwarding happens inside the coordinator so it stays ordered against
    /// the sender's synthetic clears.
    pub fn typing(&self, notice: TypingNotice) {
        self.typing.on_typing(&notice);
    }

    /// Persist a message, then deliver it live where possible
    ///
    /// Durability is unconditional and live delivery best-effort: observers
    /// always get a copy, the recipient only if it has a session.
    pub async fn send_message(
        &self,
        from: UserId,
        to: UserId,
        payload: Payload,
    ) -> DuochatResult<Message> {
        // The indicator is superseded whether or not the write succeeds
        self.typing.on_send_completes(&from, &to);

        let draft = NewMessage {
            from,
            to,
            payload,
            timestamp: self.time_source.now(),
        };
        let id = match self.store.append(draft.clone()).await {
            Ok(id) => id,
            Err(err) => {
                self.stats.store_failures.fetch_add(1, Ordering::Relaxed);
                warn!(from = %draft.from, to = %draft.to, error = %err, "failed to persist message");
                return Err(err.into());
            }
        };

        let message = draft.into_message(id);
        debug!(message_id = %message.id, kind = message.payload.kind(), "message persisted");
        if self.fanout.deliver_message(&message) {
            self.stats.live_deliveries.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.stored_only.fetch_add(1, Ordering::Relaxed);
            debug!(message_id = %message.id, to = %message.to, "recipient offline, stored only");
        }
        Ok(message)
    }

    /// Apply a status update of any generation and broadcast the results
    pub async fn update_status(&self, update: StatusUpdate) -> DuochatResult<Vec<MessageStatus>> {
        let outcome = self.status.apply(update).await;
        self.broadcast_statuses(outcome)
    }

    /// Conversation history between the session's identity and `with`
    pub async fn history(&self, identity: &UserId, with: &UserId) -> DuochatResult<Vec<Message>> {
        Ok(self.store.query_between(identity, with).await?)
    }

    /// Remove a user: directory record, messages and any live binding
    ///
    /// Returns how many messages were deleted.
    pub async fn remove_user(&self, identity: &UserId) -> DuochatResult<usize> {
        if self.registry.evict(identity).is_some() {
            self.fanout.broadcast_snapshot();
        }
        self.typing.on_disconnect(identity);

        let existed = self.directory.delete(identity).await?;
        let removed = self.store.delete_by_participant(identity).await?;
        info!(user = %identity, existed, messages = removed, "user removed");
        Ok(removed)
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn online_identities(&self) -> BTreeSet<UserId> {
        self.registry.online_identities()
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn typing_coordinator(&self) -> &TypingCoordinator {
        &self.typing
    }

    pub fn status_tracker(&self) -> &DeliveryStatusTracker {
        &self.status
    }

    pub fn config(&self) -> &DuochatConfig {
        &self.config
    }

    /// Get router statistics
    pub fn statistics(&self) -> RouterStatistics {
        RouterStatistics {
            events_handled: self.stats.events.load(Ordering::Relaxed),
            malformed_dropped: self.stats.malformed.load(Ordering::Relaxed),
            live_deliveries: self.stats.live_deliveries.load(Ordering::Relaxed),
            stored_only: self.stats.stored_only.load(Ordering::Relaxed),
            store_failures: self.stats.store_failures.load(Ordering::Relaxed),
        }
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    async fn send_history(&self, session: &SessionHandle, with: UserId) -> DuochatResult<()> {
        let Some(identity) = self.registry.identity_of(session.id()) else {
            debug!(session = %session.id(), "history requested by unbound session, dropped");
            return Ok(());
        };

        let messages = self.history(&identity, &with).await?;
        session.send(OutboundEvent::History { with, messages });
        Ok(())
    }

    fn broadcast_statuses(&self, outcome: StatusOutcome) -> DuochatResult<Vec<MessageStatus>> {
        let statuses = outcome.statuses();
        for status in &statuses {
            self.fanout.notify_status(status);
        }

        match outcome.failures.into_iter().next() {
            None => Ok(statuses),
            Some((message_id, err)) => {
                self.stats.store_failures.fetch_add(1, Ordering::Relaxed);
                debug!(message_id = %message_id, "status update partially failed");
                Err(DuochatError::Store(err))
            }
        }
    }

    fn drop_malformed(&self, session: &SessionHandle, err: ProtocolError) {
        self.stats.malformed.fetch_add(1, Ordering::Relaxed);
        debug!(session = %session.id(), error = %err, "malformed event dropped");
    }
}

// ----------------------------------------------------------------------------
// Statistics
// ----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct RouterCounters {
    events: AtomicU64,
    malformed: AtomicU64,
    live_deliveries: AtomicU64,
    stored_only: AtomicU64,
    store_failures: AtomicU64,
}

/// Statistics for the dispatch router
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RouterStatistics {
    pub events_handled: u64,
    pub malformed_dropped: u64,
    /// Messages that reached a live recipient session
    pub live_deliveries: u64,
    /// Messages persisted for an offline recipient
    pub stored_only: u64,
    pub store_failures: u64,
}
