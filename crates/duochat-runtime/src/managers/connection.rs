//! Connection registry for the duochat runtime
//!
//! This module contains the ConnectionRegistry that maps identities to their
//! live session and tracks which sessions are observers.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use duochat_core::{SessionId, UserId};

use super::session::{SessionHandle, SessionRole};

// ----------------------------------------------------------------------------
// Connection Registry
// ----------------------------------------------------------------------------

/// Identity ↔ session mapping plus the observer set
///
/// All three indexes change together under one lock, so a snapshot never sees
/// an identity bound to a session the reverse index does not know about.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    state: Mutex<RegistryState>,
}

#[derive(Debug, Default)]
struct RegistryState {
    /// At most one live session per identity
    by_identity: HashMap<UserId, SessionHandle>,
    /// Reverse index; a session owns at most one identity
    by_session: HashMap<SessionId, UserId>,
    observers: HashMap<SessionId, SessionHandle>,
    stats: ConnectionStats,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind `identity` to `session`, last register wins
    ///
    /// A session previously bound to `identity` is not closed; it simply stops
    /// being addressable by that identity.
    pub fn register(&self, identity: UserId, session: SessionHandle) -> Registration {
        let mut state = self.state();
        let session_id = session.id();

        // A session re-registering under a new identity gives up the old one
        let released = match state.by_session.get(&session_id) {
            Some(previous) if *previous != identity => {
                let previous = previous.clone();
                state.by_identity.remove(&previous);
                Some(previous)
            }
            _ => None,
        };

        let newly_online = !state.by_identity.contains_key(&identity);
        let superseded = state
            .by_identity
            .insert(identity.clone(), session)
            .map(|old| old.id())
            .filter(|old_id| *old_id != session_id);

        if let Some(old_id) = superseded {
            state.by_session.remove(&old_id);
            state.stats.sessions_superseded += 1;
        }

        state.by_session.insert(session_id, identity);
        state.stats.registrations += 1;

        Registration {
            newly_online,
            superseded,
            released,
        }
    }

    /// Add a session to the observer set, returning whether it was new
    pub fn register_observer(&self, session: SessionHandle) -> bool {
        let mut state = self.state();
        let added = state.observers.insert(session.id(), session).is_none();
        if added {
            state.stats.observers_registered += 1;
        }
        added
    }

    /// Remove everything this session owns
    pub fn unregister(&self, session_id: SessionId) -> Unregistration {
        let mut state = self.state();

        let identity = state.by_session.remove(&session_id);
        if let Some(identity) = &identity {
            let owned = state
                .by_identity
                .get(identity)
                .is_some_and(|bound| bound.id() == session_id);
            if owned {
                state.by_identity.remove(identity);
            }
        }

        let was_observer = state.observers.remove(&session_id).is_some();
        if identity.is_some() || was_observer {
            state.stats.sessions_unregistered += 1;
        }

        Unregistration {
            identity,
            was_observer,
        }
    }

    /// Drop the binding for `identity` regardless of which session holds it
    pub fn evict(&self, identity: &UserId) -> Option<SessionHandle> {
        let mut state = self.state();
        let session = state.by_identity.remove(identity)?;
        state.by_session.remove(&session.id());
        Some(session)
    }

    /// Live session for `identity`
    pub fn lookup(&self, identity: &UserId) -> Option<SessionHandle> {
        self.state().by_identity.get(identity).cloned()
    }

    /// Identity currently owned by `session_id`
    pub fn identity_of(&self, session_id: SessionId) -> Option<UserId> {
        self.state().by_session.get(&session_id).cloned()
    }

    /// Role of a session, `None` while it is still unbound
    pub fn role_of(&self, session_id: SessionId) -> Option<SessionRole> {
        let state = self.state();
        if state.observers.contains_key(&session_id) {
            Some(SessionRole::Observer)
        } else if state.by_session.contains_key(&session_id) {
            Some(SessionRole::User)
        } else {
            None
        }
    }

    /// Snapshot of online identities at call time
    pub fn online_identities(&self) -> BTreeSet<UserId> {
        self.state().by_identity.keys().cloned().collect()
    }

    /// Snapshot of observer sessions at call time
    pub fn observers(&self) -> Vec<SessionHandle> {
        self.state().observers.values().cloned().collect()
    }

    pub fn online_count(&self) -> usize {
        self.state().by_identity.len()
    }

    pub fn observer_count(&self) -> usize {
        self.state().observers.len()
    }

    /// Get registry statistics
    pub fn statistics(&self) -> ConnectionStats {
        self.state().stats.clone()
    }
}

// ----------------------------------------------------------------------------
// Supporting Types
// ----------------------------------------------------------------------------

/// What a register call displaced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registration {
    /// The identity had no live session before this call
    pub newly_online: bool,
    /// Another session that held the identity before
    pub superseded: Option<SessionId>,
    /// Identity this session held before re-registering under a new one
    pub released: Option<UserId>,
}

/// What an unregister call removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unregistration {
    /// Identity the session owned at disconnect time
    pub identity: Option<UserId>,
    pub was_observer: bool,
}

impl Registration {
    /// Whether the set of online identities changed
    pub fn changed_presence(&self) -> bool {
        self.newly_online || self.released.is_some()
    }
}

impl Unregistration {
    /// Whether the set of online identities changed
    pub fn changed_presence(&self) -> bool {
        self.identity.is_some()
    }
}

/// Statistics for connection management
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Number of register calls processed
    pub registrations: u64,
    /// Number of bindings taken over by a later register
    pub sessions_superseded: u64,
    /// Number of observer sessions added
    pub observers_registered: u64,
    /// Number of sessions removed that owned something
    pub sessions_unregistered: u64,
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
