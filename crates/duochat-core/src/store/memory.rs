//! In-memory collaborators backed by concurrent maps

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

use super::{MessageMutator, MessageStore, NewMessage, UserDirectory, UserRecord};
use crate::errors::{StoreError, StoreResult};
use crate::protocol::Message;
use crate::types::{MessageId, SystemTimeSource, TimeSource, UserId};

// ----------------------------------------------------------------------------
// Message Store
// ----------------------------------------------------------------------------

/// Message store keeping every record in a sharded map
///
/// Each message sits behind its shard's lock, so concurrent status updates to
/// one message serialize while unrelated messages proceed in parallel.
#[derive(Debug)]
pub struct InMemoryMessageStore {
    messages: DashMap<MessageId, Message>,
    next_id: AtomicU64,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self {
            messages: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn append(&self, message: NewMessage) -> StoreResult<MessageId> {
        let raw = self.next_id.fetch_add(1, Ordering::SeqCst);
        if raw == u64::MAX {
            return Err(StoreError::IdsExhausted);
        }
        let id = MessageId::new(raw);
        trace!(message_id = %id, from = %message.from, to = %message.to, "message appended");
        self.messages.insert(id, message.into_message(id));
        Ok(id)
    }

    async fn find_by_id(&self, id: MessageId) -> StoreResult<Option<Message>> {
        Ok(self.messages.get(&id).map(|entry| entry.value().clone()))
    }

    async fn update(&self, id: MessageId, mutator: MessageMutator) -> StoreResult<Option<Message>> {
        match self.messages.get_mut(&id) {
            Some(mut entry) => {
                mutator(entry.value_mut());
                Ok(Some(entry.value().clone()))
            }
            None => Ok(None),
        }
    }

    async fn query_between(&self, a: &UserId, b: &UserId) -> StoreResult<Vec<Message>> {
        let mut conversation: Vec<Message> = self
            .messages
            .iter()
            .filter(|entry| entry.value().between(a, b))
            .map(|entry| entry.value().clone())
            .collect();
        conversation.sort_by_key(|message| (message.timestamp, message.id));
        Ok(conversation)
    }

    async fn delete_by_participant(&self, identity: &UserId) -> StoreResult<usize> {
        let mut removed = 0;
        self.messages.retain(|_, message| {
            let keep = !message.involves(identity);
            if !keep {
                removed += 1;
            }
            keep
        });
        debug!(user = %identity, removed, "deleted messages by participant");
        Ok(removed)
    }
}

// ----------------------------------------------------------------------------
// User Directory
// ----------------------------------------------------------------------------

/// User directory keeping records in a concurrent map
pub struct InMemoryUserDirectory {
    users: DashMap<UserId, UserRecord>,
    time_source: Arc<dyn TimeSource>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::with_time_source(Arc::new(SystemTimeSource))
    }

    pub fn with_time_source(time_source: Arc<dyn TimeSource>) -> Self {
        Self {
            users: DashMap::new(),
            time_source,
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn exists(&self, id: &UserId) -> StoreResult<bool> {
        Ok(self.users.contains_key(id))
    }

    async fn lookup(&self, id: &UserId) -> StoreResult<Option<UserRecord>> {
        Ok(self.users.get(id).map(|entry| entry.value().clone()))
    }

    async fn create(
        &self,
        id: UserId,
        attributes: BTreeMap<String, String>,
    ) -> StoreResult<UserRecord> {
        match self.users.entry(id.clone()) {
            Entry::Occupied(_) => Err(StoreError::UserExists { user_id: id }),
            Entry::Vacant(slot) => {
                let record = UserRecord {
                    id,
                    created_at: self.time_source.now(),
                    attributes,
                };
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn delete(&self, id: &UserId) -> StoreResult<bool> {
        Ok(self.users.remove(id).is_some())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
