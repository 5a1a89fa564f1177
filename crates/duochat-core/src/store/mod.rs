//! Collaborator contracts
//!
//! The engine persists messages and consults user records through these two
//! traits. Storage mechanics live behind them; the engine only relies on the
//! read-after-write guarantee of `MessageStore::append`.

mod memory;

pub use memory::{InMemoryMessageStore, InMemoryUserDirectory};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::StoreResult;
use crate::protocol::{Message, Payload};
use crate::types::{MessageId, Timestamp, UserId};

// ----------------------------------------------------------------------------
// Message Store
// ----------------------------------------------------------------------------

/// A message that has not been assigned an id yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub from: UserId,
    pub to: UserId,
    pub payload: Payload,
    pub timestamp: Timestamp,
}

impl NewMessage {
    /// Attach the store-assigned id, producing an undelivered, unread message
    pub fn into_message(self, id: MessageId) -> Message {
        Message {
            id,
            from: self.from,
            to: self.to,
            payload: self.payload,
            timestamp: self.timestamp,
            delivered: false,
            read_at: None,
        }
    }
}

/// In-place mutation applied under the store's per-message lock
pub type MessageMutator = Box<dyn FnOnce(&mut Message) + Send>;

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a new message and return its assigned id
    ///
    /// Ids are unique and increase monotonically. A successful append must be
    /// visible to any later `find_by_id`.
    async fn append(&self, message: NewMessage) -> StoreResult<MessageId>;

    async fn find_by_id(&self, id: MessageId) -> StoreResult<Option<Message>>;

    /// Apply `mutator` atomically and return the persisted result,
    /// or `None` when no message has this id
    async fn update(&self, id: MessageId, mutator: MessageMutator) -> StoreResult<Option<Message>>;

    /// Messages exchanged between `a` and `b`, oldest first
    async fn query_between(&self, a: &UserId, b: &UserId) -> StoreResult<Vec<Message>>;

    /// Remove every message `identity` sent or received, returning how many went
    async fn delete_by_participant(&self, identity: &UserId) -> StoreResult<usize>;
}

// ----------------------------------------------------------------------------
// User Directory
// ----------------------------------------------------------------------------

/// A user record as kept by the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub created_at: Timestamp,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl UserRecord {
    pub fn display_name(&self) -> &str {
        self.attributes
            .get("displayName")
            .map(String::as_str)
            .unwrap_or_else(|| self.id.as_str())
    }
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn exists(&self, id: &UserId) -> StoreResult<bool>;

    async fn lookup(&self, id: &UserId) -> StoreResult<Option<UserRecord>>;

    /// Create a record; fails with `StoreError::UserExists` on a duplicate id
    async fn create(&self, id: UserId, attributes: BTreeMap<String, String>)
        -> StoreResult<UserRecord>;

    /// Delete a record, returning whether one existed
    async fn delete(&self, id: &UserId) -> StoreResult<bool>;
}
