//! Delivery and read status tracking for the duochat runtime
//!
//! This module contains the DeliveryStatusTracker, the single place where a
//! message's `delivered` and `read_at` fields are mutated. Every protocol
//! generation is normalized to `CanonicalStatus` first; the merge itself only
//! ever moves fields forward.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use duochat_core::{
    CanonicalStatus, Message, MessageId, MessageStatus, MessageStore, StatusUpdate, StoreError,
    TimeSource,
};
use tracing::{debug, warn};

// ----------------------------------------------------------------------------
// Delivery Status Tracker
// ----------------------------------------------------------------------------

/// Applies status updates to persisted messages
pub struct DeliveryStatusTracker {
    store: Arc<dyn MessageStore>,
    time_source: Arc<dyn TimeSource>,
    stats: StatusCounters,
}

impl DeliveryStatusTracker {
    pub fn new(store: Arc<dyn MessageStore>, time_source: Arc<dyn TimeSource>) -> Self {
        Self {
            store,
            time_source,
            stats: StatusCounters::default(),
        }
    }

    /// Apply a status update in any protocol generation
    pub async fn apply(&self, update: StatusUpdate) -> StatusOutcome {
        let generation = update.generation();
        let canonical = update.normalize(self.time_source.now());
        debug!(generation, count = canonical.len(), "applying status update");

        let mut outcome = StatusOutcome::default();
        for status in canonical {
            self.apply_one(status, &mut outcome).await;
        }
        outcome
    }

    /// Canonical entry point: merge `status` into the stored message
    ///
    /// `Ok(None)` means the id is unknown and the update was dropped.
    pub async fn set_status(
        &self,
        status: CanonicalStatus,
    ) -> Result<Option<StatusChange>, StoreError> {
        let changed = Arc::new(AtomicBool::new(false));
        let changed_flag = Arc::clone(&changed);

        let merged = self
            .store
            .update(
                status.message_id,
                Box::new(move |message: &mut Message| {
                    changed_flag.store(merge_status(message, &status), Ordering::Relaxed);
                }),
            )
            .await;

        match merged {
            Ok(Some(message)) => {
                let changed = changed.load(Ordering::Relaxed);
                let counter = if changed {
                    &self.stats.applied
                } else {
                    &self.stats.unchanged
                };
                counter.fetch_add(1, Ordering::Relaxed);
                Ok(Some(StatusChange {
                    status: message.status(),
                    changed,
                }))
            }
            Ok(None) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(message_id = %status.message_id, "status update for unknown message dropped");
                Ok(None)
            }
            Err(err) => {
                self.stats.persist_failures.fetch_add(1, Ordering::Relaxed);
                warn!(message_id = %status.message_id, error = %err, "failed to persist status update");
                Err(err)
            }
        }
    }

    /// Legacy single read receipt
    pub async fn mark_read(&self, message_id: MessageId) -> StatusOutcome {
        self.apply(StatusUpdate::LegacySingle { message_id }).await
    }

    /// Legacy batch read receipt; every id is handled on its own
    pub async fn mark_read_batch(&self, message_ids: Vec<MessageId>) -> StatusOutcome {
        self.apply(StatusUpdate::LegacyBatch { message_ids }).await
    }

    /// Get status tracking statistics
    pub fn statistics(&self) -> StatusStatistics {
        StatusStatistics {
            applied: self.stats.applied.load(Ordering::Relaxed),
            unchanged: self.stats.unchanged.load(Ordering::Relaxed),
            dropped: self.stats.dropped.load(Ordering::Relaxed),
            persist_failures: self.stats.persist_failures.load(Ordering::Relaxed),
        }
    }

    async fn apply_one(&self, status: CanonicalStatus, outcome: &mut StatusOutcome) {
        match self.set_status(status).await {
            Ok(Some(change)) => outcome.applied.push(change),
            Ok(None) => outcome.dropped.push(status.message_id),
            Err(err) => outcome.failures.push((status.message_id, err)),
        }
    }
}

/// Merge `update` into `message`, returning whether anything moved
///
/// `delivered` only goes false to true and `read_at` only goes unset to set.
/// A read implies delivery. Anything else in the update is ignored.
pub fn merge_status(message: &mut Message, update: &CanonicalStatus) -> bool {
    let mut changed = false;

    if let Some(read_at) = update.read_at {
        if message.read_at.is_none() {
            message.read_at = Some(read_at);
            changed = true;
        }
    }

    let delivered = update.delivered == Some(true) || update.read_at.is_some();
    if delivered && !message.delivered {
        message.delivered = true;
        changed = true;
    }

    changed
}

// ----------------------------------------------------------------------------
// Supporting Types
// ----------------------------------------------------------------------------

/// Merged status of one message after an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: MessageStatus,
    /// False when the update was already reflected in the record
    pub changed: bool,
}

/// Per-id results of one status update
#[derive(Debug, Default)]
pub struct StatusOutcome {
    pub applied: Vec<StatusChange>,
    /// Ids with no stored message
    pub dropped: Vec<MessageId>,
    pub failures: Vec<(MessageId, StoreError)>,
}

impl StatusOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Statuses to broadcast
    pub fn statuses(&self) -> Vec<MessageStatus> {
        self.applied.iter().map(|change| change.status.clone()).collect()
    }
}

#[derive(Debug, Default)]
struct StatusCounters {
    applied: AtomicU64,
    unchanged: AtomicU64,
    dropped: AtomicU64,
    persist_failures: AtomicU64,
}

/// Statistics about status updates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusStatistics {
    /// Updates that moved a field forward
    pub applied: u64,
    /// Updates already reflected in the record
    pub unchanged: u64,
    /// Updates for unknown message ids
    pub dropped: u64,
    /// Updates the store failed to persist
    pub persist_failures: u64,
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
