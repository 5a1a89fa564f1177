//! Property tests for the status merge
//!
//! Whatever order status updates arrive in, `delivered` and `read_at` only
//! ever move forward and re-applying an update changes nothing.

use duochat_core::{CanonicalStatus, Message, NewMessage, Payload, StatusUpdate, Timestamp};
use duochat_runtime::{merge_status, MessageId, UserId};
use proptest::prelude::*;

fn fresh_message() -> Message {
    NewMessage {
        from: UserId::new("alice"),
        to: UserId::new("bob"),
        payload: Payload::text("hi"),
        timestamp: Timestamp::new(0),
    }
    .into_message(MessageId::new(1))
}

/// Generate an arbitrary canonical update for message 1
fn arb_update() -> impl Strategy<Value = CanonicalStatus> {
    (
        proptest::option::of(any::<bool>()),
        proptest::option::of(1u64..1_000_000),
    )
        .prop_map(|(delivered, read_at)| CanonicalStatus {
            message_id: MessageId::new(1),
            delivered,
            read_at: read_at.map(Timestamp::new),
        })
}

proptest! {
    /// Property: no update sequence un-delivers or moves a read timestamp
    #[test]
    fn merge_is_monotonic(updates in prop::collection::vec(arb_update(), 0..32)) {
        let mut message = fresh_message();
        let mut was_delivered = false;
        let mut first_read: Option<Timestamp> = None;

        for update in &updates {
            merge_status(&mut message, update);

            prop_assert!(!was_delivered || message.delivered);
            if let Some(read_at) = first_read {
                prop_assert_eq!(message.read_at, Some(read_at));
            }
            if message.read_at.is_some() {
                prop_assert!(message.delivered);
            }

            was_delivered = message.delivered;
            first_read = first_read.or(message.read_at);
        }

        let expected_read = updates.iter().find_map(|update| update.read_at);
        prop_assert_eq!(message.read_at, expected_read);
    }

    /// Property: applying the same update twice is a no-op the second time
    #[test]
    fn merge_is_idempotent(
        prefix in prop::collection::vec(arb_update(), 0..8),
        update in arb_update(),
    ) {
        let mut message = fresh_message();
        for earlier in &prefix {
            merge_status(&mut message, earlier);
        }

        merge_status(&mut message, &update);
        let once = message.clone();
        prop_assert!(!merge_status(&mut message, &update));
        prop_assert_eq!(message, once);
    }

    /// Property: a legacy batch normalizes to one read per id, all at `now`
    #[test]
    fn legacy_batch_normalizes_per_id(
        ids in prop::collection::vec(1u64..10_000, 0..16),
        now in 0u64..1_000_000,
    ) {
        let message_ids: Vec<MessageId> = ids.iter().copied().map(MessageId::new).collect();
        let canonical = StatusUpdate::LegacyBatch { message_ids: message_ids.clone() }
            .normalize(Timestamp::new(now));

        prop_assert_eq!(canonical.len(), message_ids.len());
        for (status, id) in canonical.iter().zip(&message_ids) {
            prop_assert_eq!(*status, CanonicalStatus::read(*id, Timestamp::new(now)));
        }
    }
}
