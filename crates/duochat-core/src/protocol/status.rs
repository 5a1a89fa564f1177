//! Status-update protocol generations
//!
//! Clients have reported read and delivery state in three shapes over time:
//! - `{messageId}`: a single read receipt (oldest clients)
//! - `{messageIds: [..]}`: a batch of read receipts
//! - `{messageId, delivered?, readAt?}`: the canonical partial status update
//!
//! All three arrive under the `status-update` event and are told apart by shape.
//! Each one normalizes into a list of `CanonicalStatus` values before anything
//! touches shared state.

use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;
use crate::types::{MessageId, Timestamp};

// ----------------------------------------------------------------------------
// Canonical Form
// ----------------------------------------------------------------------------

/// The single normalized status mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalStatus {
    pub message_id: MessageId,
    pub delivered: Option<bool>,
    pub read_at: Option<Timestamp>,
}

impl CanonicalStatus {
    /// Mark a message as delivered only
    pub fn delivered(message_id: MessageId) -> Self {
        Self {
            message_id,
            delivered: Some(true),
            read_at: None,
        }
    }

    /// Mark a message as read at `at`, which implies delivered
    pub fn read(message_id: MessageId, at: Timestamp) -> Self {
        Self {
            message_id,
            delivered: Some(true),
            read_at: Some(at),
        }
    }
}

// ----------------------------------------------------------------------------
// Tagged Union
// ----------------------------------------------------------------------------

/// Status report as received, in any protocol generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStatusUpdate", into = "RawStatusUpdate")]
pub enum StatusUpdate {
    LegacySingle { message_id: MessageId },
    LegacyBatch { message_ids: Vec<MessageId> },
    Canonical(CanonicalStatus),
}

impl StatusUpdate {
    /// Reduce to canonical mutations, stamping legacy receipts with `now`
    ///
    /// Batch entries stay independent: each id yields its own mutation.
    pub fn normalize(self, now: Timestamp) -> Vec<CanonicalStatus> {
        match self {
            StatusUpdate::LegacySingle { message_id } => {
                vec![CanonicalStatus::read(message_id, now)]
            }
            StatusUpdate::LegacyBatch { message_ids } => message_ids
                .into_iter()
                .map(|id| CanonicalStatus::read(id, now))
                .collect(),
            StatusUpdate::Canonical(status) => vec![status],
        }
    }

    pub fn generation(&self) -> &'static str {
        match self {
            StatusUpdate::LegacySingle { .. } => "legacy-single",
            StatusUpdate::LegacyBatch { .. } => "legacy-batch",
            StatusUpdate::Canonical(_) => "canonical",
        }
    }
}

/// Superset of every generation's fields, used only for shape detection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStatusUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message_id: Option<MessageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message_ids: Option<Vec<MessageId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    delivered: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    read_at: Option<Timestamp>,
}

impl TryFrom<RawStatusUpdate> for StatusUpdate {
    type Error = ProtocolError;

    fn try_from(raw: RawStatusUpdate) -> Result<Self, Self::Error> {
        if let Some(message_ids) = raw.message_ids {
            return Ok(StatusUpdate::LegacyBatch { message_ids });
        }

        let message_id = raw.message_id.ok_or(ProtocolError::EmptyStatusUpdate)?;
        if raw.delivered.is_none() && raw.read_at.is_none() {
            return Ok(StatusUpdate::LegacySingle { message_id });
        }

        Ok(StatusUpdate::Canonical(CanonicalStatus {
            message_id,
            delivered: raw.delivered,
            read_at: raw.read_at,
        }))
    }
}

impl From<StatusUpdate> for RawStatusUpdate {
    fn from(update: StatusUpdate) -> Self {
        match update {
            StatusUpdate::LegacySingle { message_id } => RawStatusUpdate {
                message_id: Some(message_id),
                ..Default::default()
            },
            StatusUpdate::LegacyBatch { message_ids } => RawStatusUpdate {
                message_ids: Some(message_ids),
                ..Default::default()
            },
            StatusUpdate::Canonical(status) => RawStatusUpdate {
                message_id: Some(status.message_id),
                delivered: status.delivered,
                read_at: status.read_at,
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<StatusUpdate, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn test_shape_detection() {
        assert_eq!(
            parse(r#"{"messageId": 4}"#).unwrap(),
            StatusUpdate::LegacySingle {
                message_id: MessageId::new(4)
            }
        );
        assert_eq!(
            parse(r#"{"messageIds": [1, 2]}"#).unwrap(),
            StatusUpdate::LegacyBatch {
                message_ids: vec![MessageId::new(1), MessageId::new(2)]
            }
        );
        assert_eq!(
            parse(r#"{"messageId": 4, "delivered": true}"#).unwrap(),
            StatusUpdate::Canonical(CanonicalStatus::delivered(MessageId::new(4)))
        );
    }

    #[test]
    fn test_empty_update_rejected() {
        assert!(parse(r#"{"delivered": true}"#).is_err());
        assert!(parse("{}").is_err());
    }

    #[test]
    fn test_legacy_receipts_normalize_to_read() {
        let now = Timestamp::new(9_000);
        let batch = StatusUpdate::LegacyBatch {
            message_ids: vec![MessageId::new(1), MessageId::new(2)],
        };

        let canonical = batch.normalize(now);
        assert_eq!(
            canonical,
            vec![
                CanonicalStatus::read(MessageId::new(1), now),
                CanonicalStatus::read(MessageId::new(2), now),
            ]
        );

        let single = StatusUpdate::LegacySingle {
            message_id: MessageId::new(3),
        };
        assert_eq!(single.normalize(now)[0].read_at, Some(now));
    }

    #[test]
    fn test_canonical_serializes_without_legacy_fields() {
        let update = StatusUpdate::Canonical(CanonicalStatus::delivered(MessageId::new(5)));
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({"messageId": 5, "delivered": true}));
    }
}
