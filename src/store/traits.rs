//! `Database` trait, the single async interface for all persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DatabaseError;

/// Counter names tracked in the `statistics` table.
pub mod metrics {
    pub const TOTAL_EMAILS_PROCESSED: &str = "total_emails_processed";
    pub const EMAILS_CLASSIFIED: &str = "emails_classified";
    pub const REPLIES_GENERATED: &str = "replies_generated";
    pub const ACTIONS_SAVED: &str = "actions_saved";

    pub const ALL: [&str; 4] = [
        TOTAL_EMAILS_PROCESSED,
        EMAILS_CLASSIFIED,
        REPLIES_GENERATED,
        ACTIONS_SAVED,
    ];
}

/// A user action to record against an email.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewAction {
    pub email_id: String,
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    /// Any other fields supplied by the caller.
    #[serde(default, flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl NewAction {
    pub fn new(email_id: impl Into<String>) -> Self {
        Self {
            email_id: email_id.into(),
            ..Self::default()
        }
    }
}

/// A persisted action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// `action_NNNN`, numbered in save order.
    pub id: String,
    pub email_id: String,
    pub classification: Option<String>,
    pub reply: Option<String>,
    pub action: Option<String>,
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// Usage counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_emails_processed: u64,
    pub emails_classified: u64,
    pub replies_generated: u64,
    pub actions_saved: u64,
}

/// An email synced from the mail source, with its draft state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEmail {
    pub message_id: String,
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub snippet: String,
    pub received_at: DateTime<Utc>,
    pub classification: Option<String>,
    pub draft: Option<String>,
    pub sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
}

/// Backend-agnostic database trait covering actions, preferences,
/// statistics and synced emails.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Actions ─────────────────────────────────────────────────────

    /// Persist an action, assign the next `action_NNNN` id and bump
    /// `actions_saved`.
    async fn save_action(&self, action: NewAction) -> Result<ActionRecord, DatabaseError>;

    async fn get_action(&self, id: &str) -> Result<Option<ActionRecord>, DatabaseError>;

    /// All actions in save order.
    async fn list_actions(&self) -> Result<Vec<ActionRecord>, DatabaseError>;

    // ── Preferences ─────────────────────────────────────────────────

    async fn save_preference(
        &self,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError>;

    async fn get_preference(&self, key: &str) -> Result<Option<serde_json::Value>, DatabaseError>;

    // ── Statistics ──────────────────────────────────────────────────

    /// Add `by` to a counter. Unknown metric names are ignored.
    async fn increment_stat(&self, metric: &str, by: u64) -> Result<(), DatabaseError>;

    async fn get_statistics(&self) -> Result<Statistics, DatabaseError>;

    // ── Synced emails ───────────────────────────────────────────────

    /// Insert or refresh an email. Existing drafts and sent state survive.
    async fn upsert_email(&self, email: &StoredEmail) -> Result<(), DatabaseError>;

    /// Stored emails, newest first.
    async fn list_emails(&self) -> Result<Vec<StoredEmail>, DatabaseError>;

    async fn get_email(&self, message_id: &str) -> Result<Option<StoredEmail>, DatabaseError>;

    /// Store a draft. Errors with `NotFound` for unknown emails.
    async fn set_draft(&self, message_id: &str, draft: &str) -> Result<(), DatabaseError>;

    /// Mark an email as sent. Errors with `NotFound` for unknown emails.
    async fn mark_sent(&self, message_id: &str) -> Result<(), DatabaseError>;

    // ── Maintenance ─────────────────────────────────────────────────

    /// Delete all data and reset counters to zero.
    async fn clear_all(&self) -> Result<(), DatabaseError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_action_collects_extra_fields() {
        let action: NewAction = serde_json::from_value(serde_json::json!({
            "email_id": "email_001",
            "classification": "Important",
            "note": "follow up"
        }))
        .unwrap();
        assert_eq!(action.email_id, "email_001");
        assert_eq!(action.classification.as_deref(), Some("Important"));
        assert!(action.reply.is_none());
        assert_eq!(action.metadata["note"], "follow up");
    }

    #[test]
    fn statistics_serialize_by_name() {
        let stats = Statistics {
            emails_classified: 2,
            ..Statistics::default()
        };
        let json = serde_json::to_value(stats).unwrap();
        for name in metrics::ALL {
            assert!(json.get(name).is_some(), "missing {name}");
        }
        assert_eq!(json["emails_classified"], 2);
    }
}
