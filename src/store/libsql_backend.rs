//! libSQL implementation of the async `Database` trait.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{
    ActionRecord, Database, NewAction, Statistics, StoredEmail, metrics,
};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests and `:memory:` deployments).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

const ACTION_COLUMNS: &str =
    "id, email_id, classification, reply, action, metadata, created_at";

fn row_to_action(row: &libsql::Row) -> Result<ActionRecord, DatabaseError> {
    let parse = |e: libsql::Error| DatabaseError::Query(format!("action row parse: {e}"));
    let metadata_str: String = row.get(5).map_err(parse)?;
    let created_str: String = row.get(6).map_err(parse)?;
    let metadata = serde_json::from_str(&metadata_str)
        .map_err(|e| DatabaseError::Serialization(format!("action metadata: {e}")))?;

    Ok(ActionRecord {
        id: row.get(0).map_err(parse)?,
        email_id: row.get(1).map_err(parse)?,
        classification: row.get(2).ok(),
        reply: row.get(3).ok(),
        action: row.get(4).ok(),
        metadata,
        timestamp: parse_datetime(&created_str),
    })
}

const EMAIL_COLUMNS: &str = "message_id, sender, subject, body, snippet, received_at, \
     classification, draft, sent, sent_at";

fn row_to_email(row: &libsql::Row) -> Result<StoredEmail, libsql::Error> {
    let received_str: String = row.get(5)?;
    let sent: i64 = row.get(8)?;
    let sent_at: Option<String> = row.get(9).ok();

    Ok(StoredEmail {
        message_id: row.get(0)?,
        sender: row.get(1)?,
        subject: row.get(2)?,
        body: row.get(3)?,
        snippet: row.get(4)?,
        received_at: parse_datetime(&received_str),
        classification: row.get(6).ok(),
        draft: row.get(7).ok(),
        sent: sent != 0,
        sent_at: sent_at.as_deref().map(parse_datetime),
    })
}

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Actions ─────────────────────────────────────────────────────

    async fn save_action(&self, action: NewAction) -> Result<ActionRecord, DatabaseError> {
        let now = Utc::now();
        let metadata = serde_json::to_string(&action.metadata)
            .map_err(|e| DatabaseError::Serialization(format!("action metadata: {e}")))?;

        // seq and id are derived in the insert itself
        let mut rows = self
            .conn()
            .query(
                "INSERT INTO actions (id, seq, email_id, classification, reply, action, metadata, created_at)
                 SELECT printf('action_%04d', n.seq), n.seq, ?1, ?2, ?3, ?4, ?5, ?6
                 FROM (SELECT COALESCE(MAX(seq), 0) + 1 AS seq FROM actions) AS n
                 RETURNING id",
                params![
                    action.email_id.as_str(),
                    opt_text(action.classification.as_deref()),
                    opt_text(action.reply.as_deref()),
                    opt_text(action.action.as_deref()),
                    metadata,
                    now.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save_action: {e}")))?;
        let id: String = match rows.next().await {
            Ok(Some(row)) => row
                .get(0)
                .map_err(|e| DatabaseError::Query(format!("save_action: {e}")))?,
            Ok(None) => {
                return Err(DatabaseError::Query(
                    "save_action: insert returned no id".to_string(),
                ));
            }
            Err(e) => return Err(DatabaseError::Query(format!("save_action: {e}"))),
        };
        drop(rows);

        self.increment_stat(metrics::ACTIONS_SAVED, 1).await?;

        info!(
            id = %id,
            email_id = %action.email_id,
            classification = action.classification.as_deref().unwrap_or("-"),
            "Saved action"
        );

        Ok(ActionRecord {
            id,
            email_id: action.email_id,
            classification: action.classification,
            reply: action.reply,
            action: action.action,
            metadata: action.metadata,
            timestamp: now,
        })
    }

    async fn get_action(&self, id: &str) -> Result<Option<ActionRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {ACTION_COLUMNS} FROM actions WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_action: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row_to_action(&row).map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_action: {e}"))),
        }
    }

    async fn list_actions(&self) -> Result<Vec<ActionRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {ACTION_COLUMNS} FROM actions ORDER BY seq ASC"),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_actions: {e}")))?;

        let mut actions = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_actions: {e}")))?
        {
            actions.push(row_to_action(&row)?);
        }
        Ok(actions)
    }

    // ── Preferences ─────────────────────────────────────────────────

    async fn save_preference(
        &self,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(value)
            .map_err(|e| DatabaseError::Serialization(format!("preference {key}: {e}")))?;
        self.conn()
            .execute(
                "INSERT INTO preferences (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, json],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save_preference: {e}")))?;
        debug!(key, "Saved preference");
        Ok(())
    }

    async fn get_preference(&self, key: &str) -> Result<Option<serde_json::Value>, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT value FROM preferences WHERE key = ?1", params![key])
            .await
            .map_err(|e| DatabaseError::Query(format!("get_preference: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let raw: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("get_preference: {e}")))?;
                serde_json::from_str(&raw)
                    .map(Some)
                    .map_err(|e| DatabaseError::Serialization(format!("preference {key}: {e}")))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_preference: {e}"))),
        }
    }

    // ── Statistics ──────────────────────────────────────────────────

    async fn increment_stat(&self, metric: &str, by: u64) -> Result<(), DatabaseError> {
        let by = i64::try_from(by).unwrap_or(i64::MAX);
        let updated = self
            .conn()
            .execute(
                "UPDATE statistics SET value = value + ?1 WHERE metric = ?2",
                params![by, metric],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("increment_stat: {e}")))?;
        if updated == 0 {
            debug!(metric, "Ignoring unknown statistic");
        }
        Ok(())
    }

    async fn get_statistics(&self) -> Result<Statistics, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT metric, value FROM statistics", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("get_statistics: {e}")))?;

        let mut stats = Statistics::default();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("get_statistics: {e}")))?
        {
            let metric: String = row
                .get(0)
                .map_err(|e| DatabaseError::Query(format!("get_statistics: {e}")))?;
            let value: i64 = row.get(1).unwrap_or(0);
            let value = u64::try_from(value).unwrap_or(0);
            match metric.as_str() {
                metrics::TOTAL_EMAILS_PROCESSED => stats.total_emails_processed = value,
                metrics::EMAILS_CLASSIFIED => stats.emails_classified = value,
                metrics::REPLIES_GENERATED => stats.replies_generated = value,
                metrics::ACTIONS_SAVED => stats.actions_saved = value,
                _ => {}
            }
        }
        Ok(stats)
    }

    // ── Synced emails ───────────────────────────────────────────────

    async fn upsert_email(&self, email: &StoredEmail) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO emails (message_id, sender, subject, body, snippet, received_at,
                                     classification, draft, sent, sent_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(message_id) DO UPDATE SET
                     sender = excluded.sender,
                     subject = excluded.subject,
                     body = excluded.body,
                     snippet = excluded.snippet,
                     received_at = excluded.received_at,
                     classification = COALESCE(excluded.classification, emails.classification),
                     updated_at = excluded.updated_at",
                params![
                    email.message_id.as_str(),
                    email.sender.as_str(),
                    email.subject.as_str(),
                    email.body.as_str(),
                    email.snippet.as_str(),
                    email.received_at.to_rfc3339(),
                    opt_text(email.classification.as_deref()),
                    opt_text(email.draft.as_deref()),
                    i64::from(email.sent),
                    opt_text(email.sent_at.map(|t| t.to_rfc3339()).as_deref()),
                    Utc::now().to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_email: {e}")))?;
        Ok(())
    }

    async fn list_emails(&self) -> Result<Vec<StoredEmail>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {EMAIL_COLUMNS} FROM emails ORDER BY received_at DESC"),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_emails: {e}")))?;

        let mut emails = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_emails: {e}")))?
        {
            emails.push(
                row_to_email(&row).map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?,
            );
        }
        Ok(emails)
    }

    async fn get_email(&self, message_id: &str) -> Result<Option<StoredEmail>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {EMAIL_COLUMNS} FROM emails WHERE message_id = ?1"),
                params![message_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_email: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row_to_email(&row)
                .map(Some)
                .map_err(|e| DatabaseError::Query(format!("row parse: {e}"))),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_email: {e}"))),
        }
    }

    async fn set_draft(&self, message_id: &str, draft: &str) -> Result<(), DatabaseError> {
        let updated = self
            .conn()
            .execute(
                "UPDATE emails SET draft = ?1, updated_at = ?2 WHERE message_id = ?3",
                params![draft, Utc::now().to_rfc3339(), message_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_draft: {e}")))?;
        if updated == 0 {
            return Err(DatabaseError::NotFound {
                entity: "email".to_string(),
                id: message_id.to_string(),
            });
        }
        Ok(())
    }

    async fn mark_sent(&self, message_id: &str) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let updated = self
            .conn()
            .execute(
                "UPDATE emails SET sent = 1, sent_at = ?1, updated_at = ?1 WHERE message_id = ?2",
                params![now, message_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("mark_sent: {e}")))?;
        if updated == 0 {
            return Err(DatabaseError::NotFound {
                entity: "email".to_string(),
                id: message_id.to_string(),
            });
        }
        Ok(())
    }

    // ── Maintenance ─────────────────────────────────────────────────

    async fn clear_all(&self) -> Result<(), DatabaseError> {
        self.conn()
            .execute_batch(
                "DELETE FROM actions;
                 DELETE FROM preferences;
                 DELETE FROM emails;
                 UPDATE statistics SET value = 0;",
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("clear_all: {e}")))?;
        info!("All data cleared");
        Ok(())
    }
}
