//! Mail types shared by every mail source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An inbox email as returned by a [`MailSource`](super::MailSource).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Email {
    /// Source-native message ID.
    pub id: String,
    /// Sender address.
    pub sender: String,
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub unread: bool,
    /// Category assigned by the classifier, if it has run.
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub priority: Option<i32>,
}

impl Email {
    pub fn new(
        id: impl Into<String>,
        sender: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            sender: sender.into(),
            subject: subject.into(),
            body: body.into(),
            timestamp,
            unread: true,
            classification: None,
            priority: None,
        }
    }

    pub fn read(mut self) -> Self {
        self.unread = false;
        self
    }

    /// First `max_chars` characters of the body on a single line.
    pub fn snippet(&self, max_chars: usize) -> String {
        let flat = self.body.split_whitespace().collect::<Vec<_>>().join(" ");
        if flat.chars().count() <= max_chars {
            return flat;
        }
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}…", cut.trim_end())
    }
}

/// Confirmation returned after sending an email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub success: bool,
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
}
