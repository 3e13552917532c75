//! Mail sources: where inbox emails come from and replies go out.
//!
//! - [`MockMailbox`]: fixed demo inbox, sends are logged only
//! - [`GmailClient`]: Gmail REST API with bearer / refresh-token auth

pub mod gmail;
pub mod mock;
pub mod types;

pub use gmail::GmailClient;
pub use mock::MockMailbox;
pub use types::{Email, SendReceipt};

use async_trait::async_trait;

use crate::error::MailError;

/// Trait for mail sources. Pure I/O, no classification or drafting.
#[async_trait]
pub trait MailSource: Send + Sync {
    /// Source name for logging (e.g. "mock", "gmail").
    fn name(&self) -> &str;

    /// Fetch up to `limit` inbox emails, newest first where the source allows.
    async fn fetch_emails(&self, limit: usize) -> Result<Vec<Email>, MailError>;

    /// Fetch a single email, `None` if the source has no such message.
    async fn fetch_email_by_id(&self, id: &str) -> Result<Option<Email>, MailError>;

    /// Mark an email as read. Returns `false` if the message is unknown.
    async fn mark_as_read(&self, id: &str) -> Result<bool, MailError>;

    /// Send a new email.
    async fn send_email(&self, to: &str, subject: &str, body: &str)
    -> Result<SendReceipt, MailError>;
}
