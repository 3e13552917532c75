//! In-memory demo inbox.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::Rng;
use tokio::sync::RwLock;
use tracing::info;

use super::{Email, MailSource, SendReceipt};
use crate::error::MailError;

/// A mailbox holding eight fixed demo emails.
///
/// Timestamps are relative to construction time. Sending only logs.
pub struct MockMailbox {
    emails: RwLock<Vec<Email>>,
}

impl MockMailbox {
    pub fn new() -> Self {
        Self::with_emails(demo_emails())
    }

    /// Mailbox over a caller-supplied inbox.
    pub fn with_emails(emails: Vec<Email>) -> Self {
        Self {
            emails: RwLock::new(emails),
        }
    }
}

impl Default for MockMailbox {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailSource for MockMailbox {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_emails(&self, limit: usize) -> Result<Vec<Email>, MailError> {
        let emails = self.emails.read().await;
        Ok(emails.iter().take(limit).cloned().collect())
    }

    async fn fetch_email_by_id(&self, id: &str) -> Result<Option<Email>, MailError> {
        let emails = self.emails.read().await;
        Ok(emails.iter().find(|e| e.id == id).cloned())
    }

    async fn mark_as_read(&self, id: &str) -> Result<bool, MailError> {
        let mut emails = self.emails.write().await;
        match emails.iter_mut().find(|e| e.id == id) {
            Some(email) => {
                email.unread = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<SendReceipt, MailError> {
        let preview: String = body.chars().take(100).collect();
        info!(to, subject, body = %preview, "Mock send");

        let n: u32 = rand::thread_rng().gen_range(1000..=9999);
        Ok(SendReceipt {
            success: true,
            message_id: format!("sent_{n}"),
            timestamp: Utc::now(),
        })
    }
}

fn demo_emails() -> Vec<Email> {
    let now = Utc::now();
    vec![
        Email::new(
            "email_001",
            "team@company.com",
            "Project Deadline Approaching - Action Required",
            "Hi, the deadline for the Q4 project is this Friday. Please submit your final \
             deliverables by EOD Thursday. Let me know if you need any support.",
            now - Duration::hours(2),
        ),
        Email::new(
            "email_002",
            "deals@amazon.com",
            "50% OFF - Limited Time Offer on Electronics",
            "Do not miss our exclusive sale! Get up to 50% discount on laptops, headphones, \
             and more. Offer valid until midnight. Shop now!",
            now - Duration::hours(5),
        ),
        Email::new(
            "email_003",
            "hr@workplace.com",
            "Reminder: Complete Your Annual Performance Review",
            "This is a reminder to complete your annual performance review by November 5th. \
             Please log in to the portal and submit your self-assessment.",
            now - Duration::days(1),
        )
        .read(),
        Email::new(
            "email_004",
            "newsletter@techcrunch.com",
            "Daily Tech News Digest",
            "Todays top stories: AI breakthrough in medical imaging, new smartphone launches, \
             and startup funding news. Read more inside.",
            now - Duration::hours(8),
        ),
        Email::new(
            "email_005",
            "manager@company.com",
            "Meeting Reschedule - New Time Proposed",
            "Hi, I need to reschedule our 1:1 meeting from Wednesday to Thursday at 3 PM. \
             Does this work for you? Please confirm.",
            now - Duration::hours(3),
        ),
        Email::new(
            "email_006",
            "notifications@linkedin.com",
            "You have 5 new connection requests",
            "People are trying to connect with you on LinkedIn. Review and accept their \
             requests to grow your professional network.",
            now - Duration::hours(12),
        )
        .read(),
        Email::new(
            "email_007",
            "support@bankofamerica.com",
            "Your Monthly Statement is Ready",
            "Your account statement for October 2025 is now available. Log in to view your \
             transactions and download the PDF.",
            now - Duration::days(2),
        ),
        Email::new(
            "email_008",
            "client@partner.com",
            "Proposal Review Feedback",
            "Thank you for the detailed proposal. Overall it looks great. I have a few \
             questions about the timeline in section 3. Can we schedule a call to discuss?",
            now - Duration::hours(6),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::KeywordClassifier;

    #[tokio::test]
    async fn fetch_respects_limit() {
        let mailbox = MockMailbox::new();
        assert_eq!(mailbox.fetch_emails(10).await.unwrap().len(), 8);
        let three = mailbox.fetch_emails(3).await.unwrap();
        assert_eq!(three.len(), 3);
        assert_eq!(three[0].id, "email_001");
        assert!(mailbox.fetch_emails(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_by_id() {
        let mailbox = MockMailbox::new();
        let email = mailbox.fetch_email_by_id("email_005").await.unwrap().unwrap();
        assert_eq!(email.sender, "manager@company.com");
        assert!(mailbox.fetch_email_by_id("email_999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mark_as_read_flips_flag() {
        let mailbox = MockMailbox::new();
        assert!(mailbox.mark_as_read("email_001").await.unwrap());
        let email = mailbox.fetch_email_by_id("email_001").await.unwrap().unwrap();
        assert!(!email.unread);
        assert!(!mailbox.mark_as_read("missing").await.unwrap());
    }

    #[tokio::test]
    async fn send_returns_receipt() {
        let mailbox = MockMailbox::new();
        let receipt = mailbox
            .send_email("bob@example.com", "Re: hi", "Thanks!")
            .await
            .unwrap();
        assert!(receipt.success);
        let n: u32 = receipt.message_id.trim_start_matches("sent_").parse().unwrap();
        assert!((1000..=9999).contains(&n));
    }

    #[tokio::test]
    async fn demo_inbox_classifies_as_expected() {
        let classifier = KeywordClassifier::with_default_rules();
        let mailbox = MockMailbox::new();
        let emails = mailbox.fetch_emails(10).await.unwrap();
        let categories: Vec<String> = emails
            .iter()
            .map(|e| classifier.classify(&e.subject, &e.body).category)
            .collect();
        assert_eq!(categories[0], "Important");
        assert_eq!(categories[1], "Promotional");
        assert_eq!(categories[6], "Finance");
    }
}
