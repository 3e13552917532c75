//! Gmail REST API mail source.
//!
//! Messages are fetched with `format=raw` and parsed with `mail-parser`;
//! outgoing mail is built with `lettre` and posted base64url-encoded.
//! A 401 triggers one refresh-token grant when credentials allow it.

use async_trait::async_trait;
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::{DateTime, Utc};
use mail_parser::MessageParser;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{Email, MailSource, SendReceipt};
use crate::config::GmailCredentials;
use crate::error::MailError;

/// Production Gmail API root.
pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// Google OAuth2 token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

const SOURCE: &str = "gmail";

/// Gmail hands out URL-safe base64 with or without padding.
const GMAIL_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessage {
    id: String,
    #[serde(default)]
    label_ids: Vec<String>,
    raw: String,
    /// Epoch milliseconds, as a string.
    #[serde(default)]
    internal_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
    email_address: String,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

/// Gmail API client for the authenticated user's mailbox.
pub struct GmailClient {
    http: reqwest::Client,
    api_base: String,
    token_url: String,
    credentials: GmailCredentials,
    access_token: RwLock<Option<SecretString>>,
    from_address: RwLock<Option<String>>,
}

impl GmailClient {
    pub fn new(credentials: GmailCredentials) -> Self {
        Self::with_endpoints(credentials, GMAIL_API_BASE, GOOGLE_TOKEN_URL)
    }

    /// Client against custom API / token endpoints (for tests and proxies).
    pub fn with_endpoints(credentials: GmailCredentials, api_base: &str, token_url: &str) -> Self {
        let access_token = credentials.access_token.clone();
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            token_url: token_url.to_string(),
            credentials,
            access_token: RwLock::new(access_token),
            from_address: RwLock::new(None),
        }
    }

    /// Use a fixed From address instead of looking up the profile.
    pub fn with_from_address(self, address: impl Into<String>) -> Self {
        Self {
            from_address: RwLock::new(Some(address.into())),
            ..self
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/users/me/{}", self.api_base, path)
    }

    async fn current_token(&self) -> Result<SecretString, MailError> {
        if let Some(token) = self.access_token.read().await.clone() {
            return Ok(token);
        }
        self.refresh_access_token().await
    }

    /// Exchange the refresh token for a new access token.
    async fn refresh_access_token(&self) -> Result<SecretString, MailError> {
        let (Some(client_id), Some(client_secret), Some(refresh_token)) = (
            self.credentials.client_id.as_deref(),
            self.credentials.client_secret.as_ref(),
            self.credentials.refresh_token.as_ref(),
        ) else {
            return Err(MailError::AuthFailed {
                source_name: SOURCE.into(),
                reason: "access token rejected and no refresh credentials configured".into(),
            });
        };

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.expose_secret()),
                ("client_id", client_id),
                ("client_secret", client_secret.expose_secret()),
            ])
            .send()
            .await
            .map_err(|e| request_failed(format!("token refresh request failed: {e}")))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| request_failed(format!("failed to parse token response: {e}")))?;

        if !status.is_success() {
            let error = body
                .get("error_description")
                .or_else(|| body.get("error"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error");
            return Err(MailError::AuthFailed {
                source_name: SOURCE.into(),
                reason: format!("token refresh failed ({status}): {error}"),
            });
        }

        let token = body
            .get("access_token")
            .and_then(|v| v.as_str())
            .map(|s| SecretString::from(s.to_string()))
            .ok_or_else(|| MailError::AuthFailed {
                source_name: SOURCE.into(),
                reason: "no access_token in token response".into(),
            })?;

        *self.access_token.write().await = Some(token.clone());
        debug!("Gmail access token refreshed");
        Ok(token)
    }

    /// Send an authorized request, retrying once after a token refresh on 401.
    async fn send_authorized(
        &self,
        method: Method,
        url: &str,
        json: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, MailError> {
        let mut refreshed = false;
        loop {
            let token = self.current_token().await?;
            let mut request = self
                .http
                .request(method.clone(), url)
                .bearer_auth(token.expose_secret());
            if let Some(body) = json {
                request = request.json(body);
            }
            let response = request
                .send()
                .await
                .map_err(|e| request_failed(format!("{method} {url}: {e}")))?;

            if response.status() == StatusCode::UNAUTHORIZED
                && !refreshed
                && self.credentials.can_refresh()
            {
                warn!("Gmail rejected access token, refreshing");
                self.refresh_access_token().await?;
                refreshed = true;
                continue;
            }
            if response.status() == StatusCode::UNAUTHORIZED {
                return Err(MailError::AuthFailed {
                    source_name: SOURCE.into(),
                    reason: "access token rejected".into(),
                });
            }
            return Ok(response);
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, MailError> {
        let response = self.send_authorized(Method::GET, url, None).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(request_failed(format!("GET {url} returned {status}")));
        }
        response
            .json()
            .await
            .map_err(|e| request_failed(format!("invalid JSON from {url}: {e}")))
    }

    async fn sender_address(&self) -> Result<String, MailError> {
        if let Some(address) = self.from_address.read().await.clone() {
            return Ok(address);
        }
        let profile: Profile = self.get_json(&self.url("profile")).await?;
        *self.from_address.write().await = Some(profile.email_address.clone());
        Ok(profile.email_address)
    }
}

#[async_trait]
impl MailSource for GmailClient {
    fn name(&self) -> &str {
        SOURCE
    }

    async fn fetch_emails(&self, limit: usize) -> Result<Vec<Email>, MailError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let list: ListResponse = self
            .get_json(&self.url(&format!("messages?maxResults={limit}&labelIds=INBOX")))
            .await?;

        let mut emails = Vec::with_capacity(list.messages.len());
        for message in list.messages.iter().take(limit) {
            match self.fetch_email_by_id(&message.id).await {
                Ok(Some(email)) => emails.push(email),
                Ok(None) => debug!(id = %message.id, "Listed message vanished before fetch"),
                Err(e) => warn!(id = %message.id, error = %e, "Skipping unreadable message"),
            }
        }

        info!(count = emails.len(), "Fetched emails from Gmail");
        Ok(emails)
    }

    async fn fetch_email_by_id(&self, id: &str) -> Result<Option<Email>, MailError> {
        let url = self.url(&format!("messages/{id}?format=raw"));
        let response = self.send_authorized(Method::GET, &url, None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(request_failed(format!(
                "GET {url} returned {}",
                response.status()
            )));
        }
        let raw: RawMessage = response
            .json()
            .await
            .map_err(|e| request_failed(format!("invalid message JSON: {e}")))?;
        parse_raw_message(&raw).map(Some)
    }

    async fn mark_as_read(&self, id: &str) -> Result<bool, MailError> {
        let url = self.url(&format!("messages/{id}/modify"));
        let body = serde_json::json!({ "removeLabelIds": ["UNREAD"] });
        let response = self.send_authorized(Method::POST, &url, Some(&body)).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            s if s.is_success() => Ok(true),
            s => Err(request_failed(format!("POST {url} returned {s}"))),
        }
    }

    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<SendReceipt, MailError> {
        let from = self.sender_address().await?;
        let raw = compose_raw(&from, to, subject, body)?;

        let url = self.url("messages/send");
        let payload = serde_json::json!({ "raw": raw });
        let response = self.send_authorized(Method::POST, &url, Some(&payload)).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(request_failed(format!("POST {url} returned {status}")));
        }
        let sent: SentMessage = response
            .json()
            .await
            .map_err(|e| request_failed(format!("invalid send response: {e}")))?;

        info!(to, id = %sent.id, "Email sent via Gmail");
        Ok(SendReceipt {
            success: true,
            message_id: sent.id,
            timestamp: Utc::now(),
        })
    }
}

fn request_failed(reason: String) -> MailError {
    MailError::RequestFailed {
        source_name: SOURCE.into(),
        reason,
    }
}

/// Decode and parse a `format=raw` Gmail message.
fn parse_raw_message(message: &RawMessage) -> Result<Email, MailError> {
    let bytes = GMAIL_BASE64
        .decode(message.raw.trim())
        .map_err(|e| MailError::Parse {
            id: message.id.clone(),
            reason: format!("base64: {e}"),
        })?;

    let parsed = MessageParser::default()
        .parse(bytes.as_slice())
        .ok_or_else(|| MailError::Parse {
            id: message.id.clone(),
            reason: "not an RFC 5322 message".into(),
        })?;

    let sender = parsed
        .from()
        .and_then(|addr| addr.first())
        .and_then(|a| a.address())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".into());
    let subject = parsed.subject().unwrap_or("(no subject)").to_string();
    let body = if let Some(text) = parsed.body_text(0) {
        text.trim().to_string()
    } else if let Some(html) = parsed.body_html(0) {
        strip_html(&html)
    } else {
        String::new()
    };

    let timestamp = message
        .internal_date
        .as_deref()
        .and_then(|ms| ms.parse::<i64>().ok())
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .or_else(|| {
            parsed
                .date()
                .and_then(|d| DateTime::<Utc>::from_timestamp(d.to_timestamp(), 0))
        })
        .unwrap_or_else(Utc::now);

    let mut email = Email::new(message.id.clone(), sender, subject, body, timestamp);
    email.unread = message.label_ids.iter().any(|l| l == "UNREAD");
    Ok(email)
}

/// Crude tag stripper for HTML-only messages.
fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build an RFC 5322 message and encode it for the `messages/send` endpoint.
fn compose_raw(from: &str, to: &str, subject: &str, body: &str) -> Result<String, MailError> {
    let message = lettre::Message::builder()
        .from(
            from.parse()
                .map_err(|e| MailError::Compose(format!("Invalid from address: {e}")))?,
        )
        .to(to
            .parse()
            .map_err(|e| MailError::Compose(format!("Invalid to address: {e}")))?)
        .subject(subject)
        .body(body.to_string())
        .map_err(|e| MailError::Compose(format!("Failed to build email: {e}")))?;

    Ok(GMAIL_BASE64.encode(message.formatted()))
}
