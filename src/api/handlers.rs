//! Route handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::AppState;
use super::error::ApiError;
use crate::mail::Email;
use crate::reply::ReplyRequest;
use crate::store::{NewAction, StoredEmail, metrics};

/// Characters of body kept as the stored snippet.
const SNIPPET_CHARS: usize = 200;

type ApiResult = Result<Json<Value>, ApiError>;

/// Parse a JSON request body, reporting problems as 400s.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("Request body must be JSON".to_string()));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {e}")))
}

/// Bump a counter without failing the request.
async fn bump(state: &AppState, metric: &str, by: u64) {
    if let Err(e) = state.db.increment_stat(metric, by).await {
        warn!(metric, error = %e, "Failed to update statistics");
    }
}

// ── Health ──────────────────────────────────────────────────────────

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "message": "Email Assist API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"success": false, "error": "Endpoint not found"})),
    )
}

// ── Inbox ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FetchParams {
    limit: Option<usize>,
}

pub async fn fetch_emails(
    State(state): State<AppState>,
    Query(params): Query<FetchParams>,
) -> ApiResult {
    let limit = params.limit.unwrap_or(state.settings.email_fetch_limit);
    let mut emails = state.mail.fetch_emails(limit).await?;

    if state.settings.auto_classify {
        for email in &mut emails {
            email.classification = Some(state.classifier.classify(&email.subject, &email.body).category);
        }
    }

    info!(count = emails.len(), source = state.mail.name(), "Fetched emails");
    bump(&state, metrics::TOTAL_EMAILS_PROCESSED, emails.len() as u64).await;

    Ok(Json(json!({
        "success": true,
        "count": emails.len(),
        "emails": emails,
    })))
}

// ── Classification ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct EmailText {
    subject: Option<String>,
    body: Option<String>,
}

impl EmailText {
    fn require(self) -> Result<(String, String), ApiError> {
        match (self.subject, self.body) {
            (Some(subject), Some(body)) => Ok((subject, body)),
            _ => Err(ApiError::BadRequest(
                "Missing required fields: subject and body".to_string(),
            )),
        }
    }
}

pub async fn classify(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let (subject, body) = parse_body::<EmailText>(&body)?.require()?;
    info!(subject = %subject, "Classifying email");

    let analysis = state.classifier.analyze(&subject, &body);
    bump(&state, metrics::EMAILS_CLASSIFIED, 1).await;

    let classification = analysis.classification;
    Ok(Json(json!({
        "success": true,
        "classification": classification.category,
        "confidence": classification.confidence,
        "keywords": classification.keywords,
        "scores": classification.scores,
        "sentiment": analysis.sentiment,
        "action_items": analysis.action_items,
    })))
}

// ── Replies ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GenerateReplyBody {
    subject: Option<String>,
    body: Option<String>,
    sender: Option<String>,
    tone: Option<String>,
    extra_instructions: Option<String>,
}

pub async fn generate_reply(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let request: GenerateReplyBody = parse_body(&body)?;
    let (subject, body) = EmailText {
        subject: request.subject,
        body: request.body,
    }
    .require()?;
    info!(subject = %subject, "Generating reply");

    let reply = state
        .replies
        .generate(&ReplyRequest {
            subject,
            body,
            sender: request.sender,
            tone: request.tone,
            extra_instructions: request.extra_instructions,
        })
        .await?;
    bump(&state, metrics::REPLIES_GENERATED, 1).await;

    Ok(Json(json!({"success": true, "reply": reply})))
}

// ── Actions ─────────────────────────────────────────────────────────

pub async fn save_action(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let mut data: serde_json::Map<String, Value> = parse_body(&body)?;
    let email_id = match data.remove("email_id") {
        Some(Value::String(id)) => id,
        Some(other) => other.to_string(),
        None => {
            return Err(ApiError::BadRequest(
                "Missing required field: email_id".to_string(),
            ));
        }
    };
    data.insert("email_id".to_string(), Value::String(email_id));
    // assigned by the store
    data.remove("id");
    data.remove("timestamp");
    let action: NewAction = serde_json::from_value(Value::Object(data))
        .map_err(|e| ApiError::BadRequest(format!("Invalid action: {e}")))?;

    let saved = state.db.save_action(action).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Action saved successfully",
        "id": saved.id,
    })))
}

pub async fn get_action(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let action = state
        .db
        .get_action(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Action {id} not found")))?;
    Ok(Json(json!({"success": true, "action": action})))
}

pub async fn stats(State(state): State<AppState>) -> ApiResult {
    let stats = state.db.get_statistics().await?;
    Ok(Json(json!({"success": true, "stats": stats})))
}

// ── Synced inbox ────────────────────────────────────────────────────

fn to_stored(email: &Email, classification: Option<String>) -> StoredEmail {
    StoredEmail {
        message_id: email.id.clone(),
        sender: email.sender.clone(),
        subject: email.subject.clone(),
        body: email.body.clone(),
        snippet: email.snippet(SNIPPET_CHARS),
        received_at: email.timestamp,
        classification,
        draft: None,
        sent: false,
        sent_at: None,
    }
}

pub async fn sync_emails(State(state): State<AppState>) -> ApiResult {
    let emails = state.mail.fetch_emails(state.settings.email_fetch_limit).await?;

    for email in &emails {
        let classification = state
            .settings
            .auto_classify
            .then(|| state.classifier.classify(&email.subject, &email.body).category);
        state.db.upsert_email(&to_stored(email, classification)).await?;
    }

    info!(count = emails.len(), source = state.mail.name(), "Synced emails");
    bump(&state, metrics::TOTAL_EMAILS_PROCESSED, emails.len() as u64).await;
    Ok(Json(json!({"success": true, "synced": emails.len()})))
}

pub async fn list_emails(State(state): State<AppState>) -> ApiResult {
    let emails: Vec<Value> = state
        .db
        .list_emails()
        .await?
        .into_iter()
        .map(|e| {
            json!({
                "message_id": e.message_id,
                "sender": e.sender,
                "subject": e.subject,
                "snippet": e.snippet,
                "classification": e.classification,
                "draft": e.draft,
                "sent": e.sent,
            })
        })
        .collect();
    Ok(Json(Value::Array(emails)))
}

#[derive(Debug, Deserialize)]
struct DraftBody {
    message_id: String,
    tone: Option<String>,
    extra_instructions: Option<String>,
}

pub async fn draft(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let request: DraftBody = parse_body(&body)?;
    let email = state
        .db
        .get_email(&request.message_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Email {} not found", request.message_id)))?;

    let reply = state
        .replies
        .generate(&ReplyRequest {
            subject: email.subject,
            body: email.body,
            sender: Some(email.sender),
            tone: request.tone,
            extra_instructions: request.extra_instructions,
        })
        .await?;

    state.db.set_draft(&request.message_id, &reply.reply_body).await?;
    bump(&state, metrics::REPLIES_GENERATED, 1).await;
    info!(message_id = %request.message_id, reply_type = %reply.reply_type, "Draft stored");

    Ok(Json(json!({
        "success": true,
        "message_id": request.message_id,
        "draft": reply.reply_body,
    })))
}

#[derive(Debug, Deserialize)]
struct SendBody {
    message_id: String,
    draft_text: String,
}

pub async fn send(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let request: SendBody = parse_body(&body)?;
    if request.draft_text.trim().is_empty() {
        return Err(ApiError::BadRequest("draft_text must not be empty".to_string()));
    }
    let email = state
        .db
        .get_email(&request.message_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Email {} not found", request.message_id)))?;

    let subject = if email.subject.to_lowercase().starts_with("re:") {
        email.subject.clone()
    } else {
        format!("Re: {}", email.subject)
    };
    let receipt = state
        .mail
        .send_email(&email.sender, &subject, &request.draft_text)
        .await?;

    state.db.mark_sent(&request.message_id).await?;
    match state.mail.mark_as_read(&request.message_id).await {
        Ok(true) => {}
        Ok(false) => warn!(message_id = %request.message_id, "Source no longer has message"),
        Err(e) => warn!(message_id = %request.message_id, error = %e, "Failed to mark as read"),
    }

    info!(message_id = %request.message_id, to = %email.sender, "Reply sent");
    Ok(Json(json!({
        "success": true,
        "message_id": request.message_id,
        "receipt": receipt,
    })))
}
