//! Integration tests for the HTTP API.
//!
//! Each test spins up an Axum server on a random port backed by the mock
//! mailbox and an in-memory database, and drives it over real HTTP.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use email_assist::api::{ApiSettings, AppState, build_router};
use email_assist::classifier::KeywordClassifier;
use email_assist::mail::MockMailbox;
use email_assist::reply::ReplyGenerator;
use email_assist::store::{Database, LibSqlBackend};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Start a server on a random port, return (base url, database).
async fn start_server(settings: ApiSettings) -> (String, Arc<dyn Database>) {
    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    let state = AppState {
        classifier: Arc::new(KeywordClassifier::with_default_rules()),
        mail: Arc::new(MockMailbox::new()),
        replies: Arc::new(ReplyGenerator::templates()),
        db: Arc::clone(&db),
        settings: Arc::new(settings),
    };
    let app = build_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://127.0.0.1:{port}"), db)
}

async fn post(client: &reqwest::Client, url: String, body: Value) -> (u16, Value) {
    let response = client.post(url).json(&body).send().await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

async fn get(client: &reqwest::Client, url: String) -> (u16, Value) {
    let response = client.get(url).send().await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn classify_reply_save_and_stats() {
    timeout(TEST_TIMEOUT, async {
        let (base, _db) = start_server(ApiSettings::default()).await;
        let client = reqwest::Client::new();

        let (status, classified) = post(
            &client,
            format!("{base}/classify"),
            json!({
                "subject": "50% OFF - Limited Time Offer",
                "body": "Exclusive sale! Shop now and save."
            }),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(classified["classification"], "Promotional");
        assert_eq!(classified["keywords"][0], "sale");

        let (status, reply) = post(
            &client,
            format!("{base}/generate_reply"),
            json!({
                "subject": "Meeting Reschedule",
                "body": "Can we move the meeting to Thursday?",
                "sender": "manager@company.com"
            }),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(reply["reply"]["subject"], "Re: Meeting Reschedule");
        assert_eq!(reply["reply"]["reply_type"], "Meeting");
        assert_eq!(reply["reply"]["tone"], "Professional");

        let (status, saved) = post(
            &client,
            format!("{base}/save"),
            json!({
                "email_id": "email_005",
                "classification": "Important",
                "reply": reply["reply"]["body"],
                "action": "saved"
            }),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(saved["id"], "action_0001");

        let (status, stats) = get(&client, format!("{base}/stats")).await;
        assert_eq!(status, 200);
        assert_eq!(
            stats["stats"],
            json!({
                "total_emails_processed": 0,
                "emails_classified": 1,
                "replies_generated": 1,
                "actions_saved": 1
            })
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn sync_draft_and_send_flow() {
    timeout(TEST_TIMEOUT, async {
        let (base, db) = start_server(ApiSettings::default()).await;
        let client = reqwest::Client::new();

        let (status, synced) = post(&client, format!("{base}/sync_emails"), json!({})).await;
        assert_eq!(status, 200);
        assert_eq!(synced["synced"], 8);

        let (status, emails) = get(&client, format!("{base}/emails")).await;
        assert_eq!(status, 200);
        let emails = emails.as_array().unwrap();
        assert_eq!(emails.len(), 8);
        // newest first: email_001 arrived two hours ago
        assert_eq!(emails[0]["message_id"], "email_001");
        assert_eq!(emails[0]["classification"], "Important");
        assert!(emails[0]["draft"].is_null());

        let (status, drafted) = post(
            &client,
            format!("{base}/draft"),
            json!({"message_id": "email_001", "tone": "professional", "extra_instructions": ""}),
        )
        .await;
        assert_eq!(status, 200);
        let draft = drafted["draft"].as_str().unwrap().to_string();
        assert!(draft.starts_with("Hi,\n\n"));

        let stored = db.get_email("email_001").await.unwrap().unwrap();
        assert_eq!(stored.draft.as_deref(), Some(draft.as_str()));

        let (status, sent) = post(
            &client,
            format!("{base}/send"),
            json!({"message_id": "email_001", "draft_text": draft}),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(sent["receipt"]["success"], true);
        assert!(sent["receipt"]["message_id"].as_str().unwrap().starts_with("sent_"));

        let (_, emails) = get(&client, format!("{base}/emails")).await;
        assert_eq!(emails[0]["sent"], true);

        let stats = db.get_statistics().await.unwrap();
        assert_eq!(stats.total_emails_processed, 8);
        assert_eq!(stats.replies_generated, 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn sync_without_auto_classify_leaves_category_empty() {
    timeout(TEST_TIMEOUT, async {
        let settings = ApiSettings {
            email_fetch_limit: 2,
            auto_classify: false,
            ..ApiSettings::default()
        };
        let (base, _db) = start_server(settings).await;
        let client = reqwest::Client::new();

        let (_, synced) = post(&client, format!("{base}/sync_emails"), json!({})).await;
        assert_eq!(synced["synced"], 2);

        let (_, emails) = get(&client, format!("{base}/emails")).await;
        for email in emails.as_array().unwrap() {
            assert!(email["classification"].is_null());
        }
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn error_responses() {
    timeout(TEST_TIMEOUT, async {
        let (base, _db) = start_server(ApiSettings::default()).await;
        let client = reqwest::Client::new();

        let (status, body) = post(
            &client,
            format!("{base}/generate_reply"),
            json!({"subject": "only a subject"}),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["success"], false);

        let (status, body) = post(
            &client,
            format!("{base}/send"),
            json!({"message_id": "ghost", "draft_text": "hello"}),
        )
        .await;
        assert_eq!(status, 404);
        assert_eq!(body["success"], false);

        let (status, body) = get(&client, format!("{base}/does/not/exist")).await;
        assert_eq!(status, 404);
        assert_eq!(body["error"], "Endpoint not found");
    })
    .await
    .expect("test timed out");
}
