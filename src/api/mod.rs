//! HTTP API: axum router over the classifier, mail source, reply
//! generator and store.

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

use crate::classifier::KeywordClassifier;
use crate::config::AppConfig;
use crate::mail::MailSource;
use crate::reply::ReplyGenerator;
use crate::store::Database;

/// Request-time knobs taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub email_fetch_limit: usize,
    pub auto_classify: bool,
    pub cors_origins: Vec<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            email_fetch_limit: 10,
            auto_classify: true,
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl From<&AppConfig> for ApiSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            email_fetch_limit: config.email_fetch_limit,
            auto_classify: config.auto_classify,
            cors_origins: config.cors_origins.clone(),
        }
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<KeywordClassifier>,
    pub mail: Arc<dyn MailSource>,
    pub replies: Arc<ReplyGenerator>,
    pub db: Arc<dyn Database>,
    pub settings: Arc<ApiSettings>,
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Build the API router with all routes.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.cors_origins);

    Router::new()
        .route("/", get(handlers::health))
        .route("/fetch_emails", get(handlers::fetch_emails))
        .route("/classify", post(handlers::classify))
        .route("/generate_reply", post(handlers::generate_reply))
        .route("/save", post(handlers::save_action))
        .route("/stats", get(handlers::stats))
        .route("/actions/{id}", get(handlers::get_action))
        .route("/sync_emails", post(handlers::sync_emails))
        .route("/emails", get(handlers::list_emails))
        .route("/draft", post(handlers::draft))
        .route("/send", post(handlers::send))
        .fallback(handlers::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
