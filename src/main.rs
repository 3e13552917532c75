use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use email_assist::api::{ApiSettings, AppState, build_router};
use email_assist::classifier::KeywordClassifier;
use email_assist::config::AppConfig;
use email_assist::llm::{LlmConfig, create_provider};
use email_assist::mail::{GmailClient, MailSource, MockMailbox};
use email_assist::reply::{GeneratorConfig, ReplyGenerator};
use email_assist::store::{Database, LibSqlBackend};

/// Log to stderr, and to a daily rolling file when `LOG_DIR` is set.
fn init_tracing(config: &AppConfig) -> Option<WorkerGuard> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    };

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "email-assist.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter())
                .with(tracing_subscriber::fmt::layer().with_target(false))
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_target(false)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let config = AppConfig::from_env().context("Invalid configuration")?;
    let _log_guard = init_tracing(&config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = config.environment.as_str(),
        "Starting Email Assist"
    );
    for warning in config.validate() {
        tracing::warn!("{warning}");
    }

    // ── Mail source ──────────────────────────────────────────────────────
    let mail: Arc<dyn MailSource> = match &config.gmail {
        Some(credentials) => Arc::new(GmailClient::new(credentials.clone())),
        None => Arc::new(MockMailbox::new()),
    };
    tracing::info!(source = mail.name(), "Mail source ready");

    // ── Reply drafting ───────────────────────────────────────────────────
    let replies = match LlmConfig::from_ai(&config.ai) {
        Some(llm_config) => {
            let llm = create_provider(&llm_config)?;
            ReplyGenerator::with_llm(
                llm,
                GeneratorConfig {
                    temperature: config.ai.temperature,
                    max_tokens: config.ai.max_tokens,
                },
            )
        }
        None => {
            tracing::info!("No LLM configured, drafting replies from templates");
            ReplyGenerator::templates()
        }
    };

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = if config.database_path == ":memory:" {
        Arc::new(LibSqlBackend::new_memory().await?)
    } else {
        Arc::new(
            LibSqlBackend::new_local(Path::new(&config.database_path))
                .await
                .with_context(|| format!("Failed to open database at {}", config.database_path))?,
        )
    };

    let state = AppState {
        classifier: Arc::new(KeywordClassifier::with_default_rules()),
        mail,
        replies: Arc::new(replies),
        db,
        settings: Arc::new(ApiSettings::from(&config)),
    };
    let app = build_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
