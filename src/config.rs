//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};

use crate::error::ConfigError;

/// Secret key shipped for local development only.
pub const DEV_SECRET_KEY: &str = "dev-secret-key-change-in-production";

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

/// Gmail API credentials. Either a ready access token, a refresh-token
/// grant, or both (the access token is used until it is rejected).
#[derive(Debug, Clone)]
pub struct GmailCredentials {
    pub access_token: Option<SecretString>,
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
}

impl GmailCredentials {
    /// Whether a refresh-token grant can be performed.
    pub fn can_refresh(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some() && self.refresh_token.is_some()
    }
}

/// LLM settings for reply drafting.
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// OpenAI API key; LLM drafting is disabled when unset.
    pub api_key: Option<SecretString>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 150,
            temperature: 0.7,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    /// Address the HTTP server binds to.
    pub host: String,
    pub port: u16,
    pub secret_key: SecretString,
    pub ai: AiConfig,
    /// Gmail credentials; the mock mailbox is used when `None`.
    pub gmail: Option<GmailCredentials>,
    /// Default number of emails fetched per request.
    pub email_fetch_limit: usize,
    /// Classify emails while syncing them into the store.
    pub auto_classify: bool,
    /// libSQL database file (`:memory:` for an ephemeral store).
    pub database_path: String,
    pub cors_origins: Vec<String>,
    /// Fallback log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Directory for daily rolling log files (stderr only when unset).
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            host: "0.0.0.0".to_string(),
            port: 5000,
            secret_key: SecretString::from(DEV_SECRET_KEY),
            ai: AiConfig::default(),
            gmail: None,
            email_fetch_limit: 10,
            auto_classify: true,
            database_path: "./data/email-assist.db".to_string(),
            cors_origins: vec!["*".to_string()],
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup (used by `from_env` and tests).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let environment = get("APP_ENV")
            .map(|s| Environment::parse(&s))
            .unwrap_or(defaults.environment);

        let ai = AiConfig {
            api_key: non_empty("OPENAI_API_KEY").map(SecretString::from),
            model: non_empty("AI_MODEL").unwrap_or(defaults.ai.model),
            max_tokens: parse_or(&get, "MAX_TOKENS", defaults.ai.max_tokens)?,
            temperature: parse_or(&get, "TEMPERATURE", defaults.ai.temperature)?,
        };

        let gmail = GmailCredentials {
            access_token: non_empty("GMAIL_ACCESS_TOKEN").map(SecretString::from),
            client_id: non_empty("GMAIL_CLIENT_ID"),
            client_secret: non_empty("GMAIL_CLIENT_SECRET").map(SecretString::from),
            refresh_token: non_empty("GMAIL_REFRESH_TOKEN").map(SecretString::from),
        };
        let gmail = (gmail.access_token.is_some() || gmail.can_refresh()).then_some(gmail);

        let cors_origins: Vec<String> = get("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            environment,
            host: non_empty("APP_HOST").unwrap_or(defaults.host),
            port: parse_or(&get, "APP_PORT", defaults.port)?,
            secret_key: non_empty("SECRET_KEY")
                .map(SecretString::from)
                .unwrap_or(defaults.secret_key),
            ai,
            gmail,
            email_fetch_limit: parse_or(&get, "EMAIL_FETCH_LIMIT", defaults.email_fetch_limit)?,
            auto_classify: parse_bool_or(&get, "AUTO_CLASSIFY", defaults.auto_classify)?,
            database_path: non_empty("DATABASE_PATH").unwrap_or(defaults.database_path),
            cors_origins,
            log_level: non_empty("LOG_LEVEL")
                .map(|s| s.to_lowercase())
                .unwrap_or(defaults.log_level),
            log_dir: non_empty("LOG_DIR").map(PathBuf::from),
        })
    }

    /// Non-fatal configuration problems worth logging at startup.
    ///
    /// Only production deployments are checked.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.environment != Environment::Production {
            return warnings;
        }

        if self.secret_key.expose_secret() == DEV_SECRET_KEY {
            warnings.push("Using default SECRET_KEY in production".to_string());
        }
        if self.ai.api_key.is_none() {
            warnings.push("OPENAI_API_KEY not set".to_string());
        }
        if self.gmail.is_none() {
            warnings.push("Gmail credentials not set".to_string());
        }
        warnings
    }

    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("'{raw}': {e}"),
                })
        }
        _ => Ok(default),
    }
}

fn parse_bool_or(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match get(key).map(|s| s.trim().to_lowercase()) {
        None => Ok(default),
        Some(s) if s.is_empty() => Ok(default),
        Some(s) => match s.as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("'{s}' is not a boolean"),
            }),
        },
    }
}
