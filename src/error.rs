//! Error types for Email Assist.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Mail source errors (mock mailbox or Gmail API).
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Mail source {source_name} request failed: {reason}")]
    RequestFailed { source_name: String, reason: String },

    #[error("Authentication failed for mail source {source_name}: {reason}")]
    AuthFailed { source_name: String, reason: String },

    #[error("Failed to parse message {id}: {reason}")]
    Parse { id: String, reason: String },

    #[error("Failed to build outgoing message: {0}")]
    Compose(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Reply generation errors.
#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    #[error("No templates configured for reply type {0}")]
    NoTemplates(String),
}
