//! Persistence layer: libSQL storage for actions, preferences,
//! statistics and synced emails.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{ActionRecord, Database, NewAction, Statistics, StoredEmail, metrics};
