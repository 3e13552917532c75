//! Email Assist: rule-based inbox triage and reply drafting.

pub mod api;
pub mod classifier;
pub mod config;
pub mod error;
pub mod llm;
pub mod mail;
pub mod reply;
pub mod store;
