//! Rule-based email classification.
//!
//! - [`KeywordClassifier`] scores subject + body against category keyword lists
//! - [`extract_action_items`] pulls imperative phrases out of a body
//! - [`detect_sentiment`] compares positive and negative word counts
//!
//! Everything here is a pure function over an immutable [`ClassifierConfig`],
//! so a single classifier can be shared across request handlers.

pub mod actions;
pub mod keyword;
pub mod rules;
pub mod sentiment;

pub use actions::extract_action_items;
pub use keyword::{
    ClassificationResult, EmailAnalysis, FALLBACK_CONFIDENCE, GENERAL_CATEGORY, KeywordClassifier,
};
pub use rules::{CategoryRule, ClassifierConfig};
pub use sentiment::{Sentiment, detect_sentiment};
