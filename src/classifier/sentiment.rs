//! Word-list sentiment detection.

use std::fmt;

use serde::{Deserialize, Serialize};

const POSITIVE_WORDS: [&str; 10] = [
    "thanks",
    "great",
    "excellent",
    "good",
    "appreciate",
    "wonderful",
    "fantastic",
    "perfect",
    "happy",
    "glad",
];

const NEGATIVE_WORDS: [&str; 10] = [
    "issue",
    "problem",
    "error",
    "concern",
    "disappointed",
    "unfortunately",
    "urgent",
    "critical",
    "fail",
    "wrong",
];

/// Coarse sentiment of a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compare how many positive vs negative words appear in `text`.
///
/// Each word counts once no matter how often it occurs. Equal counts,
/// including zero, are `Neutral`.
pub fn detect_sentiment(text: &str) -> Sentiment {
    let text_lower = text.to_lowercase();
    let positive = POSITIVE_WORDS
        .iter()
        .filter(|w| text_lower.contains(*w))
        .count();
    let negative = NEGATIVE_WORDS
        .iter()
        .filter(|w| text_lower.contains(*w))
        .count();

    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}
