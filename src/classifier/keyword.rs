//! Keyword-scoring classifier.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::actions::extract_action_items;
use super::rules::ClassifierConfig;
use super::sentiment::{Sentiment, detect_sentiment};

/// Category reported when no rule scores above zero.
pub const GENERAL_CATEGORY: &str = "General";

/// Confidence reported for the General fallback.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Points for each keyword token found in the text.
const KEYWORD_WEIGHT: u32 = 2;

/// Points for each sender token found in the text.
const SENDER_WEIGHT: u32 = 1;

/// Outcome of classifying one email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Winning category, or `General`.
    pub category: String,
    /// Winner's share of the total score, rounded to 2 decimals.
    pub confidence: f64,
    /// Keyword tokens of the winning category that matched, in rule order.
    pub keywords: Vec<String>,
    /// Raw score for every configured category (zero entries included).
    pub scores: BTreeMap<String, u32>,
}

/// Classification plus the secondary signals derived from the same email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailAnalysis {
    pub classification: ClassificationResult,
    pub sentiment: Sentiment,
    pub action_items: Vec<String>,
}

/// Stateless classifier over a shared rule set.
///
/// Cheap to clone; the rule tables live behind an `Arc` and are never mutated.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    config: Arc<ClassifierConfig>,
}

impl KeywordClassifier {
    pub fn new(config: Arc<ClassifierConfig>) -> Self {
        Self { config }
    }

    /// Classifier using [`ClassifierConfig::default_rules`].
    pub fn with_default_rules() -> Self {
        Self::new(Arc::new(ClassifierConfig::default_rules()))
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Score `subject` + `body` against every category and pick the winner.
    pub fn classify(&self, subject: &str, body: &str) -> ClassificationResult {
        let text = format!("{subject} {body}").to_lowercase();

        let mut scores = BTreeMap::new();
        // (category, score, matched keywords) of the first rule holding the max
        let mut best: Option<(&str, u32, Vec<String>)> = None;
        let mut total: u32 = 0;

        for rule in self.config.rules() {
            let matched: Vec<String> = rule
                .keywords()
                .iter()
                .filter(|k| text.contains(k.as_str()))
                .cloned()
                .collect();
            let sender_hits = rule
                .senders()
                .iter()
                .filter(|s| text.contains(s.as_str()))
                .count() as u32;

            let score = KEYWORD_WEIGHT * matched.len() as u32 + SENDER_WEIGHT * sender_hits;
            total += score;
            scores.insert(rule.name().to_string(), score);

            if best.as_ref().is_none_or(|(_, top, _)| score > *top) {
                best = Some((rule.name(), score, matched));
            }
        }

        let result = match best {
            Some((category, max_score, keywords)) if max_score > 0 => {
                let confidence = if total > 0 {
                    round2(f64::from(max_score) / f64::from(total))
                } else {
                    FALLBACK_CONFIDENCE
                };
                ClassificationResult {
                    category: category.to_string(),
                    confidence,
                    keywords,
                    scores,
                }
            }
            _ => ClassificationResult {
                category: GENERAL_CATEGORY.to_string(),
                confidence: FALLBACK_CONFIDENCE,
                keywords: Vec::new(),
                scores,
            },
        };

        debug!(
            category = %result.category,
            confidence = result.confidence,
            total_score = total,
            "Email classified"
        );
        result
    }

    /// See [`extract_action_items`].
    pub fn extract_action_items(&self, body: &str) -> Vec<String> {
        extract_action_items(body)
    }

    /// See [`detect_sentiment`].
    pub fn detect_sentiment(&self, text: &str) -> Sentiment {
        detect_sentiment(text)
    }

    /// Classification, sentiment, and action items in one pass.
    pub fn analyze(&self, subject: &str, body: &str) -> EmailAnalysis {
        EmailAnalysis {
            classification: self.classify(subject, body),
            sentiment: detect_sentiment(&format!("{subject} {body}")),
            action_items: extract_action_items(body),
        }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

/// Round to 2 decimals on the exact binary value, ties to even.
fn round2(value: f64) -> f64 {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::rules::CategoryRule;

    fn classifier() -> KeywordClassifier {
        KeywordClassifier::with_default_rules()
    }

    fn has_two_decimals(value: f64) -> bool {
        ((value * 100.0).round() - value * 100.0).abs() < 1e-9
    }

    #[test]
    fn empty_input_is_general() {
        let result = classifier().classify("", "");
        assert_eq!(result.category, "General");
        assert_eq!(result.confidence, 0.5);
        assert!(result.keywords.is_empty());
        assert_eq!(result.scores.len(), 4);
        assert!(result.scores.values().all(|s| *s == 0));
    }

    #[test]
    fn urgent_deadline_is_important() {
        let result = classifier().classify(
            "Urgent: Project Deadline Tomorrow",
            "Please submit your work by EOD. This is critical for the client presentation.",
        );
        assert_eq!(result.category, "Important");
        for kw in ["urgent", "deadline", "critical"] {
            assert!(result.keywords.contains(&kw.to_string()), "missing {kw}");
        }
        // 3 keywords × 2 + "client" sender token × 1
        assert_eq!(result.scores["Important"], 7);
        assert!(result.scores["Important"] > result.scores["Promotional"]);
    }

    #[test]
    fn sale_email_is_promotional() {
        let result = classifier().classify(
            "50% OFF - Limited Time Sale!",
            "Shop now and save big on electronics. Free shipping on orders over $50.",
        );
        assert_eq!(result.category, "Promotional");
        assert!(result.keywords.contains(&"limited time".to_string()));
        assert!(result.keywords.contains(&"shop now".to_string()));
    }

    #[test]
    fn bank_statement_is_finance() {
        let result = classifier().classify(
            "Your Monthly Bank Statement",
            "Your account statement for October is ready. Download it from your dashboard.",
        );
        assert_eq!(result.category, "Finance");
        assert_eq!(result.keywords, vec!["statement", "account"]);
    }

    #[test]
    fn senders_do_not_enter_keyword_list() {
        let result = classifier().classify("note from the ceo", "");
        assert_eq!(result.category, "Important");
        assert_eq!(result.scores["Important"], 1);
        assert!(result.keywords.is_empty());
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn score_map_covers_every_rule() {
        let custom = ClassifierConfig::empty()
            .with_rule(CategoryRule::new("Travel", &["flight", "hotel"], &["airline"]))
            .unwrap()
            .with_rule(CategoryRule::new("Food", &["recipe"], &[]))
            .unwrap()
            .with_rule(CategoryRule::new("Sports", &["match"], &[]))
            .unwrap();
        let classifier = KeywordClassifier::new(Arc::new(custom));

        for (subject, body) in [("", ""), ("flight booked", "hotel too"), ("recipe", "x")] {
            let result = classifier.classify(subject, body);
            assert_eq!(result.scores.len(), 3);
        }
        let default = KeywordClassifier::default();
        let result = default.classify("anything", "at all");
        assert_eq!(result.scores.len(), default.config().len());
    }

    #[test]
    fn ties_go_to_first_configured_category() {
        let config = ClassifierConfig::empty()
            .with_rule(CategoryRule::new("First", &["alpha"], &[]))
            .unwrap()
            .with_rule(CategoryRule::new("Second", &["beta"], &[]))
            .unwrap();
        let classifier = KeywordClassifier::new(Arc::new(config));

        let result = classifier.classify("beta", "alpha");
        assert_eq!(result.category, "First");
        assert_eq!(result.confidence, 0.5);
        assert_eq!(result.keywords, vec!["alpha"]);
    }

    #[test]
    fn confidence_is_rounded_share_of_total() {
        // Important: "meeting" (2); Promotional: "free" (2); Finance: "payment" (2)
        let result = classifier().classify("meeting", "free payment");
        assert_eq!(result.category, "Important");
        assert_eq!(result.confidence, 0.33);
        assert!(has_two_decimals(result.confidence));
    }

    #[test]
    fn exact_half_confidence_rounds_to_even() {
        // Important 5 of 8: "urgent", "deadline" and sender "team"; Finance 3
        let result = classifier().classify("urgent deadline", "team payment bank");
        assert_eq!(result.scores["Important"], 5);
        assert_eq!(result.scores["Finance"], 3);
        assert_eq!(result.confidence, 0.62);
    }

    #[test]
    fn round2_ties_to_even_digit() {
        assert_eq!(round2(0.625), 0.62);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(17.0 / 40.0), 0.42);
        assert_eq!(round2(1.0 / 3.0), 0.33);
        assert_eq!(round2(1.0), 1.0);
    }

    #[test]
    fn confidence_bounds_hold_across_samples() {
        let samples = [
            ("Invoice overdue", "Payment failed on your account, contact billing support"),
            ("Friend request", "Alex tagged you and liked your photo on facebook"),
            ("Weekly newsletter", "Exclusive coupon inside, subscribe for more deals"),
            ("lunch?", "want to grab food"),
        ];
        for (subject, body) in samples {
            let result = classifier().classify(subject, body);
            assert!((0.0..=1.0).contains(&result.confidence));
            assert!(has_two_decimals(result.confidence));
        }
    }

    #[test]
    fn substring_matching_is_kept() {
        // "sale" inside "wholesale", "hr" inside "three"
        let result = classifier().classify("wholesale", "three");
        assert_eq!(result.scores["Promotional"], 2);
        assert_eq!(result.scores["Important"], 1);
    }

    #[test]
    fn classify_is_idempotent() {
        let c = classifier();
        let a = c.classify("Proposal review", "Client feedback on the contract");
        let b = c.classify("Proposal review", "Client feedback on the contract");
        assert_eq!(a, b);
    }

    #[test]
    fn empty_config_always_general() {
        let classifier = KeywordClassifier::new(Arc::new(ClassifierConfig::empty()));
        let result = classifier.classify("urgent", "sale");
        assert_eq!(result.category, "General");
        assert!(result.scores.is_empty());
    }

    #[test]
    fn analyze_combines_signals() {
        let analysis = classifier().analyze(
            "Problem with the invoice",
            "Please resend the invoice. I am disappointed with the error.",
        );
        assert_eq!(analysis.classification.category, "Finance");
        assert_eq!(analysis.sentiment, Sentiment::Negative);
        assert_eq!(analysis.action_items, vec!["resend the invoice"]);
    }

    #[test]
    fn result_serializes_with_expected_keys() {
        let result = classifier().classify("Urgent", "");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["category"], "Important");
        assert!(json["confidence"].is_f64());
        assert!(json["keywords"].is_array());
        assert_eq!(json["scores"]["Important"], 2);
        assert_eq!(json["scores"]["Social"], 0);
    }
}
