//! Category rule tables for the keyword classifier.
//!
//! Rules are built once at startup and shared read-only. Every token is
//! stored lower-cased so matching only needs to fold the input text.

use crate::error::ConfigError;

/// A named category with the tokens that vote for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRule {
    name: String,
    keywords: Vec<String>,
    senders: Vec<String>,
}

impl CategoryRule {
    pub fn new(name: &str, keywords: &[&str], senders: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            senders: senders.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    /// Category name reported in classification results.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Phrases worth 2 points each when present in the text.
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Sender-ish tokens worth 1 point each. Checked against the same text.
    pub fn senders(&self) -> &[String] {
        &self.senders
    }
}

/// Ordered, immutable set of category rules.
///
/// Order matters: ties between equal top scores go to the rule defined first.
#[derive(Debug, Clone, Default)]
pub struct ClassifierConfig {
    rules: Vec<CategoryRule>,
}

impl ClassifierConfig {
    /// The built-in rule set: Important, Promotional, Social, Finance.
    pub fn default_rules() -> Self {
        let rules = vec![
            CategoryRule::new(
                "Important",
                &[
                    "urgent",
                    "deadline",
                    "action required",
                    "important",
                    "asap",
                    "critical",
                    "priority",
                    "immediately",
                    "meeting",
                    "reschedule",
                    "confirm",
                    "approval",
                    "review",
                    "feedback",
                    "proposal",
                    "contract",
                ],
                &[
                    "manager", "ceo", "director", "hr", "admin", "team", "client", "partner",
                ],
            ),
            CategoryRule::new(
                "Promotional",
                &[
                    "sale",
                    "offer",
                    "discount",
                    "deal",
                    "promotion",
                    "limited time",
                    "free",
                    "save",
                    "shop now",
                    "exclusive",
                    "clearance",
                    "bargain",
                    "coupon",
                    "subscribe",
                    "unsubscribe",
                ],
                &["deals", "marketing", "newsletter", "promo", "offers", "sales"],
            ),
            CategoryRule::new(
                "Social",
                &[
                    "connection request",
                    "tagged you",
                    "liked",
                    "commented",
                    "shared",
                    "follow",
                    "friend request",
                    "notification",
                    "activity",
                ],
                &[
                    "facebook",
                    "twitter",
                    "linkedin",
                    "instagram",
                    "notifications",
                    "noreply",
                ],
            ),
            CategoryRule::new(
                "Finance",
                &[
                    "statement",
                    "balance",
                    "transaction",
                    "payment",
                    "invoice",
                    "receipt",
                    "billing",
                    "account",
                    "credit",
                    "debit",
                    "transfer",
                ],
                &["bank", "paypal", "support", "billing", "finance", "accounts"],
            ),
        ];

        Self { rules }
    }

    /// Create a config with no categories (everything classifies as General).
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a category. Names must be unique so every rule gets its own score entry.
    pub fn add_rule(&mut self, rule: CategoryRule) -> Result<(), ConfigError> {
        if self.rules.iter().any(|r| r.name == rule.name) {
            return Err(ConfigError::InvalidValue {
                key: "category".into(),
                message: format!("duplicate category '{}'", rule.name),
            });
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Builder-style variant of [`add_rule`](Self::add_rule).
    pub fn with_rule(mut self, rule: CategoryRule) -> Result<Self, ConfigError> {
        self.add_rule(rule)?;
        Ok(self)
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_order_and_sizes() {
        let config = ClassifierConfig::default_rules();
        let names: Vec<&str> = config.rules().iter().map(|r| r.name()).collect();
        assert_eq!(names, ["Important", "Promotional", "Social", "Finance"]);

        let keyword_total: usize = config.rules().iter().map(|r| r.keywords().len()).sum();
        let sender_total: usize = config.rules().iter().map(|r| r.senders().len()).sum();
        assert_eq!(keyword_total, 51);
        assert_eq!(sender_total, 26);
    }

    #[test]
    fn tokens_are_lowercased() {
        let rule = CategoryRule::new("Travel", &["Boarding Pass"], &["AIRLINE"]);
        assert_eq!(rule.keywords(), ["boarding pass"]);
        assert_eq!(rule.senders(), ["airline"]);
    }

    #[test]
    fn duplicate_category_rejected() {
        let mut config = ClassifierConfig::default_rules();
        let err = config
            .add_rule(CategoryRule::new("Finance", &["tax"], &[]))
            .unwrap_err();
        assert!(err.to_string().contains("duplicate category"));
        assert_eq!(config.len(), 4);
    }

    #[test]
    fn empty_config() {
        let config = ClassifierConfig::empty();
        assert!(config.is_empty());
        let config = config
            .with_rule(CategoryRule::new("Travel", &["flight"], &[]))
            .unwrap();
        assert_eq!(config.len(), 1);
    }
}
