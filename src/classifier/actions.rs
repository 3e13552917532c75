//! Action-item extraction from email bodies.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Maximum number of action items returned.
pub const MAX_ACTION_ITEMS: usize = 5;

/// Maximum length of a single action item, in characters.
const MAX_ITEM_CHARS: usize = 100;

/// Imperative lead-ins, each capturing up to the next sentence terminator.
static ACTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"please\s+([^.!?]+)",
        r"could you\s+([^.!?]+)",
        r"can you\s+([^.!?]+)",
        r"need to\s+([^.!?]+)",
        r"should\s+([^.!?]+)",
        r"must\s+([^.!?]+)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Pull up to five imperative phrases out of `body`.
///
/// Matching runs on the lower-cased body. Items are trimmed, cut to 100
/// characters and de-duplicated, keeping the first occurrence. Patterns are
/// scanned in a fixed order, so the output is deterministic, but callers
/// should treat it as a set.
pub fn extract_action_items(body: &str) -> Vec<String> {
    let body_lower = body.to_lowercase();
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for pattern in ACTION_PATTERNS.iter() {
        for caps in pattern.captures_iter(&body_lower) {
            let Some(m) = caps.get(1) else { continue };
            let item: String = m.as_str().trim().chars().take(MAX_ITEM_CHARS).collect();
            if seen.insert(item.clone()) {
                items.push(item);
            }
        }
    }

    items.truncate(MAX_ACTION_ITEMS);
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_set(items: Vec<String>) -> HashSet<String> {
        items.into_iter().collect()
    }

    #[test]
    fn all_six_patterns_compile() {
        assert_eq!(ACTION_PATTERNS.len(), 6);
    }

    #[test]
    fn extracts_please_and_could_you() {
        let items = extract_action_items("Please send the report. Could you also confirm the date?");
        let set = as_set(items);
        assert!(set.len() <= MAX_ACTION_ITEMS);
        assert!(set.contains("send the report"));
        assert!(set.contains("also confirm the date"));
    }

    #[test]
    fn items_are_trimmed_and_truncated() {
        let long = "x".repeat(250);
        let body = format!("You must   {long}");
        let items = extract_action_items(&body);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].chars().count(), 100);
        assert!(!items[0].starts_with(' '));
    }

    #[test]
    fn duplicates_collapse() {
        let items = extract_action_items("Please call me. PLEASE call me! please call me?");
        assert_eq!(items, vec!["call me"]);
    }

    #[test]
    fn capped_at_five() {
        let body = "Please do a. Please do b. Please do c. Please do d. \
                    Please do e. Please do f. Please do g.";
        assert_eq!(extract_action_items(body).len(), 5);
    }

    #[test]
    fn runs_to_end_of_string_without_terminator() {
        let items = extract_action_items("We need to ship the build tonight");
        assert_eq!(items, vec!["ship the build tonight"]);
    }

    #[test]
    fn no_lead_ins_yields_nothing() {
        assert!(extract_action_items("The meeting is at 3pm.").is_empty());
        assert!(extract_action_items("").is_empty());
    }

    #[test]
    fn overlapping_lead_ins_each_capture() {
        // "should" and "must" both fire on the same sentence
        let set = as_set(extract_action_items("You should and must finish it."));
        assert!(set.contains("and must finish it"));
        assert!(set.contains("finish it"));
    }
}
