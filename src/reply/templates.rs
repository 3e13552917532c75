//! Canned reply templates and the heuristics that pick and fill them.

use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

pub const GREETING: &str = "Hi,\n\n";
pub const SIGNATURE: &str = "\n\nBest regards,\nYour Digital Twin Assistant";

const ALTERNATIVE_TIME: &str = "tomorrow afternoon or Friday morning";

const MEETING_WORDS: &[&str] = &["meeting", "schedule", "reschedule", "call", "appointment"];
const PROPOSAL_WORDS: &[&str] = &["proposal", "feedback", "review", "client"];
const URGENT_WORDS: &[&str] = &["urgent", "deadline", "critical", "important"];
const PROMO_WORDS: &[&str] = &["sale", "offer", "discount", "promotion"];

const GENERIC_ACTIONS: &[&str] = &[
    "complete the requested task",
    "review the materials",
    "provide the necessary information",
    "follow up on this matter",
    "address your concerns",
];

/// Kind of reply to draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplyType {
    Important,
    Meeting,
    Proposal,
    General,
    Promotional,
}

impl ReplyType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Important => "Important",
            Self::Meeting => "Meeting",
            Self::Proposal => "Proposal",
            Self::General => "General",
            Self::Promotional => "Promotional",
        }
    }

    pub fn templates(&self) -> &'static [&'static str] {
        match self {
            Self::Important => &[
                "Thank you for bringing this to my attention. I've reviewed the details and will {action}. I'll keep you updated on the progress.",
                "I appreciate the update. I'll prioritize this and ensure {action} by the specified deadline. Please let me know if you need anything else.",
                "Understood. I'll {action} and circle back with you shortly. Thank you for the heads up.",
            ],
            Self::Meeting => &[
                "Thank you for reaching out. The proposed time works well for me. I've added it to my calendar.",
                "I appreciate you letting me know. Unfortunately, I have a conflict at that time. Would {alternative} work instead?",
                "Thanks for the update. I'll adjust my schedule accordingly and see you then.",
            ],
            Self::Proposal => &[
                "Thank you for your feedback on the proposal. I'd be happy to schedule a call to discuss your questions in detail.",
                "I appreciate your thorough review. Let me address your concerns about {topic} and we can set up a time to discuss further.",
                "Great to hear you found the proposal valuable. I'm available for a call this week to clarify any points.",
            ],
            Self::General => &[
                "Thank you for your email. I've noted your message and will respond in detail soon.",
                "I appreciate you reaching out. I'll review this and get back to you with more information.",
                "Thanks for the update. I'll look into this and follow up accordingly.",
            ],
            Self::Promotional => &[
                "Thank you for the offer, but I'm not interested at this time.",
                "I appreciate the information. I'll keep this in mind for future reference.",
            ],
        }
    }
}

impl fmt::Display for ReplyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

/// Pick the reply type from subject and body. First match wins:
/// meeting, proposal, urgent, promotional, else general.
pub fn determine_reply_type(subject: &str, body: &str) -> ReplyType {
    let text = format!("{subject} {body}").to_lowercase();
    if contains_any(&text, MEETING_WORDS) {
        ReplyType::Meeting
    } else if contains_any(&text, PROPOSAL_WORDS) {
        ReplyType::Proposal
    } else if contains_any(&text, URGENT_WORDS) {
        ReplyType::Important
    } else if contains_any(&text, PROMO_WORDS) {
        ReplyType::Promotional
    } else {
        ReplyType::General
    }
}

/// The concrete action a reply commits to.
pub fn extract_action(body: &str) -> String {
    let body = body.to_lowercase();
    if body.contains("submit") {
        "submit the deliverables".to_string()
    } else if body.contains("review") {
        "review the document".to_string()
    } else if body.contains("confirm") {
        "confirm the details".to_string()
    } else {
        GENERIC_ACTIONS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(GENERIC_ACTIONS[0])
            .to_string()
    }
}

/// First three subject words, lower-cased.
pub fn extract_topic(subject: &str) -> String {
    subject
        .split_whitespace()
        .take(3)
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Fill `{action}`, `{alternative}` and `{topic}` placeholders.
pub fn customize(template: &str, subject: &str, body: &str) -> String {
    let mut text = template.to_string();
    if text.contains("{action}") {
        text = text.replace("{action}", &extract_action(body));
    }
    if text.contains("{alternative}") {
        text = text.replace("{alternative}", ALTERNATIVE_TIME);
    }
    if text.contains("{topic}") {
        text = text.replace("{topic}", &extract_topic(subject));
    }
    text
}

/// Wrap a reply body with the standard greeting and signature.
pub fn wrap_reply(body: &str) -> String {
    format!("{GREETING}{body}{SIGNATURE}")
}

/// Random confidence in [0.75, 0.95], two decimals.
pub fn template_confidence() -> f64 {
    let raw: f64 = rand::thread_rng().gen_range(0.75..=0.95);
    (raw * 100.0).round() / 100.0
}

/// Rough tone of an email.
pub fn analyze_tone(text: &str) -> &'static str {
    let text = text.to_lowercase();
    if contains_any(&text, &["urgent", "asap", "immediately", "critical"]) {
        "Urgent"
    } else if contains_any(&text, &["thanks", "appreciate", "grateful"]) {
        "Friendly"
    } else if contains_any(&text, &["please", "kindly", "would you"]) {
        "Polite"
    } else {
        "Neutral"
    }
}
