//! Reply drafting: reply-type detection, canned templates and LLM drafts.

pub mod generator;
pub mod templates;

pub use generator::{DraftReply, GeneratorConfig, ReplyGenerator, ReplyRequest};
pub use templates::{ReplyType, analyze_tone, determine_reply_type};
