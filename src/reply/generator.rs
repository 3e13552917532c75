//! Reply drafting, either from templates or through an LLM.

use std::sync::Arc;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::templates::{
    ReplyType, analyze_tone, customize, determine_reply_type, template_confidence, wrap_reply,
};
use crate::error::{LlmError, ReplyError};
use crate::llm::{ChatMessage, CompletionRequest, FinishReason, LlmProvider};

pub const DEFAULT_TONE: &str = "Professional";

/// Confidence reported for LLM-written drafts.
const LLM_CONFIDENCE: f64 = 0.9;

/// What to reply to.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplyRequest {
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub extra_instructions: Option<String>,
}

impl ReplyRequest {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = Some(tone.into());
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.extra_instructions = Some(instructions.into());
        self
    }

    fn tone(&self) -> String {
        self.tone
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TONE)
            .to_string()
    }
}

/// A drafted reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftReply {
    pub subject: String,
    #[serde(rename = "body")]
    pub reply_body: String,
    pub reply_type: ReplyType,
    pub tone: String,
    pub confidence: f64,
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 150,
        }
    }
}

/// Drafts replies with the LLM when one is configured, templates otherwise.
pub struct ReplyGenerator {
    llm: Option<Arc<dyn LlmProvider>>,
    config: GeneratorConfig,
}

impl ReplyGenerator {
    /// Template-only generator.
    pub fn templates() -> Self {
        Self {
            llm: None,
            config: GeneratorConfig::default(),
        }
    }

    pub fn with_llm(llm: Arc<dyn LlmProvider>, config: GeneratorConfig) -> Self {
        Self {
            llm: Some(llm),
            config,
        }
    }

    pub fn uses_llm(&self) -> bool {
        self.llm.is_some()
    }

    /// Draft a reply. LLM failures fall back to templates.
    pub async fn generate(&self, request: &ReplyRequest) -> Result<DraftReply, ReplyError> {
        let reply_type = determine_reply_type(&request.subject, &request.body);

        if let Some(llm) = &self.llm {
            match self.generate_with_llm(llm.as_ref(), request, reply_type).await {
                Ok(draft) => return Ok(draft),
                Err(e) => warn!(
                    error = %e,
                    model = llm.model_name(),
                    "LLM reply failed, falling back to templates"
                ),
            }
        }

        self.generate_from_template(request, reply_type)
    }

    fn generate_from_template(
        &self,
        request: &ReplyRequest,
        reply_type: ReplyType,
    ) -> Result<DraftReply, ReplyError> {
        let template = reply_type
            .templates()
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| ReplyError::NoTemplates(reply_type.to_string()))?;

        let body = customize(template, &request.subject, &request.body);
        debug!(reply_type = %reply_type, "Drafted reply from template");

        Ok(DraftReply {
            subject: reply_subject(&request.subject),
            reply_body: wrap_reply(&body),
            reply_type,
            tone: request.tone(),
            confidence: template_confidence(),
        })
    }

    async fn generate_with_llm(
        &self,
        llm: &dyn LlmProvider,
        request: &ReplyRequest,
        reply_type: ReplyType,
    ) -> Result<DraftReply, LlmError> {
        let tone = request.tone();
        let completion = CompletionRequest::new(vec![
            ChatMessage::system(build_system_prompt(&tone)),
            ChatMessage::user(build_user_prompt(request, reply_type)),
        ])
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens);

        let response = llm.complete(completion).await?;
        if response.finish_reason == FinishReason::Length {
            warn!(model = llm.model_name(), "LLM reply hit the token limit");
        }
        let body = response.content.trim();
        if body.is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: llm.model_name().to_string(),
                reason: "empty reply".to_string(),
            });
        }

        info!(
            model = llm.model_name(),
            output_tokens = response.output_tokens,
            cost = %response.cost(llm.cost_per_token()),
            "Drafted reply with LLM"
        );

        Ok(DraftReply {
            subject: reply_subject(&request.subject),
            reply_body: wrap_reply(body),
            reply_type,
            tone,
            confidence: LLM_CONFIDENCE,
        })
    }
}

fn reply_subject(subject: &str) -> String {
    if subject.trim_start().to_lowercase().starts_with("re:") {
        subject.to_string()
    } else {
        format!("Re: {subject}")
    }
}

fn build_system_prompt(tone: &str) -> String {
    format!(
        "You are an email assistant drafting replies on behalf of a busy professional.\n\n\
         Rules:\n\
         - Write in a {tone} tone\n\
         - Two to four sentences, no filler\n\
         - Do not invent facts, dates or commitments that are not in the email\n\
         - Write only the reply body: no greeting, no signature, no subject line"
    )
}

fn build_user_prompt(request: &ReplyRequest, reply_type: ReplyType) -> String {
    let mut prompt = format!(
        "From: {sender}\nSubject: {subject}\nDetected tone: {detected}\nReply type: {reply_type}\n\n{body}",
        sender = request.sender.as_deref().unwrap_or("Unknown"),
        subject = request.subject,
        detected = analyze_tone(&format!("{} {}", request.subject, request.body)),
        body = request.body,
    );
    if let Some(extra) = request
        .extra_instructions
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        prompt.push_str("\n\nAdditional instructions: ");
        prompt.push_str(extra);
    }
    prompt
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use tokio::sync::Mutex;

    use super::*;
    use crate::llm::CompletionResponse;

    struct StubLlm {
        reply: Result<String, ()>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl StubLlm {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for StubLlm {
        fn model_name(&self) -> &str {
            "stub"
        }
        fn cost_per_token(&self) -> (Decimal, Decimal) {
            (Decimal::ZERO, Decimal::ZERO)
        }
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.seen.lock().await.push(request);
            match &self.reply {
                Ok(text) => Ok(CompletionResponse {
                    content: text.clone(),
                    input_tokens: 10,
                    output_tokens: 5,
                    finish_reason: FinishReason::Stop,
                }),
                Err(()) => Err(LlmError::RequestFailed {
                    provider: "stub".into(),
                    reason: "offline".into(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn template_reply_for_meeting() {
        let generator = ReplyGenerator::templates();
        let draft = generator
            .generate(&ReplyRequest::new(
                "Meeting Reschedule - New Time Proposed",
                "Can we move our meeting to Thursday?",
            ))
            .await
            .unwrap();

        assert_eq!(draft.subject, "Re: Meeting Reschedule - New Time Proposed");
        assert_eq!(draft.reply_type, ReplyType::Meeting);
        assert_eq!(draft.tone, "Professional");
        assert!(draft.reply_body.starts_with("Hi,\n\n"));
        assert!(draft.reply_body.ends_with("Best regards,\nYour Digital Twin Assistant"));
        assert!(!draft.reply_body.contains('{'));
        assert!((0.75..=0.95).contains(&draft.confidence));
    }

    #[tokio::test]
    async fn template_reply_keeps_requested_tone() {
        let generator = ReplyGenerator::templates();
        let draft = generator
            .generate(&ReplyRequest::new("Hello", "Just checking in").with_tone("friendly"))
            .await
            .unwrap();
        assert_eq!(draft.tone, "friendly");
        assert_eq!(draft.reply_type, ReplyType::General);
    }

    #[tokio::test]
    async fn llm_reply_is_wrapped() {
        let llm = Arc::new(StubLlm::replying("  Sounds good, see you Thursday.  "));
        let generator = ReplyGenerator::with_llm(llm.clone(), GeneratorConfig::default());
        assert!(generator.uses_llm());

        let draft = generator
            .generate(
                &ReplyRequest::new("Re: Meeting", "Thursday at 3?")
                    .with_sender("manager@company.com")
                    .with_instructions("Accept the time"),
            )
            .await
            .unwrap();

        assert_eq!(draft.subject, "Re: Meeting");
        assert_eq!(
            draft.reply_body,
            "Hi,\n\nSounds good, see you Thursday.\n\nBest regards,\nYour Digital Twin Assistant"
        );
        assert_eq!(draft.confidence, LLM_CONFIDENCE);

        let seen = llm.seen.lock().await;
        let user = &seen[0].messages[1].content;
        assert!(user.contains("From: manager@company.com"));
        assert!(user.contains("Additional instructions: Accept the time"));
        assert_eq!(seen[0].max_tokens, Some(150));
    }

    #[tokio::test]
    async fn llm_failure_falls_back_to_templates() {
        let generator =
            ReplyGenerator::with_llm(Arc::new(StubLlm::failing()), GeneratorConfig::default());
        let draft = generator
            .generate(&ReplyRequest::new("50% OFF", "Big sale"))
            .await
            .unwrap();
        assert_eq!(draft.reply_type, ReplyType::Promotional);
        assert!(
            ReplyType::Promotional
                .templates()
                .iter()
                .any(|t| draft.reply_body.contains(t))
        );
    }

    #[tokio::test]
    async fn empty_llm_reply_falls_back() {
        let generator =
            ReplyGenerator::with_llm(Arc::new(StubLlm::replying("   ")), GeneratorConfig::default());
        let draft = generator
            .generate(&ReplyRequest::new("Hi", "there"))
            .await
            .unwrap();
        assert!((0.75..=0.95).contains(&draft.confidence));
    }

    #[test]
    fn draft_serializes_body_field() {
        let draft = DraftReply {
            subject: "Re: x".into(),
            reply_body: "Hi".into(),
            reply_type: ReplyType::General,
            tone: "Professional".into(),
            confidence: 0.8,
        };
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["body"], "Hi");
        assert_eq!(json["reply_type"], "General");
    }
}
