//! Yes/no intent classification of free-text candidate replies.
//!
//! The conversation core only consumes [`IntentClassifier`]. The production
//! implementation asks an LLM for a small JSON verdict and fails soft: any
//! transport, parse, or validation problem becomes [`YesNo::Unclear`] so the
//! dialogue re-asks instead of guessing.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

/// Confidence below which a verdict is discarded.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.65;

/// Default sampling temperature for classification calls.
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// Max tokens for the verdict (JSON plus a short reasoning string).
const CLASSIFY_MAX_TOKENS: u32 = 256;

/// Tri-state outcome of classifying a reply to a yes/no question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YesNo {
    Yes,
    No,
    Unclear,
}

impl YesNo {
    /// `Some(true)` / `Some(false)` for a definite answer, `None` when unclear.
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Yes => Some(true),
            Self::No => Some(false),
            Self::Unclear => None,
        }
    }
}

impl From<Option<bool>> for YesNo {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Self::Yes,
            Some(false) => Self::No,
            None => Self::Unclear,
        }
    }
}

/// Classifies a reply to a yes/no question. Never fails.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify_yes_no(&self, text: &str) -> YesNo;
}

/// The JSON verdict the model is asked to produce.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct YesNoIntent {
    pub answer: Option<bool>,
    pub confidence: f32,
    pub reasoning: String,
}

/// LLM-backed classifier.
pub struct LlmIntentClassifier {
    llm: Arc<dyn LlmProvider>,
    confidence_threshold: f32,
    temperature: f32,
}

impl LlmIntentClassifier {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// Apply the confidence policy to a parsed verdict.
    fn decide(&self, intent: &YesNoIntent) -> YesNo {
        if intent.confidence < self.confidence_threshold {
            debug!(
                confidence = intent.confidence,
                threshold = self.confidence_threshold,
                "Low-confidence verdict treated as unclear"
            );
            return YesNo::Unclear;
        }
        YesNo::from(intent.answer)
    }
}

#[async_trait]
impl IntentClassifier for LlmIntentClassifier {
    async fn classify_yes_no(&self, text: &str) -> YesNo {
        let request = CompletionRequest::new(vec![ChatMessage::user(build_yes_no_prompt(text))])
            .with_temperature(self.temperature)
            .with_max_tokens(CLASSIFY_MAX_TOKENS);

        let response = match self.llm.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, model = self.llm.model_name(), "Yes/no classification call failed");
                return YesNo::Unclear;
            }
        };

        match parse_yes_no_intent(&response.content) {
            Ok(intent) => {
                let verdict = self.decide(&intent);
                debug!(
                    ?verdict,
                    answer = ?intent.answer,
                    confidence = intent.confidence,
                    reasoning = %intent.reasoning,
                    "Classified yes/no reply"
                );
                verdict
            }
            Err(e) => {
                warn!(
                    error = %e,
                    raw_response = %response.content,
                    "Error parsing LLM response"
                );
                YesNo::Unclear
            }
        }
    }
}

/// Build the classification prompt for one reply.
pub fn build_yes_no_prompt(user_text: &str) -> String {
    format!(
        "You are a classifier. The user responded to a yes/no question.\n\n\
         Return ONLY JSON in this schema:\n\
         {{\n  \"answer\": true/false/null,\n  \"confidence\": 0.0-1.0,\n  \"reasoning\": \"short explanation\"\n}}\n\n\
         User response: \"{user_text}\"\n"
    )
}

/// Parse and validate the model's verdict.
pub fn parse_yes_no_intent(raw: &str) -> Result<YesNoIntent, String> {
    let json_str = extract_json_object(raw);
    let intent: YesNoIntent =
        serde_json::from_str(json_str).map_err(|e| format!("JSON parse error: {e}"))?;

    if !(0.0..=1.0).contains(&intent.confidence) {
        return Err(format!("confidence out of range: {}", intent.confidence));
    }
    Ok(intent)
}

/// Slice the JSON object out of model output (handles markdown fences and
/// surrounding prose).
fn extract_json_object(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.starts_with('{') {
        return trimmed;
    }

    for fence in ["```json", "```"] {
        if let Some(start) = trimmed.find(fence) {
            let after = &trimmed[start + fence.len()..];
            if let Some(end) = after.find("```") {
                let inner = after[..end].trim();
                if inner.starts_with('{') {
                    return inner;
                }
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return &trimmed[start..=end];
    }

    trimmed
}
