//! OpenAI chat-completion fact checker with a strict JSON schema.

use super::{Claim, FactChecker, Verdict, MAX_SOURCES};
use crate::config::FactCheckSettings;
use crate::error::{FaktumError, Result};
use crate::openai::create_client_with_timeout;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
    ResponseFormatJsonSchema,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, instrument};

const SYSTEM_PROMPT: &str = "You are a fact-checking assistant. \
Extract ONLY objectively verifiable statements (numbers, dates, facts) from the transcript. \
Rate each statement as 'correct', 'incorrect' or 'unclear'. \
Give 1 to 3 credible source URLs per entry. \
Write each claim in the language of the transcript. \
No explanatory sentences outside the required JSON structure.";

/// Fact checker backed by an OpenAI chat model.
pub struct OpenAIFactChecker {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    max_chars: usize,
    max_tokens: u32,
}

impl OpenAIFactChecker {
    pub fn from_settings(settings: &FactCheckSettings) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(Duration::from_secs(settings.timeout_secs))?,
            model: settings.model.clone(),
            max_chars: settings.max_chars,
            max_tokens: settings.max_tokens,
        })
    }

    fn response_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "items": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["claim", "verdict", "sources"],
                        "properties": {
                            "claim": {"type": "string"},
                            "verdict": {"type": "string", "enum": ["correct", "incorrect", "unclear"]},
                            "sources": {
                                "type": "array",
                                "items": {"type": "string", "pattern": "^https?://\\S+$"},
                                "minItems": 0,
                                "maxItems": MAX_SOURCES
                            }
                        },
                        "additionalProperties": false
                    }
                }
            },
            "required": ["items"],
            "additionalProperties": false
        })
    }
}

#[async_trait]
impl FactChecker for OpenAIFactChecker {
    #[instrument(skip(self, text), fields(chars = text.len()))]
    async fn fact_check(&self, text: &str, lang_hint: &str) -> Result<Vec<Claim>> {
        let clipped = clip_chars(text, self.max_chars);
        debug!("Sending {} characters to {}", clipped.len(), self.model);

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .map_err(|e| FaktumError::FactCheck(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(format!("Language: {}\nTranscript:\n{}", lang_hint, clipped))
                .build()
                .map_err(|e| FaktumError::FactCheck(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.1)
            .max_completion_tokens(self.max_tokens)
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: None,
                    name: "facts_response".to_string(),
                    schema: Some(Self::response_schema()),
                    strict: Some(true),
                },
            })
            .build()
            .map_err(|e| FaktumError::FactCheck(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| FaktumError::OpenAI(format!("Fact check request failed: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| FaktumError::FactCheck("Empty response from LLM".to_string()))?;

        let claims = parse_claims(content)?;
        info!("Extracted {} claims", claims.len());
        Ok(claims)
    }
}

/// First `max_chars` characters of `text`.
fn clip_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Parse the model output into claims, tolerating loose shapes.
fn parse_claims(content: &str) -> Result<Vec<Claim>> {
    let parsed: Value = serde_json::from_str(content).map_err(|e| {
        FaktumError::FactCheck(format!(
            "JSON parsing failed: {}. Response was: {}",
            e,
            clip_chars(content, 500)
        ))
    })?;

    let items = parsed
        .get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let claims = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(obj) => {
                let claim = obj.get("claim").and_then(Value::as_str).unwrap_or_default();
                let verdict = obj.get("verdict").and_then(Value::as_str).unwrap_or_default();
                let sources = obj.get("sources")?.as_array()?;
                let sources = sources
                    .iter()
                    .filter_map(|s| s.as_str().map(str::to_string))
                    .collect();
                Some(Claim::new(claim, Verdict::parse_lenient(verdict), sources))
            }
            Value::String(s) => Some(Claim::new(s, Verdict::Unclear, Vec::new())),
            _ => None,
        })
        .collect();

    Ok(claims)
}
