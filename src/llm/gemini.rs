//! Google Gemini provider implementation

use super::types::{ChatTurn, LlmRequest, LlmResponse, Usage};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Public endpoint used when no base URL override is configured
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Finish reasons for which the candidate text is withheld
const BLOCKING_FINISH_REASONS: &[&str] =
    &["SAFETY", "RECITATION", "BLOCKLIST", "PROHIBITED_CONTENT"];

/// Gemini service implementation
pub struct GeminiService {
    client: Client,
    api_key: String,
    endpoint: String,
    model_id: String,
}

impl GeminiService {
    pub fn new(api_key: String, model: &str, base_url: Option<&str>) -> Result<Self, LlmError> {
        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/'),
            model
        );

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            endpoint,
            model_id: model.to_string(),
        })
    }

    #[cfg(test)]
    pub(crate) fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn translate_request(request: &LlmRequest) -> GeminiRequest {
        let system_instruction = request
            .system_instruction
            .as_ref()
            .filter(|s| !s.is_empty())
            .map(|text| GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: text.clone() }],
            });

        let contents = request
            .turns
            .iter()
            .map(|turn: &ChatTurn| GeminiContent {
                role: Some(turn.role.as_str().to_string()),
                parts: vec![GeminiPart {
                    text: turn.content.clone(),
                }],
            })
            .collect();

        let safety_settings = request
            .safety
            .iter()
            .map(|s| GeminiSafetySetting {
                category: s.category.api_name(),
                threshold: s.threshold.api_name(),
            })
            .collect();

        GeminiRequest {
            contents,
            system_instruction,
            generation_config: GeminiGenerationConfig {
                temperature: request.generation.temperature,
                top_p: request.generation.top_p,
                top_k: request.generation.top_k,
                max_output_tokens: request.generation.max_output_tokens,
            },
            safety_settings,
        }
    }

    fn normalize_response(resp: GeminiResponse) -> Result<LlmResponse, LlmError> {
        let Some(candidate) = resp.candidates.into_iter().next() else {
            let reason = resp
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            return Err(LlmError::blocked(format!("Prompt was blocked: {reason}")));
        };

        if let Some(reason) = candidate.finish_reason.as_deref() {
            if BLOCKING_FINISH_REASONS.contains(&reason) {
                return Err(LlmError::blocked(format!(
                    "Candidate was blocked due to {reason}"
                )));
            }
        }

        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let usage = resp.usage_metadata.unwrap_or_default();

        Ok(LlmResponse {
            text,
            finish_reason: candidate.finish_reason,
            usage: Usage {
                input_tokens: u64::from(usage.prompt_token_count),
                output_tokens: u64::from(usage.candidates_token_count),
            },
        })
    }
}

#[async_trait]
impl LlmService for GeminiService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let gemini_request = Self::translate_request(request);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&gemini_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            if let Ok(error_resp) = serde_json::from_str::<GeminiErrorResponse>(&body) {
                return Err(LlmError::from_status(status.as_u16(), &error_resp.error.message));
            }
            return Err(LlmError::from_status(status.as_u16(), &body));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        Self::normalize_response(gemini_response)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GeminiGenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    safety_settings: Vec<GeminiSafetySetting>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct GeminiSafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::{chat_safety_settings, GenerationConfig};
    use crate::llm::LlmErrorKind;
    use serde_json::json;

    fn request(turns: Vec<ChatTurn>) -> LlmRequest {
        LlmRequest {
            system_instruction: Some("You are NyayAI.".to_string()),
            turns,
            generation: GenerationConfig::CHAT,
            safety: chat_safety_settings(),
        }
    }

    #[test]
    fn test_endpoint_uses_model_and_base_url() {
        let service =
            GeminiService::new("key".to_string(), "gemini-1.5-flash", Some("http://localhost:9/"))
                .unwrap();
        assert_eq!(
            service.endpoint(),
            "http://localhost:9/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(service.model_id(), "gemini-1.5-flash");
    }

    #[test]
    fn test_translate_request_wire_shape() {
        let req = request(vec![
            ChatTurn::user("What is BNS?"),
            ChatTurn::model("BNS is..."),
            ChatTurn::user("And BNSS?"),
        ]);
        let wire = serde_json::to_value(GeminiService::translate_request(&req)).unwrap();

        assert_eq!(
            wire["systemInstruction"],
            json!({ "parts": [{ "text": "You are NyayAI." }] })
        );
        assert_eq!(wire["contents"].as_array().unwrap().len(), 3);
        assert_eq!(wire["contents"][1]["role"], "model");
        assert_eq!(wire["contents"][2]["parts"][0]["text"], "And BNSS?");
        assert_eq!(wire["generationConfig"]["topK"], 40);
        assert_eq!(wire["generationConfig"]["maxOutputTokens"], 1000);
        assert_eq!(
            wire["safetySettings"],
            json!([
                { "category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_MEDIUM_AND_ABOVE" },
                { "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_MEDIUM_AND_ABOVE" }
            ])
        );
    }

    #[test]
    fn test_empty_system_instruction_omitted() {
        let mut req = request(vec![ChatTurn::user("hi")]);
        req.system_instruction = Some(String::new());
        let wire = serde_json::to_value(GeminiService::translate_request(&req)).unwrap();
        assert!(wire.get("systemInstruction").is_none());
    }

    #[test]
    fn test_normalize_response_joins_first_candidate_parts() {
        let resp: GeminiResponse = serde_json::from_value(json!({
            "candidates": [
                {
                    "content": {
                        "role": "model",
                        "parts": [{ "text": "Section 356 " }, { "text": "covers defamation." }]
                    },
                    "finishReason": "STOP"
                },
                {
                    "content": { "role": "model", "parts": [{ "text": "ignored" }] },
                    "finishReason": "STOP"
                }
            ],
            "usageMetadata": {
                "promptTokenCount": 12,
                "candidatesTokenCount": 7,
                "totalTokenCount": 19
            }
        }))
        .unwrap();

        let normalized = GeminiService::normalize_response(resp).unwrap();
        assert_eq!(normalized.text, "Section 356 covers defamation.");
        assert_eq!(normalized.usage.input_tokens, 12);
        assert_eq!(normalized.usage.output_tokens, 7);
    }

    #[test]
    fn test_blocked_prompt_is_error() {
        let resp: GeminiResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();

        let err = GeminiService::normalize_response(resp).unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::Blocked);
        assert!(err.message.contains("SAFETY"));
    }

    #[test]
    fn test_safety_finish_reason_is_error() {
        let resp: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();

        let err = GeminiService::normalize_response(resp).unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::Blocked);
    }

    #[test]
    fn test_max_tokens_finish_reason_keeps_text() {
        let resp: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "truncated answer" }] },
                "finishReason": "MAX_TOKENS"
            }]
        }))
        .unwrap();

        let normalized = GeminiService::normalize_response(resp).unwrap();
        assert_eq!(normalized.text, "truncated answer");
        assert_eq!(normalized.finish_reason.as_deref(), Some("MAX_TOKENS"));
    }
}
