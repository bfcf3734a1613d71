//! Response exchange with the external model
//!
//! Each call opens a fresh chat session, replays the prior turns into it,
//! sends the new prompt and returns the first candidate's text.

use crate::llm::{
    chat_safety_settings, ChatSession, ChatTurn, GenerationConfig, LlmError, LlmErrorKind,
    LlmService, TurnRole,
};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use thiserror::Error;

/// How prior turns reach the model session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayMode {
    /// Each prior user turn is sent as its own round trip; model turns are
    /// dropped, so the model never sees its earlier answers
    #[default]
    UserOnly,
    /// Every prior turn is seeded into the session context and only the new
    /// prompt is sent
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeOptions {
    pub system_instruction: String,
    pub replay: ReplayMode,
    pub normalize_bullets: bool,
}

/// Per-request failure of the exchange
#[derive(Debug, Clone, Error)]
#[error("Failed to generate response: {message}")]
pub struct ResponseGenerationError {
    pub kind: LlmErrorKind,
    pub message: String,
}

impl From<LlmError> for ResponseGenerationError {
    fn from(e: LlmError) -> Self {
        Self {
            kind: e.kind,
            message: e.message,
        }
    }
}

/// Produces the assistant reply for a prompt and its prior turns
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate_response(
        &self,
        prompt: &str,
        history: &[ChatTurn],
    ) -> Result<String, ResponseGenerationError>;
}

/// Exchange client backed by an `LlmService`
pub struct ExchangeClient {
    service: Arc<dyn LlmService>,
    options: ExchangeOptions,
}

impl ExchangeClient {
    pub fn new(service: Arc<dyn LlmService>, options: ExchangeOptions) -> Self {
        Self { service, options }
    }

    async fn exchange(&self, prompt: &str, history: &[ChatTurn]) -> Result<String, LlmError> {
        let mut session = ChatSession::new(
            self.service.as_ref(),
            Some(self.options.system_instruction.clone()),
            GenerationConfig::CHAT,
            chat_safety_settings(),
        );

        match self.options.replay {
            ReplayMode::UserOnly => {
                for turn in history.iter().filter(|t| t.role == TurnRole::User) {
                    session.send_message(&turn.content).await?;
                }
            }
            ReplayMode::All => session.seed(history.iter().cloned()),
        }

        let response = session.send_message(prompt).await?;
        if response.text.trim().is_empty() {
            return Err(LlmError::unknown("Model returned an empty response"));
        }

        Ok(if self.options.normalize_bullets {
            normalize_bullets(&response.text)
        } else {
            response.text
        })
    }
}

#[async_trait]
impl ResponseGenerator for ExchangeClient {
    async fn generate_response(
        &self,
        prompt: &str,
        history: &[ChatTurn],
    ) -> Result<String, ResponseGenerationError> {
        self.exchange(prompt, history).await.map_err(|e| {
            tracing::error!(
                model = %self.service.model_id(),
                kind = e.kind.as_str(),
                error = %e.message,
                history_turns = history.len(),
                "Error generating response"
            );
            ResponseGenerationError::from(e)
        })
    }
}

/// Line-leading `*`, optional spaces or tabs, then a non-marker character
static BULLET_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^([ \t]*)\*[ \t]*([^*\s])").ok());

/// Rewrite line-leading `*` markers to a canonical `"* "`.
///
/// Indentation is kept, and `**` (bold) at line start is left alone.
pub fn normalize_bullets(text: &str) -> String {
    match BULLET_PATTERN.as_ref() {
        Some(pattern) => pattern.replace_all(text, "$1* $2").into_owned(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::MockLlmService;

    fn client(mock: &Arc<MockLlmService>, replay: ReplayMode, normalize: bool) -> ExchangeClient {
        ExchangeClient::new(
            mock.clone(),
            ExchangeOptions {
                system_instruction: "You are NyayAI.".to_string(),
                replay,
                normalize_bullets: normalize,
            },
        )
    }

    fn abc_history() -> Vec<ChatTurn> {
        vec![ChatTurn::user("A"), ChatTurn::model("B"), ChatTurn::user("C")]
    }

    #[test]
    fn test_bullet_pattern_compiles() {
        assert!(BULLET_PATTERN.is_some());
    }

    #[test]
    fn test_normalize_bullets_example() {
        assert_eq!(
            normalize_bullets("*   item one\n*no-space-item"),
            "* item one\n* no-space-item"
        );
    }

    #[test]
    fn test_normalize_bullets_idempotent() {
        let once = normalize_bullets("*   item one\n*no-space-item");
        assert_eq!(normalize_bullets(&once), once);
    }

    #[test]
    fn test_normalize_bullets_leaves_bold_and_inline() {
        let text = "**Section 356**: defamation\nPenalty is 2 * 1 years\n  *\tnested";
        assert_eq!(
            normalize_bullets(text),
            "**Section 356**: defamation\nPenalty is 2 * 1 years\n  * nested"
        );
    }

    #[tokio::test]
    async fn test_user_only_replay_drops_model_turns() {
        let mock = Arc::new(MockLlmService::new("test-model"));
        mock.queue_text("reply to A");
        mock.queue_text("reply to C");
        mock.queue_text("final");

        let result = client(&mock, ReplayMode::UserOnly, false)
            .generate_response("D", &abc_history())
            .await
            .unwrap();
        assert_eq!(result, "final");

        let replayed: Vec<String> = mock
            .recorded_requests()
            .iter()
            .map(|r| r.last_user_text().unwrap_or_default().to_string())
            .collect();
        assert_eq!(replayed, vec!["A", "C", "D"]);

        // B never reaches the model; the session only holds its own replies
        let last = mock.recorded_requests().pop().unwrap();
        assert!(last.turns.iter().all(|t| t.content != "B"));
        assert_eq!(last.turns.len(), 5);
    }

    #[tokio::test]
    async fn test_all_replay_seeds_context_without_round_trips() {
        let mock = Arc::new(MockLlmService::new("test-model"));
        mock.queue_text("final");

        client(&mock, ReplayMode::All, false)
            .generate_response("D", &abc_history())
            .await
            .unwrap();

        let requests = mock.recorded_requests();
        assert_eq!(requests.len(), 1);
        let mut expected = abc_history();
        expected.push(ChatTurn::user("D"));
        assert_eq!(requests[0].turns, expected);
    }

    #[tokio::test]
    async fn test_empty_history_single_request_with_fixed_config() {
        let mock = Arc::new(MockLlmService::new("test-model"));
        mock.queue_text("answer");

        client(&mock, ReplayMode::UserOnly, true)
            .generate_response("What is BNSS?", &[])
            .await
            .unwrap();

        let requests = mock.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].generation, GenerationConfig::CHAT);
        assert_eq!(requests[0].safety.len(), 2);
        assert_eq!(
            requests[0].system_instruction.as_deref(),
            Some("You are NyayAI.")
        );
    }

    #[tokio::test]
    async fn test_normalization_flag() {
        let mock = Arc::new(MockLlmService::new("test-model"));
        mock.queue_text("*  one\n*two");
        mock.queue_text("*  one\n*two");

        let on = client(&mock, ReplayMode::UserOnly, true)
            .generate_response("q", &[])
            .await
            .unwrap();
        let off = client(&mock, ReplayMode::UserOnly, false)
            .generate_response("q", &[])
            .await
            .unwrap();

        assert_eq!(on, "* one\n* two");
        assert_eq!(off, "*  one\n*two");
    }

    #[tokio::test]
    async fn test_failure_during_replay_is_typed() {
        let mock = Arc::new(MockLlmService::new("test-model"));
        mock.queue_error(LlmError::auth("Authentication failed: API key not valid"));

        let err = client(&mock, ReplayMode::UserOnly, true)
            .generate_response("D", &abc_history())
            .await
            .unwrap_err();

        assert_eq!(err.kind, LlmErrorKind::Auth);
        assert_eq!(
            err.to_string(),
            "Failed to generate response: Authentication failed: API key not valid"
        );
        // Replay stops at the first failure
        assert_eq!(mock.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_answer_is_failure() {
        let mock = Arc::new(MockLlmService::new("test-model"));
        mock.queue_text("   ");

        let err = client(&mock, ReplayMode::UserOnly, true)
            .generate_response("q", &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::Unknown);
    }
}
