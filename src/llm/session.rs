//! Multi-turn chat session over a stateless `generateContent` service
//!
//! The endpoint keeps no server-side state, so the session carries the
//! accumulated turns and resends them with every message.

use super::types::{ChatTurn, GenerationConfig, LlmRequest, LlmResponse, SafetySetting};
use super::{LlmError, LlmService};

pub struct ChatSession<'a> {
    service: &'a dyn LlmService,
    system_instruction: Option<String>,
    generation: GenerationConfig,
    safety: Vec<SafetySetting>,
    history: Vec<ChatTurn>,
}

impl<'a> ChatSession<'a> {
    pub fn new(
        service: &'a dyn LlmService,
        system_instruction: Option<String>,
        generation: GenerationConfig,
        safety: Vec<SafetySetting>,
    ) -> Self {
        Self {
            service,
            system_instruction,
            generation,
            safety,
            history: Vec::new(),
        }
    }

    /// Seed prior turns into the session context without a round trip
    pub fn seed(&mut self, turns: impl IntoIterator<Item = ChatTurn>) {
        self.history.extend(turns);
    }

    /// Send one user message and record the exchange on success.
    ///
    /// A failed round trip leaves the session history untouched.
    pub async fn send_message(&mut self, text: &str) -> Result<LlmResponse, LlmError> {
        let mut turns = self.history.clone();
        turns.push(ChatTurn::user(text));

        let request = LlmRequest {
            system_instruction: self.system_instruction.clone(),
            turns,
            generation: self.generation,
            safety: self.safety.clone(),
        };

        let response = self.service.complete(&request).await?;

        self.history = request.turns;
        self.history.push(ChatTurn::model(response.text.clone()));
        Ok(response)
    }

    #[cfg(test)]
    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::chat_safety_settings;
    use crate::llm::TurnRole;
    use crate::runtime::testing::MockLlmService;

    fn session(service: &MockLlmService) -> ChatSession<'_> {
        ChatSession::new(
            service,
            Some("system".to_string()),
            GenerationConfig::CHAT,
            chat_safety_settings(),
        )
    }

    #[tokio::test]
    async fn test_send_accumulates_history() {
        let mock = MockLlmService::new("test-model");
        mock.queue_text("first answer");
        mock.queue_text("second answer");

        let mut chat = session(&mock);
        chat.send_message("first").await.unwrap();
        chat.send_message("second").await.unwrap();

        let requests = mock.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].turns, vec![ChatTurn::user("first")]);
        assert_eq!(
            requests[1].turns,
            vec![
                ChatTurn::user("first"),
                ChatTurn::model("first answer"),
                ChatTurn::user("second"),
            ]
        );
        assert_eq!(chat.history().len(), 4);
        assert_eq!(requests[1].system_instruction.as_deref(), Some("system"));
    }

    #[tokio::test]
    async fn test_failed_send_leaves_history() {
        let mock = MockLlmService::new("test-model");
        mock.queue_error(LlmError::network("down"));

        let mut chat = session(&mock);
        chat.seed([ChatTurn::user("a"), ChatTurn::model("b")]);
        assert!(chat.send_message("c").await.is_err());
        assert_eq!(chat.history().len(), 2);
        assert_eq!(chat.history()[1].role, TurnRole::Model);
    }
}
