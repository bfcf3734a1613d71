//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use crate::exchange::{ResponseGenerationError, ResponseGenerator};
use crate::llm::{ChatTurn, LlmError, LlmRequest, LlmResponse, LlmService};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

// ============================================================================
// Mock LLM Service
// ============================================================================

/// Mock model endpoint that returns queued responses
pub struct MockLlmService {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmService {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response with the given text
    pub fn queue_text(&self, text: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(LlmResponse::from_text(text)));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Mock Response Generator
// ============================================================================

/// Mock exchange that returns queued replies, optionally held behind a gate
#[derive(Default)]
pub struct MockGenerator {
    replies: Mutex<VecDeque<Result<String, ResponseGenerationError>>>,
    calls: Mutex<Vec<(String, Vec<ChatTurn>)>>,
    gated: bool,
    /// Notified when a request starts (for test synchronization)
    pub request_started: Arc<Notify>,
    /// Lets a gated request finish
    pub release: Arc<Notify>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every request until `release` is notified
    pub fn with_gate(mut self) -> Self {
        self.gated = true;
        self
    }

    pub fn queue_text(&self, text: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(text.into()));
    }

    pub fn queue_error(&self, error: ResponseGenerationError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    /// Prompt and history of every call, in order
    pub fn calls(&self) -> Vec<(String, Vec<ChatTurn>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResponseGenerator for MockGenerator {
    async fn generate_response(
        &self,
        prompt: &str,
        history: &[ChatTurn],
    ) -> Result<String, ResponseGenerationError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), history.to_vec()));
        self.request_started.notify_one();
        if self.gated {
            self.release.notified().await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock reply queued").into()))
    }
}
