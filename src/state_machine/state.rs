//! Request state types

use serde::{Deserialize, Serialize};

/// Lifecycle of the most recent request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestState {
    /// No request has been made yet
    #[default]
    Idle,

    /// Placeholder appended, waiting on the model
    AwaitingResponse { pending_id: String },

    /// Placeholder replaced with the model's answer
    Resolved { message_id: String },

    /// Placeholder replaced with the generic error message
    Failed { message_id: String },
}

impl RequestState {
    /// Whether a request is outstanding; new submissions are dropped while true
    pub fn is_awaiting(&self) -> bool {
        matches!(self, RequestState::AwaitingResponse { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            RequestState::Idle => "idle",
            RequestState::AwaitingResponse { .. } => "awaiting_response",
            RequestState::Resolved { .. } => "resolved",
            RequestState::Failed { .. } => "failed",
        }
    }
}
