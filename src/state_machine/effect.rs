//! Effects produced by state transitions

use crate::conversation::Message;
use crate::llm::ChatTurn;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append entries to the conversation store
    AppendMessages { messages: Vec<Message> },

    /// Ask the model for a reply to `prompt`
    RequestResponse {
        message_id: String,
        prompt: String,
        history: Vec<ChatTurn>,
    },

    /// Replace the placeholder content and clear its pending flag
    ResolvePending { message_id: String, content: String },

    /// Notify connected clients of the new state
    NotifyStateChange,
}
