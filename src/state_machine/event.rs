//! Events that drive a request through its states

use crate::conversation::Message;
use crate::llm::ChatTurn;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    /// User submitted text; carries the entries to append and the history
    /// snapshot taken before they were appended
    UserSubmit {
        user: Message,
        placeholder: Message,
        history: Vec<ChatTurn>,
    },

    ResponseReceived {
        message_id: String,
        text: String,
    },

    /// The exchange failed; the detail has already been logged
    ResponseFailed {
        message_id: String,
    },
}
