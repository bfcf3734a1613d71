//! Pure state transition function
//!
//! Given the same state and event this always produces the same outcome and
//! performs no I/O. The runtime applies the returned effects.

use super::{Effect, Event, RequestState};
use crate::conversation::Sender;
use thiserror::Error;

/// Content shown in place of an answer whenever the exchange fails
pub const RESPONSE_ERROR_MESSAGE: &str =
    "Sorry, I encountered an error processing your request. Please try again.";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: RequestState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: RequestState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A response is still being generated")]
    Busy,
    #[error("Message text is empty")]
    EmptyMessage,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(state: &RequestState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // One outstanding request at a time
        (RequestState::AwaitingResponse { .. }, Event::UserSubmit { .. }) => {
            Err(TransitionError::Busy)
        }

        (
            _,
            Event::UserSubmit {
                user,
                placeholder,
                history,
            },
        ) => {
            if user.content.trim().is_empty() {
                return Err(TransitionError::EmptyMessage);
            }
            if user.sender != Sender::User || !placeholder.pending {
                return Err(TransitionError::InvalidTransition(
                    "submit requires a user entry and a pending placeholder".to_string(),
                ));
            }

            let pending_id = placeholder.id.clone();
            let prompt = user.content.clone();
            Ok(TransitionResult::new(RequestState::AwaitingResponse {
                pending_id: pending_id.clone(),
            })
            .with_effect(Effect::AppendMessages {
                messages: vec![user, placeholder],
            })
            .with_effect(Effect::NotifyStateChange)
            .with_effect(Effect::RequestResponse {
                message_id: pending_id,
                prompt,
                history,
            }))
        }

        (
            RequestState::AwaitingResponse { pending_id },
            Event::ResponseReceived { message_id, text },
        ) => {
            check_pending(pending_id, &message_id)?;
            Ok(TransitionResult::new(RequestState::Resolved {
                message_id: message_id.clone(),
            })
            .with_effect(Effect::ResolvePending {
                message_id,
                content: text,
            })
            .with_effect(Effect::NotifyStateChange))
        }

        (RequestState::AwaitingResponse { pending_id }, Event::ResponseFailed { message_id }) => {
            check_pending(pending_id, &message_id)?;
            Ok(TransitionResult::new(RequestState::Failed {
                message_id: message_id.clone(),
            })
            .with_effect(Effect::ResolvePending {
                message_id,
                content: RESPONSE_ERROR_MESSAGE.to_string(),
            })
            .with_effect(Effect::NotifyStateChange))
        }

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {} on {event:?}",
            state.name()
        ))),
    }
}

fn check_pending(pending_id: &str, message_id: &str) -> Result<(), TransitionError> {
    if pending_id == message_id {
        Ok(())
    } else {
        Err(TransitionError::InvalidTransition(format!(
            "Response for {message_id} while awaiting {pending_id}"
        )))
    }
}
