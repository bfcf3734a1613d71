//! API request and response types

use crate::conversation::{MediaAttachment, Message};
use crate::media::MediaKind;
use crate::state_machine::RequestState;
use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
    /// Locators of staged previews to attach
    #[serde(default)]
    pub attachments: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SectionRequest {
    pub section: String,
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub index: usize,
}

/// Response for chat actions
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl ChatResponse {
    pub fn accepted(message_id: String) -> Self {
        Self {
            accepted: true,
            message_id: Some(message_id),
        }
    }

    pub fn ignored() -> Self {
        Self {
            accepted: false,
            message_id: None,
        }
    }
}

/// Response with the conversation and staged media
#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
    pub state: RequestState,
    pub awaiting_response: bool,
    pub attachments: Vec<MediaAttachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<MediaAttachment>,
}

/// Response for an uploaded blob
#[derive(Debug, Serialize)]
pub struct AttachmentResponse {
    pub locator: String,
    pub kind: MediaKind,
}

impl From<MediaAttachment> for AttachmentResponse {
    fn from(attachment: MediaAttachment) -> Self {
        Self {
            locator: attachment.locator,
            kind: attachment.kind,
        }
    }
}

/// Response for removal actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
