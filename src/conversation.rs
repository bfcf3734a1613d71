//! Conversation state store
//!
//! An ordered, append-only message log. The only in-place mutation is the
//! patch that resolves a pending assistant placeholder.

use crate::llm::ChatTurn;
use crate::media::{MediaHandle, MediaKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

/// Media reference displayed alongside a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub kind: MediaKind,
    pub locator: String,
}

/// One entry in the conversation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<MediaAttachment>,
    #[serde(default)]
    pub pending: bool,
}

impl Message {
    pub fn user(
        id: impl Into<String>,
        content: impl Into<String>,
        media: Vec<MediaAttachment>,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            sender: Sender::User,
            timestamp: Utc::now(),
            media,
            pending: false,
        }
    }

    pub fn assistant(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            sender: Sender::Assistant,
            timestamp: Utc::now(),
            media: Vec::new(),
            pending: false,
        }
    }

    /// Assistant placeholder awaiting a response
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self {
            pending: true,
            ..Self::assistant(id, String::new())
        }
    }

    /// Wire-shape turn for the model, `None` while pending
    pub fn to_turn(&self) -> Option<ChatTurn> {
        if self.pending {
            return None;
        }
        Some(match self.sender {
            Sender::User => ChatTurn::user(self.content.clone()),
            Sender::Assistant => ChatTurn::model(self.content.clone()),
        })
    }
}

/// Fields merged into an existing message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagePatch {
    pub content: Option<String>,
    pub pending: Option<bool>,
}

impl MessagePatch {
    /// Replace the content and clear the pending flag
    pub fn resolve(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            pending: Some(false),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Message not found: {0}")]
    MessageNotFound(String),
    #[error("Message {0} is resolved and cannot become pending again")]
    PendingReopened(String),
}

pub struct ConversationStore {
    messages: Vec<Message>,
    /// Media referenced by messages, released when the store is dropped
    retained_media: Vec<MediaHandle>,
    last_id: i64,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            retained_media: Vec::new(),
            last_id: 0,
        }
    }

    /// Store seeded with an assistant greeting
    pub fn with_greeting(greeting: &str) -> Self {
        let mut store = Self::new();
        let id = store.next_id();
        store.append([Message::assistant(id, greeting)]);
        store
    }

    /// Allocate a timestamp-derived id, strictly greater than the previous one
    pub fn next_id(&mut self) -> String {
        let now = Utc::now().timestamp_millis();
        self.last_id = now.max(self.last_id + 1);
        self.last_id.to_string()
    }

    pub fn append(&mut self, entries: impl IntoIterator<Item = Message>) {
        self.messages.extend(entries);
    }

    /// Keep media handles alive for as long as the conversation exists
    pub fn retain_media(&mut self, handles: impl IntoIterator<Item = MediaHandle>) {
        self.retained_media.extend(handles);
    }

    /// Merge `patch` into the message with `id`.
    ///
    /// An unknown id leaves the store unchanged and is reported as an error.
    pub fn patch(&mut self, id: &str, patch: MessagePatch) -> Result<&Message, StoreError> {
        let message = self
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| StoreError::MessageNotFound(id.to_string()))?;

        if patch.pending == Some(true) && !message.pending {
            return Err(StoreError::PendingReopened(id.to_string()));
        }

        if let Some(content) = patch.content {
            message.content = content;
        }
        if let Some(pending) = patch.pending {
            message.pending = pending;
        }
        Ok(message)
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[cfg(test)]
    pub fn pending_count(&self) -> usize {
        self.messages.iter().filter(|m| m.pending).count()
    }

    /// Prior turns for the model, skipping pending placeholders
    pub fn history(&self) -> Vec<ChatTurn> {
        self.messages.iter().filter_map(Message::to_turn).collect()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}
