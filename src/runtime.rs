//! Runtime for the dashboard conversation
//!
//! Owns the store and request state behind one lock, runs events through the
//! pure state machine and executes the resulting effects. The lock is not
//! held while the model works, so a submit arriving meanwhile sees the
//! outstanding request and is dropped.

#[cfg(test)]
pub mod testing;

use crate::conversation::{ConversationStore, MediaAttachment, Message, MessagePatch};
use crate::exchange::{ExchangeClient, ResponseGenerator};
use crate::llm::ChatTurn;
use crate::media::{AttachmentTray, MediaBlob, MediaError, MediaKind, MediaRegistry, VideoSlot};
use crate::state_machine::{transition, Effect, Event, RequestState, TransitionError};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};

/// Type alias for production runtime with concrete implementations
pub type ProductionRuntime = ConversationRuntime<ExchangeClient>;

const BROADCAST_CAPACITY: usize = 128;

/// Events sent to SSE clients
#[derive(Debug, Clone)]
pub enum SseEvent {
    Init {
        messages: Vec<Message>,
        state: RequestState,
    },
    MessageAppended {
        message: Message,
    },
    MessagePatched {
        message: Message,
    },
    StateChange {
        state: RequestState,
    },
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Rejected(#[from] TransitionError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error("No video loaded for analysis")]
    NoVideo,
}

impl SubmitError {
    /// Submissions the dashboard silently ignores: blank text, or a request
    /// already outstanding
    pub fn is_ignored(&self) -> bool {
        matches!(
            self,
            SubmitError::Rejected(TransitionError::Busy | TransitionError::EmptyMessage)
        )
    }
}

/// A submission accepted by the state machine, waiting on the model
#[derive(Debug)]
pub struct PendingRequest {
    pub message_id: String,
    prompt: String,
    history: Vec<ChatTurn>,
}

/// Point-in-time view of the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct ChatSnapshot {
    pub messages: Vec<Message>,
    pub state: RequestState,
    pub attachments: Vec<MediaAttachment>,
    pub video: Option<MediaAttachment>,
}

struct Dashboard {
    store: ConversationStore,
    state: RequestState,
    tray: AttachmentTray,
    video: VideoSlot,
}

pub struct ConversationRuntime<G> {
    dashboard: Mutex<Dashboard>,
    generator: G,
    media: MediaRegistry,
    broadcast_tx: broadcast::Sender<SseEvent>,
}

impl<G: ResponseGenerator> ConversationRuntime<G> {
    pub fn new(generator: G, greeting: &str) -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            dashboard: Mutex::new(Dashboard {
                store: ConversationStore::with_greeting(greeting),
                state: RequestState::Idle,
                tray: AttachmentTray::new(),
                video: VideoSlot::new(),
            }),
            generator,
            media: MediaRegistry::new(),
            broadcast_tx,
        }
    }

    pub async fn snapshot(&self) -> ChatSnapshot {
        let dashboard = self.dashboard.lock().await;
        ChatSnapshot {
            messages: dashboard.store.messages().to_vec(),
            state: dashboard.state.clone(),
            attachments: dashboard.tray.attachments(),
            video: dashboard.video.current().map(|h| h.attachment()),
        }
    }

    /// Subscribe and capture the `init` event under the same lock, so no
    /// update falls between the snapshot and the stream
    pub async fn subscribe_with_init(&self) -> (SseEvent, broadcast::Receiver<SseEvent>) {
        let dashboard = self.dashboard.lock().await;
        let rx = self.broadcast_tx.subscribe();
        let init = SseEvent::Init {
            messages: dashboard.store.messages().to_vec(),
            state: dashboard.state.clone(),
        };
        (init, rx)
    }

    /// Append the user entry and placeholder for `text`.
    ///
    /// The history handed to the model is captured before anything is
    /// appended. Attachments move from the tray into the store only once the
    /// submission is accepted.
    pub async fn begin(
        &self,
        text: &str,
        attachments: &[String],
    ) -> Result<PendingRequest, SubmitError> {
        let mut dashboard = self.dashboard.lock().await;
        self.begin_locked(&mut dashboard, text, attachments)
    }

    fn begin_locked(
        &self,
        dashboard: &mut Dashboard,
        text: &str,
        attachments: &[String],
    ) -> Result<PendingRequest, SubmitError> {
        if dashboard.state.is_awaiting() {
            tracing::debug!("Ignoring submit while a response is outstanding");
            return Err(TransitionError::Busy.into());
        }

        let media = dashboard.tray.resolve(attachments)?;
        let history = dashboard.store.history();
        let user = Message::user(dashboard.store.next_id(), text, media);
        let placeholder = Message::placeholder(dashboard.store.next_id());

        let request = self
            .apply(
                dashboard,
                Event::UserSubmit {
                    user,
                    placeholder,
                    history,
                },
            )?
            .ok_or_else(|| {
                TransitionError::InvalidTransition("submit produced no request".to_string())
            })?;

        let handles = dashboard.tray.take(attachments);
        dashboard.store.retain_media(handles);

        tracing::info!(
            message_id = %request.message_id,
            history_turns = request.history.len(),
            attachments = attachments.len(),
            messages = dashboard.store.messages().len(),
            "Submitted message"
        );
        Ok(request)
    }

    /// Run the exchange for an accepted submission and resolve its placeholder
    pub async fn complete(&self, request: PendingRequest) -> Option<Message> {
        let PendingRequest {
            message_id,
            prompt,
            history,
        } = request;

        let event = match self.generator.generate_response(&prompt, &history).await {
            Ok(text) => Event::ResponseReceived {
                message_id: message_id.clone(),
                text,
            },
            Err(e) => {
                tracing::warn!(
                    message_id = %message_id,
                    kind = e.kind.as_str(),
                    error = %e,
                    "Response generation failed"
                );
                Event::ResponseFailed {
                    message_id: message_id.clone(),
                }
            }
        };

        let mut dashboard = self.dashboard.lock().await;
        if let Err(e) = self.apply(&mut dashboard, event) {
            tracing::error!(message_id = %message_id, error = %e, "Failed to resolve response");
        }
        dashboard.store.get(&message_id).cloned()
    }

    /// Submit and wait for the placeholder to resolve
    pub async fn submit(&self, text: &str, attachments: &[String]) -> Result<Message, SubmitError> {
        let request = self.begin(text, attachments).await?;
        let message_id = request.message_id.clone();
        self.complete(request).await.ok_or_else(|| {
            TransitionError::InvalidTransition(format!("{message_id} vanished")).into()
        })
    }

    /// Start the analysis of the loaded video. The video is checked under
    /// the same lock as the submission.
    pub async fn begin_video_analysis(&self, prompt: &str) -> Result<PendingRequest, SubmitError> {
        let mut dashboard = self.dashboard.lock().await;
        if dashboard.video.current().is_none() {
            return Err(SubmitError::NoVideo);
        }
        self.begin_locked(&mut dashboard, prompt, &[])
    }

    /// Stage an image or video preview for the next message
    pub async fn add_attachment(
        &self,
        file_name: Option<&str>,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<MediaAttachment, MediaError> {
        let handle = self.media.acquire(file_name, content_type, bytes)?;
        let attachment = handle.attachment();
        self.dashboard.lock().await.tray.add(handle);
        Ok(attachment)
    }

    /// Remove and release a staged preview
    pub async fn remove_attachment(&self, locator: &str) -> bool {
        self.dashboard.lock().await.tray.remove(locator)
    }

    /// Load the analysis video, releasing the previous one
    pub async fn set_video(
        &self,
        file_name: Option<&str>,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<MediaAttachment, MediaError> {
        if MediaKind::from_content_type(content_type) != Some(MediaKind::Video) {
            return Err(MediaError::NotVideo(content_type.to_string()));
        }
        let handle = self.media.acquire(file_name, content_type, bytes)?;
        let attachment = handle.attachment();
        self.dashboard.lock().await.video.set(handle)?;
        Ok(attachment)
    }

    pub async fn clear_video(&self) -> bool {
        self.dashboard.lock().await.video.clear()
    }

    pub fn media(&self, locator: &str) -> Option<MediaBlob> {
        self.media.get(locator)
    }

    /// Transition and execute effects; returns the request to run, if any
    fn apply(
        &self,
        dashboard: &mut Dashboard,
        event: Event,
    ) -> Result<Option<PendingRequest>, TransitionError> {
        let result = transition(&dashboard.state, event)?;
        dashboard.state = result.new_state;

        let mut request = None;
        for effect in result.effects {
            match effect {
                Effect::AppendMessages { messages } => {
                    for message in &messages {
                        self.broadcast(SseEvent::MessageAppended {
                            message: message.clone(),
                        });
                    }
                    dashboard.store.append(messages);
                }
                Effect::RequestResponse {
                    message_id,
                    prompt,
                    history,
                } => {
                    request = Some(PendingRequest {
                        message_id,
                        prompt,
                        history,
                    });
                }
                Effect::ResolvePending {
                    message_id,
                    content,
                } => match dashboard.store.patch(&message_id, MessagePatch::resolve(content)) {
                    Ok(message) => self.broadcast(SseEvent::MessagePatched {
                        message: message.clone(),
                    }),
                    Err(e) => tracing::error!(error = %e, "Failed to patch placeholder"),
                },
                Effect::NotifyStateChange => self.broadcast(SseEvent::StateChange {
                    state: dashboard.state.clone(),
                }),
            }
        }
        Ok(request)
    }

    fn broadcast(&self, event: SseEvent) {
        // No subscribers is fine
        let _ = self.broadcast_tx.send(event);
    }
}
