//! Locally held media blobs with scoped lifetimes
//!
//! Every blob is owned by exactly one `MediaHandle`. Dropping the handle
//! releases the blob, so a preview that is removed or replaced can never
//! leak its bytes.

use crate::conversation::MediaAttachment;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use thiserror::Error;

/// Locator prefix for blobs served from the registry
const LOCATOR_PREFIX: &str = "blob:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a MIME type; anything but image/* and video/* is unsupported
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        if essence.starts_with("image/") {
            Some(MediaKind::Image)
        } else if essence.starts_with("video/") {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("Unsupported media type: {0}")]
    Unsupported(String),
    #[error("Expected a video, got {0}")]
    NotVideo(String),
    #[error("Attachment not found: {0}")]
    NotFound(String),
}

/// A registered blob
#[derive(Debug, Clone)]
pub struct MediaBlob {
    pub content_type: String,
    pub file_name: Option<String>,
    pub bytes: Arc<[u8]>,
}

type BlobMap = Mutex<HashMap<String, MediaBlob>>;

/// Registry of live blobs, addressable by locator
#[derive(Clone, Default)]
pub struct MediaRegistry {
    blobs: Arc<BlobMap>,
}

impl MediaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a blob and return the handle that owns it
    pub fn acquire(
        &self,
        file_name: Option<&str>,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<MediaHandle, MediaError> {
        let kind = MediaKind::from_content_type(content_type)
            .ok_or_else(|| MediaError::Unsupported(content_type.to_string()))?;

        let locator = format!("{LOCATOR_PREFIX}{}", uuid::Uuid::new_v4());
        let blob = MediaBlob {
            content_type: content_type.to_string(),
            file_name: file_name.map(str::to_string),
            bytes: bytes.into(),
        };

        self.lock().insert(locator.clone(), blob);
        tracing::debug!(locator = %locator, kind = ?kind, "Acquired media");

        Ok(MediaHandle {
            locator,
            kind,
            blobs: Arc::downgrade(&self.blobs),
        })
    }

    pub fn get(&self, locator: &str) -> Option<MediaBlob> {
        self.lock().get(locator).cloned()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, MediaBlob>> {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owning handle to a registered blob; releases it on drop
#[derive(Debug)]
pub struct MediaHandle {
    locator: String,
    kind: MediaKind,
    blobs: Weak<BlobMap>,
}

impl MediaHandle {
    #[cfg(test)]
    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn attachment(&self) -> MediaAttachment {
        MediaAttachment {
            kind: self.kind,
            locator: self.locator.clone(),
        }
    }
}

impl Drop for MediaHandle {
    fn drop(&mut self) {
        if let Some(blobs) = self.blobs.upgrade() {
            blobs
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&self.locator);
            tracing::debug!(locator = %self.locator, "Released media");
        }
    }
}

/// Attachment previews staged for the next message
#[derive(Debug, Default)]
pub struct AttachmentTray {
    previews: Vec<MediaHandle>,
}

impl AttachmentTray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, handle: MediaHandle) {
        self.previews.push(handle);
    }

    /// Remove and release a preview
    pub fn remove(&mut self, locator: &str) -> bool {
        let before = self.previews.len();
        self.previews.retain(|h| h.locator != locator);
        before != self.previews.len()
    }

    /// Attachments for the given locators, in the requested order, without
    /// taking them out of the tray
    pub fn resolve(&self, locators: &[String]) -> Result<Vec<MediaAttachment>, MediaError> {
        locators
            .iter()
            .map(|locator| {
                self.previews
                    .iter()
                    .find(|h| &h.locator == locator)
                    .map(MediaHandle::attachment)
                    .ok_or_else(|| MediaError::NotFound(locator.clone()))
            })
            .collect()
    }

    /// Move the given previews out of the tray
    pub fn take(&mut self, locators: &[String]) -> Vec<MediaHandle> {
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.previews)
            .into_iter()
            .partition(|h| locators.contains(&h.locator));
        self.previews = kept;
        taken
    }

    pub fn attachments(&self) -> Vec<MediaAttachment> {
        self.previews.iter().map(MediaHandle::attachment).collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.previews.len()
    }
}

/// The single video loaded into the analysis tab
#[derive(Debug, Default)]
pub struct VideoSlot {
    current: Option<MediaHandle>,
}

impl VideoSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a video, releasing whatever was loaded before
    pub fn set(&mut self, handle: MediaHandle) -> Result<(), MediaError> {
        if handle.kind != MediaKind::Video {
            return Err(MediaError::NotVideo(format!("{:?}", handle.kind).to_lowercase()));
        }
        self.current = Some(handle);
        Ok(())
    }

    /// Release the loaded video; returns whether one was loaded
    pub fn clear(&mut self) -> bool {
        self.current.take().is_some()
    }

    pub fn current(&self) -> Option<&MediaHandle> {
        self.current.as_ref()
    }
}
