//! Capture-and-send, shared by direct commands and motion alarms.

use crate::error::ActionError;
use crate::hardware::Camera;
use crate::transport::Messenger;
use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Why a picture is being taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureReason {
    /// Requested by the owner
    Requested,
    /// Triggered by the motion sensor
    Motion,
}

impl CaptureReason {
    fn caption(self) -> Option<String> {
        match self {
            Self::Requested => None,
            Self::Motion => Some(format!(
                "🚨 Motion detected at {}",
                Local::now().format("%Y-%m-%d %H:%M:%S")
            )),
        }
    }
}

/// Takes a picture and delivers it to a chat.
///
/// The camera is single-owner hardware and the photo file is reused between
/// captures, so the whole capture + upload sequence runs under one lock.
pub struct Snapshotter {
    camera: Arc<dyn Camera>,
    messenger: Arc<dyn Messenger>,
    lock: Mutex<()>,
}

impl Snapshotter {
    /// Create a snapshotter over the given collaborators
    #[must_use]
    pub fn new(camera: Arc<dyn Camera>, messenger: Arc<dyn Messenger>) -> Self {
        Self {
            camera,
            messenger,
            lock: Mutex::new(()),
        }
    }

    /// Capture a picture and send it to `chat_id`.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::Capture` if the camera fails (nothing is sent),
    /// or `ActionError::Transport` if the upload fails.
    pub async fn capture_and_send(
        &self,
        chat_id: i64,
        reason: CaptureReason,
    ) -> Result<PathBuf, ActionError> {
        let _guard = self.lock.lock().await;

        let photo = self.camera.capture().await?;
        self.messenger
            .send_photo(chat_id, &photo, reason.caption())
            .await?;

        info!(chat_id, ?reason, "Photo sent");
        Ok(photo)
    }
}
