//! In-memory fakes for unit tests.
//!
//! Mocks check call expectations; these fakes record what happened so
//! tests can assert on sequences (sent messages, capture counts) instead.

use crate::dispatch::MenuModel;
use crate::hardware::{Camera, HardwareError, MotionSensor};
use crate::transport::{Messenger, TransportError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Camera that writes nothing and reports a fixed path
pub struct FakeCamera {
    fail: bool,
    captures: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for FakeCamera {
    fn default() -> Self {
        Self {
            fail: false,
            captures: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

impl FakeCamera {
    /// A camera whose every capture fails
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Number of capture calls so far
    #[must_use]
    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping captures seen
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Camera for FakeCamera {
    async fn capture(&self) -> Result<PathBuf, HardwareError> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        // Give a concurrent caller the chance to overlap
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail {
            return Err(HardwareError::CameraExit {
                status: "exit status: 1".to_string(),
                stderr: "no cameras available".to_string(),
            });
        }
        Ok(PathBuf::from("media/tmp_photo.jpg"))
    }
}

/// Sensor with a constant reading
pub struct FakeSensor {
    motion: bool,
}

impl FakeSensor {
    /// Always report `motion`
    #[must_use]
    pub const fn always(motion: bool) -> Self {
        Self { motion }
    }
}

impl MotionSensor for FakeSensor {
    fn poll(&self) -> Result<bool, HardwareError> {
        Ok(self.motion)
    }
}

/// One outbound message as seen by [`RecordingMessenger`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    /// Photo upload to a chat
    Photo(i64),
    /// Menu with its prompt text
    Menu(i64, String),
    /// Plain text
    Text(i64, String),
}

/// Messenger that records every send and never fails
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<Sent>>,
    captions: Mutex<Vec<(i64, Option<String>)>>,
}

impl RecordingMessenger {
    /// All messages in send order
    #[must_use]
    pub fn sent(&self) -> Vec<Sent> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Photo uploads with their captions
    #[must_use]
    pub fn photos(&self) -> Vec<(i64, Option<String>)> {
        self.captions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, message: Sent) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), TransportError> {
        self.push(Sent::Text(chat_id, text.to_string()));
        Ok(())
    }

    async fn send_menu(
        &self,
        chat_id: i64,
        text: &str,
        _menu: &MenuModel,
    ) -> Result<(), TransportError> {
        self.push(Sent::Menu(chat_id, text.to_string()));
        Ok(())
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        _photo: &Path,
        caption: Option<String>,
    ) -> Result<(), TransportError> {
        self.push(Sent::Photo(chat_id));
        self.captions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((chat_id, caption));
        Ok(())
    }
}
