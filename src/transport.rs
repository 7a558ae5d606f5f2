//! Outbound messaging interface.
//!
//! The dispatcher and the detection job talk to the chat only through
//! [`Messenger`]; the Telegram implementation lives in [`crate::bot`].

use crate::dispatch::MenuModel;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors raised while delivering a message
#[derive(Error, Debug)]
pub enum TransportError {
    /// The messaging API rejected or failed the request
    #[error("Send error: {0}")]
    Send(String),
}

/// Outbound side of the chat transport
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a plain text message
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), TransportError>;

    /// Send a text message with the interactive menu attached
    async fn send_menu(
        &self,
        chat_id: i64,
        text: &str,
        menu: &MenuModel,
    ) -> Result<(), TransportError>;

    /// Upload a photo file
    async fn send_photo(
        &self,
        chat_id: i64,
        photo: &Path,
        caption: Option<String>,
    ) -> Result<(), TransportError>;
}
