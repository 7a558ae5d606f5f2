use crate::bot::views::menu_keyboard;
use crate::dispatch::MenuModel;
use crate::transport::{Messenger, TransportError};
use async_trait::async_trait;
use std::path::Path;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile};
use tracing::warn;

/// Messenger backed by the Telegram Bot API
#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    /// Wrap a bot client
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn send_error(e: teloxide::RequestError) -> TransportError {
    TransportError::Send(e.to_string())
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), TransportError> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .map_err(send_error)?;
        Ok(())
    }

    async fn send_menu(
        &self,
        chat_id: i64,
        text: &str,
        menu: &MenuModel,
    ) -> Result<(), TransportError> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .reply_markup(menu_keyboard(menu))
            .await
            .map_err(send_error)?;
        Ok(())
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        photo: &Path,
        caption: Option<String>,
    ) -> Result<(), TransportError> {
        let mut request = self
            .bot
            .send_photo(ChatId(chat_id), InputFile::file(photo.to_path_buf()));
        if let Some(caption) = caption {
            request = request.caption(caption);
        }

        if let Err(e) = request.await {
            warn!(chat_id, photo = %photo.display(), error = %e, "Failed to upload photo");
            return Err(send_error(e));
        }
        Ok(())
    }
}
