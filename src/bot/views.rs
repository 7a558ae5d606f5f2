//! Telegram rendering of the menu and the command list.

use crate::dispatch::{ActionRegistry, MenuModel};
use teloxide::types::{BotCommand, InlineKeyboardButton, InlineKeyboardMarkup};

/// Inline keyboard for the menu, one button per row
#[must_use]
pub fn menu_keyboard(menu: &MenuModel) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(
        menu.buttons()
            .iter()
            .map(|b| vec![InlineKeyboardButton::callback(b.label.clone(), b.token.clone())]),
    )
}

/// Command hints published to the Telegram client, sorted by name
#[must_use]
pub fn bot_commands(registry: &ActionRegistry) -> Vec<BotCommand> {
    registry
        .commands()
        .into_iter()
        .map(|(name, route)| BotCommand::new(name, route.action.description()))
        .collect()
}
