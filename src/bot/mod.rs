//! Telegram side of the bot: update routing, the [`Messenger`] adapter and
//! the inline keyboard.
//!
//! [`Messenger`]: crate::transport::Messenger

/// Update handlers and the long-polling loop
pub mod runner;
/// Bot API implementation of the outbound messaging interface
pub mod telegram;
/// Keyboards and command hints
pub mod views;

pub use runner::run_bot;
pub use telegram::TelegramMessenger;
