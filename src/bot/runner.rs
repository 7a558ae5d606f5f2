use crate::bot::telegram::TelegramMessenger;
use crate::bot::views::bot_commands;
use crate::config::Settings;
use crate::context::AppContext;
use crate::dispatch::{Dispatch, InboundEvent};
use crate::hardware::{PirSensor, RpiCamera};
use anyhow::{Context, Result};
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, Me, User};
use teloxide::utils::command::parse_command;
use tracing::{debug, error, info, warn};

/// Build the Bot API client, honoring `proxy_url` when set
///
/// # Errors
///
/// Returns an error if the proxy URL is invalid or the HTTP client cannot
/// be built.
pub fn build_bot(settings: &Settings) -> Result<Bot> {
    let Some(proxy_url) = settings.proxy_url.as_deref() else {
        return Ok(Bot::new(settings.telegram_token.clone()));
    };

    let proxy = reqwest::Proxy::all(proxy_url).context("Invalid proxy URL")?;
    let client = teloxide::net::default_reqwest_settings()
        .proxy(proxy)
        .build()
        .context("Failed to build proxied HTTP client")?;

    info!("Using proxy {proxy_url} for the Bot API");
    Ok(Bot::with_client(settings.telegram_token.clone(), client))
}

/// Run the bot until Ctrl-C.
///
/// Claims the PIR pin and the camera, enables motion detection, publishes
/// the command list and long-polls for updates. On shutdown the detection
/// job is awaited to completion so the GPIO interrupt is released before
/// returning.
///
/// # Errors
///
/// Returns an error if the bot client, the hardware or the routing tables
/// cannot be initialized.
pub async fn run_bot(settings: Arc<Settings>) -> Result<()> {
    let bot = build_bot(&settings)?;

    let sensor = Arc::new(
        PirSensor::new(settings.pir_pin)
            .with_context(|| format!("Failed to claim PIR sensor on GPIO {}", settings.pir_pin))?,
    );
    let camera = Arc::new(RpiCamera::from_settings(&settings));
    info!(
        "Hardware ready: PIR on GPIO {}, camera `{} {}`",
        sensor.pin_number(),
        settings.camera_command,
        camera.args().join(" ")
    );

    let messenger = Arc::new(TelegramMessenger::new(bot.clone()));
    let context = AppContext::new(&settings, messenger, sensor, camera)?;

    if let Err(e) = bot
        .set_my_commands(bot_commands(context.dispatcher.registry()))
        .await
    {
        warn!("Failed to publish command list: {e}");
    }

    context.detection.start();
    info!("Bot is running...");

    Dispatcher::builder(bot, setup_handler())
        .dependencies(dptree::deps![context.clone()])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Shutting down...");
    context.detection.shutdown().await;
    // Last owner of the sensor; dropping it clears the GPIO interrupt
    drop(context);
    info!("Hardware released.");
    Ok(())
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handle_callback))
        .branch(
            Update::filter_message()
                .filter(|msg: Message| msg.text().is_some())
                .endpoint(handle_message),
        )
}

fn sender_name(user: &User) -> String {
    user.username
        .clone()
        .unwrap_or_else(|| user.first_name.clone())
}

async fn handle_message(
    msg: Message,
    me: Me,
    ctx: AppContext,
) -> Result<(), teloxide::RequestError> {
    let Some(text) = msg.text() else {
        return respond(());
    };
    let Some((command, _args)) = parse_command(text, me.username()) else {
        debug!("Ignoring non-command message");
        return respond(());
    };

    let event = match msg.from.as_ref() {
        Some(user) => InboundEvent::new(
            user.id.0.cast_signed(),
            sender_name(user),
            msg.chat.id.0,
        ),
        None => InboundEvent::new(msg.chat.id.0, "Unknown", msg.chat.id.0),
    };

    match ctx.dispatcher.handle_command(command, &event).await {
        Ok(Dispatch::Executed(action)) => {
            debug!(command, action = action.name(), "Command handled");
        }
        Ok(outcome) => debug!(command, ?outcome, "Command not executed"),
        Err(e) => error!("Command error: {}", e),
    }
    respond(())
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    ctx: AppContext,
) -> Result<(), teloxide::RequestError> {
    // Stop the client-side spinner before doing anything slow
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        warn!("Failed to answer callback query: {e}");
    }

    let Some(token) = q.data.as_deref() else {
        return respond(());
    };

    let sender_id = q.from.id.0.cast_signed();
    let chat_id = q.message.as_ref().map_or(sender_id, |m| m.chat().id.0);
    let event = InboundEvent::new(sender_id, sender_name(&q.from), chat_id);

    match ctx.dispatcher.handle_callback(token, &event).await {
        Ok(Dispatch::Executed(action)) => {
            debug!(token, action = action.name(), "Callback handled");
        }
        Ok(outcome) => debug!(token, ?outcome, "Callback not executed"),
        Err(e) => error!("Callback error: {}", e),
    }
    respond(())
}
