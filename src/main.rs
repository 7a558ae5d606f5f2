use dotenvy::dotenv;
use home_guard_bot::bot;
use home_guard_bot::config::Settings;
use home_guard_bot::logging::{self, Redactor};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    // Redaction has to be ready before the first log line
    let redactor = Redactor::new().map_err(|e| {
        eprintln!("Failed to compile redaction patterns: {e}");
        e
    })?;

    // Settings come first so DEBUG_MODE can pick the log filter
    let settings = Settings::new();
    logging::init(redactor, settings.as_ref().is_ok_and(|s| s.debug_mode));

    info!("Starting Home Guard bot...");

    let settings = match settings {
        Ok(s) => {
            info!(
                owner_id = s.owner_id,
                pir_pin = s.pir_pin,
                period_secs = s.detection_period().as_secs(),
                debug_mode = s.debug_mode,
                "Configuration loaded successfully."
            );
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = bot::run_bot(settings).await {
        error!("Bot stopped with error: {e:#}");
        std::process::exit(1);
    }

    info!("Bye.");
    Ok(())
}
