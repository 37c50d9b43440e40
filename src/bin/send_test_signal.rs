//! Sends a fixed test message to the configured Telegram channel.

use anyhow::{bail, Result};
use tracing::info;

use smart_breakout_bot::config::Config;
use smart_breakout_bot::logging;
use smart_breakout_bot::notify::{test_message, Notifier, TelegramNotifier};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::load(Config::settings_path())?;
    logging::init(&cfg)?;
    cfg.log_warnings();

    let Some(notifier) = TelegramNotifier::from_config(&cfg.telegram) else {
        bail!("Telegram is not configured: set bot_token and channel_username");
    };

    info!("Sending test signal to {}", notifier.chat_id());
    notifier.send(&test_message()).await?;
    info!("Test signal sent");
    Ok(())
}
