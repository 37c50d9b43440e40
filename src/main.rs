mod bot;

use anyhow::Result;

use smart_breakout_bot::config::Config;
use smart_breakout_bot::exchange::binance::BinanceClient;
use smart_breakout_bot::logging;
use smart_breakout_bot::notify::{Notifier, TelegramNotifier};

use crate::bot::BreakoutBot;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::load(Config::settings_path())?;
    logging::init(&cfg)?;
    cfg.log_warnings();

    let once = std::env::args().skip(1).any(|a| a == "--once");

    let market = Box::new(BinanceClient::new(&cfg));
    let notifier = TelegramNotifier::from_config(&cfg.telegram)
        .map(|n| Box::new(n) as Box<dyn Notifier>);

    let mut bot = BreakoutBot::new(cfg, market, notifier)?;
    bot.run(once).await?;

    Ok(())
}
