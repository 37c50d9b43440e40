use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use smart_breakout_bot::config::Config;
use smart_breakout_bot::core::retest::StepOutcome;
use smart_breakout_bot::exchange::Exchange;
use smart_breakout_bot::models::{Candle, Timeframe};
use smart_breakout_bot::notify::Notifier;
use smart_breakout_bot::strategies::{BreakoutRetestStrategy, Signal};
use smart_breakout_bot::trading::SignalDispatcher;

pub struct BreakoutBot {
    config: Config,
    market: Box<dyn Exchange>,
    strategy: BreakoutRetestStrategy,
    dispatcher: SignalDispatcher,

    last_fed: Option<DateTime<Utc>>,
    signals_emitted: usize,
    patterns_expired: usize,
}

impl BreakoutBot {
    pub fn new(
        config: Config,
        market: Box<dyn Exchange>,
        notifier: Option<Box<dyn Notifier>>,
    ) -> Result<Self> {
        info!("{}", "=".repeat(60));
        info!("Smart Breakout bot starting up");
        info!("Mode: {}", config.mode);
        info!("Symbol: {} | Timeframe: {}", config.symbol, config.timeframe);
        info!(
            "Lookback: {} | Retest tolerance: {:.3}% | Max wait: {} candles",
            config.lookback,
            config.retest_tolerance * 100.0,
            config.max_wait_candles
        );
        info!(
            "Stop loss: {:.2}% | R:R 1:2 | Quantity: {} | Shorts: {}",
            config.stop_loss_percent * 100.0,
            config.quantity,
            if config.allow_shorts { "on" } else { "off" }
        );
        if notifier.is_none() {
            info!("Telegram notifications disabled (bot_token or channel_username missing)");
        }
        info!("{}", "=".repeat(60));

        let strategy = BreakoutRetestStrategy::new(config.lookback, config.retest_config())?;
        let dispatcher =
            SignalDispatcher::new(&config.symbol, config.quantity, config.mode, notifier);

        Ok(Self {
            config,
            market,
            strategy,
            dispatcher,
            last_fed: None,
            signals_emitted: 0,
            patterns_expired: 0,
        })
    }

    pub async fn run(&mut self, once: bool) -> Result<()> {
        if once {
            self.poll().await;
            self.print_status();
            return Ok(());
        }

        info!("Bot is now running. Press Ctrl+C to stop.");
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    self.shutdown();
                    return Ok(());
                }
                _ = self.tick() => {}
            }
        }
    }

    async fn tick(&mut self) {
        self.poll().await;
        tokio::time::sleep(tokio::time::Duration::from_secs(self.config.poll_interval_secs)).await;
    }

    /// Fetch, keep closed unseen candles, feed them in order.
    async fn poll(&mut self) {
        let warming_up = self.last_fed.is_none();
        let limit = if warming_up {
            self.config.history_limit
        } else {
            self.config.lookback + 2
        };

        let tf = self.config.timeframe;
        let series = match self.market.fetch_ohlcv(tf, limit).await {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to fetch {} candles: {:#}", tf, e);
                return;
            }
        };

        let fresh = series.closed(tf, Utc::now()).after(self.last_fed);
        if fresh.is_empty() {
            debug!("No new closed candles");
            return;
        }
        if warming_up {
            info!("Warming up on {} historical candles", fresh.len());
        }

        let newest = fresh.last().map(|c| c.timestamp);
        for candle in fresh {
            // Signals confirmed on history are stale by the time we see them.
            let live = !warming_up || Some(candle.timestamp) == newest;
            self.feed(candle, live).await;
        }

        if warming_up && !self.strategy.is_warm() {
            warn!(
                "Not enough history yet: breakouts need {} closed candles",
                self.config.lookback + 1
            );
        }
    }

    async fn feed(&mut self, candle: Candle, live: bool) {
        self.check_gap(&candle);
        let ts = candle.timestamp;
        let close = candle.close;
        self.last_fed = Some(ts);

        let outcome = match self.strategy.on_candle(candle) {
            Ok(o) => o,
            Err(e) => {
                warn!("Rejected candle {}: {}", ts, e);
                return;
            }
        };

        match outcome {
            StepOutcome::Idle => {
                debug!("{} close {:.2}: idle", ts, close);
            }
            StepOutcome::BreakoutDetected(level) => {
                info!(
                    "Breakout {} of {:.2} (close {:.2}), waiting for retest",
                    level.direction, level.price, close
                );
            }
            StepOutcome::RetestTouched { level, touch } => {
                info!("Retest of {:.2} touched at {:.2}", level.price, touch);
            }
            StepOutcome::Waiting {
                phase,
                candles_waited,
            } => {
                debug!(
                    "{}: waited {}/{} candles",
                    phase, candles_waited, self.config.max_wait_candles
                );
            }
            StepOutcome::Invalidated { level, close } => {
                info!(
                    "Pattern invalidated: close {:.2} back through {:.2}",
                    close, level.price
                );
            }
            StepOutcome::Expired { level, phase } => {
                self.patterns_expired += 1;
                info!(
                    "Pattern expired in {} after {} candles (level {:.2})",
                    phase, self.config.max_wait_candles, level.price
                );
            }
            StepOutcome::Confirmed(signal) => {
                if live {
                    self.handle_signal(&signal).await;
                } else {
                    debug!(
                        "Skipping historical {} signal confirmed at {}",
                        signal.direction(),
                        signal.confirmed_at()
                    );
                }
            }
        }
    }

    fn check_gap(&self, candle: &Candle) {
        let Some(prev) = self.last_fed else {
            return;
        };
        let missing = missing_between(prev, candle.timestamp, self.config.timeframe);
        if missing > 0 {
            warn!(
                "Gap in {} feed: {} candle(s) missing between {} and {}",
                self.config.timeframe, missing, prev, candle.timestamp
            );
        }
    }

    async fn handle_signal(&mut self, signal: &Signal) {
        self.signals_emitted += 1;

        info!("{}", "=".repeat(60));
        info!("SIGNAL {} {}", signal.direction(), self.config.symbol);
        info!("  Level: {:.2} ({})", signal.level().price, signal.level().direction);
        info!("  Entry: {:.2}", signal.entry_price());
        info!("  Stop Loss: {:.2}", signal.stop_loss());
        info!("  Take Profit: {:.2}", signal.take_profit());

        let report = self.dispatcher.dispatch(self.market.as_mut(), signal).await;
        if report.ack.is_none() {
            warn!("  Order was not accepted; see error above");
        }
        if self.dispatcher.has_notifier() && !report.notified {
            warn!("  Notification not delivered");
        }
        info!("{}", "=".repeat(60));
    }

    fn print_status(&self) {
        info!("Phase: {}", self.strategy.phase().name());
        if let Some(level) = self.strategy.phase().level() {
            info!("Tracking level: {:.2}", level.price);
        }
        if let Some(level) = self.strategy.active_level() {
            info!("Last broken level: {:.2} ({})", level.price, level.direction);
        }
        info!(
            "Signals: {} | Expired patterns: {} | Last candle: {}",
            self.signals_emitted,
            self.patterns_expired,
            self.last_fed
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "none".to_string())
        );
    }

    fn shutdown(&self) {
        info!("Shutting down...");
        self.print_status();
        info!("Bot stopped.");
    }
}

/// Whole candles absent between two consecutive open times.
fn missing_between(prev: DateTime<Utc>, next: DateTime<Utc>, tf: Timeframe) -> i64 {
    let step = tf.as_chrono().num_seconds();
    ((next - prev).num_seconds() / step - 1).max(0)
}
