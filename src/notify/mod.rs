pub mod telegram;

pub use telegram::TelegramNotifier;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{OrderSide, TradingMode};
use crate::strategies::Signal;

pub const MESSAGE_HEADER: &str = "🚀 Smart Breakout Strategy";

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

/// Human-readable summary of a signal for chat channels.
pub fn format_signal_message(signal: &Signal, symbol: &str, mode: TradingMode) -> String {
    let side: OrderSide = signal.direction().order_side();
    format!(
        "{}\nPair: {}\nSignal: {}\nEntry: {:.2}\nSL: {:.2}\nTP: {:.2}\nMode: {}",
        MESSAGE_HEADER,
        symbol,
        side,
        signal.entry_price(),
        signal.stop_loss(),
        signal.take_profit(),
        mode
    )
}

/// Fixed message used to check that a channel is wired up.
pub fn test_message() -> String {
    format!(
        "{} TEST\nSignal: BUY\nEntry: 100000\nSL: 99500\nTP: 101000\nMode: Test",
        MESSAGE_HEADER
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::levels::Level;
    use crate::core::orders::compute_order;
    use crate::models::{BreakDirection, Direction};
    use crate::test_helpers::base_time;

    #[test]
    fn signal_message_lists_levels_and_mode() {
        let order = compute_order(Direction::Long, 100_000.0, 0.005).unwrap();
        let level = Level {
            price: 99_800.0,
            direction: BreakDirection::BrokenUp,
            detected_at: base_time(),
        };
        let signal = Signal::new(Direction::Long, order, level, base_time());

        let msg = format_signal_message(&signal, "BTCUSDT", TradingMode::Testnet);
        assert!(msg.starts_with(MESSAGE_HEADER));
        assert!(msg.contains("Signal: BUY"));
        assert!(msg.contains("Entry: 100000.00"));
        assert!(msg.contains("SL: 99500.00"));
        assert!(msg.contains("TP: 101000.00"));
        assert!(msg.ends_with("Mode: Testnet"));
    }

    #[test]
    fn test_message_is_marked() {
        assert!(test_message().contains("TEST"));
    }
}
