use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade side of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }

    /// Exchange order side that opens a position in this direction.
    pub fn order_side(&self) -> OrderSide {
        match self {
            Direction::Long => OrderSide::Buy,
            Direction::Short => OrderSide::Sell,
        }
    }
}

/// Which way the latest closed candle left a key level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakDirection {
    BrokenUp,
    BrokenDown,
    None,
}

impl fmt::Display for BreakDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakDirection::BrokenUp => write!(f, "broken_up"),
            BreakDirection::BrokenDown => write!(f, "broken_down"),
            BreakDirection::None => write!(f, "none"),
        }
    }
}

impl BreakDirection {
    pub fn to_direction(self) -> Option<Direction> {
        match self {
            BreakDirection::BrokenUp => Some(Direction::Long),
            BreakDirection::BrokenDown => Some(Direction::Short),
            BreakDirection::None => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

/// Where orders go: `Demo` validates against production without filling,
/// `Testnet` fills on the exchange sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    #[default]
    Demo,
    Testnet,
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradingMode::Demo => write!(f, "Demo"),
            TradingMode::Testnet => write!(f, "Testnet"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn break_direction_maps_to_trade_direction() {
        assert_eq!(BreakDirection::BrokenUp.to_direction(), Some(Direction::Long));
        assert_eq!(BreakDirection::BrokenDown.to_direction(), Some(Direction::Short));
        assert_eq!(BreakDirection::None.to_direction(), None);
    }

    #[test]
    fn order_side_follows_direction() {
        assert_eq!(Direction::Long.order_side(), OrderSide::Buy);
        assert_eq!(Direction::Short.order_side().as_str(), "SELL");
    }

    #[test]
    fn trading_mode_deserializes_lowercase() {
        let m: TradingMode = serde_json::from_str("\"testnet\"").unwrap();
        assert_eq!(m, TradingMode::Testnet);
        assert_eq!(TradingMode::default(), TradingMode::Demo);
    }
}
