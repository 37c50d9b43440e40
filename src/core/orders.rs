use serde::{Deserialize, Serialize};

use crate::error::StrategyError;
use crate::models::Direction;

/// Take-profit distance as a multiple of stop-loss distance.
pub const RISK_REWARD_RATIO: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderParams {
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl OrderParams {
    pub fn risk(&self) -> f64 {
        (self.entry - self.stop_loss).abs()
    }

    pub fn reward(&self) -> f64 {
        (self.take_profit - self.entry).abs()
    }
}

/// Stop-loss at `stop_loss_percent` from entry, take-profit at twice that
/// distance on the other side.
pub fn compute_order(
    direction: Direction,
    entry_price: f64,
    stop_loss_percent: f64,
) -> Result<OrderParams, StrategyError> {
    if !entry_price.is_finite() || entry_price <= 0.0 {
        return Err(StrategyError::InvalidParameter {
            name: "entry_price",
            value: entry_price,
            reason: "must be positive",
        });
    }
    if !stop_loss_percent.is_finite() || stop_loss_percent <= 0.0 {
        return Err(StrategyError::InvalidParameter {
            name: "stop_loss_percent",
            value: stop_loss_percent,
            reason: "must be a positive fraction",
        });
    }

    let (stop_loss, take_profit) = match direction {
        Direction::Long => {
            let stop_loss = entry_price * (1.0 - stop_loss_percent);
            (stop_loss, entry_price + RISK_REWARD_RATIO * (entry_price - stop_loss))
        }
        Direction::Short => {
            let stop_loss = entry_price * (1.0 + stop_loss_percent);
            (stop_loss, entry_price - RISK_REWARD_RATIO * (stop_loss - entry_price))
        }
    };

    if stop_loss <= 0.0 || take_profit <= 0.0 {
        return Err(StrategyError::InvalidParameter {
            name: "stop_loss_percent",
            value: stop_loss_percent,
            reason: "too wide, stop-loss or take-profit would be non-positive",
        });
    }

    Ok(OrderParams {
        entry: entry_price,
        stop_loss,
        take_profit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_order_levels() {
        let p = compute_order(Direction::Long, 100_000.0, 0.005).unwrap();
        assert!((p.stop_loss - 99_500.0).abs() < 1e-6);
        assert!((p.take_profit - 101_000.0).abs() < 1e-6);
        assert!(p.stop_loss < p.entry && p.entry < p.take_profit);
    }

    #[test]
    fn short_order_levels() {
        let p = compute_order(Direction::Short, 200.0, 0.003).unwrap();
        assert!((p.stop_loss - 200.6).abs() < 1e-9);
        assert!((p.take_profit - 198.8).abs() < 1e-9);
        assert!(p.take_profit < p.entry && p.entry < p.stop_loss);
    }

    #[test]
    fn reward_is_twice_risk() {
        let entries = [0.0421, 1.0, 102.0, 2_345.67, 64_000.5];
        let percents = [0.001, 0.003, 0.004, 0.005, 0.02, 0.3];
        for direction in [Direction::Long, Direction::Short] {
            for &entry in &entries {
                for &pct in &percents {
                    let p = compute_order(direction, entry, pct).unwrap();
                    let tolerance = 1e-9 * entry.max(1.0);
                    assert!(
                        (p.reward() - 2.0 * p.risk()).abs() < tolerance,
                        "{} entry={} pct={} risk={} reward={}",
                        direction,
                        entry,
                        pct,
                        p.risk(),
                        p.reward()
                    );
                }
            }
        }
    }

    #[test]
    fn rejects_non_positive_stop_percent() {
        for pct in [0.0, -0.003, f64::NAN] {
            let err = compute_order(Direction::Long, 100.0, pct).unwrap_err();
            assert!(matches!(
                err,
                StrategyError::InvalidParameter { name: "stop_loss_percent", .. }
            ));
        }
    }

    #[test]
    fn rejects_non_positive_entry() {
        for entry in [0.0, -1.0, f64::INFINITY] {
            assert!(matches!(
                compute_order(Direction::Short, entry, 0.003),
                Err(StrategyError::InvalidParameter { name: "entry_price", .. })
            ));
        }
    }

    #[test]
    fn rejects_stop_that_crosses_zero() {
        assert!(compute_order(Direction::Long, 100.0, 1.0).is_err());
        // Short take-profit would land at zero.
        assert!(compute_order(Direction::Short, 100.0, 0.5).is_err());
    }
}
