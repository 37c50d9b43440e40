use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::levels::Level;
use crate::core::orders::OrderParams;
use crate::models::Direction;

/// Entry intent for one confirmed breakout retest.
///
/// Only the retest state machine builds these, so every `Signal` in
/// circulation carries order levels that passed `compute_order`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    direction: Direction,
    entry_price: f64,
    stop_loss: f64,
    take_profit: f64,
    level: Level,
    confirmed_at: DateTime<Utc>,
}

impl Signal {
    pub(crate) fn new(
        direction: Direction,
        order: OrderParams,
        level: Level,
        confirmed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            direction,
            entry_price: order.entry,
            stop_loss: order.stop_loss,
            take_profit: order.take_profit,
            level,
            confirmed_at,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    pub fn stop_loss(&self) -> f64 {
        self.stop_loss
    }

    pub fn take_profit(&self) -> f64 {
        self.take_profit
    }

    /// The broken level the retest came back to.
    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn confirmed_at(&self) -> DateTime<Utc> {
        self.confirmed_at
    }
}
