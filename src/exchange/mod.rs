pub mod binance;

pub use binance::BinanceClient;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{CandleSeries, OrderSide, Timeframe};
use crate::strategies::Signal;

/// Market entry order built from a signal. Protective levels ride along
/// for logging and notification; the exchange only sees a market order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl OrderRequest {
    pub fn from_signal(signal: &Signal, symbol: &str, quantity: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            side: signal.direction().order_side(),
            quantity,
            entry_price: signal.entry_price(),
            stop_loss: signal.stop_loss(),
            take_profit: signal.take_profit(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: Option<u64>,
    pub status: String,
    /// Validated by the exchange but never placed.
    pub test: bool,
}

#[async_trait]
pub trait Exchange: Send + Sync {
    async fn fetch_ohlcv(&mut self, tf: Timeframe, limit: usize) -> Result<CandleSeries>;
    async fn submit_order(&mut self, order: &OrderRequest) -> Result<OrderAck>;
}
