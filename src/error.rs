use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by the signal core. All of them are local and recoverable:
/// the state machine is left exactly as it was before the failing call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error("invalid candle at {timestamp}: {reason}")]
    InvalidCandle {
        timestamp: DateTime<Utc>,
        reason: String,
    },

    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("need {needed} candles, got {got}")]
    InsufficientData { needed: usize, got: usize },
}

impl StrategyError {
    pub(crate) fn invalid_candle(timestamp: DateTime<Utc>, reason: impl Into<String>) -> Self {
        StrategyError::InvalidCandle {
            timestamp,
            reason: reason.into(),
        }
    }
}
