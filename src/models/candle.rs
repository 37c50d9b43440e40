use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StrategyError;
use crate::models::Timeframe;

/// One OHLCV bar. `timestamp` is the bar's open time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Time at which the bar stops forming.
    pub fn close_time(&self, tf: Timeframe) -> DateTime<Utc> {
        self.timestamp + tf.as_chrono()
    }

    pub fn is_closed(&self, tf: Timeframe, now: DateTime<Utc>) -> bool {
        self.close_time(tf) <= now
    }

    /// Checks the price fields only; ordering is the caller's concern.
    pub fn validate(&self) -> Result<(), StrategyError> {
        let prices = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ];
        for (name, price) in prices {
            if !price.is_finite() || price <= 0.0 {
                return Err(StrategyError::invalid_candle(
                    self.timestamp,
                    format!("{} must be positive and finite, got {}", name, price),
                ));
            }
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(StrategyError::invalid_candle(
                self.timestamp,
                format!("volume must be non-negative, got {}", self.volume),
            ));
        }
        if self.high < self.low {
            return Err(StrategyError::invalid_candle(
                self.timestamp,
                format!("high ({}) below low ({})", self.high, self.low),
            ));
        }
        for (name, price) in [("open", self.open), ("close", self.close)] {
            if price > self.high || price < self.low {
                return Err(StrategyError::invalid_candle(
                    self.timestamp,
                    format!(
                        "{} {} outside [{}, {}]",
                        name, price, self.low, self.high
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Wraps Vec<Candle>, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self { candles }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.candles.iter()
    }

    /// Drop the bar that is still forming at `now`, if the feed returned one.
    pub fn closed(&self, tf: Timeframe, now: DateTime<Utc>) -> CandleSeries {
        let candles = self
            .candles
            .iter()
            .filter(|c| c.is_closed(tf, now))
            .cloned()
            .collect();
        CandleSeries::new(candles)
    }

    /// Candles strictly newer than `ts`; everything when `ts` is None.
    pub fn after(&self, ts: Option<DateTime<Utc>>) -> CandleSeries {
        let candles = match ts {
            Some(ts) => self
                .candles
                .iter()
                .filter(|c| c.timestamp > ts)
                .cloned()
                .collect(),
            None => self.candles.clone(),
        };
        CandleSeries::new(candles)
    }
}

impl std::ops::Index<usize> for CandleSeries {
    type Output = Candle;
    fn index(&self, index: usize) -> &Self::Output {
        &self.candles[index]
    }
}

impl IntoIterator for CandleSeries {
    type Item = Candle;
    type IntoIter = std::vec::IntoIter<Candle>;
    fn into_iter(self) -> Self::IntoIter {
        self.candles.into_iter()
    }
}

impl<'a> IntoIterator for &'a CandleSeries {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;
    fn into_iter(self) -> Self::IntoIter {
        self.candles.iter()
    }
}
