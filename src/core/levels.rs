use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StrategyError;
use crate::models::{BreakDirection, Candle};

/// A support/resistance price and how the latest closed candle left it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub price: f64,
    pub direction: BreakDirection,
    /// Open time of the candle the level was evaluated against.
    pub detected_at: DateTime<Utc>,
}

impl Level {
    pub fn is_broken(&self) -> bool {
        self.direction != BreakDirection::None
    }
}

/// Evaluate the latest candle of `window` against the range formed by the
/// `lookback` candles before it.
///
/// `window` must be oldest-first and hold closed candles only. A break needs
/// the close strictly beyond the range; when nothing breaks, the returned
/// level is whichever range boundary sits closer to the close.
pub fn detect(window: &[Candle], lookback: usize) -> Result<Level, StrategyError> {
    if lookback == 0 {
        return Err(StrategyError::InvalidParameter {
            name: "lookback",
            value: 0.0,
            reason: "must be at least one candle",
        });
    }
    let needed = lookback + 1;
    if window.len() < needed {
        return Err(StrategyError::InsufficientData {
            needed,
            got: window.len(),
        });
    }

    let (latest, history) = match window.split_last() {
        Some(parts) => parts,
        None => {
            return Err(StrategyError::InsufficientData { needed, got: 0 });
        }
    };
    let range = &history[history.len() - lookback..];

    let highest_high = range.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let lowest_low = range.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);

    let (price, direction) = if latest.close > highest_high {
        (highest_high, BreakDirection::BrokenUp)
    } else if latest.close < lowest_low {
        (lowest_low, BreakDirection::BrokenDown)
    } else if highest_high - latest.close <= latest.close - lowest_low {
        (highest_high, BreakDirection::None)
    } else {
        (lowest_low, BreakDirection::None)
    };

    Ok(Level {
        price,
        direction,
        detected_at: latest.timestamp,
    })
}

/// Keeps the most recent broken level between calls.
#[derive(Debug, Clone)]
pub struct LevelDetector {
    lookback: usize,
    active: Option<Level>,
}

impl LevelDetector {
    pub fn new(lookback: usize) -> Result<Self, StrategyError> {
        if lookback == 0 {
            return Err(StrategyError::InvalidParameter {
                name: "lookback",
                value: 0.0,
                reason: "must be at least one candle",
            });
        }
        Ok(Self {
            lookback,
            active: None,
        })
    }

    /// Candles the window must hold before `refresh` can evaluate anything.
    pub fn window_len(&self) -> usize {
        self.lookback + 1
    }

    pub fn active(&self) -> Option<&Level> {
        self.active.as_ref()
    }

    /// Returns the level only when the latest candle broke one. Otherwise the
    /// previously active level stays in place.
    pub fn refresh(&mut self, window: &[Candle]) -> Result<Option<Level>, StrategyError> {
        let level = detect(window, self.lookback)?;
        if !level.is_broken() {
            return Ok(None);
        }
        self.active = Some(level);
        Ok(Some(level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{candle_at, make_range};

    fn window_with(last: Candle) -> Vec<Candle> {
        let mut w: Vec<Candle> = make_range(20, 100.0, 90.0).into_iter().collect();
        w.push(last);
        w
    }

    #[test]
    fn close_above_range_breaks_up() {
        let w = window_with(candle_at(20, 99.0, 101.5, 98.5, 101.0));
        let level = detect(&w, 20).unwrap();
        assert_eq!(level.direction, BreakDirection::BrokenUp);
        assert!((level.price - 100.0).abs() < 1e-9);
        assert_eq!(level.detected_at, w[20].timestamp);
    }

    #[test]
    fn close_below_range_breaks_down() {
        let w = window_with(candle_at(20, 91.0, 91.5, 88.0, 89.0));
        let level = detect(&w, 20).unwrap();
        assert_eq!(level.direction, BreakDirection::BrokenDown);
        assert!((level.price - 90.0).abs() < 1e-9);
    }

    #[test]
    fn close_equal_to_high_is_not_a_break() {
        let w = window_with(candle_at(20, 99.0, 100.5, 98.5, 100.0));
        let level = detect(&w, 20).unwrap();
        assert_eq!(level.direction, BreakDirection::None);
        assert!((level.price - 100.0).abs() < 1e-9);
    }

    #[test]
    fn unbroken_level_is_nearest_boundary() {
        let w = window_with(candle_at(20, 92.0, 93.0, 91.0, 92.0));
        let level = detect(&w, 20).unwrap();
        assert_eq!(level.direction, BreakDirection::None);
        assert!((level.price - 90.0).abs() < 1e-9);
    }

    #[test]
    fn only_trailing_lookback_counts() {
        // An old spike at 120 falls outside a 5-candle lookback.
        let mut w = vec![candle_at(0, 100.0, 120.0, 99.0, 100.0)];
        for i in 1..=5 {
            w.push(candle_at(i, 100.0, 101.0, 99.0, 100.0));
        }
        w.push(candle_at(6, 100.0, 102.5, 100.0, 102.0));
        assert_eq!(detect(&w, 5).unwrap().direction, BreakDirection::BrokenUp);
        assert_eq!(detect(&w, 6).unwrap().direction, BreakDirection::None);
    }

    #[test]
    fn short_window_is_insufficient() {
        let w: Vec<Candle> = make_range(20, 100.0, 90.0).into_iter().collect();
        let err = detect(&w, 20).unwrap_err();
        assert_eq!(err, StrategyError::InsufficientData { needed: 21, got: 20 });
    }

    #[test]
    fn zero_lookback_rejected() {
        let w = window_with(candle_at(20, 99.0, 101.5, 98.5, 101.0));
        assert!(matches!(
            detect(&w, 0),
            Err(StrategyError::InvalidParameter { name: "lookback", .. })
        ));
        assert!(LevelDetector::new(0).is_err());
    }

    #[test]
    fn detect_is_idempotent() {
        let w = window_with(candle_at(20, 99.0, 101.5, 98.5, 101.0));
        assert_eq!(detect(&w, 20).unwrap(), detect(&w, 20).unwrap());
    }

    #[test]
    fn detector_keeps_previous_break() {
        let mut det = LevelDetector::new(20).unwrap();
        let broken = window_with(candle_at(20, 99.0, 101.5, 98.5, 101.0));
        let fresh = det.refresh(&broken).unwrap();
        assert!(fresh.is_some());

        let quiet = window_with(candle_at(20, 95.0, 96.0, 94.0, 95.0));
        assert!(det.refresh(&quiet).unwrap().is_none());
        let active = det.active().unwrap();
        assert_eq!(active.direction, BreakDirection::BrokenUp);
        assert!((active.price - 100.0).abs() < 1e-9);
    }
}
