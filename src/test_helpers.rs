use chrono::{DateTime, Duration, Utc};

use crate::core::retest::RetestConfig;
use crate::models::{Candle, CandleSeries};

pub fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Create candles from (open, high, low, close) tuples with auto-incrementing 1m timestamps.
pub fn make_candles(data: &[(f64, f64, f64, f64)]) -> CandleSeries {
    make_candles_from(base_time(), data)
}

pub fn make_candles_from(start: DateTime<Utc>, data: &[(f64, f64, f64, f64)]) -> CandleSeries {
    let candles: Vec<Candle> = data
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Candle {
            timestamp: start + Duration::minutes(i as i64),
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 100.0,
        })
        .collect();

    CandleSeries::new(candles)
}

/// `n` sideways candles whose highs top out at `high` and lows bottom at `low`.
pub fn make_range(n: usize, high: f64, low: f64) -> CandleSeries {
    let mid = (high + low) / 2.0;
    let step = (high - mid) / 4.0;
    let data: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|i| {
            let wobble = if i % 2 == 0 { step } else { -step };
            let open = mid - wobble;
            let close = mid + wobble;
            let (h, l) = if i == n / 2 { (high, low) } else { (mid + 2.0 * step, mid - 2.0 * step) };
            (open, h, l, close)
        })
        .collect();
    make_candles(&data)
}

/// Candle `i` minutes after the base time.
pub fn candle_at(i: i64, o: f64, h: f64, l: f64, c: f64) -> Candle {
    Candle {
        timestamp: base_time() + Duration::minutes(i),
        open: o,
        high: h,
        low: l,
        close: c,
        volume: 100.0,
    }
}

/// 0.5% tolerance, 5-candle timeout, 0.3% stop, long-only.
pub fn test_retest_config() -> RetestConfig {
    RetestConfig {
        retest_tolerance: 0.005,
        max_wait_candles: 5,
        stop_loss_percent: 0.003,
        allow_shorts: false,
    }
}
