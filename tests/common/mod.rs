#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use smart_breakout_bot::models::{Candle, CandleSeries};

pub fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// One-hour candles from (open, high, low, close) tuples, starting at `offset` hours.
pub fn hourly(offset: i64, data: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
    data.iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Candle {
            timestamp: base_time() + Duration::hours(offset + i as i64),
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 25.0,
        })
        .collect()
}

/// `n` hourly candles chopping between `low` and `high` without breaking either.
pub fn make_range(n: usize, high: f64, low: f64) -> Vec<Candle> {
    let mid = (high + low) / 2.0;
    let quarter = (high - low) / 4.0;
    let data: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|i| {
            let up = i % 2 == 0;
            let (open, close) = if up {
                (mid - quarter / 2.0, mid + quarter / 2.0)
            } else {
                (mid + quarter / 2.0, mid - quarter / 2.0)
            };
            let (h, l) = if i == n / 2 {
                (high, low)
            } else {
                (mid + quarter, mid - quarter)
            };
            (open, h, l, close)
        })
        .collect();
    hourly(0, &data)
}

/// Range around 30k-31k, then break to 31.2k, dip to 31.05k, close at 31.5k.
pub fn bullish_breakout_retest() -> CandleSeries {
    let mut candles = make_range(20, 31_000.0, 30_000.0);
    candles.extend(hourly(
        20,
        &[
            (30_800.0, 31_250.0, 30_780.0, 31_200.0),
            (31_200.0, 31_220.0, 31_050.0, 31_100.0),
            (31_100.0, 31_550.0, 31_080.0, 31_500.0),
        ],
    ));
    CandleSeries::new(candles)
}
