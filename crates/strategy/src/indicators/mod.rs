//! Streaming indicator primitives.
//!
//! Each indicator is an incremental updater: it is fed one candle at a time
//! and returns `None` until it has seen enough history, then one value per
//! candle. The pipeline advances every indicator on every candle, so all
//! outputs for a given call belong to the same candle.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod supertrend;

pub use atr::Atr;
pub use bollinger::{BollingerBands, Bands};
pub use ema::Ema;
pub use macd::{Macd, MacdValue};
pub use rsi::Rsi;
pub use supertrend::SuperTrend;

use common::Candle;

/// An incremental indicator over a candle stream.
pub trait Indicator {
    type Output;

    /// Feed the next candle. Returns a value once warmed up.
    fn next(&mut self, candle: &Candle) -> Option<Self::Output>;

    /// Number of candles consumed before the first value is produced.
    fn warmup(&self) -> usize;
}

/// Synthetic candles from close prices: open = previous close,
/// high/low = max/min(open, close) ± 1.0.
#[cfg(test)]
pub fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
    use chrono::{Duration, TimeZone, Utc};

    let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle {
                timestamp: start + Duration::minutes(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}",
        (actual - expected).abs()
    );
}
