use common::Candle;

use super::Indicator;

/// Exponential Moving Average over close prices.
///
/// Seeded with the SMA of the first `period` values, then smoothed with
/// `k = 2 / (period + 1)`.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    k: f64,
    seed_sum: f64,
    count: usize,
    value: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            k: 2.0 / (period as f64 + 1.0),
            seed_sum: 0.0,
            count: 0,
            value: None,
        }
    }

    /// Feed a raw value (used directly by MACD for its signal line).
    pub fn update(&mut self, value: f64) -> Option<f64> {
        self.value = match self.value {
            Some(prev) => Some(value * self.k + prev * (1.0 - self.k)),
            None => {
                self.count += 1;
                self.seed_sum += value;
                (self.count == self.period).then(|| self.seed_sum / self.period as f64)
            }
        };
        self.value
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

impl Indicator for Ema {
    type Output = f64;

    fn next(&mut self, candle: &Candle) -> Option<f64> {
        self.update(candle.close)
    }

    fn warmup(&self) -> usize {
        self.period
    }
}
