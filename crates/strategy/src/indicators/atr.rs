//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|); the first
//! candle has no previous close and uses high-low.
//! ATR uses Wilder smoothing seeded with the mean of the first `period` TRs.

use common::Candle;

use super::Indicator;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    prev_close: Option<f64>,
    count: usize,
    seed_sum: f64,
    value: Option<f64>,
}

pub fn true_range(candle: &Candle, prev_close: Option<f64>) -> f64 {
    let hl = candle.high - candle.low;
    match prev_close {
        Some(pc) => hl.max((candle.high - pc).abs()).max((candle.low - pc).abs()),
        None => hl,
    }
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            prev_close: None,
            count: 0,
            seed_sum: 0.0,
            value: None,
        }
    }
}

impl Indicator for Atr {
    type Output = f64;

    fn next(&mut self, candle: &Candle) -> Option<f64> {
        let tr = true_range(candle, self.prev_close);
        self.prev_close = Some(candle.close);

        let period = self.period as f64;
        self.value = match self.value {
            Some(prev) => Some((prev * (period - 1.0) + tr) / period),
            None => {
                self.count += 1;
                self.seed_sum += tr;
                (self.count == self.period).then(|| self.seed_sum / period)
            }
        };
        self.value
    }

    fn warmup(&self) -> usize {
        self.period
    }
}
