//! SuperTrend: ATR-based directional indicator.
//!
//! Output is the active band: the lower band (support) while trending up,
//! the upper band (resistance) while trending down. Bands only tighten while
//! price respects them, and the trend flips when close crosses the active band.

use common::Candle;

use super::{Atr, Indicator};

#[derive(Debug, Clone)]
pub struct SuperTrend {
    atr: Atr,
    multiplier: f64,
    state: Option<BandState>,
}

#[derive(Debug, Clone, Copy)]
struct BandState {
    upper: f64,
    lower: f64,
    trending_up: bool,
    prev_close: f64,
}

impl SuperTrend {
    pub fn new(period: usize, multiplier: f64) -> Self {
        Self {
            atr: Atr::new(period),
            multiplier,
            state: None,
        }
    }
}

impl Indicator for SuperTrend {
    type Output = f64;

    fn next(&mut self, candle: &Candle) -> Option<f64> {
        let atr = self.atr.next(candle)?;
        let hl2 = (candle.high + candle.low) / 2.0;
        let basic_upper = hl2 + self.multiplier * atr;
        let basic_lower = hl2 - self.multiplier * atr;

        let next = match self.state {
            // Start trending up (support)
            None => BandState {
                upper: basic_upper,
                lower: basic_lower,
                trending_up: true,
                prev_close: candle.close,
            },
            Some(prev) => {
                let upper = if prev.prev_close <= prev.upper {
                    basic_upper.min(prev.upper)
                } else {
                    basic_upper
                };
                let lower = if prev.prev_close >= prev.lower {
                    basic_lower.max(prev.lower)
                } else {
                    basic_lower
                };

                let trending_up = if prev.trending_up && candle.close < lower {
                    false
                } else if !prev.trending_up && candle.close > upper {
                    true
                } else {
                    prev.trending_up
                };

                BandState {
                    upper,
                    lower,
                    trending_up,
                    prev_close: candle.close,
                }
            }
        };

        self.state = Some(next);
        Some(if next.trending_up { next.lower } else { next.upper })
    }

    fn warmup(&self) -> usize {
        self.atr.warmup()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::candles_from_closes;

    #[test]
    fn supertrend_sits_below_price_in_uptrend() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let candles = candles_from_closes(&closes);
        let mut st = SuperTrend::new(10, 3.0);
        for c in &candles {
            if let Some(v) = st.next(c) {
                assert!(v < c.close, "supertrend {v} above close {}", c.close);
            }
        }
    }

    #[test]
    fn supertrend_flips_above_price_after_crash() {
        let mut closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        closes.extend((0..30).map(|i| 129.0 - i as f64 * 4.0));
        let candles = candles_from_closes(&closes);
        let mut st = SuperTrend::new(10, 3.0);
        let last = candles.iter().filter_map(|c| st.next(c)).last().unwrap();
        assert!(last > candles.last().unwrap().close);
    }

    #[test]
    fn supertrend_warmup_follows_atr() {
        let candles = candles_from_closes(&[100.0; 12]);
        let mut st = SuperTrend::new(10, 3.0);
        let first = candles.iter().position(|c| st.next(c).is_some()).unwrap();
        assert_eq!(first + 1, st.warmup());
    }
}
