use common::Candle;

use super::{Ema, Indicator};

/// MACD (Moving Average Convergence/Divergence) indicator.
///
/// Computes: MACD line = EMA(fast) − EMA(slow), Signal = EMA(macd_line, signal_period).
/// The first value appears after `slow + signal - 1` closes.
#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
    slow_period: usize,
    signal_period: usize,
}

/// MACD line and its signal line for one candle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdValue {
    pub line: f64,
    pub signal: f64,
}

impl MacdValue {
    pub fn histogram(&self) -> f64 {
        self.line - self.signal
    }
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast < slow, "MACD fast period must be less than slow period");
        Self {
            fast: Ema::new(fast),
            slow: Ema::new(slow),
            signal: Ema::new(signal),
            slow_period: slow,
            signal_period: signal,
        }
    }

    pub fn update(&mut self, close: f64) -> Option<MacdValue> {
        // Both averages see every close, even before the slow one is seeded.
        let fast = self.fast.update(close);
        let slow = self.slow.update(close);
        let line = fast? - slow?;
        let signal = self.signal.update(line)?;
        Some(MacdValue { line, signal })
    }
}

impl Indicator for Macd {
    type Output = MacdValue;

    fn next(&mut self, candle: &Candle) -> Option<MacdValue> {
        self.update(candle.close)
    }

    fn warmup(&self) -> usize {
        self.slow_period + self.signal_period - 1
    }
}
