use std::collections::VecDeque;

use common::Candle;

use super::Indicator;

/// Bollinger Bands: SMA(period) ± k × population standard deviation.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    period: usize,
    std_devs: f64,
    window: VecDeque<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BollingerBands {
    pub fn new(period: usize, std_devs: f64) -> Self {
        assert!(period >= 2, "Bollinger period must be >= 2");
        Self {
            period,
            std_devs,
            window: VecDeque::with_capacity(period),
        }
    }

    pub fn update(&mut self, close: f64) -> Option<Bands> {
        if self.window.len() == self.period {
            self.window.pop_front();
        }
        self.window.push_back(close);
        if self.window.len() < self.period {
            return None;
        }

        let n = self.period as f64;
        let mean = self.window.iter().sum::<f64>() / n;
        let variance = self.window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let width = self.std_devs * variance.sqrt();

        Some(Bands {
            upper: mean + width,
            middle: mean,
            lower: mean - width,
        })
    }
}

impl Indicator for BollingerBands {
    type Output = Bands;

    fn next(&mut self, candle: &Candle) -> Option<Bands> {
        self.update(candle.close)
    }

    fn warmup(&self) -> usize {
        self.period
    }
}
