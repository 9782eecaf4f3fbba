use tracing::warn;

use common::{Candle, IndicatorReading};

use crate::config::IndicatorSettings;
use crate::indicators::{Atr, BollingerBands, Ema, Indicator, Macd, Rsi, SuperTrend};

/// Turns a candle sequence into one synchronized [`IndicatorReading`] per
/// candle.
///
/// Every indicator is advanced exactly once per `push`, so a reading only
/// ever combines values computed from the same candle. Readings are
/// suppressed (`None`) while the candle index is below the stabilization
/// threshold or while any indicator is still warming up.
#[derive(Debug, Clone)]
pub struct IndicatorPipeline {
    ema_fast: Ema,
    ema_slow: Ema,
    rsi: Rsi,
    macd: Macd,
    bollinger: BollingerBands,
    atr: Atr,
    super_trend: SuperTrend,
    stabilization: usize,
    seen: usize,
}

impl IndicatorPipeline {
    pub fn new(settings: &IndicatorSettings, stabilization: usize) -> Self {
        let pipeline = Self {
            ema_fast: Ema::new(settings.ema_fast),
            ema_slow: Ema::new(settings.ema_slow),
            rsi: Rsi::new(settings.rsi_period),
            macd: Macd::new(settings.macd_fast, settings.macd_slow, settings.macd_signal),
            bollinger: BollingerBands::new(settings.bollinger_period, settings.bollinger_std_devs),
            atr: Atr::new(settings.atr_period),
            super_trend: SuperTrend::new(
                settings.super_trend_period,
                settings.super_trend_multiplier,
            ),
            stabilization,
            seen: 0,
        };

        if stabilization < pipeline.warmup() {
            warn!(
                stabilization,
                warmup = pipeline.warmup(),
                "Stabilization shorter than indicator warm-up; early readings will be suppressed"
            );
        }
        pipeline
    }

    /// Longest warm-up among the indicators.
    pub fn warmup(&self) -> usize {
        [
            self.ema_fast.warmup(),
            self.ema_slow.warmup(),
            self.rsi.warmup(),
            self.macd.warmup(),
            self.bollinger.warmup(),
            self.atr.warmup(),
            self.super_trend.warmup(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    pub fn candles_seen(&self) -> usize {
        self.seen
    }

    /// Feed the next candle and return its reading, if one is available.
    pub fn push(&mut self, candle: &Candle) -> Option<IndicatorReading> {
        let index = self.seen;
        self.seen += 1;

        // Advance every indicator before looking at any result.
        let ema_fast = self.ema_fast.next(candle);
        let ema_slow = self.ema_slow.next(candle);
        let rsi = self.rsi.next(candle);
        let macd = self.macd.next(candle);
        let bands = self.bollinger.next(candle);
        let atr = self.atr.next(candle);
        let super_trend = self.super_trend.next(candle);

        if index < self.stabilization {
            return None;
        }

        let macd = macd?;
        let bands = bands?;
        Some(IndicatorReading {
            super_trend: super_trend?,
            upper_band: bands.upper,
            middle_band: bands.middle,
            lower_band: bands.lower,
            ema_fast: ema_fast?,
            ema_slow: ema_slow?,
            rsi: rsi?,
            macd_line: macd.line,
            macd_signal: macd.signal,
            atr: atr?,
        })
    }
}
