use tracing::debug;

use common::{Action, Candle, IndicatorReading, Position, PositionSide, StrategyWeights};
use risk::RiskGuard;

use crate::config::{SignalThresholds, StrategySettings};
use crate::Strategy;

/// Weighted-vote scalping strategy.
///
/// Each indicator casts a signed vote scaled by its genome weight; the sum is
/// compared against the genome's strength threshold. Owns exactly one
/// position, which is never shared with another instance.
#[derive(Debug, Clone)]
pub struct ScalpingStrategy {
    weights: StrategyWeights,
    thresholds: SignalThresholds,
    guard: RiskGuard,
    stabilization: usize,
    index: usize,
    position: Option<Position>,
}

impl ScalpingStrategy {
    pub fn new(weights: StrategyWeights, settings: &StrategySettings) -> Self {
        Self {
            weights,
            thresholds: settings.thresholds,
            guard: RiskGuard::new(settings.risk),
            stabilization: settings.stabilization,
            index: 0,
            position: None,
        }
    }

    pub fn weights(&self) -> &StrategyWeights {
        &self.weights
    }

    /// Signed sum of all weighted indicator votes for one candle.
    pub fn signal_strength(&self, candle: &Candle, reading: &IndicatorReading) -> f64 {
        signal_strength(&self.weights, &self.thresholds, candle, reading)
    }

    fn open(&mut self, side: PositionSide, candle: &Candle) {
        let position = Position::open(side, candle);
        debug!(side = %side, entry = position.entry_price, "Position opened");
        self.position = Some(position);
    }

    /// Same-side signal while already in: the entry moves to this candle.
    fn confirm(&mut self, side: PositionSide, candle: &Candle) -> Action {
        self.position = Some(Position::open(side, candle));
        debug!(side = %side, entry = candle.close, "Position confirmed");
        Action::Hold
    }

    fn close(&mut self) -> Action {
        if let Some(position) = self.position.take() {
            debug!(side = %position.side, entry = position.entry_price, "Position closed");
        }
        Action::Close
    }
}

impl Strategy for ScalpingStrategy {
    fn name(&self) -> &str {
        "Scalping"
    }

    fn decide(&mut self, candle: &Candle, reading: Option<&IndicatorReading>) -> Action {
        let index = self.index;
        self.index += 1;

        if index < self.stabilization {
            return Action::Hold;
        }
        let Some(reading) = reading else {
            return Action::Hold;
        };

        // Risk exits take priority over any new signal on this candle.
        if let Some(position) = &self.position {
            if let Some(exit) =
                self.guard
                    .check(position, candle, reading.atr, self.weights.atr_multiplier)
            {
                debug!(reason = %exit, close = candle.close, "Risk exit");
                return self.close();
            }
        }

        let strength = self.signal_strength(candle, reading);
        let threshold = self.weights.strength_threshold;
        let side = self.position.map(|p| p.side);

        if strength > threshold {
            match side {
                Some(PositionSide::Short) => self.close(),
                Some(PositionSide::Long) => self.confirm(PositionSide::Long, candle),
                None => {
                    self.open(PositionSide::Long, candle);
                    Action::Buy
                }
            }
        } else if strength < -threshold {
            match side {
                Some(PositionSide::Long) => self.close(),
                Some(PositionSide::Short) => self.confirm(PositionSide::Short, candle),
                None => {
                    self.open(PositionSide::Short, candle);
                    Action::Sell
                }
            }
        } else {
            Action::Hold
        }
    }

    fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }
}

/// Weighted vote over EMA, RSI, MACD, SuperTrend and Bollinger signals.
pub fn signal_strength(
    weights: &StrategyWeights,
    thresholds: &SignalThresholds,
    candle: &Candle,
    reading: &IndicatorReading,
) -> f64 {
    let mut strength = 0.0;
    let close = candle.close;

    // EMA crossover
    if reading.ema_fast > reading.ema_slow {
        strength += weights.ema_weight;
    } else {
        strength -= weights.ema_weight;
    }

    // RSI: overbought is bearish, oversold is bullish
    if reading.rsi > thresholds.rsi_overbought {
        strength -= weights.rsi_weight;
    } else if reading.rsi < thresholds.rsi_oversold {
        strength += weights.rsi_weight;
    }

    // MACD histogram outside the dead band
    let histogram = reading.macd_line - reading.macd_signal;
    if histogram > thresholds.macd_dead_band {
        strength += weights.macd_weight;
    } else if histogram < -thresholds.macd_dead_band {
        strength -= weights.macd_weight;
    }

    // SuperTrend
    if close > reading.super_trend {
        strength += weights.super_trend_weight;
    } else {
        strength -= weights.super_trend_weight;
    }

    // Bollinger: band breaks count fully, mid-band side counts half
    if close < reading.lower_band {
        strength += weights.bollinger_weight;
    } else if close > reading.upper_band {
        strength -= weights.bollinger_weight;
    } else if close > reading.middle_band {
        strength += weights.bollinger_weight / 2.0;
    } else if close < reading.middle_band {
        strength -= weights.bollinger_weight / 2.0;
    }

    strength
}
