use serde::{Deserialize, Serialize};
use tracing::debug;

use common::{Candle, Position, PositionSide};

/// Which exit rules are active. Distances come from the genome's ATR
/// multiplier, so only the switches are configured here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Close when price moves `atr_multiplier × ATR / 2` against the position.
    pub stop_loss: bool,
    /// Close when price moves `atr_multiplier × ATR` in favour of the position.
    pub take_profit: bool,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            stop_loss: true,
            take_profit: false,
        }
    }
}

/// Why the guard closed a position, with the price level that was breached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExitReason {
    StopLoss { level: f64 },
    TakeProfit { level: f64 },
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::StopLoss { level } => write!(f, "stop-loss at {level:.4}"),
            ExitReason::TakeProfit { level } => write!(f, "take-profit at {level:.4}"),
        }
    }
}

/// Stop distance below/above entry for a given ATR reading.
pub fn stop_distance(atr: f64, atr_multiplier: f64) -> f64 {
    atr_multiplier * atr / 2.0
}

/// Take-profit distance above/below entry for a given ATR reading.
pub fn take_profit_distance(atr: f64, atr_multiplier: f64) -> f64 {
    atr_multiplier * atr
}

/// Position-level exit rules, evaluated on every candle before any new
/// signal is considered.
///
/// The guard is stateless: the caller owns the position and clears it when
/// `check` returns an exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskGuard {
    config: RiskConfig,
}

impl RiskGuard {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> RiskConfig {
        self.config
    }

    /// Check the open `position` against this candle's range.
    ///
    /// Stop-loss is evaluated first and wins when both levels are touched
    /// within the same candle.
    pub fn check(
        &self,
        position: &Position,
        candle: &Candle,
        atr: f64,
        atr_multiplier: f64,
    ) -> Option<ExitReason> {
        let entry = position.entry_price;

        if self.config.stop_loss {
            let distance = stop_distance(atr, atr_multiplier);
            let hit = match position.side {
                PositionSide::Long => {
                    let level = entry - distance;
                    (candle.low <= level).then_some(level)
                }
                PositionSide::Short => {
                    let level = entry + distance;
                    (candle.high >= level).then_some(level)
                }
            };
            if let Some(level) = hit {
                debug!(side = %position.side, entry, level, "Stop-loss triggered");
                return Some(ExitReason::StopLoss { level });
            }
        }

        if self.config.take_profit {
            let distance = take_profit_distance(atr, atr_multiplier);
            let hit = match position.side {
                PositionSide::Long => {
                    let level = entry + distance;
                    (candle.high >= level).then_some(level)
                }
                PositionSide::Short => {
                    let level = entry - distance;
                    (candle.low <= level).then_some(level)
                }
            };
            if let Some(level) = hit {
                debug!(side = %position.side, entry, level, "Take-profit triggered");
                return Some(ExitReason::TakeProfit { level });
            }
        }

        None
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
