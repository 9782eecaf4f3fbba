use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV sample for a fixed time bucket (1-minute klines in practice).
///
/// Streams of candles are ordered by `timestamp` and carry exactly one
/// candle per bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Every indicator value the decision engine votes on, all computed from
/// the same candle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IndicatorReading {
    pub super_trend: f64,
    pub upper_band: f64,
    pub middle_band: f64,
    pub lower_band: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub rsi: f64,
    pub macd_line: f64,
    pub macd_signal: f64,
    pub atr: f64,
}

/// Action emitted once per candle by a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    #[default]
    Hold,
    Buy,
    Sell,
    Close,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Hold => write!(f, "HOLD"),
            Action::Buy => write!(f, "LONG"),
            Action::Sell => write!(f, "SHORT"),
            Action::Close => write!(f, "CLOSE"),
        }
    }
}

/// Direction of an open position. A flat book is represented by the
/// absence of a [`Position`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Long,
    Short,
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionSide::Long => write!(f, "LONG"),
            PositionSide::Short => write!(f, "SHORT"),
        }
    }
}

/// An open trade. Lives from the entry candle until the candle that closes it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: PositionSide,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
}

impl Position {
    /// Open a position at the close of `candle`.
    pub fn open(side: PositionSide, candle: &Candle) -> Self {
        Self {
            side,
            entry_price: candle.close,
            entry_time: candle.timestamp,
        }
    }
}

/// One tunable parameter of [`StrategyWeights`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gene {
    SuperTrendWeight,
    BollingerWeight,
    EmaWeight,
    RsiWeight,
    MacdWeight,
    StrengthThreshold,
    AtrMultiplier,
}

impl Gene {
    pub const ALL: [Gene; 7] = [
        Gene::SuperTrendWeight,
        Gene::BollingerWeight,
        Gene::EmaWeight,
        Gene::RsiWeight,
        Gene::MacdWeight,
        Gene::StrengthThreshold,
        Gene::AtrMultiplier,
    ];

    /// Inclusive valid range `(min, max)`.
    pub fn range(self) -> (f64, f64) {
        match self {
            Gene::SuperTrendWeight
            | Gene::BollingerWeight
            | Gene::EmaWeight
            | Gene::RsiWeight
            | Gene::MacdWeight => (0.0, 3.0),
            Gene::StrengthThreshold => (0.0, 10.0),
            Gene::AtrMultiplier => (1.5, 4.0),
        }
    }

    /// Largest perturbation a single mutation applies, in either direction.
    pub fn mutation_step(self) -> f64 {
        match self {
            Gene::StrengthThreshold => 0.25,
            Gene::AtrMultiplier => 0.2,
            _ => 0.1,
        }
    }

    pub fn clamp(self, value: f64) -> f64 {
        let (min, max) = self.range();
        if value.is_nan() {
            return min;
        }
        value.clamp(min, max)
    }
}

/// The genome tuned by the optimizer: five signal weights, the decision
/// gate and the ATR multiplier used for stop distances.
///
/// Serialized with camelCase keys, the format stored in the `genomes` table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyWeights {
    pub super_trend_weight: f64,
    pub bollinger_weight: f64,
    pub ema_weight: f64,
    pub rsi_weight: f64,
    pub macd_weight: f64,
    pub strength_threshold: f64,
    pub atr_multiplier: f64,
}

impl Default for StrategyWeights {
    /// Fallback genome used when no trained weights exist for an asset.
    fn default() -> Self {
        Self {
            super_trend_weight: 1.0,
            bollinger_weight: 1.0,
            ema_weight: 1.0,
            rsi_weight: 1.0,
            macd_weight: 1.0,
            strength_threshold: 1.0,
            atr_multiplier: 2.0,
        }
    }
}

impl StrategyWeights {
    pub fn get(&self, gene: Gene) -> f64 {
        match gene {
            Gene::SuperTrendWeight => self.super_trend_weight,
            Gene::BollingerWeight => self.bollinger_weight,
            Gene::EmaWeight => self.ema_weight,
            Gene::RsiWeight => self.rsi_weight,
            Gene::MacdWeight => self.macd_weight,
            Gene::StrengthThreshold => self.strength_threshold,
            Gene::AtrMultiplier => self.atr_multiplier,
        }
    }

    pub fn set(&mut self, gene: Gene, value: f64) {
        let slot = match gene {
            Gene::SuperTrendWeight => &mut self.super_trend_weight,
            Gene::BollingerWeight => &mut self.bollinger_weight,
            Gene::EmaWeight => &mut self.ema_weight,
            Gene::RsiWeight => &mut self.rsi_weight,
            Gene::MacdWeight => &mut self.macd_weight,
            Gene::StrengthThreshold => &mut self.strength_threshold,
            Gene::AtrMultiplier => &mut self.atr_multiplier,
        };
        *slot = value;
    }

    /// Copy with every gene forced into its valid range.
    pub fn clamped(mut self) -> Self {
        for gene in Gene::ALL {
            self.set(gene, gene.clamp(self.get(gene)));
        }
        self
    }

    pub fn is_in_range(&self) -> bool {
        Gene::ALL.iter().all(|&gene| {
            let (min, max) = gene.range();
            (min..=max).contains(&self.get(gene))
        })
    }
}

/// A genome paired with its fitness over one evaluation window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub weights: StrategyWeights,
    pub fitness: f64,
}

/// Realized P&L of one backtest or replay run, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub asset: String,
    pub result: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Which job the binary runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Train,
    Backtest,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Train => write!(f, "train"),
            RunMode::Backtest => write!(f, "backtest"),
        }
    }
}
