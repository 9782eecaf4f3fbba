pub mod backtest;
pub mod config;
pub mod decision;
pub mod feed;
pub mod indicators;
pub mod outcome;
pub mod pipeline;
pub mod stream;

pub use backtest::{fitness, run_backtest, BacktestReport, Evaluator, Tick};
pub use config::{IndicatorSettings, SignalThresholds, StrategySettings};
pub use decision::{signal_strength, ScalpingStrategy};
pub use feed::{fan_out, Replay, ReplayWindow};
pub use outcome::{ClosedTrade, OutcomeAccumulator};
pub use pipeline::IndicatorPipeline;
pub use stream::{spawn_evaluation, StreamSummary};

use common::{Action, Candle, IndicatorReading, Position};

/// All strategy implementations must satisfy this trait.
pub trait Strategy: Send {
    /// Human-readable name of this strategy.
    fn name(&self) -> &str;

    /// Decide the action for `candle`.
    ///
    /// Called exactly once per candle, in order. `reading` is `None` while
    /// the indicators are not yet stable; the strategy must Hold then.
    fn decide(&mut self, candle: &Candle, reading: Option<&IndicatorReading>) -> Action;

    /// The currently open position, if any.
    fn position(&self) -> Option<&Position>;
}
