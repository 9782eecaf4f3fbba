use serde::Serialize;

use common::{Action, Candle, IndicatorReading, StrategyWeights};

use crate::config::StrategySettings;
use crate::decision::ScalpingStrategy;
use crate::outcome::{ClosedTrade, OutcomeAccumulator};
use crate::pipeline::IndicatorPipeline;
use crate::Strategy;

/// Everything produced for one candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tick {
    pub candle: Candle,
    pub reading: Option<IndicatorReading>,
    pub action: Action,
    /// Running realized P&L after this candle.
    pub outcome: f64,
}

/// One private pipeline → strategy → accumulator chain.
///
/// Instances share nothing; the optimizer builds one per genome.
#[derive(Debug, Clone)]
pub struct Evaluator {
    pipeline: IndicatorPipeline,
    strategy: ScalpingStrategy,
    outcome: OutcomeAccumulator,
}

impl Evaluator {
    pub fn new(weights: StrategyWeights, settings: &StrategySettings) -> Self {
        Self {
            pipeline: IndicatorPipeline::new(&settings.indicators, settings.stabilization),
            strategy: ScalpingStrategy::new(weights, settings),
            outcome: OutcomeAccumulator::new(settings.log_trades),
        }
    }

    pub fn step(&mut self, candle: &Candle) -> Tick {
        let reading = self.pipeline.push(candle);
        let action = self.strategy.decide(candle, reading.as_ref());
        let outcome = self.outcome.apply(candle, action);
        Tick {
            candle: *candle,
            reading,
            action,
            outcome,
        }
    }

    pub fn candles_seen(&self) -> usize {
        self.pipeline.candles_seen()
    }

    pub fn total(&self) -> f64 {
        self.outcome.total()
    }

    pub fn strategy(&self) -> &ScalpingStrategy {
        &self.strategy
    }

    pub fn into_trades(self) -> Vec<ClosedTrade> {
        self.outcome.into_trades()
    }
}

/// Full record of a replay over a candle window.
#[derive(Debug, Clone, Default)]
pub struct BacktestReport {
    pub actions: Vec<Action>,
    pub outcomes: Vec<f64>,
    pub trades: Vec<ClosedTrade>,
}

impl BacktestReport {
    /// Total realized P&L; zero for an empty window.
    pub fn final_outcome(&self) -> f64 {
        self.outcomes.last().copied().unwrap_or(0.0)
    }

    pub fn candles(&self) -> usize {
        self.actions.len()
    }

    pub fn count(&self, action: Action) -> usize {
        self.actions.iter().filter(|&&a| a == action).count()
    }
}

/// Replay `candles` through a fresh evaluator and keep every action and
/// running outcome.
pub fn run_backtest<I>(weights: StrategyWeights, settings: &StrategySettings, candles: I) -> BacktestReport
where
    I: IntoIterator<Item = Candle>,
{
    let mut evaluator = Evaluator::new(weights, settings);
    let mut report = BacktestReport::default();
    for candle in candles {
        let tick = evaluator.step(&candle);
        report.actions.push(tick.action);
        report.outcomes.push(tick.outcome);
    }
    report.trades = evaluator.into_trades();
    report
}

/// Final realized P&L of `weights` over `candles`. This is the optimizer's
/// fitness function.
pub fn fitness<I>(weights: StrategyWeights, settings: &StrategySettings, candles: I) -> f64
where
    I: IntoIterator<Item = Candle>,
{
    let mut evaluator = Evaluator::new(weights, settings);
    for candle in candles {
        evaluator.step(&candle);
    }
    evaluator.total()
}
