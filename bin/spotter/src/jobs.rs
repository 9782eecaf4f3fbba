use std::future::Future;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use common::{
    Action, CandleSource, Config, OutcomeStore, Result, Score, StrategyWeights, TradeOutcome,
    WeightStore,
};
use optimizer::{GeneticOptimizer, OptimizationReport};
use strategy::{spawn_evaluation, ReplayWindow, StreamSummary};

use crate::settings::SpotterFileConfig;

const CHANNEL_CAPACITY: usize = 256;

/// Extra candles loaded for training on top of the requested history.
const TRAIN_HEADROOM: usize = 60;

/// Tune weights on recent history and persist the winner.
pub async fn train<S>(store: &S, cfg: &Config, file: &SpotterFileConfig) -> Result<OptimizationReport>
where
    S: CandleSource + WeightStore,
{
    let limit = cfg.history_minutes() + TRAIN_HEADROOM;
    trim_history(store, &cfg.asset, limit).await?;
    let candles = store.candles(&cfg.asset, limit).await?;
    if candles.len() < limit {
        warn!(
            asset = %cfg.asset,
            loaded = candles.len(),
            requested = limit,
            "Fewer candles than requested"
        );
    }

    let mut genetic = file.optimizer.clone();
    if cfg.optimizer_seed.is_some() {
        genetic.seed = cfg.optimizer_seed;
    }

    let mut optimizer = GeneticOptimizer::new(genetic, file.strategy.clone())?;
    let report = optimizer.run(ReplayWindow::new(candles)).await?;

    store.store_score(&cfg.asset, &report.best).await?;
    info!(
        asset = %cfg.asset,
        fitness = report.best.fitness,
        weights = ?report.best.weights,
        "Training complete"
    );
    Ok(report)
}

/// Keep only the newest `minutes` of candles for `asset`.
async fn trim_history<S: CandleSource>(store: &S, asset: &str, minutes: usize) -> Result<u64> {
    let Some(latest) = store.latest_candle(asset).await? else {
        return Ok(0);
    };
    let span = i64::try_from(minutes).unwrap_or(i64::MAX);
    let cutoff = latest.timestamp - Duration::minutes(span);
    store.prune_before(asset, cutoff).await
}

/// Replay recent history with the latest trained weights, log every action
/// and persist the final outcome.
///
/// If `shutdown` resolves first, the outcome reached so far is stored.
pub async fn backtest<S, F>(
    store: &S,
    cfg: &Config,
    file: &SpotterFileConfig,
    shutdown: F,
) -> Result<TradeOutcome>
where
    S: CandleSource + WeightStore + OutcomeStore,
    F: Future<Output = ()>,
{
    let weights = match store.latest_weights(&cfg.asset).await? {
        Some(weights) => weights,
        None => {
            warn!(asset = %cfg.asset, "No trained weights; using defaults");
            StrategyWeights::default()
        }
    };
    let weights = weights.clamped();

    let candles = store.candles(&cfg.asset, cfg.history_minutes()).await?;
    info!(asset = %cfg.asset, candles = candles.len(), weights = ?weights, "Backtest starting");

    let mut settings = file.strategy.clone();
    settings.log_trades = true;

    let window = ReplayWindow::new(candles);
    let (candle_rx, feeder) = window.into_channel(CHANNEL_CAPACITY);
    let (mut ticks, evaluation) = spawn_evaluation(candle_rx, weights, settings, CHANNEL_CAPACITY);

    tokio::pin!(shutdown);
    let mut outcome = 0.0;
    let mut interrupted = false;
    loop {
        tokio::select! {
            tick = ticks.recv() => match tick {
                Some(tick) => {
                    outcome = tick.outcome;
                    if tick.action == Action::Hold {
                        debug!(price = tick.candle.close, outcome, "Action: {}", tick.action);
                    } else {
                        info!(price = tick.candle.close, outcome, "Action: {}", tick.action);
                    }
                }
                None => break,
            },
            _ = &mut shutdown => {
                warn!("Shutdown requested; storing partial outcome");
                interrupted = true;
                break;
            }
        }
    }

    if interrupted {
        feeder.abort();
        evaluation.abort();
    } else {
        feeder.await?;
        let StreamSummary { candles, outcome: total } = evaluation.await?;
        debug!(candles, total, "Evaluation joined");
        outcome = total;
    }

    let result = TradeOutcome {
        asset: cfg.asset.clone(),
        result: outcome,
        recorded_at: Utc::now(),
    };
    store.store_outcome(&result).await?;
    info!(asset = %cfg.asset, outcome, "Backtest complete");
    Ok(result)
}

/// Convenience for logging the genome a training run settled on.
pub fn describe(score: &Score) -> String {
    let w = &score.weights;
    format!(
        "fitness {:.4} | st {:.2} bb {:.2} ema {:.2} rsi {:.2} macd {:.2} | threshold {:.2} atr x{:.2}",
        score.fitness,
        w.super_trend_weight,
        w.bollinger_weight,
        w.ema_weight,
        w.rsi_weight,
        w.macd_weight,
        w.strength_threshold,
        w.atr_multiplier,
    )
}
