use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{Candle, Result, Score, StrategyWeights, TradeOutcome};

/// Historical candle provider.
///
/// `SqliteStore` in `crates/store` implements this over the `snapshots`
/// table. Implementations return candles in ascending time order.
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// The most recent `limit` candles for `asset`, oldest first.
    async fn candles(&self, asset: &str, limit: usize) -> Result<Vec<Candle>>;

    /// Most recent stored candle for `asset`.
    async fn latest_candle(&self, asset: &str) -> Result<Option<Candle>>;

    /// Delete candles of `asset` older than `cutoff`. Returns rows removed.
    async fn prune_before(&self, asset: &str, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// Persistence for trained genomes.
#[async_trait]
pub trait WeightStore: Send + Sync {
    /// Latest stored weights for `asset`, or `None` when the asset was never
    /// trained. Callers fall back to `StrategyWeights::default()`.
    async fn latest_weights(&self, asset: &str) -> Result<Option<StrategyWeights>>;

    /// Persist the winning genome of an optimization run.
    async fn store_score(&self, asset: &str, score: &Score) -> Result<()>;
}

/// Persistence for realized results of backtest and replay runs.
#[async_trait]
pub trait OutcomeStore: Send + Sync {
    async fn store_outcome(&self, outcome: &TradeOutcome) -> Result<()>;
}
