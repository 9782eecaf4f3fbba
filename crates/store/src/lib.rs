//! SQLite persistence for candles, trained genomes and backtest results.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use common::{
    Candle, CandleSource, Error, OutcomeStore, Result, Score, StrategyWeights, TradeOutcome,
    WeightStore,
};

type CandleRow = (String, f64, f64, f64, f64, f64);

/// One pool shared by every store trait.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    /// Connect to `url`, creating the database file if needed, and apply
    /// pending migrations.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        // Each connection to an in-memory database sees its own database.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let db = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { db };
        store.migrate().await?;
        info!("Database ready");
        Ok(store)
    }

    /// Fresh private database, mostly for tests and dry runs.
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.db).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    /// Upsert candles for `asset`, keyed by timestamp.
    pub async fn insert_candles(&self, asset: &str, candles: &[Candle]) -> Result<u64> {
        let mut tx = self.db.begin().await?;
        let mut written = 0;
        for candle in candles {
            written += sqlx::query(
                r#"
                INSERT INTO snapshots (asset, date, open, high, low, close, volume)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(asset, date) DO UPDATE SET
                    open = excluded.open,
                    high = excluded.high,
                    low = excluded.low,
                    close = excluded.close,
                    volume = excluded.volume
                "#,
            )
            .bind(asset)
            .bind(timestamp(candle.timestamp))
            .bind(candle.open)
            .bind(candle.high)
            .bind(candle.low)
            .bind(candle.close)
            .bind(candle.volume)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }
        tx.commit().await?;
        debug!(asset, written, "Candles stored");
        Ok(written)
    }
}

#[async_trait]
impl CandleSource for SqliteStore {
    async fn candles(&self, asset: &str, limit: usize) -> Result<Vec<Candle>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<CandleRow> = sqlx::query_as(
            r#"
            SELECT date, open, high, low, close, volume FROM snapshots
            WHERE asset = ?1
            ORDER BY date DESC
            LIMIT ?2
            "#,
        )
        .bind(asset)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        // Newest-first from the query; callers get oldest first.
        let mut candles = rows
            .into_iter()
            .map(candle_from_row)
            .collect::<Result<Vec<_>>>()?;
        candles.reverse();
        debug!(asset, count = candles.len(), "Candles loaded");
        Ok(candles)
    }

    async fn latest_candle(&self, asset: &str) -> Result<Option<Candle>> {
        let row: Option<CandleRow> = sqlx::query_as(
            r#"
            SELECT date, open, high, low, close, volume FROM snapshots
            WHERE asset = ?1
            ORDER BY date DESC
            LIMIT 1
            "#,
        )
        .bind(asset)
        .fetch_optional(&self.db)
        .await?;
        row.map(candle_from_row).transpose()
    }

    async fn prune_before(&self, asset: &str, cutoff: DateTime<Utc>) -> Result<u64> {
        let removed = sqlx::query("DELETE FROM snapshots WHERE asset = ?1 AND date < ?2")
            .bind(asset)
            .bind(timestamp(cutoff))
            .execute(&self.db)
            .await?
            .rows_affected();
        info!(asset, removed, cutoff = %cutoff, "Pruned old candles");
        Ok(removed)
    }
}

#[async_trait]
impl WeightStore for SqliteStore {
    async fn latest_weights(&self, asset: &str) -> Result<Option<StrategyWeights>> {
        let genome: Option<String> = sqlx::query_scalar(
            r#"
            SELECT genome FROM genomes
            WHERE asset = ?1
            ORDER BY date DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(asset)
        .fetch_optional(&self.db)
        .await?;

        match genome {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn store_score(&self, asset: &str, score: &Score) -> Result<()> {
        let genome = serde_json::to_string(&score.weights)?;
        sqlx::query("INSERT INTO genomes (asset, date, genome, fitness) VALUES (?1, ?2, ?3, ?4)")
            .bind(asset)
            .bind(timestamp(Utc::now()))
            .bind(genome)
            .bind(score.fitness)
            .execute(&self.db)
            .await?;
        info!(asset, fitness = score.fitness, "Genome stored");
        Ok(())
    }
}

#[async_trait]
impl OutcomeStore for SqliteStore {
    async fn store_outcome(&self, outcome: &TradeOutcome) -> Result<()> {
        sqlx::query("INSERT INTO trade_results (asset, date, result) VALUES (?1, ?2, ?3)")
            .bind(&outcome.asset)
            .bind(timestamp(outcome.recorded_at))
            .bind(outcome.result)
            .execute(&self.db)
            .await?;
        info!(asset = %outcome.asset, result = outcome.result, "Trade result stored");
        Ok(())
    }
}

/// Fixed-width UTC text so lexical order is time order.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn candle_from_row((date, open, high, low, close, volume): CandleRow) -> Result<Candle> {
    let timestamp = DateTime::parse_from_rfc3339(&date)
        .map_err(|e| Error::Other(format!("bad snapshot date '{date}': {e}")))?
        .with_timezone(&Utc);
    Ok(Candle {
        timestamp,
        open,
        high,
        low,
        close,
        volume,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn minute_candles(n: usize) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let close = 100.0 + i as f64;
                Candle {
                    timestamp: start + Duration::minutes(i as i64),
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 3.0,
                }
            })
            .collect()
    }

    #[tokio::test]
    async fn candles_come_back_oldest_first() {
        let store = SqliteStore::in_memory().await.unwrap();
        let candles = minute_candles(10);
        // Insert out of order.
        let mut shuffled = candles.clone();
        shuffled.reverse();
        store.insert_candles("BTCUSDT", &shuffled).await.unwrap();

        let loaded = store.candles("BTCUSDT", 4).await.unwrap();
        assert_eq!(loaded, candles[6..].to_vec());

        let all = store.candles("BTCUSDT", 100).await.unwrap();
        assert_eq!(all, candles);
        assert!(store.candles("ETHUSDT", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reinserting_a_candle_updates_it() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut candles = minute_candles(3);
        store.insert_candles("BTCUSDT", &candles).await.unwrap();
        candles[2].close = 999.0;
        store.insert_candles("BTCUSDT", &candles[2..]).await.unwrap();

        let loaded = store.candles("BTCUSDT", 10).await.unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(store.latest_candle("BTCUSDT").await.unwrap().unwrap().close, 999.0);
    }

    #[tokio::test]
    async fn prune_removes_only_older_candles() {
        let store = SqliteStore::in_memory().await.unwrap();
        let candles = minute_candles(10);
        store.insert_candles("BTCUSDT", &candles).await.unwrap();

        let removed = store.prune_before("BTCUSDT", candles[4].timestamp).await.unwrap();
        assert_eq!(removed, 4);
        assert_eq!(store.candles("BTCUSDT", 100).await.unwrap(), candles[4..].to_vec());
    }

    #[tokio::test]
    async fn missing_weights_are_none() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert_eq!(store.latest_weights("BTCUSDT").await.unwrap(), None);
    }

    #[tokio::test]
    async fn latest_stored_genome_wins() {
        let store = SqliteStore::in_memory().await.unwrap();
        let first = Score {
            weights: StrategyWeights::default(),
            fitness: 1.0,
        };
        let second = Score {
            weights: StrategyWeights {
                ema_weight: 2.5,
                strength_threshold: 3.0,
                ..StrategyWeights::default()
            },
            fitness: 7.5,
        };
        store.store_score("BTCUSDT", &first).await.unwrap();
        store.store_score("BTCUSDT", &second).await.unwrap();

        assert_eq!(
            store.latest_weights("BTCUSDT").await.unwrap(),
            Some(second.weights)
        );
        assert_eq!(store.latest_weights("ETHUSDT").await.unwrap(), None);
    }

    #[tokio::test]
    async fn outcomes_are_appended() {
        let store = SqliteStore::in_memory().await.unwrap();
        for result in [12.5, -3.0] {
            store
                .store_outcome(&TradeOutcome {
                    asset: "BTCUSDT".into(),
                    result,
                    recorded_at: Utc::now(),
                })
                .await
                .unwrap();
        }
        let total: f64 = sqlx::query_scalar("SELECT SUM(result) FROM trade_results")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(total, 9.5);
    }
}
