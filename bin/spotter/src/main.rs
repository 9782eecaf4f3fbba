mod jobs;
mod settings;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::{Config, RunMode};
use store::SqliteStore;

use crate::settings::SpotterFileConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    info!(mode = %cfg.mode, asset = %cfg.asset, days = cfg.history_days, "Spotter starting");

    let file = SpotterFileConfig::load(&cfg.strategy_config_path)
        .with_context(|| format!("loading {}", cfg.strategy_config_path))?;

    // ── Database ──────────────────────────────────────────────────────────────
    let store = SqliteStore::connect(&cfg.database_url)
        .await
        .context("connecting to database")?;

    // ── Job ───────────────────────────────────────────────────────────────────
    match cfg.mode {
        RunMode::Train => {
            let report = jobs::train(&store, &cfg, &file).await.context("training")?;
            info!("Best genome: {}", jobs::describe(&report.best));
        }
        RunMode::Backtest => {
            let shutdown = async {
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            };
            let outcome = jobs::backtest(&store, &cfg, &file, shutdown)
                .await
                .context("backtesting")?;
            info!("Outcome: {:.4}", outcome.result);
        }
    }

    Ok(())
}
