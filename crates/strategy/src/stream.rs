use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use common::{Candle, StrategyWeights};

use crate::backtest::{Evaluator, Tick};
use crate::config::StrategySettings;

/// Summary returned when a streamed evaluation finishes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamSummary {
    pub candles: usize,
    pub outcome: f64,
}

/// Run an evaluator over a candle channel as its own task.
///
/// Emits one [`Tick`] per received candle, in order, and closes the tick
/// channel once `candles` closes. The input is always consumed to the end:
/// if the tick receiver goes away the task keeps evaluating silently so the
/// summary still covers the full stream.
pub fn spawn_evaluation(
    mut candles: mpsc::Receiver<Candle>,
    weights: StrategyWeights,
    settings: StrategySettings,
    capacity: usize,
) -> (mpsc::Receiver<Tick>, JoinHandle<StreamSummary>) {
    let (tick_tx, tick_rx) = mpsc::channel(capacity.max(1));

    let handle = tokio::spawn(async move {
        let mut evaluator = Evaluator::new(weights, &settings);
        let mut downstream = Some(tick_tx);

        while let Some(candle) = candles.recv().await {
            let tick = evaluator.step(&candle);
            if let Some(tx) = &downstream {
                if tx.send(tick).await.is_err() {
                    warn!("Tick receiver dropped; continuing evaluation without output");
                    downstream = None;
                }
            }
        }

        let summary = StreamSummary {
            candles: evaluator.candles_seen(),
            outcome: evaluator.total(),
        };
        info!(candles = summary.candles, outcome = summary.outcome, "Candle stream closed");
        summary
    });

    (tick_rx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::run_backtest;
    use crate::feed::ReplayWindow;
    use crate::indicators::candles_from_closes;
    use common::Action;

    fn wave(n: usize) -> Vec<Candle> {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + (i as f64 / 6.0).sin() * 6.0).collect();
        candles_from_closes(&closes)
    }

    #[tokio::test]
    async fn streamed_ticks_match_synchronous_backtest() {
        let candles = wave(300);
        let settings = StrategySettings::default();
        let weights = StrategyWeights {
            strength_threshold: 0.5,
            ..StrategyWeights::default()
        };
        let expected = run_backtest(weights, &settings, candles.clone());

        let window = ReplayWindow::new(candles);
        let (rx, _feeder) = window.into_channel(8);
        let (mut ticks, handle) = spawn_evaluation(rx, weights, settings, 8);

        let mut actions = Vec::new();
        while let Some(tick) = ticks.recv().await {
            actions.push(tick.action);
        }
        let summary = handle.await.unwrap();

        assert_eq!(actions, expected.actions);
        assert_eq!(summary.candles, 300);
        assert_eq!(summary.outcome, expected.final_outcome());
    }

    #[tokio::test]
    async fn early_close_upstream_ends_cleanly() {
        let candles = wave(300);
        let (tx, rx) = mpsc::channel(4);
        let (mut ticks, handle) =
            spawn_evaluation(rx, StrategyWeights::default(), StrategySettings::default(), 4);

        let producer = tokio::spawn(async move {
            for c in candles.into_iter().take(10) {
                tx.send(c).await.unwrap();
            }
            // tx dropped here: upstream closes early
        });

        let mut received = Vec::new();
        while let Some(tick) = ticks.recv().await {
            received.push(tick);
        }
        producer.await.unwrap();
        let summary = handle.await.unwrap();

        assert_eq!(received.len(), 10);
        assert!(received.iter().all(|t| t.action == Action::Hold && t.reading.is_none()));
        assert_eq!(summary, StreamSummary { candles: 10, outcome: 0.0 });
    }

    #[tokio::test]
    async fn dropped_tick_receiver_still_drains_input() {
        let window = ReplayWindow::new(wave(120));
        let (rx, feeder) = window.into_channel(2);
        let (ticks, handle) =
            spawn_evaluation(rx, StrategyWeights::default(), StrategySettings::default(), 1);
        drop(ticks);

        feeder.await.unwrap();
        assert_eq!(handle.await.unwrap().candles, 120);
    }
}
