use chrono::{Duration, TimeZone, Utc};
use common::{Action, Candle, PositionSide, StrategyWeights};
use proptest::prelude::*;
use risk::stop_distance;
use strategy::{Evaluator, Strategy as _, StrategySettings};

/// Random walk built from per-candle returns and wick sizes.
fn walk(steps: &[(f64, f64)]) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    let mut close = 100.0_f64;
    steps
        .iter()
        .enumerate()
        .map(|(i, &(ret, wick))| {
            let open = close;
            close = (close * (1.0 + ret)).max(1.0);
            Candle {
                timestamp: start + Duration::minutes(i as i64),
                open,
                high: open.max(close) + wick,
                low: (open.min(close) - wick).max(0.5),
                close,
                volume: 1.0,
            }
        })
        .collect()
}

fn walk_steps(len: std::ops::Range<usize>) -> impl proptest::strategy::Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((-0.01f64..0.01f64, 0.0f64..1.5f64), len)
}

fn weights() -> impl proptest::strategy::Strategy<Value = StrategyWeights> {
    (
        0.0f64..3.0,
        0.0f64..3.0,
        0.0f64..3.0,
        0.0f64..3.0,
        0.0f64..3.0,
        0.0f64..4.0,
        1.5f64..4.0,
    )
        .prop_map(|(st, bb, ema, rsi, macd, threshold, atr)| StrategyWeights {
            super_trend_weight: st,
            bollinger_weight: bb,
            ema_weight: ema,
            rsi_weight: rsi,
            macd_weight: macd,
            strength_threshold: threshold,
            atr_multiplier: atr,
        })
}

fn settings() -> StrategySettings {
    StrategySettings {
        stabilization: 40,
        ..StrategySettings::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// One action per candle, and nothing but Hold before stabilization.
    #[test]
    fn one_action_per_candle(steps in walk_steps(0..200), w in weights()) {
        let candles = walk(&steps);
        let mut evaluator = Evaluator::new(w, &settings());
        for (i, c) in candles.iter().enumerate() {
            let tick = evaluator.step(c);
            if i < 40 {
                prop_assert_eq!(tick.action, Action::Hold);
            }
            prop_assert!(tick.outcome.is_finite());
        }
        prop_assert_eq!(evaluator.candles_seen(), candles.len());
    }

    /// A long whose candle trades through the stop is closed on that candle.
    /// The stop is measured from the latest confirmed entry.
    #[test]
    fn breached_long_stop_closes(steps in walk_steps(60..250), w in weights()) {
        let candles = walk(&steps);
        let mut evaluator = Evaluator::new(w, &settings());
        let mut long_entry: Option<f64> = None;

        for c in &candles {
            let tick = evaluator.step(c);
            if let (Some(entry), Some(reading)) = (long_entry, tick.reading) {
                if c.low <= entry - stop_distance(reading.atr, w.atr_multiplier) {
                    prop_assert_eq!(tick.action, Action::Close);
                }
            }
            long_entry = evaluator
                .strategy()
                .position()
                .filter(|p| p.side == PositionSide::Long)
                .map(|p| p.entry_price);
            match tick.action {
                Action::Buy => prop_assert_eq!(long_entry, Some(c.close)),
                Action::Close | Action::Sell => prop_assert!(long_entry.is_none()),
                Action::Hold => {}
            }
        }
    }

    /// Buy and Sell never repeat without a Close in between.
    #[test]
    fn entries_need_a_close_in_between(steps in walk_steps(60..250), w in weights()) {
        let candles = walk(&steps);
        let mut evaluator = Evaluator::new(w, &settings());
        let mut open = false;
        for c in &candles {
            match evaluator.step(c).action {
                Action::Buy | Action::Sell => {
                    prop_assert!(!open);
                    open = true;
                }
                Action::Close => {
                    prop_assert!(open);
                    open = false;
                }
                Action::Hold => {}
            }
        }
    }
}
