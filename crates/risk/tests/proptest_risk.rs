use chrono::Utc;
use common::{Candle, Position, PositionSide};
use proptest::prelude::*;
use risk::{stop_distance, ExitReason, RiskConfig, RiskGuard};

fn candle(high: f64, low: f64) -> Candle {
    Candle {
        timestamp: Utc::now(),
        open: low,
        high,
        low,
        close: high,
        volume: 1.0,
    }
}

fn side() -> impl Strategy<Value = PositionSide> {
    prop_oneof![Just(PositionSide::Long), Just(PositionSide::Short)]
}

proptest! {
    /// Risk rule evaluations on randomized f64 inputs must never panic.
    #[test]
    fn risk_rules_never_panic_on_extreme_prices(
        entry_price in 0.0001f64..1_000_000.0f64,
        low in 0.0001f64..1_000_000.0f64,
        spread in 0.0f64..10_000.0f64,
        atr in 0.0f64..10_000.0f64,
        multiplier in 1.5f64..4.0f64,
        side in side(),
    ) {
        let guard = RiskGuard::new(RiskConfig { stop_loss: true, take_profit: true });
        let position = Position { side, entry_price, entry_time: Utc::now() };
        let _ = guard.check(&position, &candle(low + spread, low), atr, multiplier);
    }

    /// A long whose candle low reaches entry − stop distance is always stopped out.
    #[test]
    fn long_breaching_stop_level_is_closed(
        entry_price in 10.0f64..100_000.0f64,
        atr in 0.01f64..5.0f64,
        multiplier in 1.5f64..4.0f64,
        overshoot in 0.0f64..5.0f64,
    ) {
        let guard = RiskGuard::default();
        let position = Position { side: PositionSide::Long, entry_price, entry_time: Utc::now() };
        let low = entry_price - stop_distance(atr, multiplier) - overshoot;
        let exit = guard.check(&position, &candle(entry_price, low), atr, multiplier);
        prop_assert!(matches!(exit, Some(ExitReason::StopLoss { .. })), "expected StopLoss exit, got {:?}", exit);
    }

    /// A candle that stays strictly inside the stop band never triggers the stop.
    #[test]
    fn candle_inside_stop_band_keeps_position(
        entry_price in 10.0f64..100_000.0f64,
        atr in 0.01f64..5.0f64,
        multiplier in 1.5f64..4.0f64,
        side in side(),
    ) {
        let guard = RiskGuard::default();
        let position = Position { side, entry_price, entry_time: Utc::now() };
        let half = stop_distance(atr, multiplier) * 0.5;
        let exit = guard.check(&position, &candle(entry_price + half, entry_price - half), atr, multiplier);
        prop_assert_eq!(exit, None);
    }
}
