use serde::{Deserialize, Serialize};

use common::{Error, Result};
use risk::RiskConfig;

/// Strategy tunables that are not part of the genome.
///
/// Loaded from the `[strategy]` table of the config file (TOML):
/// ```toml
/// [strategy]
/// stabilization = 100
/// log_trades = false
///
/// [strategy.risk]
/// stop_loss = true
/// take_profit = false
///
/// [strategy.indicators]
/// ema_fast = 5
/// ema_slow = 20
///
/// [strategy.thresholds]
/// rsi_overbought = 70.0
/// ```
/// Every field is optional and falls back to the defaults below.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StrategySettings {
    /// Candles to consume before the first decision. Everything before this
    /// index is a Hold.
    pub stabilization: usize,
    /// Log every realized trade at `debug` level.
    pub log_trades: bool,
    pub risk: RiskConfig,
    pub indicators: IndicatorSettings,
    pub thresholds: SignalThresholds,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            stabilization: 100,
            log_trades: false,
            risk: RiskConfig::default(),
            indicators: IndicatorSettings::default(),
            thresholds: SignalThresholds::default(),
        }
    }
}

impl StrategySettings {
    pub fn validate(&self) -> Result<()> {
        self.indicators.validate()
    }
}

/// Indicator periods.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IndicatorSettings {
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_std_devs: f64,
    pub atr_period: usize,
    pub super_trend_period: usize,
    pub super_trend_multiplier: f64,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            ema_fast: 5,
            ema_slow: 20,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_std_devs: 2.0,
            atr_period: 14,
            super_trend_period: 10,
            super_trend_multiplier: 3.0,
        }
    }
}

impl IndicatorSettings {
    /// Reject periods the indicators cannot be built with.
    pub fn validate(&self) -> Result<()> {
        let minimums = [
            ("ema_fast", self.ema_fast, 1),
            ("ema_slow", self.ema_slow, 1),
            ("rsi_period", self.rsi_period, 2),
            ("macd_fast", self.macd_fast, 1),
            ("macd_signal", self.macd_signal, 1),
            ("bollinger_period", self.bollinger_period, 2),
            ("atr_period", self.atr_period, 1),
            ("super_trend_period", self.super_trend_period, 1),
        ];
        for (name, value, min) in minimums {
            if value < min {
                return Err(Error::Config(format!("{name} must be at least {min}, got {value}")));
            }
        }
        if self.macd_fast >= self.macd_slow {
            return Err(Error::Config(format!(
                "macd_fast ({}) must be less than macd_slow ({})",
                self.macd_fast, self.macd_slow
            )));
        }
        for (name, value) in [
            ("bollinger_std_devs", self.bollinger_std_devs),
            ("super_trend_multiplier", self.super_trend_multiplier),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::Config(format!("{name} must be positive, got {value}")));
            }
        }
        Ok(())
    }
}

/// Fixed levels used by the RSI and MACD votes.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SignalThresholds {
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    /// MACD histogram must exceed ± this value to vote.
    pub macd_dead_band: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            macd_dead_band: 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_table_keeps_defaults() {
        let settings: StrategySettings = toml::from_str(
            r#"
            stabilization = 299

            [risk]
            take_profit = true

            [indicators]
            ema_fast = 8
            "#,
        )
        .unwrap();

        assert_eq!(settings.stabilization, 299);
        assert!(settings.risk.stop_loss);
        assert!(settings.risk.take_profit);
        assert_eq!(settings.indicators.ema_fast, 8);
        assert_eq!(settings.indicators.ema_slow, 20);
        assert_eq!(settings.thresholds, SignalThresholds::default());
    }

    #[test]
    fn default_periods_are_valid() {
        assert!(StrategySettings::default().validate().is_ok());
    }

    #[test]
    fn inverted_macd_periods_are_a_config_error() {
        let settings: StrategySettings = toml::from_str(
            r#"
            [indicators]
            macd_fast = 30
            "#,
        )
        .unwrap();
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("macd_fast")), "{err}");
    }

    #[test]
    fn too_short_periods_are_rejected() {
        for indicators in [
            IndicatorSettings { rsi_period: 1, ..IndicatorSettings::default() },
            IndicatorSettings { bollinger_period: 1, ..IndicatorSettings::default() },
            IndicatorSettings { ema_slow: 0, ..IndicatorSettings::default() },
            IndicatorSettings { atr_period: 0, ..IndicatorSettings::default() },
            IndicatorSettings { bollinger_std_devs: 0.0, ..IndicatorSettings::default() },
        ] {
            assert!(matches!(indicators.validate(), Err(Error::Config(_))), "{indicators:?}");
        }
    }
}
