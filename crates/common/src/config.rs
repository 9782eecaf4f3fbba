use crate::RunMode;

/// All configuration loaded from environment variables at startup.
/// Missing required variables cause an immediate panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    // Job
    pub mode: RunMode,
    pub asset: String,
    /// Days of 1-minute candles to train or backtest on.
    pub history_days: u32,

    // Database
    pub database_url: String,

    // Strategy / optimizer config file path
    pub strategy_config_path: String,

    /// Seed for the optimizer RNG. Unset means a fresh seed per run.
    pub optimizer_seed: Option<u64>,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Panics on any missing required variable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let mode = parse_mode(&required_env("SPOTTER_MODE"));
        let default_days = match mode {
            RunMode::Train => 3,
            RunMode::Backtest => 1,
        };

        Config {
            mode,
            asset: optional_env("ASSET").unwrap_or_else(|| "BTCUSDT".to_string()),
            history_days: optional_env("HISTORY_DAYS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_days),
            database_url: required_env("DATABASE_URL"),
            strategy_config_path: optional_env("STRATEGY_CONFIG_PATH")
                .unwrap_or_else(|| "config/spotter.toml".to_string()),
            optimizer_seed: optional_env("OPTIMIZER_SEED").map(|v| {
                v.parse()
                    .unwrap_or_else(|_| panic!("OPTIMIZER_SEED must be an integer, got: '{v}'"))
            }),
        }
    }

    /// Number of 1-minute candles covered by `history_days`.
    pub fn history_minutes(&self) -> usize {
        self.history_days as usize * 24 * 60
    }
}

fn parse_mode(raw: &str) -> RunMode {
    match raw.to_lowercase().as_str() {
        "train" => RunMode::Train,
        "backtest" => RunMode::Backtest,
        other => panic!("ERROR: SPOTTER_MODE must be 'train' or 'backtest', got: '{other}'"),
    }
}

fn required_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        panic!("Required environment variable '{key}' is not set. Check your .env file.")
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parsing_is_case_insensitive() {
        assert_eq!(parse_mode("TRAIN"), RunMode::Train);
        assert_eq!(parse_mode("Backtest"), RunMode::Backtest);
    }

    #[test]
    #[should_panic(expected = "SPOTTER_MODE")]
    fn unknown_mode_panics() {
        parse_mode("live");
    }
}
