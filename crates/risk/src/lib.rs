pub mod guard;

pub use guard::{stop_distance, take_profit_distance, ExitReason, RiskConfig, RiskGuard};
