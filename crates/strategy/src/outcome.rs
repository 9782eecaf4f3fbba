use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use common::{Action, Candle, PositionSide};

/// One round trip observed on the action stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub side: PositionSide,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub pnl: f64,
    /// Candles between entry and exit.
    pub bars_held: usize,
    /// Highest high and lowest low while the trade was open.
    pub high: f64,
    pub low: f64,
}

#[derive(Debug, Clone, Copy)]
struct OpenTrade {
    side: PositionSide,
    entry_price: f64,
    entry_time: DateTime<Utc>,
    bars: usize,
    high: f64,
    low: f64,
}

/// Replays a (candle, action) stream into a running realized P&L.
///
/// Tracks its own view of the position from the actions alone, so it never
/// shares state with the strategy that produced them. Trades still open when
/// the stream ends contribute nothing.
#[derive(Debug, Clone, Default)]
pub struct OutcomeAccumulator {
    open: Option<OpenTrade>,
    realized: f64,
    trades: Vec<ClosedTrade>,
    log_trades: bool,
}

impl OutcomeAccumulator {
    pub fn new(log_trades: bool) -> Self {
        Self {
            log_trades,
            ..Self::default()
        }
    }

    /// Apply one candle and its action. Returns the running total.
    pub fn apply(&mut self, candle: &Candle, action: Action) -> f64 {
        let close = candle.close;

        if let Some(open) = self.open.as_mut() {
            open.bars += 1;
            open.high = open.high.max(candle.high);
            open.low = open.low.min(candle.low);
        }

        match (self.open, action) {
            (None, Action::Buy) => self.enter(PositionSide::Long, candle),
            (None, Action::Sell) => self.enter(PositionSide::Short, candle),
            (Some(open), Action::Close) => {
                let pnl = match open.side {
                    PositionSide::Long => close - open.entry_price,
                    PositionSide::Short => open.entry_price - close,
                };
                self.realized += pnl;
                self.open = None;

                let trade = ClosedTrade {
                    side: open.side,
                    entry_price: open.entry_price,
                    exit_price: close,
                    entry_time: open.entry_time,
                    exit_time: candle.timestamp,
                    pnl,
                    bars_held: open.bars,
                    high: open.high,
                    low: open.low,
                };
                if self.log_trades {
                    debug!(
                        side = %trade.side,
                        entry = trade.entry_price,
                        exit = trade.exit_price,
                        pnl = trade.pnl,
                        bars = trade.bars_held,
                        high = trade.high,
                        low = trade.low,
                        total = self.realized,
                        "Position closed"
                    );
                }
                self.trades.push(trade);
            }
            _ => {}
        }

        self.realized
    }

    fn enter(&mut self, side: PositionSide, candle: &Candle) {
        self.open = Some(OpenTrade {
            side,
            entry_price: candle.close,
            entry_time: candle.timestamp,
            bars: 0,
            high: candle.close,
            low: candle.close,
        });
    }

    pub fn total(&self) -> f64 {
        self.realized
    }

    pub fn trades(&self) -> &[ClosedTrade] {
        &self.trades
    }

    pub fn into_trades(self) -> Vec<ClosedTrade> {
        self.trades
    }

    pub fn open_side(&self) -> Option<PositionSide> {
        self.open.map(|o| o.side)
    }
}
