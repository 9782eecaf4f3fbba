use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use common::Candle;

/// Broadcast one candle stream to `consumers` independent receivers.
///
/// A single pump task forwards every candle, in order, to each output queue
/// (`capacity` deep). Backpressure is shared: the pump waits for the slowest
/// consumer. When `input` closes, every output closes exactly once. A
/// consumer that drops its receiver is detached; the others keep receiving.
///
/// Returns the receivers and the pump handle, which resolves to the number of
/// candles forwarded.
pub fn fan_out(
    mut input: mpsc::Receiver<Candle>,
    consumers: usize,
    capacity: usize,
) -> (Vec<mpsc::Receiver<Candle>>, JoinHandle<usize>) {
    let (mut senders, receivers): (Vec<_>, Vec<_>) =
        (0..consumers).map(|_| mpsc::channel(capacity.max(1))).unzip();

    let pump = tokio::spawn(async move {
        let mut forwarded = 0;
        while let Some(candle) = input.recv().await {
            let mut detached = Vec::new();
            for (i, tx) in senders.iter().enumerate() {
                if tx.send(candle).await.is_err() {
                    detached.push(i);
                }
            }
            for i in detached.into_iter().rev() {
                warn!(consumer = i, "Fan-out consumer dropped; detaching");
                senders.remove(i);
            }
            forwarded += 1;
        }
        debug!(forwarded, "Fan-out input closed; closing all outputs");
        forwarded
    });

    (receivers, pump)
}

/// A bounded candle window materialized once and replayed any number of
/// times.
///
/// Each [`Replay`] is an independent cursor over the shared buffer, so many
/// concurrent consumers read the same candles without copying them and
/// without being able to mutate them.
#[derive(Debug, Clone)]
pub struct ReplayWindow {
    candles: Arc<[Candle]>,
}

impl Default for ReplayWindow {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ReplayWindow {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self {
            candles: candles.into(),
        }
    }

    /// Fresh cursor positioned at the first candle.
    pub fn replay(&self) -> Replay {
        Replay {
            candles: Arc::clone(&self.candles),
            position: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// Push the whole window into a channel, closing it at the end. Stops
    /// early if the receiver goes away.
    pub fn into_channel(&self, capacity: usize) -> (mpsc::Receiver<Candle>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let replay = self.replay();
        let handle = tokio::spawn(async move {
            for candle in replay {
                if tx.send(candle).await.is_err() {
                    break;
                }
            }
        });
        (rx, handle)
    }
}

/// Cursor over a [`ReplayWindow`].
#[derive(Debug, Clone)]
pub struct Replay {
    candles: Arc<[Candle]>,
    position: usize,
}

impl Iterator for Replay {
    type Item = Candle;

    fn next(&mut self) -> Option<Candle> {
        let candle = self.candles.get(self.position).copied()?;
        self.position += 1;
        Some(candle)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.candles.len() - self.position;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Replay {}
