use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

use crate::board::Board;
use crate::feed::{FeedError, PriceFeed};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    Unsubscribed,
    Subscribed,
}

/// Owns the polling lifecycle of one board.
///
/// While subscribed, a timer task starts a fetch-and-diff cycle every
/// `interval`. The timer never waits on a fetch: each cycle runs in its own
/// task and applies its result through the board's watch channel. Cycles are
/// numbered when started, and a result that lands after a newer cycle's has
/// been applied is dropped. Dropping the controller cancels the timer.
pub struct PollController<F> {
    feed: Arc<F>,
    board: Arc<watch::Sender<Board>>,
    interval: Duration,
    next_seq: Arc<AtomicU64>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl<F: PriceFeed> PollController<F> {
    pub fn new(feed: F) -> Self {
        Self::with_interval(feed, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_interval(feed: F, interval: Duration) -> Self {
        let (board, _) = watch::channel(Board::default());
        Self {
            feed: Arc::new(feed),
            board: Arc::new(board),
            interval,
            next_seq: Arc::new(AtomicU64::new(1)),
            ticker: Mutex::new(None),
        }
    }

    pub fn board(&self) -> Board {
        self.board.borrow().clone()
    }

    /// Receiver notified every time the board changes.
    pub fn watch(&self) -> watch::Receiver<Board> {
        self.board.subscribe()
    }

    pub fn subscription(&self) -> Subscription {
        if self.ticker().is_some() {
            Subscription::Subscribed
        } else {
            Subscription::Unsubscribed
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription() == Subscription::Subscribed
    }

    /// Fetches the full item list and makes it both the visible rows and the
    /// diff baseline. On failure the board is emptied and shows an error.
    pub async fn initial_load(&self) -> Result<(), FeedError> {
        self.board.send_modify(Board::begin_load);
        match self.feed.fetch_items().await {
            Ok(items) => {
                info!(items = items.len(), "initial load complete");
                self.board.send_modify(|board| board.finish_load(items));
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "failed to fetch items");
                self.board.send_modify(Board::fail_load);
                Err(err)
            }
        }
    }

    /// Starts polling: one cycle right away, then one per interval.
    /// Returns `false` when already subscribed. Must be called from within a
    /// tokio runtime.
    pub fn subscribe(&self) -> bool {
        let mut ticker = self.ticker();
        if ticker.is_some() {
            debug!("already subscribed");
            return false;
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        tokio::spawn(run_cycle(self.feed.clone(), self.board.clone(), seq));

        let feed = self.feed.clone();
        let board = self.board.clone();
        let next_seq = self.next_seq.clone();
        let period = self.interval;
        *ticker = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                let seq = next_seq.fetch_add(1, Ordering::Relaxed);
                tokio::spawn(run_cycle(feed.clone(), board.clone(), seq));
            }
        }));
        info!(interval_ms = period.as_millis() as u64, "subscribed to price updates");
        true
    }

    /// Stops the timer. Cycles already in flight still complete and apply.
    /// Returns `false` when not subscribed.
    pub fn unsubscribe(&self) -> bool {
        match self.ticker().take() {
            Some(handle) => {
                handle.abort();
                info!("unsubscribed from price updates");
                true
            }
            None => false,
        }
    }

    pub fn shutdown(&self) {
        self.unsubscribe();
    }
}

impl<F> PollController<F> {
    fn ticker(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.ticker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<F> Drop for PollController<F> {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker().take() {
            handle.abort();
        }
    }
}

async fn run_cycle<F: PriceFeed>(feed: Arc<F>, board: Arc<watch::Sender<Board>>, seq: u64) {
    match feed.fetch_updates().await {
        Ok(items) => {
            debug!(seq, items = items.len(), "price update received");
            if !board.send_if_modified(|board| board.apply_update(seq, items)) {
                debug!(seq, "dropped out-of-order price update");
            }
        }
        Err(err) => warn!(error = %err, "failed to fetch price updates"),
    }
}
