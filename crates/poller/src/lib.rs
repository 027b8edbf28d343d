//! Client side of the price board: pulls snapshots through a [`PriceFeed`],
//! tags every row with its price direction and keeps polling on a fixed
//! cadence while subscribed.

mod board;
mod controller;
mod diff;
mod feed;

pub use board::{Board, LOAD_ERROR_MESSAGE};
pub use controller::{PollController, Subscription, DEFAULT_POLL_INTERVAL};
pub use diff::classify;
pub use feed::{BoxError, FeedError, PriceFeed};
