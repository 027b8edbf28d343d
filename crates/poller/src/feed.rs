use async_trait::async_trait;
use catalog::Item;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Where the board gets its snapshots from.
#[async_trait]
pub trait PriceFeed: Send + Sync + 'static {
    /// Current prices without moving them.
    async fn fetch_items(&self) -> Result<Vec<Item>, FeedError>;

    /// Asks the source to step its prices and returns the new snapshot.
    async fn fetch_updates(&self) -> Result<Vec<Item>, FeedError>;
}
