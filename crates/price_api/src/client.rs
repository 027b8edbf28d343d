use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use catalog::Item;
use hyper::client::HttpConnector;
use hyper::{Client, Uri};
use poller::{FeedError, PriceFeed};
use tracing::debug;

pub const DEFAULT_API_URL: &str = "http://localhost:5210/api";

/// HTTP client for the price API, usable as a [`PriceFeed`].
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client<HttpConnector>,
    base: String,
}

impl ApiClient {
    /// `base_url` points at the API root, e.g. `http://localhost:5210/api`.
    pub fn new(base_url: &str) -> Result<Self> {
        let uri: Uri = base_url
            .parse()
            .with_context(|| format!("invalid api url `{base_url}`"))?;
        if uri.scheme_str() != Some("http") {
            bail!("api url must use the `http` scheme: `{base_url}`");
        }
        Ok(Self {
            http: Client::new(),
            base: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    async fn get_items(&self, path: &str) -> Result<Vec<Item>, FeedError> {
        let uri: Uri = format!("{}/{}", self.base, path)
            .parse()
            .map_err(|err| FeedError::Transport(Box::new(err)))?;
        debug!(%uri, "requesting items");
        let response = self
            .http
            .get(uri)
            .await
            .map_err(|err| FeedError::Transport(Box::new(err)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }
        let body = hyper::body::to_bytes(response.into_body())
            .await
            .map_err(|err| FeedError::Transport(Box::new(err)))?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl PriceFeed for ApiClient {
    async fn fetch_items(&self) -> Result<Vec<Item>, FeedError> {
        self.get_items("items").await
    }

    async fn fetch_updates(&self) -> Result<Vec<Item>, FeedError> {
        self.get_items("items/update").await
    }
}
