//! HTTP boundary of the price board: the routes served over a
//! [`price_store::PriceStore`] and the client the poller fetches through.

mod client;
mod server;

pub use client::{ApiClient, DEFAULT_API_URL};
pub use server::{bind, handle, serve, ApiState, ITEMS_PATH, UPDATE_PATH};
