use std::convert::Infallible;
use std::net::SocketAddr;

use anyhow::Result;
use hyper::{
    header::{HeaderValue, CONTENT_TYPE},
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server, StatusCode,
};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::{info, warn};

#[derive(Clone)]
pub struct MetricsHandle {
    registry: Registry,
    api_requests: IntCounterVec,
    price_walks: IntCounter,
}

impl MetricsHandle {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let api_requests = IntCounterVec::new(
            Opts::new("price_api_requests_total", "API requests served, by route"),
            &["route"],
        )?;
        let price_walks = IntCounter::new(
            "price_store_walks_total",
            "Random walk steps applied to the price store",
        )?;
        registry.register(Box::new(api_requests.clone()))?;
        registry.register(Box::new(price_walks.clone()))?;
        Ok(Self {
            registry,
            api_requests,
            price_walks,
        })
    }

    pub fn record_request(&self, route: &str) {
        self.api_requests.with_label_values(&[route]).inc();
    }

    pub fn record_walk(&self) {
        self.price_walks.inc();
    }

    pub fn requests(&self, route: &str) -> u64 {
        self.api_requests.with_label_values(&[route]).get()
    }

    pub fn walks(&self) -> u64 {
        self.price_walks.get()
    }

    /// Text exposition of every registered metric.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }

    pub async fn serve(self, addr: SocketAddr) -> Result<()> {
        let make_svc = make_service_fn(move |_| {
            let metrics = self.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |_req: Request<Body>| {
                    let metrics = metrics.clone();
                    async move { Ok::<_, Infallible>(metrics.exposition()) }
                }))
            }
        });

        let server = Server::try_bind(&addr)?.serve(make_svc);
        info!(%addr, "metrics exporter listening");
        server.await?;
        Ok(())
    }

    fn exposition(&self) -> Response<Body> {
        match self.encode() {
            Ok(buffer) => {
                let mut response = Response::new(Body::from(buffer));
                if let Ok(value) = TextEncoder::new().format_type().parse::<HeaderValue>() {
                    response.headers_mut().insert(CONTENT_TYPE, value);
                }
                response
            }
            Err(err) => {
                warn!(error = ?err, "failed to encode metrics");
                let mut response = Response::new(Body::empty());
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
        }
    }
}
