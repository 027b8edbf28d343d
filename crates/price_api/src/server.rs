use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, VARY,
};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use metrics::MetricsHandle;
use price_store::PriceStore;
use serde::Serialize;
use tracing::{info, warn};

pub const ITEMS_PATH: &str = "/api/items";
pub const UPDATE_PATH: &str = "/api/items/update";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Items,
    Update,
}

impl Route {
    fn resolve(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            ITEMS_PATH => Some(Route::Items),
            UPDATE_PATH => Some(Route::Update),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Route::Items => "items",
            Route::Update => "update",
        }
    }
}

/// Everything a request handler needs. Cheap to clone.
#[derive(Clone)]
pub struct ApiState {
    store: PriceStore,
    metrics: MetricsHandle,
    allowed_origin: HeaderValue,
}

impl ApiState {
    pub fn new(store: PriceStore, metrics: MetricsHandle, allowed_origin: &str) -> Result<Self> {
        let allowed_origin = HeaderValue::from_str(allowed_origin)
            .with_context(|| format!("invalid allowed origin `{allowed_origin}`"))?;
        Ok(Self {
            store,
            metrics,
            allowed_origin,
        })
    }

    pub fn store(&self) -> &PriceStore {
        &self.store
    }

    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }
}

pub async fn handle(state: ApiState, req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let route = Route::resolve(req.uri().path());
    let mut response = match (req.method(), route) {
        (&Method::OPTIONS, Some(_)) => preflight(),
        (&Method::GET, Some(route)) => {
            state.metrics.record_request(route.label());
            match route {
                Route::Items => {
                    info!("getting all items");
                    json(StatusCode::OK, &state.store.snapshot())
                }
                Route::Update => {
                    info!("updating prices");
                    let items = state.store.apply_random_walk();
                    state.metrics.record_walk();
                    json(StatusCode::OK, &items)
                }
            }
        }
        (method, Some(_)) => {
            warn!(%method, path = req.uri().path(), "method not allowed");
            error(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
        }
        (_, None) => error(StatusCode::NOT_FOUND, "not found"),
    };
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, state.allowed_origin.clone());
    headers.insert(VARY, HeaderValue::from_static("Origin"));
    Ok(response)
}

/// Binds the API listener and returns the bound address together with the
/// server future. Port 0 picks a free port.
pub fn bind(
    state: ApiState,
    addr: SocketAddr,
) -> Result<(SocketAddr, impl Future<Output = hyper::Result<()>>)> {
    let make_svc = make_service_fn(move |_| {
        let state = state.clone();
        async move { Ok::<_, Infallible>(service_fn(move |req| handle(state.clone(), req))) }
    });
    let server = Server::try_bind(&addr)
        .with_context(|| format!("failed to bind api listener on {addr}"))?
        .serve(make_svc);
    Ok((server.local_addr(), server))
}

pub async fn serve(state: ApiState, addr: SocketAddr) -> Result<()> {
    let (local, server) = bind(state, addr)?;
    info!(addr = %local, "price api listening");
    server.await?;
    Ok(())
}

fn json<T: Serialize>(status: StatusCode, body: &T) -> Response<Body> {
    match serde_json::to_vec(body) {
        Ok(bytes) => {
            let mut response = Response::new(Body::from(bytes));
            *response.status_mut() = status;
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(err) => {
            warn!(error = ?err, "failed to encode response body");
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    }
}

fn error(status: StatusCode, message: &str) -> Response<Body> {
    json(status, &serde_json::json!({ "error": message }))
}

fn preflight() -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("*"));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    response
}
