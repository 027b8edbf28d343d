use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use metrics::MetricsHandle;
use price_api::{serve, ApiState};
use price_store::{PriceStore, DEFAULT_ITEM_COUNT};
use tokio::{signal, task};
use tracing::{info, Level};
use uuid::Uuid;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, env = "API_ADDR", default_value = "127.0.0.1:5210")]
    listen_addr: SocketAddr,

    #[arg(long, env = "METRICS_ADDR", default_value = "127.0.0.1:9109")]
    metrics_addr: SocketAddr,

    /// Browser origin allowed to call the API.
    #[arg(long, env = "ALLOWED_ORIGIN", default_value = "http://localhost:3000")]
    allowed_origin: String,

    #[arg(
        long,
        env = "ITEM_COUNT",
        default_value_t = DEFAULT_ITEM_COUNT,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    item_count: u32,

    /// Fixed RNG seed, for reproducible price walks.
    #[arg(long, env = "PRICE_SEED")]
    seed: Option<u64>,
}

fn log_startup(args: &Args, run_id: &str) {
    info!(addr = %args.listen_addr, "api bind planned");
    info!(addr = %args.metrics_addr, "metrics bind planned");
    info!(origin = %args.allowed_origin, "cors origin configured");
    info!(items = args.item_count, seed = ?args.seed, "price store configured");
    info!(%run_id, "run initialized");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let run_id = Uuid::new_v4().to_string();
    log_startup(&args, &run_id);

    let store = PriceStore::new(args.item_count, args.seed);
    store.initialize();

    let metrics = MetricsHandle::new().context("failed to build metrics registry")?;
    let metrics_task = metrics.clone();
    let metrics_addr = args.metrics_addr;
    task::spawn(async move {
        if let Err(err) = metrics_task.serve(metrics_addr).await {
            tracing::error!(error = ?err, "metrics server error");
        }
    });

    let state = ApiState::new(store, metrics, &args.allowed_origin)?;
    info!(run_id = %run_id, addr = %args.listen_addr, "ready");

    tokio::select! {
        res = serve(state, args.listen_addr) => res?,
        _ = signal::ctrl_c() => info!(run_id = %run_id, "shutdown requested"),
    }
    Ok(())
}
