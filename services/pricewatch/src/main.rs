use std::sync::Arc;
use std::time::Duration;

use admin_ipc::{run_server, DEFAULT_SOCKET_PATH};
use clap::Parser;
use poller::PollController;
use price_api::{ApiClient, DEFAULT_API_URL};
use tokio::{signal, task};
use tracing::{info, warn, Level};

mod control;
mod render;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, env = "PRICE_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    #[arg(long, env = "ADMIN_SOCKET", default_value = DEFAULT_SOCKET_PATH)]
    admin_socket: String,

    #[arg(
        long,
        env = "POLL_INTERVAL_MS",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    interval_ms: u64,

    /// Subscribe to price updates once the initial load succeeds.
    #[arg(long)]
    subscribe: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!(
        api = %args.api_url,
        socket = %args.admin_socket,
        interval_ms = args.interval_ms,
        "booting pricewatch"
    );

    let client = ApiClient::new(&args.api_url)?;
    let controller = Arc::new(PollController::with_interval(
        client,
        Duration::from_millis(args.interval_ms),
    ));

    let mut board_rx = controller.watch();
    task::spawn(async move {
        while board_rx.changed().await.is_ok() {
            let board = board_rx.borrow_and_update().clone();
            print!("{}", render::render(&board));
        }
    });

    let admin_controller = controller.clone();
    let socket_path = args.admin_socket.clone();
    task::spawn(async move {
        let handler = move |req| {
            let controller = admin_controller.clone();
            async move { control::dispatch(&controller, req).await }
        };
        if let Err(err) = run_server(socket_path, handler).await {
            tracing::error!(error = ?err, "admin ipc server failed");
        }
    });

    match controller.initial_load().await {
        Ok(()) if args.subscribe => {
            controller.subscribe();
        }
        Ok(()) => info!("loaded; waiting for a subscribe request"),
        Err(_) => warn!("initial load failed; send a reload request to retry"),
    }

    signal::ctrl_c().await?;
    controller.shutdown();
    info!("shutdown requested");
    Ok(())
}
