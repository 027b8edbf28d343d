use admin_ipc::{send_request, AdminRequest, AdminResponse, DEFAULT_SOCKET_PATH};
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, env = "ADMIN_SOCKET", default_value = DEFAULT_SOCKET_PATH)]
    socket: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Subscription state, item count and last load error.
    Status,
    /// Start polling for price updates.
    Subscribe,
    /// Stop polling.
    Unsubscribe,
    /// Retry the initial item load.
    Reload,
}

impl From<Command> for AdminRequest {
    fn from(command: Command) -> Self {
        match command {
            Command::Status => AdminRequest::Status,
            Command::Subscribe => AdminRequest::Subscribe,
            Command::Unsubscribe => AdminRequest::Unsubscribe,
            Command::Reload => AdminRequest::Reload,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let req = AdminRequest::from(cli.command);

    let resp = send_request(&cli.socket, &req).await?;
    println!("{}", serde_json::to_string(&resp)?);
    if let AdminResponse::Error(message) = resp {
        bail!("{message}");
    }
    Ok(())
}
