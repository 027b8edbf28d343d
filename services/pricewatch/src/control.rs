use admin_ipc::{AdminRequest, AdminResponse, WatchStatus};
use anyhow::Result;
use poller::{PollController, PriceFeed};
use tracing::info;

pub fn status<F: PriceFeed>(controller: &PollController<F>) -> WatchStatus {
    let board = controller.board();
    WatchStatus {
        subscribed: controller.is_subscribed(),
        items: board.rows().len(),
        cycles: board.cycles(),
        load_error: board.load_error().map(str::to_owned),
    }
}

pub async fn dispatch<F: PriceFeed>(
    controller: &PollController<F>,
    req: AdminRequest,
) -> Result<AdminResponse> {
    info!(request = ?req, "admin request");
    let resp = match req {
        AdminRequest::Status => AdminResponse::Status(status(controller)),
        AdminRequest::Subscribe => AdminResponse::Ack {
            changed: controller.subscribe(),
        },
        AdminRequest::Unsubscribe => AdminResponse::Ack {
            changed: controller.unsubscribe(),
        },
        AdminRequest::Reload => {
            controller.initial_load().await?;
            AdminResponse::Ack { changed: true }
        }
    };
    Ok(resp)
}
