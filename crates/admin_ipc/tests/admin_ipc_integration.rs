#![cfg(unix)]

use std::sync::{Arc, Mutex};

use admin_ipc::{send_request, AdminRequest, AdminResponse, WatchStatus};
use anyhow::{anyhow, bail};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::time::{sleep, Duration};

fn status(subscribed: bool) -> WatchStatus {
    WatchStatus {
        subscribed,
        items: 10,
        cycles: 0,
        load_error: None,
    }
}

#[tokio::test]
async fn status_subscribe_unsubscribe_flow() {
    let dir = tempfile::tempdir().expect("temp dir");
    let socket_path = dir.path().join("watch.sock");
    let socket_str = socket_path
        .to_str()
        .expect("socket path should be utf-8")
        .to_string();

    let subscribed = Arc::new(Mutex::new(false));
    let handler_state = Arc::clone(&subscribed);

    let server_task = tokio::spawn(admin_ipc::run_server(socket_path.clone(), move |req| {
        let handler_state = Arc::clone(&handler_state);
        async move {
            let mut state = handler_state
                .lock()
                .map_err(|_| anyhow!("state poisoned"))?;
            match req {
                AdminRequest::Status => Ok(AdminResponse::Status(status(*state))),
                AdminRequest::Subscribe => {
                    let changed = !*state;
                    *state = true;
                    Ok(AdminResponse::Ack { changed })
                }
                AdminRequest::Unsubscribe => {
                    let changed = *state;
                    *state = false;
                    Ok(AdminResponse::Ack { changed })
                }
                AdminRequest::Reload => bail!("api unreachable"),
            }
        }
    }));

    // Allow the server task to start listening.
    sleep(Duration::from_millis(50)).await;

    let initial = send_request(&socket_str, &AdminRequest::Status)
        .await
        .expect("initial status");
    assert_eq!(initial, AdminResponse::Status(status(false)));

    let first = send_request(&socket_str, &AdminRequest::Subscribe)
        .await
        .expect("subscribe resp");
    assert_eq!(first, AdminResponse::Ack { changed: true });

    let again = send_request(&socket_str, &AdminRequest::Subscribe)
        .await
        .expect("second subscribe resp");
    assert_eq!(again, AdminResponse::Ack { changed: false });

    let subscribed_status = send_request(&socket_str, &AdminRequest::Status)
        .await
        .expect("subscribed status");
    assert_eq!(subscribed_status, AdminResponse::Status(status(true)));

    let off = send_request(&socket_str, &AdminRequest::Unsubscribe)
        .await
        .expect("unsubscribe resp");
    assert_eq!(off, AdminResponse::Ack { changed: true });

    let reload = send_request(&socket_str, &AdminRequest::Reload)
        .await
        .expect("reload resp");
    match reload {
        AdminResponse::Error(message) => assert!(message.contains("api unreachable")),
        other => panic!("expected error response, got {other:?}"),
    }

    server_task.abort();
}

#[tokio::test]
async fn malformed_line_gets_error_response() {
    let dir = tempfile::tempdir().expect("temp dir");
    let socket_path = dir.path().join("watch.sock");

    let server_task = tokio::spawn(admin_ipc::run_server(socket_path.clone(), |_req| async {
        Ok(AdminResponse::Ack { changed: true })
    }));
    sleep(Duration::from_millis(50)).await;

    let mut stream = UnixStream::connect(&socket_path).await.expect("connect");
    stream.write_all(b"{\"type\":\"Explode\"}\n").await.unwrap();
    let (read_half, _write_half) = stream.into_split();
    let mut line = String::new();
    BufReader::new(read_half).read_line(&mut line).await.unwrap();
    let resp: AdminResponse = serde_json::from_str(line.trim()).unwrap();
    assert!(matches!(resp, AdminResponse::Error(msg) if msg.starts_with("malformed request")));

    server_task.abort();
}
