// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use yare::parameterized;

use crate::supervisor::{BuildSpec, Supervisor, SupervisorConfig};

fn ctx(command: &str) -> ListenCtx<SystemClock> {
    ListenCtx {
        surface: ControlSurface::new(
            Supervisor::new(SupervisorConfig::default()),
            BuildSpec::new(command, Duration::from_secs(60)),
        ),
        ipc_timeout: Duration::from_secs(2),
    }
}

/// Feed `raw` to a connection handler and return the full response text.
async fn exchange(ctx: &ListenCtx<SystemClock>, raw: &[u8]) -> String {
    let (mut client, server) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server);
    client.write_all(raw).await.unwrap();
    handle_connection(server_read, server_write, ctx).await.unwrap();

    let mut response = String::new();
    client.read_to_string(&mut response).await.unwrap();
    response
}

fn request(method: &str, target: &str) -> Vec<u8> {
    format!("{method} {target} HTTP/1.1\r\nHost: localhost\r\n\r\n").into_bytes()
}

#[parameterized(
    unknown_path = { "GET", "/builds", "HTTP/1.1 404 Not Found\r\n" },
    root = { "GET", "/", "HTTP/1.1 404 Not Found\r\n" },
    post_start = { "POST", "/start", "HTTP/1.1 405 Method Not Allowed\r\n" },
    delete_cancel = { "DELETE", "/cancel", "HTTP/1.1 405 Method Not Allowed\r\n" },
    status = { "GET", "/status", "HTTP/1.1 200 OK\r\n" },
    cancel_idle = { "GET", "/cancel", "HTTP/1.1 400 Bad Request\r\n" },
)]
fn routes_by_method_and_path(method: &str, target: &str, status_line: &str) {
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    rt.block_on(async {
        let ctx = ctx("true");
        let response = exchange(&ctx, &request(method, target)).await;
        assert!(response.starts_with(status_line), "{response}");
        assert!(response.contains("Connection: close\r\n"));
    });
}

#[tokio::test]
async fn malformed_request_gets_400() {
    let ctx = ctx("true");
    let response = exchange(&ctx, b"HELLO\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{response}");
    assert!(response.contains("Bad request: "));
}

#[tokio::test]
async fn start_status_cancel_over_connection() {
    let ctx = ctx("sleep 30");

    let started = exchange(&ctx, &request("GET", "/start")).await;
    assert!(started.ends_with("\r\n\r\nBuild started\n"), "{started}");

    let again = exchange(&ctx, &request("GET", "/start")).await;
    assert!(again.ends_with("\r\n\r\nBuild is running\n"), "{again}");

    let status = exchange(&ctx, &request("GET", "/status")).await;
    assert!(status.contains("\r\n\r\nrunning\n"), "{status}");

    let cancelled = exchange(&ctx, &request("GET", "/cancel")).await;
    assert!(cancelled.ends_with("\r\n\r\nCancelling build\n"), "{cancelled}");

    let json = exchange(&ctx, &request("GET", "/status?format=json")).await;
    assert!(json.contains("Content-Type: application/json\r\n"), "{json}");
    assert!(json.contains("\"phase\":\"cancelled\""), "{json}");
}

#[tokio::test]
async fn client_hangup_before_request_is_reported() {
    let ctx = ctx("true");
    let (client, server) = tokio::io::duplex(1024);
    drop(client);
    let (read, write) = tokio::io::split(server);
    let result = handle_connection(read, write, &ctx).await;
    assert!(matches!(result, Err(ConnectionError::Http(HttpError::ConnectionClosed))));
}
