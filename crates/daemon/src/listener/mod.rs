// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for the HTTP control API.
//!
//! The Listener runs in a spawned task, accepting TCP connections and handling
//! each one in its own task so a slow cancel never blocks status queries.

mod http;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bsup_core::{Clock, SystemClock};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::control::{ControlSurface, Reply, StatusFormat};
use http::{HttpError, Request};

/// Shared context for all connection handlers.
pub(crate) struct ListenCtx<C: Clock> {
    pub surface: ControlSurface<C>,
    pub ipc_timeout: Duration,
}

/// Listener task for accepting control API connections.
pub struct Listener<C: Clock = SystemClock> {
    tcp: TcpListener,
    ctx: Arc<ListenCtx<C>>,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub(crate) enum ConnectionError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),
}

impl<C: Clock> Listener<C> {
    pub fn new(tcp: TcpListener, surface: ControlSurface<C>, ipc_timeout: Duration) -> Self {
        Self { tcp, ctx: Arc::new(ListenCtx { surface, ipc_timeout }) }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.tcp.local_addr()
    }

    /// Run the accept loop, spawning a task for each connection.
    pub async fn run(self) {
        loop {
            match self.tcp.accept().await {
                Ok((stream, addr)) => {
                    debug!("TCP connection from {}", addr);
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        let (reader, writer) = stream.into_split();
                        if let Err(e) = handle_connection(reader, writer, &ctx).await {
                            log_connection_error(e);
                        }
                    });
                }
                Err(e) => error!("TCP accept error: {}", e),
            }
        }
    }
}

fn log_connection_error(e: ConnectionError) {
    match e {
        ConnectionError::Http(HttpError::ConnectionClosed) => debug!("Client disconnected"),
        ConnectionError::Http(HttpError::Timeout) => warn!("Connection timeout"),
        _ => error!("Connection error: {}", e),
    }
}

/// Handle a single request/response exchange.
///
/// The handler is not raced against client disconnect: a cancel that has
/// begun teardown always runs to completion.
async fn handle_connection<R, W, C>(
    reader: R,
    mut writer: W,
    ctx: &ListenCtx<C>,
) -> Result<(), ConnectionError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
    C: Clock,
{
    let mut reader = BufReader::new(reader);
    let reply = match http::read_request(&mut reader, ctx.ipc_timeout).await {
        Ok(request) => {
            // Status is polled frequently; everything else is worth noting.
            if request.path == "/status" {
                debug!(method = %request.method, path = %request.path, "received request");
            } else {
                info!(method = %request.method, path = %request.path, "received request");
            }
            route(&request, &ctx.surface).await
        }
        Err(HttpError::Malformed(reason)) => {
            debug!(%reason, "rejecting malformed request");
            Reply::bad_request(format!("Bad request: {reason}\n"))
        }
        Err(HttpError::TooLarge) => Reply::bad_request("Request too large\n"),
        Err(e) => return Err(e.into()),
    };

    debug!(status = reply.status, "sending response");
    http::write_response(&mut writer, &reply, ctx.ipc_timeout).await?;
    Ok(())
}

/// Dispatch a request to the control surface.
async fn route<C: Clock>(request: &Request, surface: &ControlSurface<C>) -> Reply {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/start") => surface.start(),
        ("GET", "/status") => surface.status(StatusFormat::from_query(request.query.as_deref())),
        ("GET", "/cancel") => surface.cancel().await,
        (_, "/start" | "/status" | "/cancel") => Reply::method_not_allowed(),
        _ => Reply::not_found(),
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
