// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the control API.
//!
//! Sends HTTP/1.1 GET requests over TCP and reads responses using
//! Content-Length framing, falling back to connection close when the
//! header is absent.

use std::net::SocketAddr;
use std::time::Duration;

use bsup_core::StatusReport;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Largest response body the client will buffer.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not connect to daemon at {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("failed to decode status: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A raw response from the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientResponse {
    pub status: u16,
    pub body: String,
}

impl ClientResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into [`ClientError::Http`].
    pub fn into_success(self) -> Result<String, ClientError> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(ClientError::Http { status: self.status, body: self.body.trim_end().to_string() })
        }
    }
}

/// Client for a running `bsupd`.
#[derive(Debug, Clone)]
pub struct DaemonClient {
    addr: SocketAddr,
    timeout: Duration,
}

impl DaemonClient {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr, timeout: Duration::from_secs(30) }
    }

    /// Bound on a whole exchange (connect + write + read). Cancel waits for
    /// teardown, so this must exceed the daemon's kill grace.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn get(&self, path: &str) -> Result<ClientResponse, ClientError> {
        let request =
            format!("GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n", path, self.addr);
        tokio::time::timeout(self.timeout, self.send_request(&request))
            .await
            .map_err(|_| ClientError::Timeout(self.timeout))?
    }

    async fn send_request(&self, request: &str) -> Result<ClientResponse, ClientError> {
        let mut stream = TcpStream::connect(self.addr)
            .await
            .map_err(|source| ClientError::Connect { addr: self.addr, source })?;
        stream.write_all(request.as_bytes()).await?;

        let mut reader = BufReader::new(&mut stream);
        read_http_response(&mut reader).await
    }

    pub async fn start(&self) -> Result<String, ClientError> {
        self.get("/start").await?.into_success()
    }

    pub async fn cancel(&self) -> Result<String, ClientError> {
        self.get("/cancel").await?.into_success()
    }

    /// Text rendering of the current build.
    pub async fn status_text(&self) -> Result<String, ClientError> {
        self.get("/status").await?.into_success()
    }

    pub async fn status(&self) -> Result<StatusReport, ClientError> {
        let body = self.get("/status?format=json").await?.into_success()?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Read and parse an HTTP/1.1 response from a buffered stream.
pub(crate) async fn read_http_response<R: AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
) -> Result<ClientResponse, ClientError> {
    let mut status_line = String::new();
    reader.read_line(&mut status_line).await?;
    if status_line.is_empty() {
        return Err(ClientError::Malformed("empty response".to_string()));
    }

    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| ClientError::Malformed(format!("bad status line: {:?}", status_line)))?;

    // Read headers, extract Content-Length (case-insensitive)
    let mut content_length: Option<usize> = None;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await?;
        if line == "\r\n" || line == "\n" || line.is_empty() {
            break;
        }
        let line_lower = line.to_ascii_lowercase();
        if let Some(val) = line_lower.strip_prefix("content-length:") {
            let len = val
                .trim()
                .parse()
                .map_err(|_| ClientError::Malformed(format!("bad content-length: {}", val.trim())))?;
            content_length = Some(len);
        }
    }

    let mut buf = Vec::new();
    match content_length {
        Some(len) if len > MAX_BODY_BYTES => {
            return Err(ClientError::Malformed(format!("body too large: {} bytes", len)));
        }
        Some(len) => {
            buf.resize(len, 0);
            reader.read_exact(&mut buf).await?;
        }
        None => {
            reader.take(MAX_BODY_BYTES as u64 + 1).read_to_end(&mut buf).await?;
            if buf.len() > MAX_BODY_BYTES {
                return Err(ClientError::Malformed("body too large".to_string()));
            }
        }
    }
    let body = String::from_utf8_lossy(&buf).into_owned();
    Ok(ClientResponse { status, body })
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
