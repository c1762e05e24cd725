// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal HTTP/1.1 framing for the control API.
//!
//! One request per connection. Request bodies are never read; responses use
//! Content-Length framing and `Connection: close`.

use std::io::ErrorKind;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::control::Reply;

/// Upper bound on request line plus headers.
const MAX_HEAD_BYTES: usize = 8 * 1024;

/// A parsed request head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Request {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
}

#[derive(Debug, Error)]
pub(crate) enum HttpError {
    #[error("connection closed")]
    ConnectionClosed,

    #[error("timed out")]
    Timeout,

    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("request head exceeds {MAX_HEAD_BYTES} bytes")]
    TooLarge,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read one request head, bounded by `timeout`.
pub(crate) async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
    timeout: Duration,
) -> Result<Request, HttpError> {
    tokio::time::timeout(timeout, read_head(reader)).await.map_err(|_| HttpError::Timeout)?
}

async fn read_head<R: AsyncRead + Unpin>(reader: &mut BufReader<R>) -> Result<Request, HttpError> {
    let mut line = String::new();
    let mut used = read_line_limited(reader, &mut line, MAX_HEAD_BYTES).await?;
    if used == 0 {
        return Err(HttpError::ConnectionClosed);
    }
    let request = parse_request_line(line.trim_end())?;

    // Drain headers; none of them affect routing.
    loop {
        line.clear();
        let n = read_line_limited(reader, &mut line, MAX_HEAD_BYTES - used).await?;
        if n == 0 || line == "\r\n" || line == "\n" {
            break;
        }
        used += n;
    }
    Ok(request)
}

async fn read_line_limited<R: AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
    buf: &mut String,
    limit: usize,
) -> Result<usize, HttpError> {
    if limit == 0 {
        return Err(HttpError::TooLarge);
    }
    let n = (&mut *reader).take(limit as u64).read_line(buf).await.map_err(|e| {
        if e.kind() == ErrorKind::InvalidData {
            HttpError::Malformed("request head is not UTF-8".to_string())
        } else {
            HttpError::Io(e)
        }
    })?;
    if n == limit && !buf.ends_with('\n') {
        return Err(HttpError::TooLarge);
    }
    Ok(n)
}

/// Parse `METHOD /path?query HTTP/1.x`.
pub(crate) fn parse_request_line(line: &str) -> Result<Request, HttpError> {
    let mut parts = line.split_whitespace();
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(HttpError::Malformed(format!("bad request line: {line:?}")));
    };
    if !version.starts_with("HTTP/1.") {
        return Err(HttpError::Malformed(format!("unsupported version: {version}")));
    }
    if !target.starts_with('/') {
        return Err(HttpError::Malformed(format!("bad request target: {target}")));
    }
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query.to_string())),
        None => (target, None),
    };
    Ok(Request { method: method.to_string(), path: path.to_string(), query })
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Serialize a reply as a complete HTTP/1.1 response.
pub(crate) fn encode_response(reply: &Reply) -> Vec<u8> {
    let mut out = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        reply.status,
        reason_phrase(reply.status),
        reply.content_type,
        reply.body.len()
    )
    .into_bytes();
    out.extend_from_slice(reply.body.as_bytes());
    out
}

/// Write a reply and flush, bounded by `timeout`.
pub(crate) async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    reply: &Reply,
    timeout: Duration,
) -> Result<(), HttpError> {
    let bytes = encode_response(reply);
    tokio::time::timeout(timeout, async {
        writer.write_all(&bytes).await?;
        writer.flush().await?;
        writer.shutdown().await
    })
    .await
    .map_err(|_| HttpError::Timeout)??;
    Ok(())
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
