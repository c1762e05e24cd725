// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status snapshot of the current build, as served to callers.

use crate::build::{BuildId, BuildRecord, Phase, Stream};
use crate::time_fmt::{format_elapsed_ms, format_epoch_ms};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Captured output of one stream, decoded as UTF-8 when possible.
///
/// Undecodable output does not fail the report; the decode error is carried
/// inline in place of the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamText {
    Text { len: usize, text: String },
    Undecodable { len: usize, error: String },
}

impl StreamText {
    pub fn decode(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => StreamText::Text { len: bytes.len(), text: text.to_string() },
            Err(e) => StreamText::Undecodable { len: bytes.len(), error: e.to_string() },
        }
    }

    pub fn len(&self) -> usize {
        match self {
            StreamText::Text { len, .. } | StreamText::Undecodable { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            StreamText::Text { text, .. } => Some(text),
            StreamText::Undecodable { .. } => None,
        }
    }
}

/// Point-in-time view of a [`BuildRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub build: BuildId,
    pub phase: Phase,
    pub started_at_ms: Option<u64>,
    pub ended_at_ms: Option<u64>,
    pub cancelled_at_ms: Option<u64>,
    /// Elapsed time while running, total time once ended.
    pub duration_ms: Option<u64>,
    pub timed_out: bool,
    pub exit_code: Option<i32>,
    pub stdout: StreamText,
    pub stderr: StreamText,
}

impl StatusReport {
    pub fn from_record(record: &BuildRecord, now_ms: u64) -> Self {
        Self {
            build: record.id(),
            phase: record.phase(),
            started_at_ms: record.started_at_ms(),
            ended_at_ms: record.ended_at_ms(),
            cancelled_at_ms: record.cancelled_at_ms(),
            duration_ms: record.duration_ms(now_ms),
            timed_out: record.timed_out(),
            exit_code: record.exit_code(),
            stdout: StreamText::decode(record.output(Stream::Stdout)),
            stderr: StreamText::decode(record.output(Stream::Stderr)),
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.phase)?;
        if self.phase == Phase::Ready {
            return Ok(());
        }
        writeln!(f, "build: {}", self.build)?;
        if let Some(ms) = self.started_at_ms {
            writeln!(f, "started: {}", format_epoch_ms(ms))?;
        }
        if let Some(ms) = self.cancelled_at_ms {
            writeln!(f, "cancelled: {}", format_epoch_ms(ms))?;
        }
        if let Some(ms) = self.ended_at_ms {
            writeln!(f, "ended: {}", format_epoch_ms(ms))?;
        }
        if let Some(ms) = self.duration_ms {
            let label = if self.ended_at_ms.is_some() { "duration" } else { "elapsed" };
            writeln!(f, "{}: {}", label, format_elapsed_ms(ms))?;
        }
        if self.timed_out {
            writeln!(f, "WARNING: timeout exceeded")?;
        }
        if let Some(code) = self.exit_code {
            writeln!(f, "exit_code: {}", code)?;
        }
        write_stream(f, Stream::Stdout, &self.stdout)?;
        write_stream(f, Stream::Stderr, &self.stderr)
    }
}

fn write_stream(f: &mut fmt::Formatter<'_>, stream: Stream, text: &StreamText) -> fmt::Result {
    match text {
        StreamText::Text { len, text } => {
            writeln!(f, "{} length: {}:", stream, len)?;
            f.write_str(text)?;
            if !text.is_empty() && !text.ends_with('\n') {
                writeln!(f)?;
            }
            Ok(())
        }
        StreamText::Undecodable { len, error } => {
            writeln!(f, "{} length: {}: <failed to decode: {}>", stream, len, error)
        }
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
