// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Human-readable durations and timestamps.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format whole seconds as a compact duration: `42s`, `3m 5s`, `2h 10m`, `1d 4h`.
pub fn format_elapsed(secs: u64) -> String {
    let (days, rem) = (secs / 86_400, secs % 86_400);
    let (hours, rem) = (rem / 3_600, rem % 3_600);
    let (mins, secs) = (rem / 60, rem % 60);
    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {mins}m")
    } else if mins > 0 {
        format!("{mins}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Like [`format_elapsed`], but shows sub-second durations in milliseconds.
pub fn format_elapsed_ms(ms: u64) -> String {
    if ms < 1_000 {
        format!("{ms}ms")
    } else {
        format_elapsed(ms / 1_000)
    }
}

/// RFC 3339 rendering of an epoch-millisecond timestamp, in UTC.
pub fn format_epoch_ms(ms: u64) -> String {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| format!("{ms}ms"))
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
