// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! bsup-core: build record model shared by the supervisor daemon and its client

pub mod macros;

pub mod build;
pub mod clock;
pub mod report;
pub mod time_fmt;

pub use build::{BuildId, BuildRecord, Phase, Stream};
#[cfg(any(test, feature = "test-support"))]
pub use clock::FakeClock;
pub use clock::{Clock, SystemClock};
pub use report::{StatusReport, StreamText};
pub use time_fmt::{format_elapsed, format_elapsed_ms};
