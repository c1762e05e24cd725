// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! bsup daemon library
//!
//! Supervises a single external build at a time and serves the start / status /
//! cancel control API. The HTTP client used by the `bsup` CLI lives here too.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod client;
pub mod control;
pub mod env;
pub mod lifecycle;
pub mod listener;
pub mod supervisor;

pub use client::{ClientError, ClientResponse, DaemonClient};
pub use control::{ControlSurface, Reply, StatusFormat};
pub use lifecycle::{startup, Config, DaemonState, LifecycleError, StartupResult};
pub use listener::Listener;
pub use supervisor::{BuildSpec, DrainPacing, Supervisor, SupervisorConfig, SupervisorError};
