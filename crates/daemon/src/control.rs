// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control surface: maps start / status / cancel onto the supervisor and
//! renders the replies served over HTTP.

use bsup_core::{Clock, SystemClock};
use tracing::{error, info};

use crate::supervisor::{BuildSpec, Supervisor, SupervisorError};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

/// A rendered reply: HTTP status plus body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self { status: 200, content_type: TEXT_PLAIN, body: body.into() }
    }

    pub fn bad_request(body: impl Into<String>) -> Self {
        Self { status: 400, content_type: TEXT_PLAIN, body: body.into() }
    }

    pub fn not_found() -> Self {
        Self { status: 404, content_type: TEXT_PLAIN, body: "Not found\n".to_string() }
    }

    pub fn method_not_allowed() -> Self {
        Self { status: 405, content_type: TEXT_PLAIN, body: "Method not allowed\n".to_string() }
    }

    pub fn internal_error(body: impl Into<String>) -> Self {
        Self { status: 500, content_type: TEXT_PLAIN, body: body.into() }
    }

    fn json(body: String) -> Self {
        Self { status: 200, content_type: APPLICATION_JSON, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Rendering of the status report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFormat {
    #[default]
    Text,
    Json,
}

impl StatusFormat {
    /// Parse from a URL query string (`format=json`). Anything else is text.
    pub fn from_query(query: Option<&str>) -> Self {
        let Some(query) = query else {
            return Self::Text;
        };
        let json = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .any(|(key, value)| key == "format" && value.eq_ignore_ascii_case("json"));
        if json {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// The three externally visible operations, bound to one configured build.
pub struct ControlSurface<C: Clock = SystemClock> {
    supervisor: Supervisor<C>,
    build: BuildSpec,
}

impl<C: Clock> ControlSurface<C> {
    pub fn new(supervisor: Supervisor<C>, build: BuildSpec) -> Self {
        Self { supervisor, build }
    }

    pub fn supervisor(&self) -> &Supervisor<C> {
        &self.supervisor
    }

    pub fn start(&self) -> Reply {
        match self.supervisor.start(&self.build) {
            Ok(build) => {
                info!(%build, "start accepted");
                Reply::ok("Build started\n")
            }
            Err(SupervisorError::AlreadyRunning) => Reply::bad_request("Build is running\n"),
            Err(SupervisorError::InvalidCommand(e)) => {
                let diagnostic = e.diagnostic(&self.build.command);
                error!(command = %self.build.command, error = %e, "build command does not parse");
                Reply::internal_error(format!("Failed to start build: {diagnostic}\n"))
            }
            Err(e) => {
                error!(error = %e, "start failed");
                Reply::internal_error(format!("Failed to start build: {e}\n"))
            }
        }
    }

    pub fn status(&self, format: StatusFormat) -> Reply {
        let report = self.supervisor.status();
        match format {
            StatusFormat::Text => Reply::ok(report.to_string()),
            StatusFormat::Json => match serde_json::to_string(&report) {
                Ok(body) => Reply::json(body),
                Err(e) => {
                    error!(error = %e, "failed to encode status");
                    Reply::internal_error(format!("Failed to encode status: {e}\n"))
                }
            },
        }
    }

    /// Cancels the running build. Replies once teardown has completed.
    pub async fn cancel(&self) -> Reply {
        match self.supervisor.cancel().await {
            Ok(build) => {
                info!(%build, "cancel accepted");
                Reply::ok("Cancelling build\n")
            }
            Err(_) => Reply::bad_request("No running build to cancel\n"),
        }
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
