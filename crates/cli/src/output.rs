// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use anyhow::Result;
use bsup_core::{Phase, StatusReport};
use clap::ValueEnum;

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Render a status report for the terminal.
pub fn render_report(report: &StatusReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(report.to_string()),
        OutputFormat::Json => Ok(format!("{}\n", serde_json::to_string_pretty(report)?)),
    }
}

/// Exit code for `bsup wait`: the build's own code when it finished on its
/// own, 1 otherwise.
pub fn wait_exit_code(report: &StatusReport) -> i32 {
    match (report.phase, report.timed_out, report.exit_code) {
        (Phase::Finished, false, Some(code)) => code,
        _ => 1,
    }
}
