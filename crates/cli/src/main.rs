// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! bsup: command-line client for the build supervisor daemon.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod exit_error;
mod output;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::build;
use exit_error::ExitError;
use output::OutputFormat;

/// Request timeout. Cancel replies only after teardown, which may take the
/// daemon's full kill grace.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "bsup", version = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH")))]
#[command(about = "Control a bsupd build supervisor")]
struct Cli {
    /// Daemon address (default: $BSUP_ADDR or 127.0.0.1:8080)
    #[arg(long, global = true)]
    addr: Option<SocketAddr>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the configured build
    Start,
    /// Show the current build
    Status {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Cancel the running build and wait for teardown
    Cancel,
    /// Wait for the current build to end; exits with its exit code
    Wait {
        /// Poll interval in milliseconds
        #[arg(long, default_value = "1000")]
        interval_ms: u64,
        /// Give up after this many seconds (exit code 2)
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Print the final report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn format_for(json: bool) -> OutputFormat {
    if json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    }
}

async fn run(cli: Cli) -> Result<()> {
    let client = client::connect(cli.addr, REQUEST_TIMEOUT)?;
    match cli.command {
        Command::Start => build::handle_start(&client).await,
        Command::Status { json } => build::handle_status(&client, format_for(json)).await,
        Command::Cancel => build::handle_cancel(&client).await,
        Command::Wait { interval_ms, timeout_secs, json } => {
            build::handle_wait(
                &client,
                Duration::from_millis(interval_ms.max(1)),
                timeout_secs.map(Duration::from_secs),
                format_for(json),
            )
            .await
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        if let Some(exit) = e.downcast_ref::<ExitError>() {
            if !exit.message.is_empty() {
                eprintln!("{}", exit.message);
            }
            std::process::exit(exit.code);
        }
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
