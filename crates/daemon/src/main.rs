// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! bsupd: single-build supervisor daemon.
//!
//! Usage: `bsupd [COMMAND]`. The build command comes from the first argument
//! or `BSUP_BUILD_CMD`.

use std::process::ExitCode;

use bsup_daemon::{startup, Config, LifecycleError, StartupResult};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> ExitCode {
    let config = match Config::load(std::env::args().nth(1)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("bsupd: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match setup_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("bsupd: failed to set up logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to build runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Daemon failed: {}", e);
            eprintln!("bsupd: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Log to `config.log_path` and stderr, filtered by `RUST_LOG` (default
/// `info`).
fn setup_logging(config: &Config) -> Result<WorkerGuard, LifecycleError> {
    let (log_dir, log_file) = config.log_target();
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
    Ok(guard)
}

async fn run(config: Config) -> Result<(), LifecycleError> {
    let StartupResult { mut daemon, listener } = startup(&config).await?;
    let addr = listener.local_addr()?;
    println!("Server started at http://{}", addr);

    let listener_task = tokio::spawn(listener.run());
    wait_for_shutdown_signal().await?;
    listener_task.abort();

    daemon.shutdown().await
}

async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = sigterm.recv() => {}
    }
    info!("Shutdown signal received");
    Ok(())
}
