//! specview backend process entry point: parses configuration, wires the
//! task runtime and session manager together, and runs the websocket
//! accept loop until every session is closed and the exit grace period
//! (if any) elapses.

mod cli;
mod config;
mod dispatch;
mod loader_factory;
mod logging;
mod socket;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use cli::Cli;
use config::ServerConfig;
use dispatch::Dispatcher;
use loader_factory::UnconfiguredLoaderFactory;
use specview_session::{SessionManager, TaskRuntime};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init_tracing(cli.verbose);
    let log_path = match &cli.log {
        Some(Some(path)) => Some(path.clone()),
        Some(None) => Some(logging::default_log_path()),
        None => None,
    };
    if let Some(path) = &log_path {
        logging::install_file_logger(path);
        logging::log(&format!("logging to {}", path.display()));
    }

    let mut config = ServerConfig::load_or_default(cli.config.as_deref()).context("loading configuration")?;
    if let Some(bind) = &cli.bind {
        config.bind_address = bind.clone();
    }
    if cli.read_only {
        config.read_only = true;
    }
    if cli.threads > 0 {
        config.compute_threads = cli.threads;
    }

    specview_session::configure_compute_pool(config.compute_threads.max(1))
        .context("configuring the shared compute thread pool")?;

    let runtime = Arc::new(TaskRuntime::new(config.worker_threads));
    let manager = Arc::new(SessionManager::new(config.exit_grace()));
    let dispatcher = Arc::new(Dispatcher::new(runtime, Arc::new(UnconfiguredLoaderFactory)));

    tracing::info!(
        bind = %config.bind_address,
        read_only = config.read_only,
        workers = config.worker_threads,
        "specview-server starting"
    );

    socket::run(&config.bind_address, config.read_only, config.idle_wait(), manager, dispatcher).await
}
