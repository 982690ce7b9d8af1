use anyhow::Context;
use clap::Parser;
use matching_engine::Engine;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::info;
use types::order::AssetType;

use gateway::dispatch::Dispatcher;
use gateway::server::Server;
use gateway::session::{SessionRegistry, SessionReporter};

/// Bound on messages buffered between the readers and the dispatcher.
const MESSAGE_QUEUE_DEPTH: usize = 256;

#[derive(Parser, Debug)]
#[command(author, version, about = "Single-venue limit-order matching exchange", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    address: String,
    /// Port to listen on
    #[arg(long, default_value_t = 9001)]
    port: u16,
    /// Maximum number of concurrent connection reads
    #[arg(long, default_value_t = 10)]
    workers: usize,
}

/// Resolves on SIGINT or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sessions = Arc::new(SessionRegistry::new());
    let (messages_tx, messages_rx) = mpsc::channel(MESSAGE_QUEUE_DEPTH);

    let reporter = SessionReporter::new(Arc::clone(&sessions));
    let engine = Engine::new(reporter.clone(), [AssetType::Equities]);
    let dispatcher = Dispatcher::new(messages_rx, engine, reporter, Arc::clone(&sessions));

    let server = Server::bind(
        &args.address,
        args.port,
        args.workers,
        Arc::clone(&sessions),
        messages_tx,
        shutdown_rx,
    )
    .await
    .context("unable to start listener")?;

    let dispatcher_task = tokio::spawn(dispatcher.run());
    let server_task = tokio::spawn(server.run());

    shutdown_signal().await;
    info!("server shutting down");
    let _ = shutdown_tx.send(true);

    // The accept loop and readers exit between tasks; once their channel
    // senders drop, the dispatcher drains what is left and stops.
    server_task.await.context("accept loop panicked")?;
    dispatcher_task.await.context("dispatcher panicked")?;
    Ok(())
}
