// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use certwatch::{
    config::OperatorConfig,
    constants::{TOKIO_THREAD_NAME, TOKIO_WORKER_THREADS},
    context::Context,
    controller::run_ssl_controller,
    store::{KubeStore, ObjectStore},
    triggers::ExpiryScanner,
};
use kube::Client;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name(TOKIO_THREAD_NAME)
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

fn init_logging() {
    // Format: timestamp file:line LEVEL message
    // Example: 2025-11-29T23:45:00.123456Z main.rs:49 INFO Starting certwatch SSL controller
    //
    // Respects RUST_LOG (default INFO) and RUST_LOG_FORMAT (json or text)
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main() -> Result<()> {
    init_logging();

    info!("Starting certwatch SSL controller");

    let config = OperatorConfig::from_env()?;
    info!(
        scan_interval = ?config.scan_interval,
        scan_queue_capacity = config.scan_queue_capacity,
        reconcile_concurrency = config.reconcile_concurrency,
        error_requeue = ?config.error_requeue,
        conflict_retries = config.conflict_retries,
        "Loaded configuration"
    );

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown_signal(), shutdown.clone()));

    let store: Arc<dyn ObjectStore> = Arc::new(KubeStore::new(client.clone()));
    let ctx = Arc::new(Context::new(store.clone(), config.clone()));

    let (scan_tx, scan_rx) = mpsc::channel(config.scan_queue_capacity);
    let scanner = ExpiryScanner::new(store, config.scan_interval, scan_tx, shutdown.clone());

    tokio::join!(
        scanner.run(),
        run_ssl_controller(client, ctx, scan_rx, shutdown)
    );

    info!("Shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM and return the signal name.
async fn shutdown_signal() -> Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                Ok("SIGINT")
            }
            _ = sigterm.recv() => Ok("SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("SIGINT")
    }
}

/// Cancel `token` once `signal` resolves.
///
/// A signal listener that cannot be installed also cancels, so the process never
/// runs without a way to stop it cleanly.
async fn cancel_on_signal<F>(signal: F, token: CancellationToken)
where
    F: Future<Output = Result<&'static str>>,
{
    match signal.await {
        Ok(name) => info!(signal = name, "Received shutdown signal, stopping controllers"),
        Err(e) => error!(error = %e, "Failed to listen for shutdown signals, stopping controllers"),
    }
    token.cancel();
}
