//! Process wiring: configuration, backend, store, executors, dispatchers,
//! and the HTTP control plane.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;

use crate::api::{self, state::AppState};
use crate::config::Config;
use crate::dispatch::{Dispatcher, RetryPolicy};
use crate::executor::ExecutorRegistry;
use crate::kv::FjallKv;
use crate::observability::Metrics;
use crate::store::Store;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Builds the whole stack from a validated configuration and serves until
/// shutdown. A backend that cannot be opened or probed is fatal here; the
/// process must not run without its store.
pub async fn run(config: Config) -> Result<(), AnyError> {
    let kv = Arc::new(FjallKv::open(&config.backend.data_path)?);
    let store = Store::open(kv.clone(), &config.backend.prefix)?;

    let registry = Arc::new(ExecutorRegistry::with_defaults());
    let metrics = Arc::new(Metrics::new());
    let retry = RetryPolicy {
        max_attempts: config.executor.max_attempts,
        backoff_base: Duration::from_secs(config.executor.backoff_base_secs),
    };

    let mut dispatchers = BTreeMap::new();
    for kind in registry.kinds() {
        let dispatcher = Arc::new(Dispatcher::new(
            kind,
            store.clone(),
            Arc::clone(&registry),
            Arc::clone(&metrics),
            retry.clone(),
            config.executor.concurrency,
        ));
        let loaded = dispatcher.load_from_store()?;
        info!(kind, jobs = loaded, "dispatcher queued stored jobs");
        Arc::clone(&dispatcher).start();
        dispatchers.insert(kind.to_string(), dispatcher);
    }

    let address = config.server.bind_addr;
    let state = AppState::new(config, store, dispatchers, metrics);
    let app = api::router(state.clone());

    let listener = TcpListener::bind(address).await?;
    info!(%address, "flowd API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop ticking; in-flight runs finish on their own.
    for dispatcher in state.dispatchers.values() {
        dispatcher.stop();
    }
    kv.persist()?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
