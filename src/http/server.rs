//! HTTP server setup and the serve loop.
//!
//! # Responsibilities
//! - Build the Axum router (metrics route, landing page, middleware)
//! - Serve one accept loop per bound listener, all sharing the router
//! - Stop every loop on shutdown, signal, or the first listener failure
//! - Run the listener set's cleanup hooks once serving has stopped
//!
//! # Design Decisions
//! - On a termination signal the hooks run before connections are drained,
//!   so socket files are gone even if a client never finishes its request
//! - Draining is bounded by [`DRAIN_TIMEOUT`]; a second signal cuts it short

use std::fmt;
use std::io;
use std::time::Duration;

use axum::{routing::MethodRouter, Router};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::WebConfig;
use crate::http::landing::LandingConfig;
use crate::lifecycle::{Shutdown, TerminationSignal, TerminationSignals};
use crate::net::listener::{BoundListener, ListenerSet};

/// Longest wait for in-flight connections once serving stops.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// How serving ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// Shutdown was requested through [`Shutdown::trigger`].
    Shutdown,
    /// The process received a termination signal.
    Signal(TerminationSignal),
}

impl ServeOutcome {
    /// True for a requested shutdown, which maps to a zero exit status.
    pub fn is_graceful(&self) -> bool {
        matches!(self, ServeOutcome::Shutdown)
    }
}

/// Error type for the serve loop.
#[derive(Debug)]
pub enum ServeError {
    /// The serve loop was entered without listeners.
    NoListeners,
    /// Signal handlers could not be installed.
    Signals(io::Error),
    /// A listener failed while serving.
    Listener { listener: String, source: io::Error },
    /// A listener stopped without being asked to.
    ListenerStopped { listener: String },
    /// A serving task panicked or was cancelled.
    Task(tokio::task::JoinError),
}

impl fmt::Display for ServeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServeError::NoListeners => write!(f, "no listeners to serve on"),
            ServeError::Signals(e) => write!(f, "failed to install signal handlers: {}", e),
            ServeError::Listener { listener, source } => {
                write!(f, "listener {} failed: {}", listener, source)
            }
            ServeError::ListenerStopped { listener } => {
                write!(f, "listener {} stopped unexpectedly", listener)
            }
            ServeError::Task(e) => write!(f, "serving task failed: {}", e),
        }
    }
}

impl std::error::Error for ServeError {}

/// Build the router for an exporter.
///
/// The landing page is mounted as the fallback when enabled and the
/// telemetry path is not the root.
#[allow(deprecated)]
pub fn build_router(web: &WebConfig, metrics: MethodRouter, landing: LandingConfig) -> Router {
    let mut router = Router::new().route(&web.telemetry_path, metrics);

    if web.landing_page && web.telemetry_path != "/" {
        let page = landing.render();
        router = router.fallback(move || {
            let page = page.clone();
            async move { page }
        });
    }

    if let Some(timeout) = web.request_timeout {
        router = router.layer(TimeoutLayer::new(timeout));
    }

    router.layer(TraceLayer::new_for_http())
}

/// Serve `router` on every listener until shutdown, a signal, or an error.
pub async fn serve(set: ListenerSet, router: Router, shutdown: &Shutdown) -> Result<ServeOutcome, ServeError> {
    let signals = TerminationSignals::install().map_err(ServeError::Signals)?;
    serve_with_signals(set, router, signals, shutdown).await
}

/// [`serve`] with signal handlers installed by the caller, typically before
/// the listeners were opened.
pub async fn serve_with_signals(
    set: ListenerSet,
    router: Router,
    mut signals: TerminationSignals,
    shutdown: &Shutdown,
) -> Result<ServeOutcome, ServeError> {
    if set.is_empty() {
        return Err(ServeError::NoListeners);
    }

    let mut shutdown_rx = shutdown.subscribe();
    let (listeners, mut hooks) = set.into_parts();
    let (stop_tx, _) = watch::channel(false);

    let mut tasks = JoinSet::new();
    for listener in listeners {
        let name = listener.describe();
        tracing::info!(address = %name, "Listening on");
        let router = router.clone();
        let stop = stop_tx.subscribe();
        tasks.spawn(async move {
            let result = serve_listener(listener, router, stop).await;
            (name, result)
        });
    }

    let result = tokio::select! {
        signal = signals.recv() => {
            tracing::info!(signal = %signal, "Termination signal received");
            Ok(ServeOutcome::Signal(signal))
        }
        _ = shutdown_rx.recv() => {
            tracing::info!("Shutdown requested");
            Ok(ServeOutcome::Shutdown)
        }
        Some(joined) = tasks.join_next() => Err(match joined {
            Ok((listener, Ok(()))) => ServeError::ListenerStopped { listener },
            Ok((listener, Err(source))) => ServeError::Listener { listener, source },
            Err(e) => ServeError::Task(e),
        }),
    };

    let _ = stop_tx.send(true);
    if matches!(result, Ok(ServeOutcome::Signal(_))) {
        hooks.run();
    }

    let drained = tokio::select! {
        drained = tokio::time::timeout(DRAIN_TIMEOUT, drain(&mut tasks)) => drained.is_ok(),
        signal = signals.recv() => {
            tracing::warn!(signal = %signal, "Second termination signal, not waiting for connections");
            false
        }
    };
    if !drained {
        tracing::warn!(pending = tasks.len(), "Aborting listeners with open connections");
        tasks.abort_all();
    }

    hooks.run();
    tracing::info!("HTTP server stopped");
    result
}

async fn drain(tasks: &mut JoinSet<(String, io::Result<()>)>) {
    while let Some(joined) = tasks.join_next().await {
        if let Ok((listener, Err(e))) = joined {
            tracing::warn!(address = %listener, error = %e, "Listener failed during shutdown");
        }
    }
}

async fn serve_listener(listener: BoundListener, router: Router, stop: watch::Receiver<bool>) -> io::Result<()> {
    match listener {
        BoundListener::Tcp(listener) => {
            axum::serve(listener, router)
                .with_graceful_shutdown(stopped(stop))
                .await
        }
        BoundListener::Unix { listener, .. } => {
            axum::serve(listener, router)
                .with_graceful_shutdown(stopped(stop))
                .await
        }
    }
}

/// Resolves once the stop flag is set or the sender is gone.
async fn stopped(mut stop: watch::Receiver<bool>) {
    loop {
        let done = *stop.borrow_and_update();
        if done || stop.changed().await.is_err() {
            return;
        }
    }
}
