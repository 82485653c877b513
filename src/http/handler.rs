//! Metrics scrape handler.
//!
//! # Responsibilities
//! - Render the exporter's registry on each scrape
//! - Enforce the concurrent-scrape limit (`--web.max-requests`)
//! - Record the handler's own request metrics unless disabled
//!
//! # Design Decisions
//! - Over-limit scrapes are rejected with 503 immediately instead of queueing
//! - Collectors may block (they talk to devices, files, daemons), so the
//!   gather runs on the blocking pool

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tokio::sync::Semaphore;

use crate::observability::metrics::{
    MetricsRegistry, HANDLER_REQUESTS_IN_FLIGHT, HANDLER_REQUESTS_TOTAL,
};

/// Prometheus text exposition format.
pub const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// State shared by all scrapes of one exporter.
#[derive(Clone)]
pub struct MetricsState {
    registry: Arc<MetricsRegistry>,
    limit: Option<Arc<Semaphore>>,
    max_requests: usize,
    self_metrics: bool,
}

impl MetricsState {
    /// `max_requests == 0` disables the limit.
    pub fn new(registry: Arc<MetricsRegistry>, max_requests: usize, self_metrics: bool) -> Self {
        let limit = (max_requests > 0).then(|| Arc::new(Semaphore::new(max_requests)));
        Self {
            registry,
            limit,
            max_requests,
            self_metrics,
        }
    }

    fn record_request(&self, status: StatusCode) {
        if !self.self_metrics {
            return;
        }
        let code = status.as_u16().to_string();
        self.registry
            .record(|| metrics::counter!(HANDLER_REQUESTS_TOTAL, "code" => code).increment(1));
    }

    fn track_in_flight(&self, delta: f64) {
        if !self.self_metrics {
            return;
        }
        self.registry
            .record(|| metrics::gauge!(HANDLER_REQUESTS_IN_FLIGHT).increment(delta));
    }
}

/// `GET <telemetry path>`.
pub async fn metrics_handler(State(state): State<MetricsState>) -> Response {
    let _permit = match &state.limit {
        Some(limit) => match limit.clone().try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::debug!(max_requests = state.max_requests, "Scrape rejected, too many in flight");
                state.record_request(StatusCode::SERVICE_UNAVAILABLE);
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    format!(
                        "Limit of concurrent requests reached ({}), try again later.\n",
                        state.max_requests
                    ),
                )
                    .into_response();
            }
        },
        None => None,
    };

    state.track_in_flight(1.0);
    let registry = Arc::clone(&state.registry);
    let gathered = tokio::task::spawn_blocking(move || registry.gather()).await;
    state.track_in_flight(-1.0);

    match gathered {
        Ok(body) => {
            state.record_request(StatusCode::OK);
            ([(header::CONTENT_TYPE, TEXT_FORMAT)], body).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Metrics gathering task failed");
            state.record_request(StatusCode::INTERNAL_SERVER_ERROR);
            (StatusCode::INTERNAL_SERVER_ERROR, "An error has occurred while gathering metrics.\n")
                .into_response()
        }
    }
}
