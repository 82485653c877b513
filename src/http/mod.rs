//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerSet (TCP / unix / inherited / overlay)
//!     → server.rs (one axum accept loop per listener, shared router)
//!     → handler.rs (telemetry path: scrape limit, gather, render)
//!     → landing.rs (every other path, when enabled)
//! ```

pub mod handler;
pub mod landing;
pub mod server;

pub use handler::{metrics_handler, MetricsState, TEXT_FORMAT};
pub use landing::LandingConfig;
pub use server::{build_router, serve, serve_with_signals, ServeError, ServeOutcome, DRAIN_TIMEOUT};
