//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!
//! Exporter collectors produce:
//!     → metrics.rs (per-exporter Prometheus registry)
//!     → rendered by the HTTP metrics handler on scrape
//! ```

pub mod logging;
pub mod metrics;

pub use self::logging::init_logging;
pub use self::metrics::{
    BuildInfoCollector, CollectError, Collector, MetricsRegistry, ProcessCollector, RegistryError,
};
