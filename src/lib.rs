//! Bootstrap helper for Prometheus exporters.
//!
//! Wires command-line flags, opens listeners (TCP, unix socket, systemd
//! socket activation, overlay network), builds the metrics handler and
//! serves it until shutdown.

pub mod config;
pub mod helper;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::HelperConfig;
pub use helper::{ExporterHelper, HelperError};
pub use http::ServeOutcome;
pub use lifecycle::Shutdown;
pub use net::{BoundListener, ListenerError, ListenerProvider, ListenerSet};
pub use observability::{CollectError, Collector, MetricsRegistry};
