//! Metrics registry and exposition.
//!
//! # Responsibilities
//! - Own a Prometheus recorder per exporter (no global recorder)
//! - Run registered collectors on every scrape
//! - Provide the exporter's own metrics (build info, handler, process)
//!
//! # Metrics
//! - `<exporter>_build_info` (gauge): always 1, labelled with the version
//! - `promhttp_metric_handler_requests_total` (counter): scrapes by status code
//! - `promhttp_metric_handler_requests_in_flight` (gauge): concurrent scrapes
//! - `process_start_time_seconds` (gauge): unix time the exporter started
//! - `process_open_fds` (gauge, Linux): open file descriptors
//!
//! # Design Decisions
//! - Collectors record through `metrics::with_local_recorder`, so several
//!   helpers can live in one process (tests, embedders)
//! - A failing collector is logged and the scrape continues with the rest

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use metrics::Recorder;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

pub const HANDLER_REQUESTS_TOTAL: &str = "promhttp_metric_handler_requests_total";
pub const HANDLER_REQUESTS_IN_FLIGHT: &str = "promhttp_metric_handler_requests_in_flight";

/// Error returned by a collector during a scrape.
#[derive(Debug)]
pub struct CollectError(String);

impl CollectError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for CollectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for CollectError {}

impl From<std::io::Error> for CollectError {
    fn from(e: std::io::Error) -> Self {
        Self(e.to_string())
    }
}

/// Registration failures.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("collector {0:?} is already registered")]
    AlreadyRegistered(String),
}

/// Something that records metrics when scraped.
///
/// `collect` runs with the registry's recorder installed, so the plain
/// `metrics::gauge!`/`counter!` macros land in this exporter's output.
pub trait Collector: Send + Sync + 'static {
    /// Unique name within a registry.
    fn name(&self) -> &str;

    fn collect(&self) -> Result<(), CollectError>;
}

/// Per-exporter metric storage plus its collectors.
pub struct MetricsRegistry {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    collectors: Vec<Box<dyn Collector>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        Self {
            recorder,
            handle,
            collectors: Vec::new(),
        }
    }

    /// Register a collector. Names must be unique.
    pub fn register<C: Collector>(&mut self, collector: C) -> Result<(), RegistryError> {
        self.register_boxed(Box::new(collector))
    }

    pub fn register_boxed(&mut self, collector: Box<dyn Collector>) -> Result<(), RegistryError> {
        if self.collectors.iter().any(|c| c.name() == collector.name()) {
            return Err(RegistryError::AlreadyRegistered(collector.name().to_string()));
        }
        tracing::debug!(collector = collector.name(), "Registered collector");
        self.collectors.push(collector);
        Ok(())
    }

    /// Run `f` with this registry's recorder installed.
    pub fn record<T>(&self, f: impl FnOnce() -> T) -> T {
        let recorder: &dyn Recorder = &self.recorder;
        metrics::with_local_recorder(recorder, f)
    }

    /// Run every collector and render the text exposition format.
    pub fn gather(&self) -> String {
        for collector in &self.collectors {
            if let Err(e) = self.record(|| collector.collect()) {
                tracing::error!(collector = collector.name(), error = %e, "Error collecting metrics");
            }
        }
        self.handle.run_upkeep();
        self.handle.render()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace characters that are not valid in a metric name.
pub fn sanitize_metric_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == ':' { c } else { '_' })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// `<exporter>_build_info{version="..."} 1`.
pub struct BuildInfoCollector {
    metric: String,
    version: String,
}

impl BuildInfoCollector {
    pub fn new(exporter_name: &str, version: &str) -> Self {
        Self {
            metric: format!("{}_build_info", sanitize_metric_name(exporter_name)),
            version: version.to_string(),
        }
    }

    pub fn metric_name(&self) -> &str {
        &self.metric
    }
}

impl Collector for BuildInfoCollector {
    fn name(&self) -> &str {
        "build_info"
    }

    fn collect(&self) -> Result<(), CollectError> {
        metrics::describe_gauge!(
            self.metric.clone(),
            "A metric with a constant '1' value labeled by version from which the exporter was built."
        );
        metrics::gauge!(self.metric.clone(), "version" => self.version.clone()).set(1.0);
        Ok(())
    }
}

/// Process metrics of the exporter itself.
pub struct ProcessCollector {
    start_time: f64,
}

impl ProcessCollector {
    pub fn new() -> Self {
        let start_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        Self { start_time }
    }
}

impl Default for ProcessCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for ProcessCollector {
    fn name(&self) -> &str {
        "process"
    }

    fn collect(&self) -> Result<(), CollectError> {
        metrics::gauge!("process_start_time_seconds").set(self.start_time);

        #[cfg(target_os = "linux")]
        metrics::gauge!("process_open_fds").set(open_fds()? as f64);
        Ok(())
    }
}

/// Descriptors open in this process, not counting the one used to list them.
#[cfg(target_os = "linux")]
fn open_fds() -> std::io::Result<usize> {
    let listed = std::fs::read_dir("/proc/self/fd")?.count();
    Ok(listed.saturating_sub(1))
}
