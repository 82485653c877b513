//! Exporter bootstrap.
//!
//! [`ExporterHelper`] ties the subsystems together for one exporter:
//!
//! ```text
//! parse_args → HelperConfig
//!     → init_logging
//!     → registry (build info, process, handler, user collector)
//!     → bind (listener selection, overlay + custom providers)
//!     → serve (until shutdown / signal / listener error)
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use axum::routing::{get, MethodRouter};

use crate::config::{validate_config, HelperArgs, HelperConfig, ValidationError, WebConfig};
use crate::http::{
    build_router, metrics_handler, serve_with_signals, LandingConfig, MetricsState, ServeError, ServeOutcome,
};
use crate::lifecycle::{Shutdown, TerminationSignals};
use crate::net::{select_listeners, ListenerError, ListenerProvider, ListenerSet, OverlayProvider};
use crate::observability::{
    init_logging, BuildInfoCollector, Collector, MetricsRegistry, ProcessCollector, RegistryError,
};

/// Top-level failure of an exporter run.
#[derive(Debug, thiserror::Error)]
pub enum HelperError {
    #[error("invalid configuration: {}", join_errors(.0))]
    Config(Vec<ValidationError>),

    #[error("couldn't register exporter collector: {0}")]
    Registration(#[from] RegistryError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error(transparent)]
    Serve(#[from] ServeError),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Bootstrap helper for one exporter.
pub struct ExporterHelper {
    name: String,
    description: String,
    default_address: String,
    version: String,
    providers: Vec<Box<dyn ListenerProvider>>,
}

impl ExporterHelper {
    pub fn new(name: impl Into<String>, description: impl Into<String>, default_address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            default_address: default_address.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            providers: Vec::new(),
        }
    }

    /// Version reported in `--version`, build info and the landing page.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Add an extension listener provider. The overlay provider is always
    /// consulted first; added providers follow in insertion order.
    pub fn with_provider<P: ListenerProvider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The command line, with this exporter's defaults.
    pub fn command(&self) -> clap::Command {
        HelperArgs::command_for(&self.name, &self.description, &self.version, &self.default_address)
    }

    /// Parse the process arguments, exiting with usage on error.
    pub fn parse_args(&self) -> HelperConfig {
        self.try_parse_from(std::env::args_os()).unwrap_or_else(|e| e.exit())
    }

    pub fn try_parse_from<I, T>(&self, args: I) -> Result<HelperConfig, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let args = HelperArgs::try_parse_for(&self.name, &self.description, &self.version, &self.default_address, args)?;
        Ok(args.into_config(&self.name))
    }

    /// Parse the helper's flags plus an extension's own `clap::Args`.
    ///
    /// The extension's flags show up in `--help` next to the `--web.*` ones;
    /// build the provider from the returned value and pass it to
    /// [`ExporterHelper::with_provider`].
    pub fn try_parse_with<A, I, T>(&self, args: I) -> Result<(HelperConfig, A), clap::Error>
    where
        A: clap::Args,
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let (args, extension) =
            HelperArgs::try_parse_with(&self.name, &self.description, &self.version, &self.default_address, args)?;
        Ok((args.into_config(&self.name), extension))
    }

    /// Install the global log subscriber. Later calls are no-ops.
    pub fn init_logging(&self, config: &HelperConfig) {
        init_logging(&config.log);
    }

    /// Fresh registry with build info and, unless disabled, process metrics.
    pub fn registry(&self, web: &WebConfig) -> Result<MetricsRegistry, RegistryError> {
        let mut registry = MetricsRegistry::new();
        registry.register(BuildInfoCollector::new(&self.name, &self.version))?;
        if !web.disable_exporter_metrics {
            registry.register(ProcessCollector::new())?;
        }
        Ok(registry)
    }

    /// Route serving `registry` with the configured limits.
    pub fn metrics_route(&self, web: &WebConfig, registry: MetricsRegistry) -> MethodRouter {
        let state = MetricsState::new(Arc::new(registry), web.max_requests, !web.disable_exporter_metrics);
        get(metrics_handler).with_state(state)
    }

    /// Open the listeners for `config`.
    pub async fn bind(&self, config: &HelperConfig) -> Result<ListenerSet, ListenerError> {
        let overlay = OverlayProvider::with_tunnel(config.overlay.clone());
        let mut providers: Vec<&dyn ListenerProvider> = Vec::with_capacity(self.providers.len() + 1);
        providers.push(&overlay);
        providers.extend(self.providers.iter().map(|p| p.as_ref()));

        select_listeners(&config.web.listener, &providers).await
    }

    /// Serve an already built metrics route.
    pub async fn run_with_handler(
        &self,
        config: HelperConfig,
        metrics: MethodRouter,
        shutdown: &Shutdown,
    ) -> Result<ServeOutcome, HelperError> {
        validate_config(&config).map_err(HelperError::Config)?;

        tracing::info!(name = %self.name, version = %self.version, "Starting {}", self.name);

        let landing = LandingConfig {
            name: self.name.clone(),
            description: self.description.clone(),
            version: self.version.clone(),
            metrics_path: config.web.telemetry_path.clone(),
        };
        let router = build_router(&config.web, metrics, landing);

        // Handlers go in before any socket file exists, so a signal during
        // binding still reaches the cleanup path.
        let signals = TerminationSignals::install().map_err(ServeError::Signals)?;
        let listeners = self.bind(&config).await?;
        Ok(serve_with_signals(listeners, router, signals, shutdown).await?)
    }

    /// Register `collector` and serve it.
    pub async fn run<C: Collector>(
        &self,
        config: HelperConfig,
        collector: C,
        shutdown: &Shutdown,
    ) -> Result<ServeOutcome, HelperError> {
        let mut registry = self.registry(&config.web)?;
        registry.register(collector)?;

        let route = self.metrics_route(&config.web, registry);
        self.run_with_handler(config, route, shutdown).await
    }

    /// Run until terminated and map the result to a process exit status.
    ///
    /// Zero only for a requested shutdown; a termination signal or any
    /// startup or serving error exits with 1.
    pub async fn listen_and_serve<C: Collector>(&self, config: HelperConfig, collector: C) -> ExitCode {
        let shutdown = Shutdown::new();
        match self.run(config, collector, &shutdown).await {
            Ok(outcome) if outcome.is_graceful() => ExitCode::SUCCESS,
            Ok(outcome) => {
                tracing::info!(outcome = ?outcome, "Exiting after termination signal");
                ExitCode::FAILURE
            }
            Err(e) => {
                tracing::error!(error = %e, "Exporter failed");
                ExitCode::FAILURE
            }
        }
    }
}
