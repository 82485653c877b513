//! Configuration schema definitions.
//!
//! The effective configuration of one exporter process. Built once from the
//! command line and passed by value; nothing mutates it afterwards.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Address the reference exporters listen on by default.
pub const DEFAULT_LISTEN_ADDRESS: &str = ":9633";

/// Root configuration for an exporter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HelperConfig {
    /// HTTP serving settings.
    pub web: WebConfig,

    /// Logging settings.
    pub log: LogConfig,

    /// Overlay-network listener settings.
    pub overlay: OverlayConfig,
}

/// HTTP serving configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct WebConfig {
    /// Path under which metrics are exposed.
    pub telemetry_path: String,

    /// Listener sources.
    pub listener: ListenerConfig,

    /// Maximum concurrent scrapes. 0 disables the limit.
    pub max_requests: usize,

    /// Drop the exporter's own handler and process metrics.
    pub disable_exporter_metrics: bool,

    /// Serve an HTML landing page outside the telemetry path.
    pub landing_page: bool,

    /// Per-request timeout. `None` disables it.
    pub request_timeout: Option<Duration>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            telemetry_path: "/metrics".to_string(),
            listener: ListenerConfig::default(),
            max_requests: 2,
            disable_exporter_metrics: false,
            landing_page: true,
            request_timeout: None,
        }
    }
}

/// Where to listen.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerConfig {
    /// Addresses in configured order: `host:port` or `/path/to.sock`.
    pub listen_addresses: Vec<String>,

    /// Use sockets passed by systemd instead of `listen_addresses`.
    pub systemd_socket: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            listen_addresses: vec![DEFAULT_LISTEN_ADDRESS.to_string()],
            systemd_socket: false,
        }
    }
}

/// Overlay-network listener configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayConfig {
    /// Identity JSON file. Ignored when it does not exist.
    pub identity_file: PathBuf,

    /// Service to bind on the overlay.
    pub service_name: String,

    /// Serve on the overlay only.
    pub only: bool,

    /// Socket directory of the local overlay tunneler.
    pub tunnel_dir: PathBuf,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            identity_file: PathBuf::from("./identity.json"),
            service_name: String::new(),
            only: false,
            tunnel_dir: PathBuf::from("/run/ziti"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

/// Minimum level of emitted log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unrecognized log level {:?}", other)),
        }
    }
}

/// Output format of log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Logfmt,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "logfmt" => Ok(LogFormat::Logfmt),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unrecognized log format {:?}", other)),
        }
    }
}
