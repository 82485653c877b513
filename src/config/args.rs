//! Command-line flags.
//!
//! Flag names follow the Prometheus exporter conventions
//! (`--web.listen-address`, `--log.level`, ...). Defaults that depend on the
//! exporter (its name and default address) are filled in at runtime by
//! [`HelperArgs::command_for`].

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Command, CommandFactory, FromArgMatches, Parser};

use crate::config::schema::{
    HelperConfig, ListenerConfig, LogConfig, LogFormat, LogLevel, OverlayConfig, WebConfig,
};

/// All flags understood by the helper.
#[derive(Debug, Clone, Parser)]
pub struct HelperArgs {
    #[command(flatten)]
    pub web: WebArgs,

    #[command(flatten)]
    pub overlay: OverlayArgs,

    #[command(flatten)]
    pub log: LogArgs,
}

#[derive(Debug, Clone, Args)]
pub struct WebArgs {
    /// Path under which to expose metrics.
    #[arg(long = "web.telemetry-path", default_value = "/metrics")]
    pub telemetry_path: String,

    /// Addresses on which to expose metrics and web interface. Repeatable for multiple addresses.
    #[arg(long = "web.listen-address", value_name = "ADDRESS")]
    pub listen_addresses: Vec<String>,

    /// Use systemd socket activation listeners instead of port listeners (Linux only).
    #[arg(long = "web.systemd-socket")]
    pub systemd_socket: bool,

    /// Maximum number of parallel scrape requests. Use 0 to disable.
    #[arg(long = "web.max-requests", default_value_t = 2)]
    pub max_requests: usize,

    /// Exclude metrics about the exporter itself (promhttp_*, process_*).
    #[arg(long = "web.disable-exporter-metrics")]
    pub disable_exporter_metrics: bool,

    /// Enable or disable the landing page on root path '/'.
    #[arg(
        long = "web.landing-page",
        default_value_t = true,
        action = ArgAction::Set,
        value_name = "BOOL"
    )]
    pub landing_page: bool,

    /// Per-request timeout in seconds. Use 0 to disable.
    #[arg(long = "web.request-timeout", default_value_t = 0, value_name = "SECONDS")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Args)]
pub struct OverlayArgs {
    /// Path of the ziti identity json file. Ignored if path does not exist.
    #[arg(long = "web.ziti.identity", default_value = "./identity.json")]
    pub identity_file: PathBuf,

    /// Name of the service to bind to. Stops if it wants to bind but does not exist.
    #[arg(long = "web.ziti.service-name")]
    pub service_name: Option<String>,

    /// If it listens on the ziti network only. Requires a valid ziti config.
    #[arg(long = "web.ziti.only")]
    pub only: bool,

    /// Socket directory of the local ziti tunneler.
    #[arg(long = "web.ziti.tunnel-dir", default_value = "/run/ziti")]
    pub tunnel_dir: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct LogArgs {
    /// Only log messages with the given severity or above. One of: [debug, info, warn, error].
    #[arg(long = "log.level", default_value = "info")]
    pub level: LogLevel,

    /// Output format of log messages. One of: [logfmt, json].
    #[arg(long = "log.format", default_value = "logfmt")]
    pub format: LogFormat,
}

impl HelperArgs {
    /// Build the command line for an exporter.
    pub fn command_for(name: &str, description: &str, version: &str, default_address: &str) -> Command {
        let name = name.to_string();
        let default_address = default_address.to_string();
        Self::command()
            .name(name.clone())
            .about(description.to_string())
            .version(version.to_string())
            .mut_arg("listen_addresses", |arg| arg.default_value(default_address))
            .mut_arg("service_name", |arg| arg.default_value(name))
    }

    /// Parse flags from an iterator, with exporter-specific defaults.
    pub fn try_parse_for<I, T>(
        name: &str,
        description: &str,
        version: &str,
        default_address: &str,
        args: I,
    ) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = Self::command_for(name, description, version, default_address).try_get_matches_from(args)?;
        Self::from_arg_matches(&matches)
    }

    /// Like [`HelperArgs::try_parse_for`], with extra flags `A` (typically an
    /// extension provider's) parsed from the same command line.
    pub fn try_parse_with<A, I, T>(
        name: &str,
        description: &str,
        version: &str,
        default_address: &str,
        args: I,
    ) -> Result<(Self, A), clap::Error>
    where
        A: Args,
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let command = A::augment_args(Self::command_for(name, description, version, default_address));
        let matches = command.try_get_matches_from(args)?;
        Ok((Self::from_arg_matches(&matches)?, A::from_arg_matches(&matches)?))
    }

    /// Convert parsed flags into the immutable configuration.
    pub fn into_config(self, exporter_name: &str) -> HelperConfig {
        let request_timeout = match self.web.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        HelperConfig {
            web: WebConfig {
                telemetry_path: self.web.telemetry_path,
                listener: ListenerConfig {
                    listen_addresses: self.web.listen_addresses,
                    systemd_socket: self.web.systemd_socket,
                },
                max_requests: self.web.max_requests,
                disable_exporter_metrics: self.web.disable_exporter_metrics,
                landing_page: self.web.landing_page,
                request_timeout,
            },
            log: LogConfig {
                level: self.log.level,
                format: self.log.format,
            },
            overlay: OverlayConfig {
                identity_file: self.overlay.identity_file,
                service_name: self
                    .overlay
                    .service_name
                    .unwrap_or_else(|| exporter_name.to_string()),
                only: self.overlay.only,
                tunnel_dir: self.overlay.tunnel_dir,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> HelperConfig {
        let argv = std::iter::once("test_exporter").chain(args.iter().copied());
        HelperArgs::try_parse_for("test_exporter", "A test exporter", "0.1.0", ":9100", argv)
            .unwrap()
            .into_config("test_exporter")
    }

    #[test]
    fn runtime_defaults_apply() {
        let config = parse(&[]);
        assert_eq!(config.web.listener.listen_addresses, vec![":9100".to_string()]);
        assert_eq!(config.overlay.service_name, "test_exporter");
        assert_eq!(config.web.telemetry_path, "/metrics");
        assert_eq!(config.web.max_requests, 2);
        assert!(config.web.landing_page);
        assert_eq!(config.web.request_timeout, None);
    }

    #[test]
    fn repeated_listen_addresses_keep_order() {
        let config = parse(&[
            "--web.listen-address=127.0.0.1:9100",
            "--web.listen-address=/run/exporter.sock",
        ]);
        assert_eq!(
            config.web.listener.listen_addresses,
            vec!["127.0.0.1:9100".to_string(), "/run/exporter.sock".to_string()]
        );
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--web.telemetry-path=/probe",
            "--web.systemd-socket",
            "--web.max-requests=0",
            "--web.disable-exporter-metrics",
            "--web.landing-page=false",
            "--web.request-timeout=5",
            "--web.ziti.only",
            "--web.ziti.service-name=metrics",
            "--log.level=debug",
            "--log.format=json",
        ]);
        assert_eq!(config.web.telemetry_path, "/probe");
        assert!(config.web.listener.systemd_socket);
        assert_eq!(config.web.max_requests, 0);
        assert!(config.web.disable_exporter_metrics);
        assert!(!config.web.landing_page);
        assert_eq!(config.web.request_timeout, Some(Duration::from_secs(5)));
        assert!(config.overlay.only);
        assert_eq!(config.overlay.service_name, "metrics");
        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let argv = ["test_exporter", "--log.level=verbose"];
        assert!(HelperArgs::try_parse_for("test_exporter", "", "0.1.0", ":9100", argv).is_err());
    }
}
