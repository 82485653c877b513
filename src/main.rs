//! Minimal exporter built on the helper.
//!
//! Exposes its own uptime next to the helper's build info and process
//! metrics. Useful as a template and as a smoke test of the flag surface:
//!
//! ```text
//! exporter-helper --web.listen-address=127.0.0.1:9633 \
//!                 --web.listen-address=/run/exporter-helper.sock
//! ```

use std::process::ExitCode;
use std::time::Instant;

use exporter_helper::config::DEFAULT_LISTEN_ADDRESS;
use exporter_helper::{CollectError, Collector, ExporterHelper};

struct UptimeCollector {
    started: Instant,
}

impl Collector for UptimeCollector {
    fn name(&self) -> &str {
        "uptime"
    }

    fn collect(&self) -> Result<(), CollectError> {
        metrics::gauge!("exporter_helper_uptime_seconds").set(self.started.elapsed().as_secs_f64());
        Ok(())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let helper = ExporterHelper::new(
        "exporter_helper",
        "Prometheus exporter exposing its own uptime",
        DEFAULT_LISTEN_ADDRESS,
    );

    let config = helper.parse_args();
    helper.init_logging(&config);

    let collector = UptimeCollector {
        started: Instant::now(),
    };
    helper.listen_and_serve(config, collector).await
}
