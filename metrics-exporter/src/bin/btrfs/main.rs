use crate::{
    collector::{
        btrfs::{BtrfsCollector, COLLECTOR_NAME},
        registry::{CollectorRegistry, DEFAULT_ENABLED},
    },
    config::{CollectorSelection, ExporterConfig},
    error::{ExporterError, HttpBind, HttpService, RegisterCollectors},
    serve::metric_route,
};
use actix_web::{middleware, web, HttpServer};
use clap::Parser;
use prometheus::Registry;
use snafu::ResultExt;
use std::{net::SocketAddr, path::PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Sysfs client module.
pub(crate) mod client;
/// Collector module.
pub(crate) mod collector;
/// Config module for metrics-exporter.
pub(crate) mod config;
/// Error module.
pub(crate) mod error;
/// Prometheus metrics handler module.
pub(crate) mod serve;

#[derive(Parser, Debug)]
#[clap(name = "metrics-exporter-btrfs", version, about)]
struct Cli {
    /// TCP address where prometheus endpoint will listen to
    #[clap(long, short, default_value = "0.0.0.0:9100")]
    metrics_endpoint: SocketAddr,

    /// Mount point of sysfs
    #[clap(long, env = "SYSFS_PATH", default_value = "/sys")]
    sysfs_path: PathBuf,

    /// Namespace prefixed to every metric name
    #[clap(long, default_value = "node")]
    namespace: String,

    /// Collectors to enable in addition to the defaults
    #[clap(long, value_delimiter = ',')]
    enable_collectors: Vec<String>,

    /// Collectors to disable
    #[clap(long, value_delimiter = ',')]
    disable_collectors: Vec<String>,

    /// Disable all collectors that are not explicitly enabled
    #[clap(long)]
    disable_default_collectors: bool,
}

impl Cli {
    fn args() -> Self {
        Cli::parse()
    }

    fn exporter_config(self) -> ExporterConfig {
        ExporterConfig::new(
            self.metrics_endpoint,
            self.sysfs_path,
            self.namespace,
            CollectorSelection {
                enabled: self.enable_collectors,
                disabled: self.disable_collectors,
                disable_defaults: self.disable_default_collectors,
            },
        )
    }
}

/// Registers every collector this exporter ships.
fn register_collectors(registry: &mut CollectorRegistry) -> Result<(), ExporterError> {
    registry.register(COLLECTOR_NAME, DEFAULT_ENABLED, BtrfsCollector::factory)
}

/// Builds the enabled collectors and registers them with prometheus.
fn initialize_registry(config: &ExporterConfig) -> Result<Registry, ExporterError> {
    let mut collectors = CollectorRegistry::default();
    register_collectors(&mut collectors)?;
    let node_collector = collectors.build(config)?;
    info!(
        collectors = ?node_collector.collector_names().collect::<Vec<_>>(),
        "Initialized collectors"
    );

    let registry = Registry::new();
    registry
        .register(Box::new(node_collector))
        .context(RegisterCollectors)?;
    Ok(registry)
}

#[tokio::main]
async fn main() -> Result<(), ExporterError> {
    let args = Cli::args();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    ExporterConfig::initialize(args.exporter_config());
    let config = ExporterConfig::get_config();

    let registry = initialize_registry(config).map_err(|error| {
        error!(%error, "Failed to initialize collectors");
        error
    })?;

    info!(endpoint = %config.metrics_endpoint(), "Serving metrics");
    let app = move || {
        actix_web::App::new()
            .app_data(web::Data::new(registry.clone()))
            .wrap(middleware::Logger::default())
            .configure(metric_route)
    };
    HttpServer::new(app)
        .bind(config.metrics_endpoint())
        .context(HttpBind)?
        .workers(1)
        .run()
        .await
        .context(HttpService)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::btrfs::tests::fixture_fs;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_defaults() {
        let config = Cli::try_parse_from(["metrics-exporter-btrfs"])
            .unwrap()
            .exporter_config();
        assert_eq!(config.metrics_endpoint().to_string(), "0.0.0.0:9100");
        assert_eq!(config.namespace(), "node");
        assert_eq!(config.collectors(), &CollectorSelection::default());
    }

    #[test]
    fn cli_collector_selection() {
        let config = Cli::try_parse_from([
            "metrics-exporter-btrfs",
            "--sysfs-path",
            "/host/sys",
            "--disable-collectors",
            "btrfs,xfs",
            "--disable-default-collectors",
        ])
        .unwrap()
        .exporter_config();
        assert_eq!(config.sys_path(), std::path::Path::new("/host/sys"));
        assert_eq!(config.collectors().disabled, vec!["btrfs", "xfs"]);
        assert!(config.collectors().disable_defaults);
    }

    #[test]
    fn registry_serves_btrfs_metrics() {
        let sysfs = TempDir::new().unwrap();
        fixture_fs(sysfs.path());
        let config = ExporterConfig::new(
            "127.0.0.1:9100".parse().unwrap(),
            sysfs.path().to_path_buf(),
            "node".to_string(),
            CollectorSelection::default(),
        );

        let families = initialize_registry(&config).unwrap().gather();
        let names = families
            .iter()
            .map(|family| family.get_name())
            .collect::<Vec<_>>();
        for name in [
            "node_btrfs_device_count",
            "node_btrfs_device_size",
            "node_btrfs_global_rsv_size_bytes",
            "node_btrfs_ratio",
            "node_btrfs_reserved_bytes",
            "node_btrfs_total_bytes",
            "node_btrfs_used_bytes",
            "node_scrape_collector_success",
        ] {
            assert!(names.contains(&name), "missing {name}");
        }
    }

    #[test]
    fn missing_sysfs_is_fatal() {
        let config = ExporterConfig::new(
            "127.0.0.1:9100".parse().unwrap(),
            "/nonexistent/sysfs".into(),
            "node".to_string(),
            CollectorSelection::default(),
        );
        let error = initialize_registry(&config).err().unwrap();
        assert!(matches!(error, ExporterError::CollectorInit { .. }));
    }
}
