use once_cell::sync::OnceCell;
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};

static CONFIG: OnceCell<ExporterConfig> = OnceCell::new();

/// Exporter config that can be passed through arguments.
#[derive(Debug, Clone)]
pub(crate) struct ExporterConfig {
    /// Network address where the prometheus metrics endpoint will listen (example: 0.0.0.0:9100).
    metrics_endpoint: SocketAddr,

    /// Mount point of sysfs.
    sys_path: PathBuf,

    /// Prefix of every exported metric name.
    namespace: String,

    /// Which collectors to run.
    collectors: CollectorSelection,
}

/// Collectors explicitly enabled or disabled on the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct CollectorSelection {
    pub(crate) enabled: Vec<String>,
    pub(crate) disabled: Vec<String>,
    /// Treat every collector as disabled unless explicitly enabled.
    pub(crate) disable_defaults: bool,
}

impl CollectorSelection {
    /// Whether the collector `name` should run. Disabling wins over enabling.
    pub(crate) fn is_enabled(&self, name: &str, default_enabled: bool) -> bool {
        if self.disabled.iter().any(|n| n == name) {
            return false;
        }
        if self.enabled.iter().any(|n| n == name) {
            return true;
        }
        default_enabled && !self.disable_defaults
    }

    /// Every collector name mentioned by the selection.
    pub(crate) fn named(&self) -> impl Iterator<Item = &str> {
        self.enabled
            .iter()
            .chain(self.disabled.iter())
            .map(String::as_str)
    }
}

impl ExporterConfig {
    pub(crate) fn new(
        metrics_endpoint: SocketAddr,
        sys_path: PathBuf,
        namespace: String,
        collectors: CollectorSelection,
    ) -> Self {
        Self {
            metrics_endpoint,
            sys_path,
            namespace,
            collectors,
        }
    }

    /// Initialize exporter configs.
    pub(crate) fn initialize(config: ExporterConfig) {
        CONFIG.get_or_init(|| config);
    }

    /// Get exporter config.
    pub(crate) fn get_config() -> &'static ExporterConfig {
        CONFIG.get().expect("Exporter config is not initialized")
    }

    /// Get metrics endpoint.
    pub(crate) fn metrics_endpoint(&self) -> &SocketAddr {
        &self.metrics_endpoint
    }

    /// Get sysfs mount point.
    pub(crate) fn sys_path(&self) -> &Path {
        &self.sys_path
    }

    /// Get metric namespace.
    pub(crate) fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Get collector selection.
    pub(crate) fn collectors(&self) -> &CollectorSelection {
        &self.collectors
    }
}
