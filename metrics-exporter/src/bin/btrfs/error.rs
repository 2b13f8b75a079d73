use crate::collector::ConstMetric;
use snafu::Snafu;
use std::{num::ParseIntError, path::PathBuf, sync::mpsc::SendError};

/// Errors returned while reading btrfs statistics from sysfs.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), context(suffix(false)))]
pub(crate) enum StatsError {
    /// The sysfs mount point could not be stat'ed.
    #[snafu(display("could not read {}: {}", path.display(), source))]
    MountPoint {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The sysfs mount point exists but is not a directory.
    #[snafu(display("mount point {} is not a directory", path.display()))]
    NotADirectory { path: PathBuf },

    /// A sysfs attribute or directory could not be read.
    #[snafu(display("failed to read {}: {}", path.display(), source))]
    ReadPath {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A sysfs attribute did not hold an unsigned integer.
    #[snafu(display("failed to parse {:?} in {}: {}", value, path.display(), source))]
    ParseValue {
        path: PathBuf,
        value: String,
        source: ParseIntError,
    },
}

/// Error used in the exporter.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), context(suffix(false)))]
pub(crate) enum ExporterError {
    #[snafu(display("failed to open sysfs: {}", source))]
    OpenSysfs { source: StatsError },

    #[snafu(display("failed to retrieve Btrfs stats: {}", source))]
    RetrieveStats { source: StatsError },

    #[snafu(display("metric receiver went away: {}", source))]
    MetricChannel { source: SendError<ConstMetric> },

    #[snafu(display("collector {} is already registered", name))]
    DuplicateCollector { name: String },

    #[snafu(display("unknown collector {}", name))]
    UnknownCollector { name: String },

    #[snafu(display("couldn't initialize collector {}: {}", name, source))]
    CollectorInit {
        name: String,
        source: Box<ExporterError>,
    },

    #[snafu(display("failed to create scrape metrics: {}", source))]
    ScrapeMetrics { source: prometheus::Error },

    #[snafu(display("failed to register collectors: {}", source))]
    RegisterCollectors { source: prometheus::Error },

    #[snafu(display("Failed to bind endpoint to http server: {}", source))]
    HttpBind { source: std::io::Error },

    #[snafu(display("Failed to start http service: {}", source))]
    HttpService { source: std::io::Error },
}
