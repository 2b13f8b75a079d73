use super::{fq_name, Collector, ConstMetric, MetricSender};
use crate::{
    client::{
        btrfs::{AllocationStats, AllocationType, Layout, LayoutUsage, Stats},
        sysfs::SysFs,
        StatsSource,
    },
    config::ExporterConfig,
    error::{ExporterError, MetricChannel, OpenSysfs, RetrieveStats},
};
use snafu::ResultExt;
use strum::IntoEnumIterator;
use tracing::{debug, info};

/// Name under which the collector is registered.
pub(crate) const COLLECTOR_NAME: &str = "btrfs";

const SUBSYSTEM: &str = "btrfs";
/// Labels identifying the filesystem, carried by every metric.
const FS_LABELS: [&str; 2] = ["label", "uuid"];

/// A metric of one filesystem, before the filesystem labels are bound.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BtrfsMetric {
    name: &'static str,
    desc: &'static str,
    value: f64,
    extra_labels: &'static [&'static str],
    extra_label_values: Vec<String>,
}

/// Exposes space allocation statistics of btrfs filesystems.
pub(crate) struct BtrfsCollector {
    source: Box<dyn StatsSource>,
    namespace: String,
}

impl BtrfsCollector {
    /// Opens sysfs at the configured path.
    pub(crate) fn new(config: &ExporterConfig) -> Result<Self, ExporterError> {
        let fs = SysFs::new(config.sys_path()).context(OpenSysfs)?;
        info!(sysfs = %fs.root().display(), "Reading btrfs statistics from sysfs");
        Ok(Self::with_source(Box::new(fs), config.namespace()))
    }

    /// Constructor handed to the collector registry.
    pub(crate) fn factory(config: &ExporterConfig) -> Result<Box<dyn Collector>, ExporterError> {
        Ok(Box::new(Self::new(config)?))
    }

    pub(crate) fn with_source(source: Box<dyn StatsSource>, namespace: &str) -> Self {
        Self {
            source,
            namespace: namespace.to_string(),
        }
    }

    /// Binds the filesystem labels to every metric of `stats` and sends them.
    fn update_btrfs_stats(&self, ch: &MetricSender, stats: &Stats) -> Result<(), ExporterError> {
        for metric in flatten(stats) {
            let label_names = FS_LABELS
                .iter()
                .chain(metric.extra_labels)
                .map(|label| label.to_string())
                .collect();
            let label_values = [stats.label.clone(), stats.uuid.clone()]
                .into_iter()
                .chain(metric.extra_label_values)
                .collect();
            ch.send(ConstMetric::gauge(
                fq_name(&self.namespace, SUBSYSTEM, metric.name),
                metric.desc,
                label_names,
                label_values,
                metric.value,
            ))
            .context(MetricChannel)?;
        }
        Ok(())
    }
}

impl Collector for BtrfsCollector {
    fn update(&self, ch: &MetricSender) -> Result<(), ExporterError> {
        let stats = self.source.stats().context(RetrieveStats)?;
        debug!(filesystems = stats.len(), "Retrieved btrfs stats");
        for s in &stats {
            self.update_btrfs_stats(ch, s)?;
        }
        Ok(())
    }
}

/// Flattens the statistics of one filesystem, in a fixed order: filesystem-wide
/// metrics, devices, then each allocation type and its layouts.
pub(crate) fn flatten(stats: &Stats) -> Vec<BtrfsMetric> {
    let mut metrics = vec![
        BtrfsMetric {
            name: "device_count",
            desc: "Number of devices that are part of the filesystem.",
            value: stats.devices.len() as f64,
            extra_labels: &[],
            extra_label_values: vec![],
        },
        BtrfsMetric {
            name: "global_rsv_size_bytes",
            desc: "Size of global reserve.",
            value: stats.allocation.global_rsv_size as f64,
            extra_labels: &[],
            extra_label_values: vec![],
        },
    ];

    metrics.extend(stats.devices.iter().map(|device| BtrfsMetric {
        name: "device_size",
        desc: "Size of a device that is part of the filesystem.",
        value: device.size as f64,
        extra_labels: &["device"],
        extra_label_values: vec![device.name.clone()],
    }));

    for allocation_type in AllocationType::iter() {
        metrics.extend(allocation_stats(
            allocation_type,
            stats.allocation.stats(allocation_type),
        ));
    }
    metrics
}

fn allocation_stats(allocation_type: AllocationType, stats: &AllocationStats) -> Vec<BtrfsMetric> {
    let mut metrics = vec![BtrfsMetric {
        name: "reserved_bytes",
        desc: "Amount of space reserved for a data type",
        value: stats.reserved_bytes as f64,
        extra_labels: &["type"],
        extra_label_values: vec![allocation_type.as_ref().to_string()],
    }];

    for layout in Layout::iter() {
        if let Some(usage) = stats.layout(layout) {
            metrics.extend(layout_stats(allocation_type, layout, usage));
        }
    }
    metrics
}

fn layout_stats(
    allocation_type: AllocationType,
    layout: Layout,
    usage: &LayoutUsage,
) -> [BtrfsMetric; 3] {
    let labels = || vec![allocation_type.as_ref().to_string(), layout.as_ref().to_string()];
    [
        BtrfsMetric {
            name: "used_bytes",
            desc: "Amount of used space by a layout/data type",
            value: usage.used_bytes as f64,
            extra_labels: &["type", "mode"],
            extra_label_values: labels(),
        },
        BtrfsMetric {
            name: "total_bytes",
            desc: "Amount of space allocated for a layout/data type",
            value: usage.total_bytes as f64,
            extra_labels: &["type", "mode"],
            extra_label_values: labels(),
        },
        BtrfsMetric {
            name: "ratio",
            desc: "Data allocation ratio for a layout/data type",
            value: usage.ratio,
            extra_labels: &["type", "mode"],
            extra_label_values: labels(),
        },
    ]
}
