use crate::error::ExporterError;
use prometheus::{
    core::{Collector as _, Desc},
    proto::{MetricFamily, MetricType},
    GaugeVec, Opts,
};
use std::sync::mpsc::Sender;

/// Module for the btrfs collector.
pub(crate) mod btrfs;
/// Runs the enabled collectors on behalf of prometheus.
pub(crate) mod node;
/// Explicit registration of the available collectors.
pub(crate) mod registry;
#[cfg(test)]
pub(crate) mod testing;

/// Channel on which collectors emit their metrics.
pub(crate) type MetricSender = Sender<ConstMetric>;

/// A source of metrics, updated once per scrape.
pub(crate) trait Collector: Send + Sync {
    /// Sends the current value of every metric to `ch`.
    fn update(&self, ch: &MetricSender) -> Result<(), ExporterError>;
}

/// A fully bound metric: description, label values and value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ConstMetric {
    fq_name: String,
    help: String,
    label_names: Vec<String>,
    kind: MetricType,
    label_values: Vec<String>,
    value: f64,
}

impl ConstMetric {
    /// Build a gauge. `label_values` must align with `label_names`.
    pub(crate) fn gauge(
        fq_name: String,
        help: &str,
        label_names: Vec<String>,
        label_values: Vec<String>,
        value: f64,
    ) -> Self {
        debug_assert_eq!(label_names.len(), label_values.len());
        Self {
            fq_name,
            help: help.to_string(),
            label_names,
            kind: MetricType::GAUGE,
            label_values,
            value,
        }
    }

    /// Get the fully-qualified metric name.
    pub(crate) fn fq_name(&self) -> &str {
        &self.fq_name
    }

    /// Converts the metric into a prometheus metric family.
    pub(crate) fn to_metric_family(&self) -> Result<Vec<MetricFamily>, prometheus::Error> {
        let label_names = self.label_names.iter().map(String::as_str).collect::<Vec<_>>();
        let label_values = self.label_values.iter().map(String::as_str).collect::<Vec<_>>();
        match self.kind {
            MetricType::GAUGE => {
                let gauge_vec =
                    GaugeVec::new(Opts::new(&self.fq_name, &self.help), &label_names)?;
                gauge_vec
                    .get_metric_with_label_values(&label_values)?
                    .set(self.value);
                Ok(gauge_vec.collect())
            }
            kind => Err(prometheus::Error::Msg(format!(
                "unsupported metric type {kind:?} for {}",
                self.fq_name
            ))),
        }
    }
}

/// Joins the non-empty name components with `_`.
pub(crate) fn fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

/// Initializes a GaugeVec metric keyed by collector name and records its descriptors.
fn init_scrape_gauge_vec(
    namespace: &str,
    metric_name: &str,
    metric_desc: &str,
    descs: &mut Vec<Desc>,
) -> Result<GaugeVec, prometheus::Error> {
    let opts = Opts::new(metric_name, metric_desc)
        .namespace(namespace)
        .subsystem("scrape");
    let gauge_vec = GaugeVec::new(opts, &["collector"])?;
    descs.extend(gauge_vec.desc().into_iter().cloned());
    Ok(gauge_vec)
}
