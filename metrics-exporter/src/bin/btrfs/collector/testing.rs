use super::{Collector, ConstMetric, MetricSender};
use crate::error::{ExporterError, StatsError};
use std::path::PathBuf;

fn value(name: &str) -> ConstMetric {
    ConstMetric::gauge(name.to_string(), "Test value.", vec![], vec![], 1.0)
}

/// Sends one metric and succeeds.
pub(crate) struct StaticCollector;

impl Collector for StaticCollector {
    fn update(&self, ch: &MetricSender) -> Result<(), ExporterError> {
        ch.send(value("test_static_value"))
            .map_err(|source| ExporterError::MetricChannel { source })
    }
}

/// Sends one metric, then fails.
pub(crate) struct FailingCollector;

impl Collector for FailingCollector {
    fn update(&self, ch: &MetricSender) -> Result<(), ExporterError> {
        ch.send(value("test_failing_value"))
            .map_err(|source| ExporterError::MetricChannel { source })?;
        Err(ExporterError::RetrieveStats {
            source: StatsError::NotADirectory {
                path: PathBuf::from("/sys"),
            },
        })
    }
}

pub(crate) struct PanickingCollector;

impl Collector for PanickingCollector {
    fn update(&self, _ch: &MetricSender) -> Result<(), ExporterError> {
        panic!("collector bug");
    }
}
