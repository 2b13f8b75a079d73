use super::{init_scrape_gauge_vec, Collector, ConstMetric};
use crate::error::{ExporterError, ScrapeMetrics};
use prometheus::{
    core::{Collector as PrometheusCollector, Desc},
    proto::MetricFamily,
    GaugeVec,
};
use snafu::ResultExt;
use std::{
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};
use tracing::{debug, error};

/// Outcome of one collector run: how long it took and what it sent, if it succeeded.
struct Scrape {
    duration: Duration,
    metrics: Option<Vec<ConstMetric>>,
}

/// Runs every enabled collector on each prometheus scrape.
pub(crate) struct NodeCollector {
    collectors: Vec<(String, Box<dyn Collector>)>,
    scrape_duration: GaugeVec,
    scrape_success: GaugeVec,
    descs: Vec<Desc>,
}

impl NodeCollector {
    /// Initialize the scrape metrics for the given collectors.
    pub(crate) fn new(
        namespace: &str,
        collectors: Vec<(String, Box<dyn Collector>)>,
    ) -> Result<Self, ExporterError> {
        let mut descs = Vec::new();
        let scrape_duration = init_scrape_gauge_vec(
            namespace,
            "collector_duration_seconds",
            "Duration of a collector scrape.",
            &mut descs,
        )
        .context(ScrapeMetrics)?;
        let scrape_success = init_scrape_gauge_vec(
            namespace,
            "collector_success",
            "Whether a collector succeeded.",
            &mut descs,
        )
        .context(ScrapeMetrics)?;

        Ok(Self {
            collectors,
            scrape_duration,
            scrape_success,
            descs,
        })
    }

    /// Names of the collectors that run on each scrape.
    pub(crate) fn collector_names(&self) -> impl Iterator<Item = &str> {
        self.collectors.iter().map(|(name, _)| name.as_str())
    }

    /// Runs all collectors concurrently, each with its own channel.
    fn scrape(&self) -> Vec<(&str, Scrape)> {
        thread::scope(|scope| {
            let handles = self
                .collectors
                .iter()
                .map(|(name, collector)| {
                    (
                        name.as_str(),
                        scope.spawn(move || execute(name, collector.as_ref())),
                    )
                })
                .collect::<Vec<_>>();

            handles
                .into_iter()
                .map(|(name, handle)| {
                    let scrape = handle.join().unwrap_or_else(|_| {
                        error!(collector = name, "Collector panicked");
                        Scrape {
                            duration: Duration::ZERO,
                            metrics: None,
                        }
                    });
                    (name, scrape)
                })
                .collect()
        })
    }

    /// Sets the scrape gauges of one collector and returns them.
    fn scrape_metrics(&self, name: &str, scrape: &Scrape) -> Vec<MetricFamily> {
        let mut metric_family = Vec::with_capacity(2);
        let success = if scrape.metrics.is_some() { 1.0 } else { 0.0 };

        match self.scrape_duration.get_metric_with_label_values(&[name]) {
            Ok(duration) => {
                duration.set(scrape.duration.as_secs_f64());
                metric_family.extend(duration.collect());
            }
            Err(error) => {
                error!(%error, collector = name, "Error while creating scrape duration metric");
            }
        }
        match self.scrape_success.get_metric_with_label_values(&[name]) {
            Ok(scrape_success) => {
                scrape_success.set(success);
                metric_family.extend(scrape_success.collect());
            }
            Err(error) => {
                error!(%error, collector = name, "Error while creating scrape success metric");
            }
        }
        metric_family
    }
}

/// Runs one collector to completion and drains its channel.
fn execute(name: &str, collector: &dyn Collector) -> Scrape {
    let (tx, rx) = mpsc::channel();
    let begin = Instant::now();
    let result = collector.update(&tx);
    let duration = begin.elapsed();
    drop(tx);

    match result {
        Ok(()) => {
            debug!(
                collector = name,
                duration_seconds = duration.as_secs_f64(),
                "Collector succeeded"
            );
            Scrape {
                duration,
                metrics: Some(rx.into_iter().collect()),
            }
        }
        Err(error) => {
            error!(
                %error,
                collector = name,
                duration_seconds = duration.as_secs_f64(),
                "Collector failed"
            );
            Scrape {
                duration,
                metrics: None,
            }
        }
    }
}

impl PrometheusCollector for NodeCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut metric_family = Vec::new();
        for (name, scrape) in self.scrape() {
            for metric in scrape.metrics.iter().flatten() {
                match metric.to_metric_family() {
                    Ok(families) => metric_family.extend(families),
                    Err(error) => {
                        error!(%error, collector = name, metric = metric.fq_name(), "Error while creating metric");
                    }
                }
            }
            metric_family.extend(self.scrape_metrics(name, &scrape));
        }
        metric_family
    }
}
