use super::{node::NodeCollector, Collector};
use crate::{
    config::ExporterConfig,
    error::{CollectorInit, DuplicateCollector, ExporterError, UnknownCollector},
};
use snafu::{ensure, OptionExt, ResultExt};
use tracing::info;

/// Collectors registered with this flag run unless explicitly disabled.
pub(crate) const DEFAULT_ENABLED: bool = true;

/// Builds a collector from the exporter configuration.
pub(crate) type CollectorFactory =
    fn(&ExporterConfig) -> Result<Box<dyn Collector>, ExporterError>;

struct Registration {
    name: &'static str,
    default_enabled: bool,
    factory: CollectorFactory,
}

/// The collectors known to the exporter, in registration order.
#[derive(Default)]
pub(crate) struct CollectorRegistry {
    registrations: Vec<Registration>,
}

impl CollectorRegistry {
    /// Registers a collector under a unique name.
    pub(crate) fn register(
        &mut self,
        name: &'static str,
        default_enabled: bool,
        factory: CollectorFactory,
    ) -> Result<(), ExporterError> {
        ensure!(
            self.find(name).is_none(),
            DuplicateCollector { name }
        );
        self.registrations.push(Registration {
            name,
            default_enabled,
            factory,
        });
        Ok(())
    }

    fn find(&self, name: &str) -> Option<&Registration> {
        self.registrations.iter().find(|r| r.name == name)
    }

    /// Constructs the collectors enabled by the configuration.
    pub(crate) fn build(&self, config: &ExporterConfig) -> Result<NodeCollector, ExporterError> {
        let selection = config.collectors();
        for name in selection.named() {
            self.find(name).context(UnknownCollector { name })?;
        }

        let mut collectors = Vec::new();
        for registration in &self.registrations {
            if !selection.is_enabled(registration.name, registration.default_enabled) {
                info!(collector = registration.name, "Collector disabled");
                continue;
            }
            let collector = (registration.factory)(config)
                .map_err(Box::new)
                .context(CollectorInit {
                    name: registration.name,
                })?;
            info!(collector = registration.name, "Collector enabled");
            collectors.push((registration.name.to_string(), collector));
        }
        NodeCollector::new(config.namespace(), collectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        collector::testing::{FailingCollector, StaticCollector},
        config::CollectorSelection,
        error::StatsError,
    };

    fn static_collector(_: &ExporterConfig) -> Result<Box<dyn Collector>, ExporterError> {
        Ok(Box::new(StaticCollector))
    }

    fn failing_collector(_: &ExporterConfig) -> Result<Box<dyn Collector>, ExporterError> {
        Ok(Box::new(FailingCollector))
    }

    fn broken_collector(_: &ExporterConfig) -> Result<Box<dyn Collector>, ExporterError> {
        Err(ExporterError::OpenSysfs {
            source: StatsError::NotADirectory {
                path: "/sys".into(),
            },
        })
    }

    fn config(selection: CollectorSelection) -> ExporterConfig {
        ExporterConfig::new(
            "127.0.0.1:9100".parse().unwrap(),
            "/sys".into(),
            "node".to_string(),
            selection,
        )
    }

    fn registry() -> CollectorRegistry {
        let mut registry = CollectorRegistry::default();
        registry
            .register("static", DEFAULT_ENABLED, static_collector)
            .unwrap();
        registry.register("failing", false, failing_collector).unwrap();
        registry
    }

    fn enabled(registry: &CollectorRegistry, selection: CollectorSelection) -> Vec<String> {
        registry
            .build(&config(selection))
            .unwrap()
            .collector_names()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn duplicate_registration() {
        let mut registry = registry();
        let error = registry
            .register("static", DEFAULT_ENABLED, static_collector)
            .unwrap_err();
        assert_eq!(error.to_string(), "collector static is already registered");
    }

    #[test]
    fn builds_default_collectors() {
        assert_eq!(enabled(&registry(), CollectorSelection::default()), vec!["static"]);
    }

    #[test]
    fn selection_overrides_defaults() {
        let selection = CollectorSelection {
            enabled: vec!["failing".to_string()],
            disabled: vec!["static".to_string()],
            disable_defaults: false,
        };
        assert_eq!(enabled(&registry(), selection), vec!["failing"]);

        let selection = CollectorSelection {
            disable_defaults: true,
            ..Default::default()
        };
        assert!(enabled(&registry(), selection).is_empty());
    }

    #[test]
    fn unknown_collector() {
        let selection = CollectorSelection {
            disabled: vec!["zfs".to_string()],
            ..Default::default()
        };
        let error = registry().build(&config(selection)).err().unwrap();
        assert_eq!(error.to_string(), "unknown collector zfs");
    }

    #[test]
    fn factory_failure() {
        let mut registry = registry();
        registry
            .register("broken", DEFAULT_ENABLED, broken_collector)
            .unwrap();
        let error = registry
            .build(&config(CollectorSelection::default()))
            .err()
            .unwrap();
        assert_eq!(
            error.to_string(),
            "couldn't initialize collector broken: failed to open sysfs: mount point /sys is not a directory"
        );
    }
}
