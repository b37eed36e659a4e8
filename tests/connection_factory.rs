//! Integration tests for the connection factory and source registry.

use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use repofed::command::Command;
use repofed::connection::{detectors_from_config, ConnectionFactory, RegistryError, SourceRegistry};
use repofed::connector::{ConnectorError, FailOn, InMemorySource, IsolationLevel};
use repofed::core::config::{Config, RepofedConfig, SourceConfig};
use repofed::core::error::ErrorKind;
use repofed::core::path::Path;

fn factory_with(sources: Vec<InMemorySource>) -> ConnectionFactory {
    let registry = Arc::new(SourceRegistry::new());
    for source in sources {
        registry.register(Arc::new(source)).unwrap();
    }
    ConnectionFactory::new(registry)
}

#[test]
fn unknown_source_is_not_an_error() {
    let factory = factory_with(vec![InMemorySource::new("alpha")]);

    assert!(factory.create_connection("beta").unwrap().is_none());

    let mut conn = factory.create_connection("alpha").unwrap().unwrap();
    assert_eq!(conn.source_name(), "alpha");
    assert!(conn.execute(Command::read_node(Path::root())).unwrap().is_ok());
}

#[test]
fn lookup_ignores_surrounding_whitespace() {
    let factory = factory_with(vec![InMemorySource::new("alpha")]);
    assert!(factory.create_connection(" alpha ").unwrap().is_some());
}

#[test]
fn offline_source_is_unavailable() {
    let source = InMemorySource::new("alpha");
    source.set_available(false);
    let factory = factory_with(vec![source.clone()]);

    let err = factory.create_connection("alpha").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectorUnavailable);

    source.set_available(true);
    assert!(factory.create_connection("alpha").unwrap().is_some());
}

#[test]
fn open_failure_reason_is_reported() {
    let source = InMemorySource::new("alpha")
        .fail_on(FailOn::OpenSession(ConnectorError::Unavailable("pool exhausted".into())));
    let factory = factory_with(vec![source]);

    let err = factory.create_connection("alpha").unwrap_err();
    assert!(err.to_string().contains("pool exhausted"));
}

#[test]
fn duplicate_registration_is_rejected() {
    let registry = SourceRegistry::new();
    registry.register(Arc::new(InMemorySource::new("alpha"))).unwrap();

    let err = registry
        .register(Arc::new(InMemorySource::new("alpha")))
        .unwrap_err();
    assert_eq!(err, RegistryError::Duplicate("alpha".into()));
}

#[test]
fn unregistered_source_keeps_open_connections() {
    let registry = Arc::new(SourceRegistry::new());
    registry.register(Arc::new(InMemorySource::new("alpha"))).unwrap();
    let factory = ConnectionFactory::new(Arc::clone(&registry));

    let mut conn = factory.create_connection("alpha").unwrap().unwrap();
    registry.unregister("alpha").unwrap();

    assert!(factory.create_connection("alpha").unwrap().is_none());
    assert!(conn.execute(Command::read_node(Path::root())).unwrap().is_ok());
}

#[test]
fn concurrent_connection_requests() {
    let factory = factory_with(vec![InMemorySource::new("alpha"), InMemorySource::new("beta")]);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let factory = factory.clone();
            thread::spawn(move || {
                let name = if i % 2 == 0 { "alpha" } else { "beta" };
                let mut conn = factory.create_connection(name).unwrap().unwrap();
                let result = conn.execute(Command::read_node(Path::root())).unwrap();
                conn.close().unwrap();
                result.is_ok()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}

#[test]
fn concurrent_registration_keeps_every_source() {
    let registry = Arc::new(SourceRegistry::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                registry
                    .register(Arc::new(InMemorySource::new(format!("s{}", i))))
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.len(), 8);
}

mod from_config {
    use super::*;

    fn config(sources: Vec<SourceConfig>) -> Config {
        Config::from_file(RepofedConfig {
            sources,
            ..RepofedConfig::default()
        })
    }

    #[test]
    fn builds_every_configured_source() {
        let dir = TempDir::new().unwrap();
        let config = config(vec![
            SourceConfig::new("scratch", "memory"),
            SourceConfig {
                root: Some(dir.path().to_path_buf()),
                ..SourceConfig::new("docs", "filesystem")
            },
        ]);

        let factory = ConnectionFactory::from_config(&config, detectors_from_config(&config)).unwrap();
        assert_eq!(factory.registry().names(), vec!["docs", "scratch"]);
        assert_eq!(
            factory.capabilities("docs").unwrap().isolation,
            IsolationLevel::None
        );
        assert_eq!(
            factory.capabilities("scratch").unwrap().isolation,
            IsolationLevel::Snapshot
        );
    }

    #[test]
    fn read_only_flag_reaches_capabilities() {
        let config = config(vec![SourceConfig {
            read_only: true,
            ..SourceConfig::new("frozen", "memory")
        }]);

        let factory = ConnectionFactory::from_config(&config, detectors_from_config(&config)).unwrap();
        assert!(factory.capabilities("frozen").unwrap().read_only);
    }

    #[test]
    fn missing_filesystem_root_is_unavailable_at_connect() {
        let dir = TempDir::new().unwrap();
        let config = config(vec![SourceConfig {
            root: Some(dir.path().join("gone")),
            ..SourceConfig::new("docs", "filesystem")
        }]);

        let factory = ConnectionFactory::from_config(&config, detectors_from_config(&config)).unwrap();
        let err = factory.create_connection("docs").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectorUnavailable);
    }

    #[test]
    fn unknown_connector_is_rejected() {
        let config = config(vec![SourceConfig::new("x", "carrier-pigeon")]);
        assert!(ConnectionFactory::from_config(&config, detectors_from_config(&config)).is_err());
    }
}
