//! Lifecycle adapter for the embedded coordination service.
//!
//! The coordination service has no dependencies of its own; the broker and
//! the SQL gateway both register with it, so it must be the first component
//! up and the last one down.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use ministack_bootable::{Component, ComponentName, Lifecycle, State, remove_working_dir};
use ministack_engine::{Engine, EngineConfig, EngineFactory};
use ministack_properties::PropertyResolver;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Property key for the coordination service host.
pub const COORDINATOR_HOST_KEY: &str = "coordinator.host";
/// Property key for the coordination service client port.
pub const COORDINATOR_PORT_KEY: &str = "coordinator.port";
/// Property key for the coordination service working directory.
pub const COORDINATOR_TEMP_DIR_KEY: &str = "coordinator.temp.dir";

/// Resolved settings for the coordination service.
#[derive(Clone, Debug)]
pub struct CoordinatorSettings {
    /// Host the service binds to.
    pub host: String,
    /// Client port.
    pub port: u16,
    /// Working directory handed to the engine.
    pub temp_dir: PathBuf,
}

impl CoordinatorSettings {
    /// Resolves the settings from the property source. Fails fast on a
    /// missing or mistyped key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if any required key is absent or mistyped.
    pub fn resolve(resolver: &PropertyResolver) -> Result<Self, Error> {
        Ok(Self {
            host: resolver.get_string(COORDINATOR_HOST_KEY)?,
            port: resolver.get_port(COORDINATOR_PORT_KEY)?,
            temp_dir: resolver.get_string(COORDINATOR_TEMP_DIR_KEY)?.into(),
        })
    }

    /// The `"host:port"` descriptor clients use to reach the service.
    /// Derived on demand, never stored.
    #[must_use]
    pub fn client_connect(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for CoordinatorSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[host:{}, port:{}]", self.host, self.port)
    }
}

/// Runs the coordination service other components register with.
pub struct CoordinatorService<F>
where
    F: EngineFactory<CoordinatorSettings>,
{
    settings: CoordinatorSettings,
    factory: F,
    lifecycle: Lifecycle,
    engine: Mutex<Option<F::Engine>>,
}

impl<F> CoordinatorService<F>
where
    F: EngineFactory<CoordinatorSettings>,
{
    /// Creates the adapter, resolving its settings eagerly. The engine is
    /// only built once [`Component::start`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is incomplete.
    pub fn new(resolver: &PropertyResolver, factory: F) -> Result<Self, Error> {
        Ok(Self {
            settings: CoordinatorSettings::resolve(resolver)?,
            factory,
            lifecycle: Lifecycle::new(),
            engine: Mutex::new(None),
        })
    }

    /// The resolved settings.
    #[must_use]
    pub const fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }
}

#[async_trait]
impl<F> Component for CoordinatorService<F>
where
    F: EngineFactory<CoordinatorSettings>,
{
    fn name(&self) -> ComponentName {
        ComponentName::Coordinator
    }

    fn describe(&self) -> String {
        self.settings.to_string()
    }

    async fn state(&self) -> State {
        self.lifecycle.state().await
    }

    async fn start(&self) -> Result<(), ministack_bootable::Error> {
        if !self.lifecycle.begin_start().await {
            debug!("{} is not stopped, ignoring start", self.name());
            return Ok(());
        }

        info!("{} is starting", self.name());

        let engine = self.factory.build(&self.settings);
        if let Err(e) = engine.start().await {
            error!(
                component = %self.name(),
                phase = "start",
                error = %e,
                "unable to start coordinator engine"
            );
        }
        self.engine.lock().await.replace(engine);

        self.lifecycle.complete_start().await;
        info!("{} is started", self.name());

        Ok(())
    }

    async fn stop(&self) -> Result<(), ministack_bootable::Error> {
        if !self.lifecycle.begin_stop().await {
            debug!("{} is not started, ignoring stop", self.name());
            return Ok(());
        }

        info!("{} is stopping", self.name());

        if let Some(engine) = self.engine.lock().await.take() {
            if let Err(e) = engine.stop(true).await {
                error!(
                    component = %self.name(),
                    phase = "stop",
                    error = %e,
                    "unable to stop coordinator engine"
                );
            }
        }

        remove_working_dir(self.name(), &self.settings.temp_dir).await;

        self.lifecycle.complete_stop().await;
        info!("{} is stopped", self.name());

        Ok(())
    }

    async fn configuration(&self) -> Result<EngineConfig, ministack_bootable::Error> {
        self.engine
            .lock()
            .await
            .as_ref()
            .ok_or(ministack_bootable::Error::NotStarted(self.name()))?
            .configuration()
            .ok_or(ministack_bootable::Error::Unsupported {
                component: self.name(),
                operation: "configuration",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use ministack_engine_mock::{Journal, MockEngineFactory};
    use tempfile::NamedTempFile;

    fn resolver(temp_dir: &std::path::Path) -> PropertyResolver {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "\"coordinator.host\" = \"localhost\"").unwrap();
        writeln!(file, "\"coordinator.port\" = 2181").unwrap();
        writeln!(file, "\"coordinator.temp.dir\" = {:?}", temp_dir).unwrap();
        let resolver = PropertyResolver::load(file.path()).unwrap();
        file.close().unwrap();
        resolver
    }

    #[tokio::test]
    async fn test_start_stop_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("coordinator");
        std::fs::create_dir_all(&work).unwrap();

        let journal = Journal::new();
        let factory = MockEngineFactory::new("coordinator", journal.clone());
        let coordinator = CoordinatorService::new(&resolver(&work), factory).unwrap();

        assert_eq!(coordinator.state().await, State::Stopped);
        coordinator.start().await.unwrap();
        assert_eq!(coordinator.state().await, State::Started);

        coordinator.stop().await.unwrap();
        assert_eq!(coordinator.state().await, State::Stopped);
        assert!(!work.exists(), "working directory should be cleaned up");
        assert_eq!(
            journal.entries(),
            vec!["coordinator:build", "coordinator:start", "coordinator:stop"]
        );
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let factory = MockEngineFactory::new("coordinator", Journal::new());
        let coordinator =
            CoordinatorService::new(&resolver(dir.path()), factory).unwrap();

        coordinator.start().await.unwrap();
        coordinator.start().await.unwrap();

        assert_eq!(coordinator.state().await, State::Started);
        // second start must not build a second engine
        assert_eq!(coordinator.factory.build_count(), 1);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new();
        let factory = MockEngineFactory::new("coordinator", journal.clone());
        let coordinator =
            CoordinatorService::new(&resolver(dir.path()), factory).unwrap();

        coordinator.start().await.unwrap();
        coordinator.stop().await.unwrap();
        coordinator.stop().await.unwrap();

        assert_eq!(coordinator.state().await, State::Stopped);
        // second stop performs no engine interaction
        assert_eq!(journal.entries().len(), 3);
    }

    #[tokio::test]
    async fn test_best_effort_start() {
        let dir = tempfile::tempdir().unwrap();
        let factory = MockEngineFactory::new("coordinator", Journal::new()).fail_start();
        let coordinator =
            CoordinatorService::new(&resolver(dir.path()), factory).unwrap();

        // engine start failure does not surface and does not block the state
        coordinator.start().await.unwrap();
        assert_eq!(coordinator.state().await, State::Started);
    }

    #[tokio::test]
    async fn test_cleanup_runs_when_engine_stop_fails() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("coordinator");
        std::fs::create_dir_all(&work).unwrap();

        let factory = MockEngineFactory::new("coordinator", Journal::new()).fail_stop();
        let coordinator = CoordinatorService::new(&resolver(&work), factory).unwrap();

        coordinator.start().await.unwrap();
        coordinator.stop().await.unwrap();

        assert_eq!(coordinator.state().await, State::Stopped);
        assert!(!work.exists());
    }

    #[tokio::test]
    async fn test_configuration_requires_start() {
        let dir = tempfile::tempdir().unwrap();
        let factory = MockEngineFactory::new("coordinator", Journal::new())
            .with_configuration(EngineConfig::new().with("tick.ms", "2000"));
        let coordinator =
            CoordinatorService::new(&resolver(dir.path()), factory).unwrap();

        assert!(matches!(
            coordinator.configuration().await,
            Err(ministack_bootable::Error::NotStarted(_))
        ));

        coordinator.start().await.unwrap();
        let config = coordinator.configuration().await.unwrap();
        assert_eq!(config.get("tick.ms"), Some("2000"));
    }

    #[tokio::test]
    async fn test_describe_and_connect() {
        let dir = tempfile::tempdir().unwrap();
        let factory = MockEngineFactory::new("coordinator", Journal::new());
        let coordinator =
            CoordinatorService::new(&resolver(dir.path()), factory).unwrap();

        assert_eq!(coordinator.describe(), "[host:localhost, port:2181]");
        assert_eq!(coordinator.settings().client_connect(), "localhost:2181");
    }
}
