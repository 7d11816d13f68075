//! Lifecycle adapter for the embedded SQL gateway and its metastore.
//!
//! The gateway registers with the coordination service and owns three
//! working directories: the embedded metastore database (derby), a scratch
//! directory and the warehouse directory. On stop it removes the metastore
//! database directory twice: once at its configured path and once at the
//! relative path made of the final segment, guarding against a driver that
//! resolves the directory against the process working directory. Possibly
//! redundant; kept until the driver's working-directory semantics are
//! confirmed.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ministack_bootable::{Component, ComponentName, Lifecycle, State, remove_working_dir};
use ministack_coordinator::{COORDINATOR_HOST_KEY, COORDINATOR_PORT_KEY};
use ministack_engine::{Engine, EngineConfig, EngineFactory};
use ministack_properties::PropertyResolver;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Property key for the SQL gateway host.
pub const SQL_GATEWAY_HOST_KEY: &str = "sql.gateway.host";
/// Property key for the SQL gateway port.
pub const SQL_GATEWAY_PORT_KEY: &str = "sql.gateway.port";
/// Property key for the metastore host.
pub const SQL_GATEWAY_METASTORE_HOST_KEY: &str = "sql.gateway.metastore.host";
/// Property key for the metastore port.
pub const SQL_GATEWAY_METASTORE_PORT_KEY: &str = "sql.gateway.metastore.port";
/// Property key for the embedded metastore database directory.
pub const SQL_GATEWAY_DERBY_DIR_KEY: &str = "sql.gateway.derby.dir";
/// Property key for the scratch directory.
pub const SQL_GATEWAY_SCRATCH_DIR_KEY: &str = "sql.gateway.scratch.dir";
/// Property key for the warehouse directory.
pub const SQL_GATEWAY_WAREHOUSE_DIR_KEY: &str = "sql.gateway.warehouse.dir";

/// Resolved settings for the SQL gateway.
#[derive(Clone, Debug)]
pub struct SqlGatewaySettings {
    /// Host the gateway binds to.
    pub host: String,
    /// Gateway port.
    pub port: u16,
    /// Host of the embedded metastore.
    pub metastore_host: String,
    /// Port of the embedded metastore.
    pub metastore_port: u16,
    /// Embedded metastore database directory.
    pub derby_dir: PathBuf,
    /// Scratch directory for query execution.
    pub scratch_dir: PathBuf,
    /// Warehouse directory.
    pub warehouse_dir: PathBuf,
    /// Host of the coordination service.
    pub coordinator_host: String,
    /// Port of the coordination service.
    pub coordinator_port: u16,
}

impl SqlGatewaySettings {
    /// Resolves the settings from the property source. Fails fast on a
    /// missing or mistyped key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if any required key is absent or mistyped.
    pub fn resolve(resolver: &PropertyResolver) -> Result<Self, Error> {
        Ok(Self {
            host: resolver.get_string(SQL_GATEWAY_HOST_KEY)?,
            port: resolver.get_port(SQL_GATEWAY_PORT_KEY)?,
            metastore_host: resolver.get_string(SQL_GATEWAY_METASTORE_HOST_KEY)?,
            metastore_port: resolver.get_port(SQL_GATEWAY_METASTORE_PORT_KEY)?,
            derby_dir: resolver.get_string(SQL_GATEWAY_DERBY_DIR_KEY)?.into(),
            scratch_dir: resolver.get_string(SQL_GATEWAY_SCRATCH_DIR_KEY)?.into(),
            warehouse_dir: resolver.get_string(SQL_GATEWAY_WAREHOUSE_DIR_KEY)?.into(),
            coordinator_host: resolver.get_string(COORDINATOR_HOST_KEY)?,
            coordinator_port: resolver.get_port(COORDINATOR_PORT_KEY)?,
        })
    }

    /// The `"host:port"` descriptor of the coordination service. Derived on
    /// demand, never stored.
    #[must_use]
    pub fn coordinator_connect(&self) -> String {
        format!("{}:{}", self.coordinator_host, self.coordinator_port)
    }
}

impl fmt::Display for SqlGatewaySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[port:{}]", self.port)
    }
}

/// Runs the SQL gateway with its embedded metastore.
pub struct SqlGatewayService<F>
where
    F: EngineFactory<SqlGatewaySettings>,
{
    settings: SqlGatewaySettings,
    factory: F,
    lifecycle: Lifecycle,
    engine: Mutex<Option<F::Engine>>,
}

impl<F> SqlGatewayService<F>
where
    F: EngineFactory<SqlGatewaySettings>,
{
    /// Creates the adapter, resolving its settings eagerly. The engine is
    /// only built once [`Component::start`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is incomplete.
    pub fn new(resolver: &PropertyResolver, factory: F) -> Result<Self, Error> {
        Ok(Self {
            settings: SqlGatewaySettings::resolve(resolver)?,
            factory,
            lifecycle: Lifecycle::new(),
            engine: Mutex::new(None),
        })
    }

    /// The resolved settings.
    #[must_use]
    pub const fn settings(&self) -> &SqlGatewaySettings {
        &self.settings
    }

    async fn cleanup(&self) {
        let derby_dir = &self.settings.derby_dir;
        remove_working_dir(ComponentName::SqlGateway, derby_dir).await;

        // Duplicate deletion of the final path segment as a relative path.
        if let Some(file_name) = derby_dir.file_name() {
            remove_working_dir(ComponentName::SqlGateway, Path::new(file_name)).await;
        }
    }
}

#[async_trait]
impl<F> Component for SqlGatewayService<F>
where
    F: EngineFactory<SqlGatewaySettings>,
{
    fn name(&self) -> ComponentName {
        ComponentName::SqlGateway
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

        info!(
            "{} is starting, registering with {}",
            self.name(),
            self.settings.coordinator_connect()
        );

        let engine = self.factory.build(&self.settings);
        if let Err(e) = engine.start().await {
            error!(
                component = %self.name(),
                phase = "start",
                error = %e,
                "unable to start sql gateway engine"
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
                    "unable to stop sql gateway engine"
                );
            }
        }

        self.cleanup().await;

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

    fn resolver(derby_dir: &Path) -> PropertyResolver {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "\"sql.gateway.host\" = \"localhost\"").unwrap();
        writeln!(file, "\"sql.gateway.port\" = 10000").unwrap();
        writeln!(file, "\"sql.gateway.metastore.host\" = \"localhost\"").unwrap();
        writeln!(file, "\"sql.gateway.metastore.port\" = 9083").unwrap();
        writeln!(file, "\"sql.gateway.derby.dir\" = {:?}", derby_dir).unwrap();
        writeln!(file, "\"sql.gateway.scratch.dir\" = \"/tmp/ministack/scratch\"").unwrap();
        writeln!(
            file,
            "\"sql.gateway.warehouse.dir\" = \"/tmp/ministack/warehouse\""
        )
        .unwrap();
        writeln!(file, "\"coordinator.host\" = \"localhost\"").unwrap();
        writeln!(file, "\"coordinator.port\" = 2181").unwrap();
        let resolver = PropertyResolver::load(file.path()).unwrap();
        file.close().unwrap();
        resolver
    }

    #[tokio::test]
    async fn test_stop_removes_derby_dir_and_relative_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        // unique final segment so the relative duplicate does not collide
        // with other test runs sharing the working directory
        let segment = format!("derby-{}", std::process::id());
        let derby = dir.path().join(&segment);
        std::fs::create_dir_all(&derby).unwrap();

        // the relative duplicate the wrapped driver may have created
        let relative = PathBuf::from(&segment);
        std::fs::create_dir_all(&relative).unwrap();

        let factory = MockEngineFactory::new("sql-gateway", Journal::new());
        let gateway = SqlGatewayService::new(&resolver(&derby), factory).unwrap();

        gateway.start().await.unwrap();
        gateway.stop().await.unwrap();

        assert_eq!(gateway.state().await, State::Stopped);
        assert!(!derby.exists());
        assert!(!relative.exists());
    }

    #[tokio::test]
    async fn test_configuration_forwards_engine_handle() {
        let dir = tempfile::tempdir().unwrap();
        let derby = dir.path().join("derby");

        let factory = MockEngineFactory::new("sql-gateway", Journal::new())
            .with_configuration(EngineConfig::new().with("metastore.uris", "thrift://localhost:9083"));
        let gateway = SqlGatewayService::new(&resolver(&derby), factory).unwrap();

        assert!(matches!(
            gateway.configuration().await,
            Err(ministack_bootable::Error::NotStarted(_))
        ));

        gateway.start().await.unwrap();
        let config = gateway.configuration().await.unwrap();
        assert_eq!(
            config.get("metastore.uris"),
            Some("thrift://localhost:9083")
        );
        // the mock surfaces the settings it was built from
        assert_eq!(config.get("settings"), Some("[port:10000]"));
    }

    #[tokio::test]
    async fn test_describe_shows_port_only() {
        let dir = tempfile::tempdir().unwrap();
        let factory = MockEngineFactory::new("sql-gateway", Journal::new());
        let gateway =
            SqlGatewayService::new(&resolver(&dir.path().join("derby")), factory).unwrap();

        assert_eq!(gateway.describe(), "[port:10000]");
        assert_eq!(gateway.settings().coordinator_connect(), "localhost:2181");
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let factory = MockEngineFactory::new("sql-gateway", Journal::new());
        let gateway =
            SqlGatewayService::new(&resolver(&dir.path().join("derby")), factory).unwrap();

        gateway.start().await.unwrap();
        gateway.start().await.unwrap();
        assert_eq!(gateway.factory.build_count(), 1);
    }
}
