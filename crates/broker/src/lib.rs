//! Lifecycle adapter for the embedded message broker.
//!
//! The broker registers with the coordination service, so it consumes the
//! coordinator's host/port keys and must be started after it. The broker is
//! also the one component kind that exposes no configuration handle:
//! [`Component::configuration`] fails deterministically on it.
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
use ministack_coordinator::{COORDINATOR_HOST_KEY, COORDINATOR_PORT_KEY};
use ministack_engine::{Engine, EngineConfig, EngineFactory};
use ministack_properties::PropertyResolver;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Property key for the broker host.
pub const BROKER_HOST_KEY: &str = "broker.host";
/// Property key for the broker port.
pub const BROKER_PORT_KEY: &str = "broker.port";
/// Property key for the broker id.
pub const BROKER_ID_KEY: &str = "broker.id";
/// Property key for the broker working directory.
pub const BROKER_TEMP_DIR_KEY: &str = "broker.temp.dir";

/// Resolved settings for the message broker.
#[derive(Clone, Debug)]
pub struct BrokerSettings {
    /// Host the broker binds to.
    pub host: String,
    /// Listener port.
    pub port: u16,
    /// Broker id within the (single-node) cluster.
    pub broker_id: i64,
    /// Working directory handed to the engine.
    pub temp_dir: PathBuf,
    /// Host of the coordination service the broker registers with.
    pub coordinator_host: String,
    /// Port of the coordination service.
    pub coordinator_port: u16,
}

impl BrokerSettings {
    /// Resolves the settings from the property source. Fails fast on a
    /// missing or mistyped key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if any required key is absent or mistyped.
    pub fn resolve(resolver: &PropertyResolver) -> Result<Self, Error> {
        Ok(Self {
            host: resolver.get_string(BROKER_HOST_KEY)?,
            port: resolver.get_port(BROKER_PORT_KEY)?,
            broker_id: resolver.get_int(BROKER_ID_KEY)?,
            temp_dir: resolver.get_string(BROKER_TEMP_DIR_KEY)?.into(),
            coordinator_host: resolver.get_string(COORDINATOR_HOST_KEY)?,
            coordinator_port: resolver.get_port(COORDINATOR_PORT_KEY)?,
        })
    }

    /// The `"host:port"` descriptor of the coordination service the broker
    /// registers with. Derived on demand, never stored.
    #[must_use]
    pub fn coordinator_connect(&self) -> String {
        format!("{}:{}", self.coordinator_host, self.coordinator_port)
    }
}

impl fmt::Display for BrokerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[host:{}, port:{}]", self.host, self.port)
    }
}

/// Runs the message broker.
pub struct BrokerService<F>
where
    F: EngineFactory<BrokerSettings>,
{
    settings: BrokerSettings,
    factory: F,
    lifecycle: Lifecycle,
    engine: Mutex<Option<F::Engine>>,
}

impl<F> BrokerService<F>
where
    F: EngineFactory<BrokerSettings>,
{
    /// Creates the adapter, resolving its settings eagerly. The engine is
    /// only built once [`Component::start`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is incomplete.
    pub fn new(resolver: &PropertyResolver, factory: F) -> Result<Self, Error> {
        Ok(Self {
            settings: BrokerSettings::resolve(resolver)?,
            factory,
            lifecycle: Lifecycle::new(),
            engine: Mutex::new(None),
        })
    }

    /// The resolved settings.
    #[must_use]
    pub const fn settings(&self) -> &BrokerSettings {
        &self.settings
    }
}

#[async_trait]
impl<F> Component for BrokerService<F>
where
    F: EngineFactory<BrokerSettings>,
{
    fn name(&self) -> ComponentName {
        ComponentName::Broker
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
                "unable to start broker engine"
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
                    "unable to stop broker engine"
                );
            }
        }

        remove_working_dir(self.name(), &self.settings.temp_dir).await;

        self.lifecycle.complete_stop().await;
        info!("{} is stopped", self.name());

        Ok(())
    }

    /// The broker engine exposes no configuration handle.
    async fn configuration(&self) -> Result<EngineConfig, ministack_bootable::Error> {
        Err(ministack_bootable::Error::Unsupported {
            component: self.name(),
            operation: "configuration",
        })
    }
}
