//! Abstract contract for the embedded service engines wrapped by ministack.
//!
//! The engines themselves (broker runtime, SQL gateway, coordination quorum)
//! are external collaborators. Adapters only ever build an engine from their
//! resolved settings, start it, stop it, and optionally read back its
//! effective configuration.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::collections::BTreeMap;

use async_trait::async_trait;

/// Effective configuration of a running engine, exposed for deep
/// introspection by tests and dependent components.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineConfig(BTreeMap<String, String>);

impl EngineConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, returning the configuration for chaining.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Looks up an entry by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Iterates over all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An opaque wrapped service engine.
#[async_trait]
pub trait Engine
where
    Self: Send + Sync + 'static,
{
    /// Start the engine.
    async fn start(&self) -> Result<(), Error>;

    /// Stop the engine. `force` requests an immediate stop rather than a
    /// graceful drain.
    async fn stop(&self, force: bool) -> Result<(), Error>;

    /// The engine's effective configuration, if it exposes one.
    fn configuration(&self) -> Option<EngineConfig>;
}

/// Builds engines from a component's resolved settings.
///
/// Construction is infallible: the wrapped engines are assembled from already
/// validated settings and only report problems once started.
pub trait EngineFactory<S>
where
    Self: Send + Sync + 'static,
{
    /// The engine type this factory produces.
    type Engine: Engine;

    /// Build an engine for the given settings.
    fn build(&self, settings: &S) -> Self::Engine;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_entries() {
        let config = EngineConfig::new()
            .with("broker.id", "1")
            .with("broker.host", "localhost");

        assert_eq!(config.get("broker.id"), Some("1"));
        assert_eq!(config.get("missing"), None);
        assert_eq!(config.len(), 2);
        assert!(!config.is_empty());

        // BTreeMap keeps iteration deterministic
        let keys: Vec<&str> = config.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["broker.host", "broker.id"]);
    }
}
