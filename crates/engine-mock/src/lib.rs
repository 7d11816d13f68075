//! Scriptable engine implementation for local development and tests.
//!
//! The real embedded engines are external collaborators, so the local binary
//! and the test suites run against this mock instead. Every build/start/stop
//! is recorded into a shared [`Journal`], and failures can be scripted to
//! exercise the lenient lifecycle policy of the adapters.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use ministack_engine::{Engine, EngineConfig, EngineFactory, Error};
use tracing::debug;

/// Shared, append-only record of engine interactions. Cloning yields a handle
/// to the same journal, so one journal can observe a whole cluster.
#[derive(Clone, Debug, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.into());
    }

    /// Snapshot of all entries in record order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Factory producing [`MockEngine`]s for one component.
pub struct MockEngineFactory {
    label: String,
    journal: Journal,
    fail_start: bool,
    fail_stop: bool,
    configuration: Option<EngineConfig>,
    builds: Arc<AtomicUsize>,
}

impl MockEngineFactory {
    /// Creates a factory recording into `journal` under `label`.
    #[must_use]
    pub fn new(label: impl Into<String>, journal: Journal) -> Self {
        Self {
            label: label.into(),
            journal,
            fail_start: false,
            fail_stop: false,
            configuration: None,
            builds: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Scripts every built engine to fail its start call.
    #[must_use]
    pub fn fail_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Scripts every built engine to fail its stop call.
    #[must_use]
    pub fn fail_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    /// Gives built engines a canned effective configuration.
    #[must_use]
    pub fn with_configuration(mut self, configuration: EngineConfig) -> Self {
        self.configuration = Some(configuration);
        self
    }

    /// Number of engines built so far.
    #[must_use]
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl<S> EngineFactory<S> for MockEngineFactory
where
    S: fmt::Display + Send + Sync,
{
    type Engine = MockEngine;

    fn build(&self, settings: &S) -> MockEngine {
        self.builds.fetch_add(1, Ordering::SeqCst);
        self.journal.record(format!("{}:build", self.label));

        // Surface the settings the engine was built from through its
        // effective configuration.
        let configuration = self
            .configuration
            .clone()
            .map(|config| config.with("settings", settings.to_string()));

        MockEngine {
            label: self.label.clone(),
            journal: self.journal.clone(),
            fail_start: self.fail_start,
            fail_stop: self.fail_stop,
            configuration,
        }
    }
}

/// A no-op engine that records its lifecycle calls.
pub struct MockEngine {
    label: String,
    journal: Journal,
    fail_start: bool,
    fail_stop: bool,
    configuration: Option<EngineConfig>,
}

#[async_trait]
impl Engine for MockEngine {
    async fn start(&self) -> Result<(), Error> {
        debug!("mock engine {} starting", self.label);
        self.journal.record(format!("{}:start", self.label));

        if self.fail_start {
            return Err(Error::Failure(format!(
                "{} start scripted to fail",
                self.label
            )));
        }

        Ok(())
    }

    async fn stop(&self, _force: bool) -> Result<(), Error> {
        debug!("mock engine {} stopping", self.label);
        self.journal.record(format!("{}:stop", self.label));

        if self.fail_stop {
            return Err(Error::Failure(format!(
                "{} stop scripted to fail",
                self.label
            )));
        }

        Ok(())
    }

    fn configuration(&self) -> Option<EngineConfig> {
        self.configuration.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Settings;

    impl fmt::Display for Settings {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "[host:localhost]")
        }
    }

    #[tokio::test]
    async fn test_journal_records_lifecycle() {
        let journal = Journal::new();
        let factory = MockEngineFactory::new("broker", journal.clone());

        let engine = EngineFactory::<Settings>::build(&factory, &Settings);
        engine.start().await.unwrap();
        engine.stop(true).await.unwrap();

        assert_eq!(
            journal.entries(),
            vec!["broker:build", "broker:start", "broker:stop"]
        );
        assert_eq!(factory.build_count(), 1);
    }

    #[tokio::test]
    async fn test_scripted_start_failure_still_records() {
        let journal = Journal::new();
        let factory = MockEngineFactory::new("broker", journal.clone()).fail_start();

        let engine = EngineFactory::<Settings>::build(&factory, &Settings);
        assert!(engine.start().await.is_err());
        assert_eq!(journal.entries(), vec!["broker:build", "broker:start"]);
    }

    #[tokio::test]
    async fn test_configuration_carries_settings() {
        let journal = Journal::new();
        let factory = MockEngineFactory::new("gateway", journal)
            .with_configuration(EngineConfig::new().with("mode", "embedded"));

        let engine = EngineFactory::<Settings>::build(&factory, &Settings);
        let config = engine.configuration().unwrap();
        assert_eq!(config.get("mode"), Some("embedded"));
        assert_eq!(config.get("settings"), Some("[host:localhost]"));
    }
}
