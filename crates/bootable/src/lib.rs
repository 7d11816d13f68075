//! Abstract interface for bootable cluster components.
//!
//! Every wrapped service implements [`Component`] the same way: settings are
//! resolved eagerly at construction, the engine is built lazily on
//! [`Component::start`], and both `start` and `stop` are idempotent and
//! lenient. An engine failure is logged by the adapter and the lifecycle
//! still reaches its terminal state, so the reported [`State`] means "the
//! call completed", not "the service is live".
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use ministack_engine::EngineConfig;
use tokio::sync::Mutex;
use tracing::{debug, error};

/// Process-wide-unique identity of a cluster component. Used as the registry
/// key and as the prefix for its configuration keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentName {
    /// The coordination service other components register with.
    Coordinator,
    /// The message broker.
    Broker,
    /// The SQL gateway and its embedded metastore.
    SqlGateway,
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Coordinator => "coordinator",
            Self::Broker => "broker",
            Self::SqlGateway => "sql-gateway",
        };
        write!(f, "{name}")
    }
}

/// Lifecycle state of a component.
///
/// `Starting` and `Stopping` are transient: start/stop run to completion on
/// the caller's task, so other callers only ever observe `Stopped` or
/// `Started`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum State {
    /// Not running; the initial and final state.
    #[default]
    Stopped,
    /// Transitioning towards `Started`.
    Starting,
    /// The start call has completed.
    Started,
    /// Transitioning towards `Stopped`.
    Stopping,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Started => "started",
            Self::Stopping => "stopping",
        };
        write!(f, "{state}")
    }
}

/// Shared state-machine helper composed by every adapter.
///
/// Exactly four legal edges exist:
/// `Stopped → Starting → Started` and `Started → Stopping → Stopped`.
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: Mutex<State>,
}

impl Lifecycle {
    /// Creates a lifecycle in the `Stopped` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current state.
    pub async fn state(&self) -> State {
        *self.state.lock().await
    }

    /// Moves `Stopped → Starting`. Returns `false` (leaving the state
    /// untouched) from any other state, which makes `start` a no-op.
    pub async fn begin_start(&self) -> bool {
        let mut state = self.state.lock().await;
        if *state == State::Stopped {
            *state = State::Starting;
            true
        } else {
            false
        }
    }

    /// Moves `Starting → Started`. Must only follow a successful
    /// [`Self::begin_start`].
    pub async fn complete_start(&self) {
        let mut state = self.state.lock().await;
        debug_assert_eq!(*state, State::Starting);
        *state = State::Started;
    }

    /// Moves `Started → Stopping`. Returns `false` from any other state,
    /// which makes `stop` a no-op.
    pub async fn begin_stop(&self) -> bool {
        let mut state = self.state.lock().await;
        if *state == State::Started {
            *state = State::Stopping;
            true
        } else {
            false
        }
    }

    /// Moves `Stopping → Stopped`. Must only follow a successful
    /// [`Self::begin_stop`].
    pub async fn complete_stop(&self) {
        let mut state = self.state.lock().await;
        debug_assert_eq!(*state, State::Stopping);
        *state = State::Stopped;
    }
}

/// Trait for bootable cluster components.
#[async_trait]
pub trait Component
where
    Self: Send + Sync + 'static,
{
    /// The identity of this component. Constant, no side effects.
    fn name(&self) -> ComponentName;

    /// Human-readable snapshot of the effective settings, for diagnostics.
    /// Bracketed `[key:value, ...]` form; not machine-parsed anywhere.
    fn describe(&self) -> String;

    /// The current lifecycle state.
    async fn state(&self) -> State;

    /// Start the component: build the engine from the resolved settings and
    /// start it. No-op unless the state is `Stopped`. The state is `Started`
    /// when the call returns even if the engine failed to come up; callers
    /// needing liveness must probe the engine itself.
    async fn start(&self) -> Result<(), Error>;

    /// Stop the component's engine, run working-directory cleanup, and
    /// release the engine handle. No-op unless the state is `Started`.
    /// Cleanup runs even when the engine failed to stop, and the state is
    /// `Stopped` when the call returns.
    async fn stop(&self) -> Result<(), Error>;

    /// The engine's effective configuration, for deep introspection.
    ///
    /// # Errors
    ///
    /// Not every component kind exposes one: returns [`Error::Unsupported`]
    /// on those that do not, and [`Error::NotStarted`] before the engine has
    /// been built.
    async fn configuration(&self) -> Result<EngineConfig, Error>;
}

/// Best-effort removal of a working directory an adapter told its engine to
/// use. Failures other than the directory being absent are logged and
/// swallowed so that cleanup never blocks the lifecycle from reaching
/// `Stopped`.
pub async fn remove_working_dir(component: ComponentName, path: &Path) {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => debug!("{} removed working directory {}", component, path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => error!(
            component = %component,
            phase = "cleanup",
            error = %e,
            "unable to remove working directory {}",
            path.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lifecycle_full_cycle() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state().await, State::Stopped);

        assert!(lifecycle.begin_start().await);
        assert_eq!(lifecycle.state().await, State::Starting);
        lifecycle.complete_start().await;
        assert_eq!(lifecycle.state().await, State::Started);

        assert!(lifecycle.begin_stop().await);
        assert_eq!(lifecycle.state().await, State::Stopping);
        lifecycle.complete_stop().await;
        assert_eq!(lifecycle.state().await, State::Stopped);
    }

    #[tokio::test]
    async fn test_begin_start_is_noop_unless_stopped() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.begin_start().await);
        lifecycle.complete_start().await;

        // already started: no edge available
        assert!(!lifecycle.begin_start().await);
        assert_eq!(lifecycle.state().await, State::Started);
    }

    #[tokio::test]
    async fn test_begin_stop_is_noop_unless_started() {
        let lifecycle = Lifecycle::new();
        assert!(!lifecycle.begin_stop().await);
        assert_eq!(lifecycle.state().await, State::Stopped);
    }

    #[test]
    fn test_component_name_display() {
        assert_eq!(ComponentName::Coordinator.to_string(), "coordinator");
        assert_eq!(ComponentName::Broker.to_string(), "broker");
        assert_eq!(ComponentName::SqlGateway.to_string(), "sql-gateway");
    }

    #[tokio::test]
    async fn test_remove_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("work");
        tokio::fs::create_dir_all(&path).await.unwrap();

        remove_working_dir(ComponentName::Broker, &path).await;
        assert!(!path.exists());

        // absent directory is not an error
        remove_working_dir(ComponentName::Broker, &path).await;
    }
}
