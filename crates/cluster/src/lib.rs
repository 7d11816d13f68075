//! Registry and orchestrator for a set of bootable cluster components.
//!
//! A [`Cluster`] owns every configured component adapter, derives a start
//! order from the declared dependencies and drives aggregate start/stop.
//! Orchestration is strictly serial so the ordering stays deterministic, and
//! it is best-effort: one component failing internally never prevents the
//! remaining components from being attempted. The cluster is an explicit
//! value constructed at process entry; there is no global registry.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use ministack_bootable::{Component, ComponentName, State};
use tracing::{error, info};

struct Entry {
    component: Box<dyn Component>,
    depends_on: Vec<ComponentName>,
}

/// The full set of configured components and their dependency edges.
#[derive(Default)]
pub struct Cluster {
    entries: Vec<Entry>,
}

impl Cluster {
    /// Creates an empty cluster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a component together with the identities it depends on
    /// (the components whose connection descriptors it consumes).
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRegistered`] if the identity is taken.
    pub fn register(
        &mut self,
        component: Box<dyn Component>,
        depends_on: Vec<ComponentName>,
    ) -> Result<(), Error> {
        let name = component.name();
        if self.entries.iter().any(|e| e.component.name() == name) {
            return Err(Error::AlreadyRegistered(name));
        }

        self.entries.push(Entry {
            component,
            depends_on,
        });

        Ok(())
    }

    /// Looks up a registered component.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the identity was never registered.
    pub fn get(&self, name: ComponentName) -> Result<&dyn Component, Error> {
        self.entries
            .iter()
            .find(|e| e.component.name() == name)
            .map(|e| e.component.as_ref())
            .ok_or(Error::NotFound(name))
    }

    /// Number of registered components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no component is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Computes the start order: every component after all of its declared
    /// dependencies, independents keeping their registration order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDependency`] for an edge to an unregistered
    /// identity and [`Error::DependencyCycle`] if no valid order exists.
    pub fn start_order(&self) -> Result<Vec<ComponentName>, Error> {
        for entry in &self.entries {
            for dependency in &entry.depends_on {
                if !self.entries.iter().any(|e| e.component.name() == *dependency) {
                    return Err(Error::UnknownDependency {
                        component: entry.component.name(),
                        dependency: *dependency,
                    });
                }
            }
        }

        let mut order = Vec::with_capacity(self.entries.len());
        while order.len() < self.entries.len() {
            let placed_before = order.len();

            for entry in &self.entries {
                let name = entry.component.name();
                if order.contains(&name) {
                    continue;
                }
                if entry.depends_on.iter().all(|d| order.contains(d)) {
                    order.push(name);
                }
            }

            if order.len() == placed_before {
                return Err(Error::DependencyCycle);
            }
        }

        Ok(order)
    }

    /// Starts every component exactly once, in dependency order. A single
    /// component's failure is logged and does not abort the sweep.
    ///
    /// # Errors
    ///
    /// Only ordering problems surface; see [`Self::start_order`].
    pub async fn start_all(&self) -> Result<(), Error> {
        let order = self.start_order()?;
        info!("starting {} components", order.len());

        for name in order {
            let component = self.get(name)?;
            info!("starting {} {}", name, component.describe());
            if let Err(e) = component.start().await {
                error!(component = %name, phase = "start", error = %e, "unable to start component");
            }
        }

        Ok(())
    }

    /// Stops every component in reverse dependency order, with the same
    /// best-effort continuation policy as [`Self::start_all`].
    ///
    /// # Errors
    ///
    /// Only ordering problems surface; see [`Self::start_order`].
    pub async fn stop_all(&self) -> Result<(), Error> {
        let mut order = self.start_order()?;
        order.reverse();
        info!("stopping {} components", order.len());

        for name in order {
            let component = self.get(name)?;
            if let Err(e) = component.stop().await {
                error!(component = %name, phase = "stop", error = %e, "unable to stop component");
            }
        }

        Ok(())
    }

    /// Diagnostic snapshot of every component's lifecycle state, in
    /// registration order.
    pub async fn states(&self) -> Vec<(ComponentName, State)> {
        let mut states = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            states.push((entry.component.name(), entry.component.state().await));
        }
        states
    }
}
