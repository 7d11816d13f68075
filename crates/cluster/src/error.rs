use ministack_bootable::ComponentName;
use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A component with the same identity is already registered.
    #[error("{0} is already registered")]
    AlreadyRegistered(ComponentName),

    /// Two or more components depend on each other.
    #[error("component dependencies form a cycle")]
    DependencyCycle,

    /// Lookup of an identity that was never registered.
    #[error("{0} is not registered")]
    NotFound(ComponentName),

    /// A component declares a dependency on an unregistered identity.
    #[error("{component} depends on unregistered component {dependency}")]
    UnknownDependency {
        /// The component declaring the dependency.
        component: ComponentName,
        /// The missing dependency.
        dependency: ComponentName,
    },
}
