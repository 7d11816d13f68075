use thiserror::Error;

use crate::ComponentName;

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The component has no engine handle yet.
    #[error("{0} is not started")]
    NotStarted(ComponentName),

    /// The operation is not implemented by this component kind.
    #[error("the operation {operation} can not be called on {component}")]
    Unsupported {
        /// The component the operation was called on.
        component: ComponentName,
        /// The unsupported operation.
        operation: &'static str,
    },
}
