use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be resolved.
    #[error("bad config: {0}")]
    Config(#[from] ministack_properties::Error),
}
