use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The property source could not be read.
    #[error("unable to read properties from {path}: {source}")]
    Read {
        /// Path of the property source.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },

    /// The property source is not well-formed.
    #[error("bad config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required key is absent.
    #[error("missing required property: {0}")]
    MissingKey(String),

    /// A key is present but holds the wrong type.
    #[error("property {key} is not a valid {expected}")]
    InvalidType {
        /// The offending key.
        key: String,
        /// What the caller asked for.
        expected: &'static str,
    },
}
