//! Flat key/value property resolution for cluster components.
//!
//! The property source is loaded once per process and is immutable
//! afterwards, so a single [`PropertyResolver`] can be shared across all
//! component adapters without synchronization. A missing or malformed source
//! is fatal: no component can start without configuration.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::collections::HashMap;
use std::path::Path;

use toml::{Table, Value};

/// Typed lookups over a flat property set.
///
/// Nested tables in the source file are flattened to dotted keys at load
/// time, so `[broker] port = 9092` and `broker.port = 9092` read the same.
#[derive(Debug)]
pub struct PropertyResolver {
    values: HashMap<String, Value>,
}

impl PropertyResolver {
    /// Loads the property source at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Read`] if the file is unreadable and [`Error::Parse`]
    /// if it is malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let table: Table = content.parse()?;

        let mut values = HashMap::new();
        flatten(&mut values, None, table);

        Ok(Self { values })
    }

    /// Looks up a string property.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingKey`] or [`Error::InvalidType`].
    pub fn get_string(&self, key: &str) -> Result<String, Error> {
        self.get(key)?
            .as_str()
            .map(ToOwned::to_owned)
            .ok_or_else(|| Error::InvalidType {
                key: key.to_owned(),
                expected: "string",
            })
    }

    /// Looks up an integer property.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingKey`] or [`Error::InvalidType`].
    pub fn get_int(&self, key: &str) -> Result<i64, Error> {
        self.get(key)?.as_integer().ok_or_else(|| Error::InvalidType {
            key: key.to_owned(),
            expected: "integer",
        })
    }

    /// Looks up a TCP port property.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingKey`] or [`Error::InvalidType`] (also when the
    /// value does not fit a port).
    pub fn get_port(&self, key: &str) -> Result<u16, Error> {
        let value = self.get_int(key)?;
        u16::try_from(value).map_err(|_| Error::InvalidType {
            key: key.to_owned(),
            expected: "port",
        })
    }

    /// Composes a `"host:port"` connection descriptor from two keys.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingKey`] or [`Error::InvalidType`] for either key.
    pub fn connection_string(&self, host_key: &str, port_key: &str) -> Result<String, Error> {
        let host = self.get_string(host_key)?;
        let port = self.get_port(port_key)?;
        Ok(format!("{host}:{port}"))
    }

    fn get(&self, key: &str) -> Result<&Value, Error> {
        self.values
            .get(key)
            .ok_or_else(|| Error::MissingKey(key.to_owned()))
    }
}

fn flatten(values: &mut HashMap<String, Value>, prefix: Option<&str>, table: Table) {
    for (key, value) in table {
        let key = prefix.map_or_else(|| key.clone(), |prefix| format!("{prefix}.{key}"));
        match value {
            Value::Table(nested) => flatten(values, Some(&key), nested),
            other => {
                values.insert(key, other);
            }
        }
    }
}
