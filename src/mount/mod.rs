//! Mount registry
//!
//! Normalizes the raw `mounts` mapping of a remote container into an
//! ordered [`MountTable`], and resolves user input to exactly one mount.
//!
//! Declaration order is preserved: `mount:download --all` walks the table
//! in that order.

pub mod definition;

pub use definition::{MountDefinition, MountSource};

use indexmap::IndexMap;
use serde::Serialize;
use serde_yaml::Value;

use crate::error::{Result, ShipError};

/// Strip leading and trailing separators from a mount path.
pub fn normalize_relative_path(path: &str) -> String {
    path.trim_matches('/').to_string()
}

/// The raw `mounts` value from a container config, if declared.
pub fn mounts_from_config(config: &Value) -> Option<&Value> {
    config.get("mounts").filter(|v| !v.is_null())
}

/// Normalized mounts keyed by mount path, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MountTable(IndexMap<String, MountDefinition>);

impl MountTable {
    /// Normalize a raw `mounts` mapping.
    ///
    /// Keys lose their leading/trailing `/`, definitions get a default
    /// source. Feeding the output back through [`MountTable::to_raw`] and
    /// `normalize` yields the same table.
    pub fn normalize(raw: &Value) -> Result<Self> {
        let mapping = match raw {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(mapping) => mapping,
            _ => {
                return Err(ShipError::Config(
                    "'mounts' must be a mapping of path to definition".to_string(),
                ))
            }
        };

        let mut table = IndexMap::with_capacity(mapping.len());
        for (key, definition) in mapping {
            let declared = key.as_str().ok_or_else(|| {
                ShipError::Config(format!("Mount path must be a string, got {:?}", key))
            })?;
            let path = normalize_relative_path(declared);
            if path.is_empty() {
                return Err(ShipError::InvalidMount {
                    path: declared.to_string(),
                    reason: "mount path is empty".to_string(),
                });
            }

            let definition = MountDefinition::from_raw(&path, definition)?;
            if table.insert(path.clone(), definition).is_some() {
                return Err(ShipError::InvalidMount {
                    path,
                    reason: "declared more than once".to_string(),
                });
            }
        }

        Ok(Self(table))
    }

    /// Serialize back to the raw config shape.
    #[cfg(test)]
    pub fn to_raw(&self) -> Result<Value> {
        Ok(serde_yaml::to_value(self)?)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MountDefinition)> {
        self.0.iter().map(|(path, def)| (path.as_str(), def))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Resolve user input to one declared mount path.
    ///
    /// An exact match wins even if it is also a prefix of another mount.
    /// Otherwise the input must be a prefix of exactly one mount.
    pub fn match_path(&self, input: &str) -> Result<&str> {
        let needle = normalize_relative_path(input);
        if needle.is_empty() {
            return Err(ShipError::NotFound(format!("Mount not found: {}", input)));
        }

        if let Some((path, _)) = self.0.get_key_value(&needle) {
            return Ok(path.as_str());
        }

        let candidates: Vec<&str> = self.paths().filter(|p| p.starts_with(&needle)).collect();
        match candidates.as_slice() {
            [single] => Ok(*single),
            [] => Err(ShipError::NotFound(format!("Mount not found: {}", input))),
            _ => Err(ShipError::AmbiguousMount {
                input: input.to_string(),
                candidates: candidates.iter().map(|c| c.to_string()).collect(),
            }),
        }
    }

    /// Mounts backed by shared storage, mapped to their path inside the
    /// local shared directory.
    pub fn shared_file_mounts(&self) -> IndexMap<&str, &str> {
        self.iter()
            .filter_map(|(path, def)| def.shared_path(path).map(|shared| (path, shared)))
            .collect()
    }
}
