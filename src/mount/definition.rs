//! Mount definition types
//!
//! A mount is declared in an application's (or service's) config under the
//! `mounts` key:
//!
//! ```yaml
//! mounts:
//!   web/uploads:
//!     source: local
//!     source_path: uploads
//!   /private/:
//!     source: service
//!     service: files
//!     source_path: private
//!   "legacy": "shared:files/legacy"
//! ```

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::{Result, ShipError};

/// Legacy string form of a shared mount: `shared:files/<path>`.
const LEGACY_SHARED_PREFIX: &str = "shared:files";

/// Storage backing a mount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MountSource {
    /// Storage attached to the container (default)
    #[default]
    Local,
    /// Network storage provided by a separate service
    Service,
    /// Ephemeral scratch space, never shared
    Tmp,
}

impl std::fmt::Display for MountSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MountSource::Local => write!(f, "local"),
            MountSource::Service => write!(f, "service"),
            MountSource::Tmp => write!(f, "tmp"),
        }
    }
}

/// A normalized mount definition. The mount path itself is the key of the
/// owning [`MountTable`](super::MountTable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MountDefinition {
    #[serde(default)]
    pub source: MountSource,

    /// Path inside the shared storage, without leading or trailing `/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,

    /// Name of the backing service, for `source: service`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl MountDefinition {
    pub fn new(source: MountSource) -> Self {
        Self {
            source,
            ..Default::default()
        }
    }

    pub fn with_source_path(mut self, source_path: impl Into<String>) -> Self {
        self.source_path = Some(source_path.into());
        self
    }

    /// Parse one raw definition as found in the config.
    pub fn from_raw(path: &str, raw: &Value) -> Result<Self> {
        let definition = match raw {
            Value::String(s) => Self::from_legacy(path, s)?,
            Value::Mapping(_) => serde_yaml::from_value::<MountDefinition>(raw.clone())
                .map_err(|e| ShipError::InvalidMount {
                    path: path.to_string(),
                    reason: e.to_string(),
                })?,
            other => {
                return Err(ShipError::InvalidMount {
                    path: path.to_string(),
                    reason: format!("expected a mapping, got {}", value_kind(other)),
                })
            }
        };

        Ok(definition.normalized())
    }

    fn from_legacy(path: &str, raw: &str) -> Result<Self> {
        let rest = raw
            .strip_prefix(LEGACY_SHARED_PREFIX)
            .ok_or_else(|| ShipError::InvalidMount {
                path: path.to_string(),
                reason: format!("unrecognized mount string '{}'", raw),
            })?;

        Ok(Self::new(MountSource::Local).with_source_path(rest))
    }

    fn normalized(mut self) -> Self {
        self.source_path = self
            .source_path
            .map(|p| p.trim_matches('/').to_string())
            .filter(|p| !p.is_empty());
        self
    }

    /// Whether the mount is backed by persistent shared storage, which
    /// makes the local shared directory a sensible transfer endpoint.
    pub fn is_shared(&self) -> bool {
        match self.source {
            MountSource::Service => true,
            MountSource::Local => self.source_path.is_some(),
            MountSource::Tmp => false,
        }
    }

    /// Path relative to the local shared directory, for shared mounts.
    /// Service mounts without a source path fall back to the mount path.
    pub fn shared_path<'a>(&'a self, mount_path: &'a str) -> Option<&'a str> {
        if !self.is_shared() {
            return None;
        }
        Some(self.source_path.as_deref().unwrap_or(mount_path))
    }

    /// Short label for menus and listings.
    pub fn describe(&self) -> String {
        match (&self.source, &self.service, &self.source_path) {
            (MountSource::Service, Some(service), _) => format!("service ({})", service),
            (source, _, Some(source_path)) => format!("{}: {}", source, source_path),
            (source, _, None) => source.to_string(),
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(path: &str, yaml: &str) -> Result<MountDefinition> {
        let raw: Value = serde_yaml::from_str(yaml).unwrap();
        MountDefinition::from_raw(path, &raw)
    }

    #[test]
    fn test_default_source_is_local() {
        let def = parse("var/cache", "source_path: cache").unwrap();
        assert_eq!(def.source, MountSource::Local);
        assert_eq!(def.source_path.as_deref(), Some("cache"));
    }

    #[test]
    fn test_empty_mapping() {
        let def = parse("var/cache", "{}").unwrap();
        assert_eq!(def, MountDefinition::new(MountSource::Local));
        assert!(!def.is_shared());
    }

    #[test]
    fn test_source_path_is_trimmed() {
        let def = parse("private", "{source: local, source_path: /files/private/}").unwrap();
        assert_eq!(def.source_path.as_deref(), Some("files/private"));

        let def = parse("private", "{source: local, source_path: /}").unwrap();
        assert!(def.source_path.is_none());
    }

    #[test]
    fn test_legacy_string() {
        let def = parse("web/files", "shared:files/files").unwrap();
        assert_eq!(def.source, MountSource::Local);
        assert_eq!(def.source_path.as_deref(), Some("files"));
        assert!(def.is_shared());
    }

    #[test]
    fn test_invalid_string_rejected() {
        let err = parse("web/files", "something-else").unwrap_err();
        assert!(matches!(err, ShipError::InvalidMount { .. }));
    }

    #[test]
    fn test_non_mapping_rejected() {
        let err = parse("web/files", "[1, 2]").unwrap_err();
        assert!(err.to_string().contains("a sequence"));
    }

    #[test]
    fn test_unknown_source_rejected() {
        assert!(parse("web/files", "{source: nfs}").is_err());
    }

    #[test]
    fn test_shared_classification() {
        let local = MountDefinition::new(MountSource::Local);
        assert!(!local.is_shared());
        assert_eq!(local.shared_path("web/uploads"), None);

        let shared = MountDefinition::new(MountSource::Local).with_source_path("files");
        assert_eq!(shared.shared_path("private"), Some("files"));

        let service = MountDefinition::new(MountSource::Service);
        assert_eq!(service.shared_path("data"), Some("data"));

        let tmp = MountDefinition::new(MountSource::Tmp).with_source_path("x");
        assert!(!tmp.is_shared());
    }

    #[test]
    fn test_describe() {
        let service = MountDefinition {
            source: MountSource::Service,
            source_path: None,
            service: Some("files".to_string()),
        };
        assert_eq!(service.describe(), "service (files)");
        assert_eq!(
            MountDefinition::new(MountSource::Local).with_source_path("up").describe(),
            "local: up"
        );
        assert_eq!(MountDefinition::new(MountSource::Tmp).describe(), "tmp");
    }
}
