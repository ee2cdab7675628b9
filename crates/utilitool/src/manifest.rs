//! Package manifests (package.json)
//!
//! Reads the project's root manifest and builds the manifests of the
//! generated packages from it.

use crate::naming::validate_package_name;
use crate::version::{parse_version, Version, VersionBump};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Root manifest fields copied into every generated manifest, in output order
pub const MANIFEST_COPY_FIELDS: &[&str] = &[
    "author",
    "bugs",
    "contributors",
    "funding",
    "license",
    "maintainers",
    "repository",
    "version",
];

/// Entry point declared by every generated manifest
pub const PACKAGE_MAIN: &str = "index.js";

/// Errors that can occur while loading or validating a manifest
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Failed to read manifest file
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid JSON, or not a JSON object
    #[error("Failed to parse \"{path}\": {message}")]
    Parse { path: PathBuf, message: String },

    /// Missing or invalid required field
    #[error("Invalid manifest {path}: {message}")]
    Validation { path: PathBuf, message: String },
}

/// The project's own package.json
#[derive(Debug, Clone, PartialEq)]
pub struct RootManifest {
    path: PathBuf,
    fields: Map<String, Value>,
}

impl RootManifest {
    /// Parse a manifest from a file
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content, path)
    }

    /// Parse a manifest from a string; `path` is only used in messages
    pub fn from_str(content: &str, path: impl Into<PathBuf>) -> Result<Self, ManifestError> {
        let path = path.into();
        match serde_json::from_str::<Value>(content) {
            Ok(Value::Object(fields)) => Ok(Self { path, fields }),
            Ok(_) => Err(ManifestError::Parse {
                path,
                message: "expected a JSON object".to_string(),
            }),
            Err(e) => Err(ManifestError::Parse {
                path,
                message: e.to_string(),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    pub fn version(&self) -> Option<&str> {
        self.fields.get("version").and_then(Value::as_str)
    }

    /// A top-level field, treating `null` as absent
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|value| !value.is_null())
    }

    /// Range the root manifest itself declares for `dependency`
    pub fn declared_range(&self, dependency: &str) -> Option<&str> {
        ["dependencies", "peerDependencies", "devDependencies"]
            .iter()
            .filter_map(|table| self.fields.get(*table).and_then(Value::as_object))
            .find_map(|table| table.get(dependency).and_then(Value::as_str))
    }

    /// Check the `name` field, and the `version` field when `require_version`
    pub fn validate(&self, require_version: bool) -> Result<(), ManifestError> {
        let name = match self.name() {
            Some(name) if !name.is_empty() => name,
            _ => return Err(self.invalid("missing required field \"name\"".to_string())),
        };
        let check = validate_package_name(name);
        if !check.errors.is_empty() {
            return Err(self.invalid(format!(
                "invalid name \"{}\": {}",
                name,
                check.errors.join(", ")
            )));
        }

        if require_version {
            self.parsed_version()?;
        }
        Ok(())
    }

    /// The `version` field as a semantic version
    pub fn parsed_version(&self) -> Result<Version, ManifestError> {
        let version = self
            .version()
            .ok_or_else(|| self.invalid("missing required field \"version\"".to_string()))?;
        parse_version(version).map_err(|e| self.invalid(e.to_string()))
    }

    /// Apply `bump` to the in-memory version; the file on disk is untouched
    pub fn bump_version(&mut self, bump: &VersionBump) -> Result<Version, ManifestError> {
        let next = match bump {
            VersionBump::Set(version) => version.clone(),
            other => other.apply(&self.parsed_version()?),
        };
        self.fields
            .insert("version".to_string(), Value::String(next.to_string()));
        Ok(next)
    }

    fn invalid(&self, message: String) -> ManifestError {
        ManifestError::Validation {
            path: self.path.clone(),
            message,
        }
    }
}

/// Manifest written into each generated package.
///
/// Field order is `name`, `dependencies`, `main`, then the copied fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageManifest {
    pub name: String,
    pub dependencies: BTreeMap<String, String>,
    pub main: String,
    #[serde(flatten)]
    pub copied: Map<String, Value>,
}

impl PackageManifest {
    /// Manifest for `name` with `dependencies`, copying the listed root fields
    /// that are present and not null
    pub fn derive(
        name: &str,
        dependencies: BTreeMap<String, String>,
        root: &RootManifest,
    ) -> Self {
        let mut copied = Map::new();
        for key in MANIFEST_COPY_FIELDS {
            if let Some(value) = root.field(key) {
                copied.insert(key.to_string(), value.clone());
            }
        }
        Self {
            name: name.to_string(),
            dependencies,
            main: PACKAGE_MAIN.to_string(),
            copied,
        }
    }
}
