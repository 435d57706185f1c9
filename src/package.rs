//! Fallback `info` block from the host package manifest.

use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding the manifest location.
pub const MANIFEST_ENV: &str = "ROUTEDOC_MANIFEST";

/// Version reported when the manifest has none.
pub const DEFAULT_VERSION: &str = "1.0.0";

#[derive(Debug, Deserialize)]
struct Manifest {
    package: Option<Value>,
}

/// Name, version and description of the host package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageInfo {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
}

impl PackageInfo {
    /// Read `[package]` from a `Cargo.toml`.
    ///
    /// A missing or unreadable manifest is not an error: the defaults are used
    /// and the reason is logged at debug level. Values inherited from a
    /// workspace (`version.workspace = true`) count as missing.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "Package manifest not readable");
                return Self::default();
            }
        };
        let manifest: Manifest = match toml::from_str(&content) {
            Ok(manifest) => manifest,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "Package manifest not parseable");
                return Self::default();
            }
        };
        let Some(package) = manifest.package else {
            return Self::default();
        };
        let field = |key: &str| package.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            name: field("name"),
            version: field("version"),
            description: field("description"),
        }
    }

    /// Load from `ROUTEDOC_MANIFEST`, or `Cargo.toml` in the working directory.
    #[must_use]
    pub fn discover() -> Self {
        let path = std::env::var_os(MANIFEST_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("Cargo.toml"));
        Self::load(&path)
    }

    /// Render as an OpenAPI `info` object.
    #[must_use]
    pub fn to_info(&self) -> Value {
        let mut info = Map::new();
        info.insert("title".into(), json!(self.name.as_deref().unwrap_or("")));
        info.insert(
            "version".into(),
            json!(self.version.as_deref().unwrap_or(DEFAULT_VERSION)),
        );
        if let Some(description) = &self.description {
            info.insert("description".into(), json!(description));
        }
        Value::Object(info)
    }
}
