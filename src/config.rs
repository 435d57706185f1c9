//! # Generator Configuration
//!
//! [`GeneratorOptions`] selects the target dialect and carries its document
//! level fields. The presence of a non-empty `openapi` block selects
//! OpenAPI 3; otherwise a Swagger 2.0 document is produced from the
//! (optional) `swagger` block.
//!
//! Options can be written by hand or loaded from YAML/JSON:
//!
//! ```yaml
//! openapi:
//!   info:
//!     title: Pet Store
//!     version: 1.0.0
//!   servers:
//!     - url: https://{region}.example.com/api
//!       variables:
//!         region:
//!           default: eu
//!   x-audience: public
//! hiddenTag: internal
//! hideUntagged: false
//! stripBasePath: true
//! ```
//!
//! Hooks that are code rather than data (`transform`, `transformObject`, the
//! reference naming strategy) are attached with the `with_*` builders.

use crate::filter::{
    DocumentTransformFn, TransformFn, TransformInput, TransformOutput, Visibility,
    DEFAULT_HIDDEN_TAG,
};
use crate::package::PackageInfo;
use crate::resolver::RefNaming;
use anyhow::Context;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Swagger 2.0 document-level fields.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SwaggerOptions {
    pub info: Option<Value>,
    pub host: Option<String>,
    pub schemes: Option<Vec<String>>,
    pub consumes: Option<Vec<String>>,
    pub produces: Option<Vec<String>>,
    pub definitions: Option<Map<String, Value>>,
    pub base_path: Option<String>,
    pub security_definitions: Option<Value>,
    pub security: Option<Vec<Value>>,
    pub tags: Option<Vec<Value>>,
    pub external_docs: Option<Value>,
    /// Remaining keys; `x-*` ones are copied to the document root
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

/// OpenAPI 3 document-level fields.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenApiOptions {
    /// Version string, `3.0.3` when absent
    pub openapi: Option<String>,
    pub info: Option<Value>,
    pub servers: Option<Vec<Value>>,
    pub components: Option<Map<String, Value>>,
    pub security: Option<Vec<Value>>,
    pub tags: Option<Vec<Value>>,
    pub external_docs: Option<Value>,
    /// Remaining keys; `x-*` ones are copied to the document root
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl OpenApiOptions {
    /// An empty block does not select OpenAPI 3.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Vendor extensions (`x-*`) among a block's leftover keys.
pub(crate) fn vendor_extensions<'a>(
    extensions: &'a Map<String, Value>,
) -> impl Iterator<Item = (&'a String, &'a Value)> + 'a {
    extensions.iter().filter(|(key, _)| key.starts_with("x-"))
}

/// Everything [`crate::generator::SpecGenerator`] needs besides the registries.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorOptions {
    pub openapi: Option<OpenApiOptions>,
    pub swagger: Option<SwaggerOptions>,
    /// Routes tagged with this are hidden (`X-HIDDEN`)
    pub hidden_tag: String,
    /// Hide routes without tags
    pub hide_untagged: bool,
    /// Strip `basePath` / server paths from route URLs (default on)
    pub strip_base_path: bool,
    #[serde(skip)]
    pub transform: Option<TransformFn>,
    #[serde(skip)]
    pub transform_object: Option<DocumentTransformFn>,
    #[serde(skip)]
    pub naming: Option<Arc<dyn RefNaming>>,
    /// Fallback `info`; discovered from `Cargo.toml` when unset
    #[serde(skip)]
    pub package: Option<PackageInfo>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            openapi: None,
            swagger: None,
            hidden_tag: DEFAULT_HIDDEN_TAG.to_string(),
            hide_untagged: false,
            strip_base_path: true,
            transform: None,
            transform_object: None,
            naming: None,
            package: None,
        }
    }
}

impl fmt::Debug for GeneratorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorOptions")
            .field("openapi", &self.openapi)
            .field("swagger", &self.swagger)
            .field("hidden_tag", &self.hidden_tag)
            .field("hide_untagged", &self.hide_untagged)
            .field("strip_base_path", &self.strip_base_path)
            .field("transform", &self.transform.is_some())
            .field("transform_object", &self.transform_object.is_some())
            .field("naming", &self.naming.is_some())
            .field("package", &self.package)
            .finish()
    }
}

impl GeneratorOptions {
    /// Options producing an OpenAPI 3 document.
    #[must_use]
    pub fn openapi(options: OpenApiOptions) -> Self {
        Self {
            openapi: Some(options),
            ..Self::default()
        }
    }

    /// Options producing a Swagger 2.0 document.
    #[must_use]
    pub fn swagger(options: SwaggerOptions) -> Self {
        Self {
            swagger: Some(options),
            ..Self::default()
        }
    }

    /// Whether the OpenAPI 3 dialect is selected.
    #[must_use]
    pub fn is_openapi(&self) -> bool {
        self.openapi.as_ref().is_some_and(|o| !o.is_empty())
    }

    #[must_use]
    pub fn with_transform<F>(mut self, f: F) -> Self
    where
        F: Fn(TransformInput<'_>) -> TransformOutput + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_transform_object<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.transform_object = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_naming(mut self, naming: impl RefNaming + 'static) -> Self {
        self.naming = Some(Arc::new(naming));
        self
    }

    #[must_use]
    pub fn with_package(mut self, package: PackageInfo) -> Self {
        self.package = Some(package);
        self
    }

    #[must_use]
    pub fn with_hidden_tag(mut self, tag: impl Into<String>) -> Self {
        self.hidden_tag = tag.into();
        self
    }

    #[must_use]
    pub fn with_hide_untagged(mut self, hide: bool) -> Self {
        self.hide_untagged = hide;
        self
    }

    #[must_use]
    pub fn with_strip_base_path(mut self, strip: bool) -> Self {
        self.strip_base_path = strip;
        self
    }

    /// Hide rules derived from these options.
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        Visibility {
            hidden_tag: self.hidden_tag.clone(),
            hide_untagged: self.hide_untagged,
        }
    }
}

/// Load options from a YAML (`.yaml`/`.yml`) or JSON file.
pub fn load_options(path: &Path) -> anyhow::Result<GeneratorOptions> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read options file {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    let options: GeneratorOptions = if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("invalid YAML options in {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("invalid JSON options in {}", path.display()))?
    };
    Ok(options)
}
