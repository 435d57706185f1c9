//! # Assemblers
//!
//! An [`Assembler`] turns prepared routes into operation objects and builds
//! the document envelope for one target format. The two formats disagree on
//! parameter shapes, request bodies, status key handling and links, so each
//! has its own implementation; [`Dialect`] picks one when the generator is
//! constructed.

pub mod openapi;
pub mod swagger;

pub use openapi::OpenApiAssembler;
pub use swagger::SwaggerAssembler;

use crate::config::GeneratorOptions;
use crate::error::Result;
use crate::filter::PreparedRoute;
use crate::package::PackageInfo;
use crate::resolver::{Resolver, SchemaDialect};
use crate::url_template::format_url_template;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

/// Description used when a response declares none.
pub const DEFAULT_RESPONSE_DESCRIPTION: &str = "Default Response";

/// Response keyword overriding the response description.
pub const RESPONSE_DESCRIPTION_KEY: &str = "x-response-description";

/// Operation metadata copied verbatim from the route schema.
const OPERATION_METADATA: &[&str] = &[
    "tags",
    "summary",
    "description",
    "operationId",
    "externalDocs",
];

static STATUS_CLASS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[1-5]XX$").expect("status class regex should be valid"));

/// Builds one document format.
pub trait Assembler: Send + Sync {
    /// Namespace `$ref`s are rewritten into.
    fn schema_dialect(&self) -> SchemaDialect;

    /// Container entries supplied in the options.
    fn user_schemas(&self) -> Map<String, Value>;

    /// Route URL to `paths` key: base path stripped, leading slash ensured,
    /// `{param}` syntax.
    fn normalize_url(&self, url: &str) -> Result<String>;

    /// Operation object for one prepared route. `path` is the normalized URL.
    fn build_operation(
        &self,
        route: &PreparedRoute,
        path: &str,
        resolver: &Resolver,
    ) -> Result<Value>;

    /// Document root with an empty `paths` placeholder in its final position.
    fn build_envelope(
        &self,
        package: &PackageInfo,
        resolver: &Resolver,
    ) -> Result<Map<String, Value>>;
}

/// The selected target format.
#[derive(Debug, Clone)]
pub enum Dialect {
    Swagger(SwaggerAssembler),
    OpenApi(OpenApiAssembler),
}

impl Dialect {
    /// OpenAPI 3 when a non-empty `openapi` block is configured, Swagger 2.0 otherwise.
    #[must_use]
    pub fn from_options(options: &GeneratorOptions) -> Self {
        match &options.openapi {
            Some(openapi) if !openapi.is_empty() => Dialect::OpenApi(OpenApiAssembler::new(
                openapi.clone(),
                options.strip_base_path,
            )),
            _ => Dialect::Swagger(SwaggerAssembler::new(
                options.swagger.clone().unwrap_or_default(),
                options.strip_base_path,
            )),
        }
    }

    #[must_use]
    pub fn assembler(&self) -> &dyn Assembler {
        match self {
            Dialect::Swagger(a) => a,
            Dialect::OpenApi(a) => a,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Swagger(_) => "swagger",
            Dialect::OpenApi(_) => "openapi",
        }
    }
}

/// Status key as emitted: upper-cased, `default` kept.
pub(crate) fn status_key(raw: &str) -> String {
    if raw.eq_ignore_ascii_case("default") {
        "default".to_string()
    } else {
        raw.to_ascii_uppercase()
    }
}

/// `2XX`-style status class keys.
pub(crate) fn is_status_class(key: &str) -> bool {
    STATUS_CLASS_REGEX.is_match(key)
}

/// `x-response-description` > `description` > default.
pub(crate) fn response_description(response: &Value) -> String {
    response
        .get(RESPONSE_DESCRIPTION_KEY)
        .or_else(|| response.get("description"))
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_RESPONSE_DESCRIPTION)
        .to_string()
}

/// Response map used when a route documents none.
pub(crate) fn default_responses(status: &str) -> Value {
    let mut responses = Map::new();
    responses.insert(
        status.to_string(),
        json!({ "description": DEFAULT_RESPONSE_DESCRIPTION }),
    );
    Value::Object(responses)
}

pub(crate) fn copy_operation_metadata(
    schema: &Map<String, Value>,
    operation: &mut Map<String, Value>,
) {
    for key in OPERATION_METADATA {
        if let Some(value) = schema.get(*key) {
            operation.insert((*key).to_string(), value.clone());
        }
    }
}

/// Route-level `x-*` keys.
pub(crate) fn copy_vendor_extensions(
    schema: &Map<String, Value>,
    operation: &mut Map<String, Value>,
) {
    for (key, value) in schema {
        if key.starts_with("x-") {
            operation.insert(key.clone(), value.clone());
        }
    }
}

pub(crate) fn insert_if_some(target: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        target.insert(key.to_string(), value);
    }
}

/// Remove `base` from the front of `url` on a segment boundary.
pub(crate) fn strip_base_path(url: &str, base: &str) -> Option<String> {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        return None;
    }
    let rest = url.strip_prefix(base)?;
    if rest.is_empty() {
        Some("/".to_string())
    } else if rest.starts_with('/') {
        Some(rest.to_string())
    } else {
        None
    }
}

/// Leading slash plus `{param}` templating.
pub(crate) fn finish_path(url: &str) -> String {
    if url.starts_with('/') {
        format_url_template(url)
    } else {
        format_url_template(&format!("/{url}"))
    }
}
