//! # Document Generator
//!
//! [`SpecGenerator`] turns a completed [`RegistrationSink`] into a Swagger 2.0
//! or OpenAPI 3 document and caches it.
//!
//! ## Caching
//!
//! The structured document and its YAML and JSON renderings live in
//! independent slots. Each is filled on first request and never refreshed, so
//! repeated calls return the same `Arc`. The text slots are rendered from the
//! structured slot. A failed generation fills nothing; the next call tries again. A new
//! generator starts with empty slots.
//!
//! ```
//! use routedoc::{GeneratorOptions, RegistrationSink, RouteDescriptor, SpecGenerator};
//! use http::Method;
//! use std::sync::Arc;
//!
//! let sink = Arc::new(RegistrationSink::new());
//! sink.record_route(sink.root_scope(), RouteDescriptor::new(Method::GET, "/health")).unwrap();
//! sink.complete_registration();
//!
//! let generator = SpecGenerator::new(Arc::clone(&sink), GeneratorOptions::default());
//! let doc = generator.document().unwrap();
//! assert_eq!(doc["swagger"], "2.0");
//! assert!(doc["paths"]["/health"]["get"].is_object());
//! ```

use crate::assembler::Dialect;
use crate::config::GeneratorOptions;
use crate::error::Result;
use crate::filter;
use crate::package::PackageInfo;
use crate::registry::RegistrationSink;
use crate::resolver::{DefaultRefNaming, RefNaming, Resolver};
use once_cell::sync::OnceCell;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Output selection for [`SpecGenerator::generate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Return YAML text instead of the structured document
    pub yaml: bool,
}

/// A generated document in the requested representation.
#[derive(Debug, Clone)]
pub enum GeneratedDocument {
    Structured(Arc<Value>),
    Yaml(Arc<str>),
}

impl GeneratedDocument {
    #[must_use]
    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            GeneratedDocument::Structured(doc) => Some(doc),
            GeneratedDocument::Yaml(_) => None,
        }
    }

    #[must_use]
    pub fn as_yaml(&self) -> Option<&str> {
        match self {
            GeneratedDocument::Yaml(text) => Some(text),
            GeneratedDocument::Structured(_) => None,
        }
    }
}

/// Generates and caches the document for one registration sink.
pub struct SpecGenerator {
    sink: Arc<RegistrationSink>,
    options: GeneratorOptions,
    dialect: Dialect,
    document: OnceCell<Arc<Value>>,
    yaml: OnceCell<Arc<str>>,
    json: OnceCell<Arc<str>>,
}

impl std::fmt::Debug for SpecGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecGenerator")
            .field("dialect", &self.dialect.name())
            .field("options", &self.options)
            .field("cached", &self.document.get().is_some())
            .finish()
    }
}

impl SpecGenerator {
    /// Create a generator. The dialect is fixed here from `options`.
    #[must_use]
    pub fn new(sink: Arc<RegistrationSink>, options: GeneratorOptions) -> Self {
        let dialect = Dialect::from_options(&options);
        debug!(dialect = dialect.name(), "Created document generator");
        Self {
            sink,
            options,
            dialect,
            document: OnceCell::new(),
            yaml: OnceCell::new(),
            json: OnceCell::new(),
        }
    }

    /// The selected dialect.
    #[must_use]
    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Generate (or return the cached) document in the requested form.
    pub fn generate(&self, options: GenerateOptions) -> Result<GeneratedDocument> {
        if options.yaml {
            self.yaml().map(GeneratedDocument::Yaml)
        } else {
            self.document().map(GeneratedDocument::Structured)
        }
    }

    /// The structured document.
    pub fn document(&self) -> Result<Arc<Value>> {
        self.document
            .get_or_try_init(|| self.build().map(Arc::new))
            .map(Arc::clone)
    }

    /// The document as YAML text.
    pub fn yaml(&self) -> Result<Arc<str>> {
        self.yaml
            .get_or_try_init(|| {
                let document = self.document()?;
                let text = serde_yaml::to_string(document.as_ref())?;
                Ok(Arc::from(text))
            })
            .map(Arc::clone)
    }

    /// The document as pretty-printed JSON text.
    pub fn json(&self) -> Result<Arc<str>> {
        self.json
            .get_or_try_init(|| {
                let document = self.document()?;
                let text = serde_json::to_string_pretty(document.as_ref())?;
                Ok(Arc::from(text))
            })
            .map(Arc::clone)
    }

    fn build(&self) -> Result<Value> {
        let snapshot = self.sink.snapshot()?;
        let assembler = self.dialect.assembler();

        let default_naming = DefaultRefNaming;
        let naming: &dyn RefNaming = match &self.options.naming {
            Some(naming) => naming.as_ref(),
            None => &default_naming,
        };
        let resolver = Resolver::build(
            &snapshot.schemas,
            &assembler.user_schemas(),
            assembler.schema_dialect(),
            naming,
        )?;

        let package = self
            .options
            .package
            .clone()
            .unwrap_or_else(PackageInfo::discover);
        let mut document = assembler.build_envelope(&package, &resolver)?;

        let visibility = self.options.visibility();
        let mut paths = Map::new();
        let mut operations = 0usize;
        for route in &snapshot.routes {
            let Some(prepared) = filter::prepare(route, self.options.transform.as_ref(), &visibility)
            else {
                continue;
            };
            let path = assembler.normalize_url(&prepared.url)?;
            let operation = assembler.build_operation(&prepared, &path, &resolver)?;

            let Value::Object(path_item) = paths
                .entry(path)
                .or_insert_with(|| Value::Object(Map::new()))
            else {
                continue;
            };
            for method in &route.methods {
                path_item.insert(method.as_str().to_ascii_lowercase(), operation.clone());
                operations += 1;
            }
        }

        let path_count = paths.len();
        document.insert("paths".to_string(), Value::Object(paths));

        let mut document = Value::Object(document);
        if let Some(transform_object) = &self.options.transform_object {
            document = transform_object(document);
        }

        info!(
            dialect = self.dialect.name(),
            routes = snapshot.routes.len(),
            paths = path_count,
            operations,
            "Generated API document"
        );
        Ok(document)
    }
}
