use crate::registry::{RegistrationSink, RouteDescriptor, ScopeId};
use anyhow::{anyhow, Context, Result};
use http::Method;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// One scope of a route manifest. The file itself is the root scope.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RouteManifest {
    pub schemas: Vec<Value>,
    pub routes: Vec<ManifestRoute>,
    pub scopes: Vec<RouteManifest>,
}

/// A route entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestRoute {
    pub method: MethodList,
    pub url: String,
    #[serde(default)]
    pub schema: Option<Value>,
    #[serde(default)]
    pub links: Option<Map<String, Value>>,
}

/// `method: GET` or `method: [GET, HEAD]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MethodList {
    One(String),
    Many(Vec<String>),
}

impl MethodList {
    fn to_methods(&self) -> Result<Vec<Method>> {
        let names: Vec<&str> = match self {
            MethodList::One(name) => vec![name.as_str()],
            MethodList::Many(names) => names.iter().map(String::as_str).collect(),
        };
        if names.is_empty() {
            return Err(anyhow!("route has an empty method list"));
        }
        names
            .into_iter()
            .map(|name| {
                Method::from_bytes(name.to_ascii_uppercase().as_bytes())
                    .with_context(|| format!("invalid HTTP method '{name}'"))
            })
            .collect()
    }
}

impl RouteManifest {
    /// Record this scope and its children into `sink`, depth first.
    pub fn register(&self, sink: &RegistrationSink, scope: ScopeId) -> Result<()> {
        for schema in &self.schemas {
            sink.record_schema(scope, schema.clone())?;
        }
        for route in &self.routes {
            let methods = route.method.to_methods()?;
            let mut descriptor =
                RouteDescriptor::new(Method::GET, route.url.clone()).with_methods(methods);
            if let Some(schema) = &route.schema {
                descriptor = descriptor.with_schema(schema.clone());
            }
            if let Some(links) = &route.links {
                descriptor = descriptor.with_links(links.clone());
            }
            sink.record_route(scope, descriptor)
                .with_context(|| format!("failed to record route {}", route.url))?;
        }
        for child in &self.scopes {
            let child_scope = sink.open_scope(scope)?;
            child.register(sink, child_scope)?;
        }
        Ok(())
    }

    /// Number of routes in this scope and below.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.len() + self.scopes.iter().map(RouteManifest::route_count).sum::<usize>()
    }
}

/// Parse a YAML (`.yaml`/`.yml`) or JSON manifest and return a completed sink.
pub fn load_manifest(path: &Path) -> Result<Arc<RegistrationSink>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    let manifest: RouteManifest = if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("invalid YAML manifest in {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("invalid JSON manifest in {}", path.display()))?
    };

    let sink = Arc::new(RegistrationSink::new());
    manifest.register(&sink, sink.root_scope())?;
    sink.complete_registration();
    debug!(
        manifest = %path.display(),
        routes = manifest.route_count(),
        "Loaded route manifest"
    );
    Ok(sink)
}
