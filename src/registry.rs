//! # Registration Module
//!
//! The host server records every route and every shared schema into a
//! [`RegistrationSink`] while it is being set up, then fires
//! [`RegistrationSink::complete_registration`] exactly once when the whole
//! server tree is initialised. From that point the registries are frozen and a
//! [`RegistrySnapshot`] is available to the document generator.
//!
//! ## Scopes
//!
//! Schemas are registered into nested scopes (a plugin registered inside
//! another plugin gets a child scope). A scope sees its own schemas and those
//! of all its ancestors. When the snapshot is taken, scopes are visited in
//! creation order, so for an identifier registered in several scopes the
//! outermost registration wins.
//!
//! ```
//! use routedoc::registry::{RegistrationSink, RouteDescriptor};
//! use http::Method;
//! use serde_json::json;
//!
//! let sink = RegistrationSink::new();
//! let root = sink.root_scope();
//! let api = sink.open_scope(root).unwrap();
//!
//! sink.record_schema(api, json!({ "$id": "User", "type": "object" })).unwrap();
//! sink.record_route(api, RouteDescriptor::new(Method::GET, "/users/:id")).unwrap();
//!
//! let snapshot = sink.complete_registration();
//! assert_eq!(snapshot.routes.len(), 1);
//! assert!(snapshot.schemas.contains_key("User"));
//! ```

use crate::error::{Result, SpecError};
use crate::filter::RouteTransform;
use http::Method;
use once_cell::sync::OnceCell;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Handle to a registration scope inside one [`RegistrationSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    /// Numeric index of the scope, in creation order
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// One registered endpoint, possibly under several HTTP methods.
#[derive(Clone)]
pub struct RouteDescriptor {
    /// HTTP methods the route answers; each becomes its own operation entry
    pub methods: Vec<Method>,
    /// Raw URL pattern in router syntax (`/users/:id`)
    pub url: String,
    /// Route schema: `querystring`, `params`, `headers`, `cookies`, `body`,
    /// `response` slots plus operation metadata
    pub schema: Option<Value>,
    /// OpenAPI link objects keyed by response status code
    pub links: Option<Map<String, Value>>,
    /// Route-level override of the document transform
    pub transform: Option<RouteTransform>,
}

impl RouteDescriptor {
    /// A route without schema for a single method.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            methods: vec![method],
            url: url.into(),
            schema: None,
            links: None,
            transform: None,
        }
    }

    /// Replace the method set (e.g. `[GET, HEAD]`).
    #[must_use]
    pub fn with_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    /// Attach the route schema.
    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Attach OpenAPI links keyed by status code.
    #[must_use]
    pub fn with_links(mut self, links: Map<String, Value>) -> Self {
        self.links = Some(links);
        self
    }

    /// Override the document-level transform for this route.
    #[must_use]
    pub fn with_transform(mut self, transform: RouteTransform) -> Self {
        self.transform = Some(transform);
        self
    }
}

impl fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("methods", &self.methods)
            .field("url", &self.url)
            .field("schema", &self.schema)
            .field("links", &self.links)
            .field("transform", &self.transform)
            .finish()
    }
}

/// Frozen view of both registries, taken when registration completes.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    /// Routes in registration order
    pub routes: Vec<Arc<RouteDescriptor>>,
    /// Shared schemas by `$id`, outermost registration first
    pub schemas: Map<String, Value>,
}

#[derive(Debug)]
struct Scope {
    parent: Option<usize>,
    schemas: Vec<(String, Value)>,
}

#[derive(Debug, Default)]
struct SinkState {
    scopes: Vec<Scope>,
    routes: Vec<Arc<RouteDescriptor>>,
    frozen: bool,
}

/// Collects routes and schemas during server setup.
///
/// Share it as `Arc<RegistrationSink>` with the routing layer; every method
/// takes `&self`.
#[derive(Debug)]
pub struct RegistrationSink {
    state: RwLock<SinkState>,
    snapshot: OnceCell<Arc<RegistrySnapshot>>,
}

impl Default for RegistrationSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationSink {
    /// Create a sink with a single root scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SinkState {
                scopes: vec![Scope {
                    parent: None,
                    schemas: Vec::new(),
                }],
                routes: Vec::new(),
                frozen: false,
            }),
            snapshot: OnceCell::new(),
        }
    }

    /// The root scope every other scope descends from.
    #[must_use]
    pub fn root_scope(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Open a child scope of `parent`.
    pub fn open_scope(&self, parent: ScopeId) -> Result<ScopeId> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.frozen {
            return Err(SpecError::RegistryFrozen { what: "scope" });
        }
        if parent.0 >= state.scopes.len() {
            return Err(SpecError::UnknownScope(parent.0));
        }
        state.scopes.push(Scope {
            parent: Some(parent.0),
            schemas: Vec::new(),
        });
        Ok(ScopeId(state.scopes.len() - 1))
    }

    /// Record a route registration. The scope only has to exist; routes are
    /// documented in global registration order.
    pub fn record_route(&self, scope: ScopeId, route: RouteDescriptor) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.frozen {
            return Err(SpecError::RegistryFrozen { what: "route" });
        }
        if scope.0 >= state.scopes.len() {
            return Err(SpecError::UnknownScope(scope.0));
        }
        debug!(url = %route.url, methods = ?route.methods, scope = scope.0, "Recorded route");
        state.routes.push(Arc::new(route));
        Ok(())
    }

    /// Record a shared schema. It must carry a string `$id`.
    ///
    /// Registering the same identifier twice in one scope keeps the first.
    pub fn record_schema(&self, scope: ScopeId, schema: Value) -> Result<()> {
        let id = schema
            .get("$id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(SpecError::MissingSchemaId)?;

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.frozen {
            return Err(SpecError::RegistryFrozen { what: "schema" });
        }
        let target = state
            .scopes
            .get_mut(scope.0)
            .ok_or(SpecError::UnknownScope(scope.0))?;
        if target.schemas.iter().any(|(existing, _)| *existing == id) {
            debug!(schema_id = %id, scope = scope.0, "Ignoring duplicate schema in scope");
            return Ok(());
        }
        target.schemas.push((id, schema));
        Ok(())
    }

    /// Schemas visible from `scope`: its own and every ancestor's, outermost
    /// registration winning on identifier collisions.
    pub fn schemas_visible_to(&self, scope: ScopeId) -> Result<Map<String, Value>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if scope.0 >= state.scopes.len() {
            return Err(SpecError::UnknownScope(scope.0));
        }

        let mut chain = Vec::new();
        let mut cursor = Some(scope.0);
        while let Some(idx) = cursor {
            chain.push(idx);
            cursor = state.scopes[idx].parent;
        }

        let mut visible = Map::new();
        for idx in chain.into_iter().rev() {
            for (id, schema) in &state.scopes[idx].schemas {
                if !visible.contains_key(id) {
                    visible.insert(id.clone(), schema.clone());
                }
            }
        }
        Ok(visible)
    }

    /// Fire the registration-complete signal and freeze both registries.
    ///
    /// Single-fire: later calls return the snapshot taken by the first.
    pub fn complete_registration(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(self.snapshot.get_or_init(|| {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.frozen = true;

            let mut schemas = Map::new();
            for scope in &state.scopes {
                for (id, schema) in &scope.schemas {
                    if !schemas.contains_key(id) {
                        schemas.insert(id.clone(), schema.clone());
                    }
                }
            }

            info!(
                routes = state.routes.len(),
                schemas = schemas.len(),
                scopes = state.scopes.len(),
                "Registration complete"
            );

            Arc::new(RegistrySnapshot {
                routes: state.routes.clone(),
                schemas,
            })
        }))
    }

    /// Whether the registration-complete signal has fired.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.snapshot.get().is_some()
    }

    /// The frozen snapshot, or [`SpecError::NotReady`] before the signal.
    pub fn snapshot(&self) -> Result<Arc<RegistrySnapshot>> {
        self.snapshot.get().cloned().ok_or(SpecError::NotReady)
    }
}
