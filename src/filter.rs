//! Route transforms and visibility rules.
//!
//! A route goes through two steps before it reaches an assembler. First the
//! transform hook may rewrite its schema and URL; the route's own override
//! wins over the document-level hook. Then the visibility rules run against
//! the transformed schema.

use crate::registry::RouteDescriptor;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Tag that hides a route when none is configured.
pub const DEFAULT_HIDDEN_TAG: &str = "X-HIDDEN";

/// What a transform hook receives.
#[derive(Debug, Clone, Copy)]
pub struct TransformInput<'a> {
    /// The route schema as registered (if any)
    pub schema: Option<&'a Value>,
    /// The raw route URL
    pub url: &'a str,
    /// The full route descriptor
    pub route: &'a RouteDescriptor,
}

/// What a transform hook returns.
///
/// `schema` replaces the route schema as-is, so `None` leaves the route
/// without one. `url: None` keeps the registered URL.
#[derive(Debug, Clone, Default)]
pub struct TransformOutput {
    pub schema: Option<Value>,
    pub url: Option<String>,
}

/// Per-route transform hook.
pub type TransformFn = Arc<dyn Fn(TransformInput<'_>) -> TransformOutput + Send + Sync>;

/// Post-processing hook for the finished document.
pub type DocumentTransformFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Route-level transform override.
#[derive(Clone)]
pub enum RouteTransform {
    /// Skip the document-level transform for this route
    Disabled,
    /// Use this transform instead of the document-level one
    Custom(TransformFn),
}

impl RouteTransform {
    /// Wrap a closure as a custom route transform.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(TransformInput<'_>) -> TransformOutput + Send + Sync + 'static,
    {
        RouteTransform::Custom(Arc::new(f))
    }
}

impl fmt::Debug for RouteTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteTransform::Disabled => f.write_str("Disabled"),
            RouteTransform::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Hide rules applied after the transform.
#[derive(Debug, Clone)]
pub struct Visibility {
    pub hidden_tag: String,
    pub hide_untagged: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            hidden_tag: DEFAULT_HIDDEN_TAG.to_string(),
            hide_untagged: false,
        }
    }
}

impl Visibility {
    /// Whether a route with this (transformed) schema stays out of the document.
    #[must_use]
    pub fn is_hidden(&self, schema: Option<&Value>) -> bool {
        let Some(schema) = schema else {
            return self.hide_untagged;
        };
        if schema.get("hide").and_then(Value::as_bool) == Some(true) {
            return true;
        }
        let tags: Vec<&str> = schema
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| tags.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        if tags.is_empty() {
            return self.hide_untagged;
        }
        tags.contains(&self.hidden_tag.as_str())
    }
}

/// A route after its transform ran, ready for an assembler.
#[derive(Debug, Clone)]
pub struct PreparedRoute {
    pub route: Arc<RouteDescriptor>,
    pub schema: Option<Value>,
    pub url: String,
}

/// Apply the effective transform, then the hide rules.
///
/// Returns `None` when the route is hidden.
pub fn prepare(
    route: &Arc<RouteDescriptor>,
    document_transform: Option<&TransformFn>,
    visibility: &Visibility,
) -> Option<PreparedRoute> {
    let effective = match &route.transform {
        Some(RouteTransform::Disabled) => None,
        Some(RouteTransform::Custom(f)) => Some(f),
        None => document_transform,
    };

    let (schema, url) = match effective {
        Some(transform) => {
            let output = transform(TransformInput {
                schema: route.schema.as_ref(),
                url: &route.url,
                route,
            });
            (
                output.schema,
                output.url.unwrap_or_else(|| route.url.clone()),
            )
        }
        None => (route.schema.clone(), route.url.clone()),
    };

    if visibility.is_hidden(schema.as_ref()) {
        debug!(url = %route.url, "Route hidden from document");
        return None;
    }

    Some(PreparedRoute {
        route: Arc::clone(route),
        schema,
        url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use serde_json::json;

    fn route(schema: Value) -> Arc<RouteDescriptor> {
        Arc::new(RouteDescriptor::new(Method::GET, "/r").with_schema(schema))
    }

    #[test]
    fn test_hide_flag() {
        let vis = Visibility::default();
        assert!(vis.is_hidden(Some(&json!({ "hide": true }))));
        assert!(!vis.is_hidden(Some(&json!({ "hide": false }))));
    }

    #[test]
    fn test_hidden_tag() {
        let vis = Visibility::default();
        assert!(vis.is_hidden(Some(&json!({ "tags": ["X-HIDDEN"] }))));
        assert!(!vis.is_hidden(Some(&json!({ "tags": ["users"] }))));

        let custom = Visibility {
            hidden_tag: "internal".into(),
            hide_untagged: false,
        };
        assert!(custom.is_hidden(Some(&json!({ "tags": ["a", "internal"] }))));
        assert!(!custom.is_hidden(Some(&json!({ "tags": ["X-HIDDEN"] }))));
    }

    #[test]
    fn test_hide_untagged() {
        let vis = Visibility {
            hide_untagged: true,
            ..Visibility::default()
        };
        assert!(vis.is_hidden(None));
        assert!(vis.is_hidden(Some(&json!({ "tags": [] }))));
        assert!(!vis.is_hidden(Some(&json!({ "tags": ["users"] }))));
        assert!(!Visibility::default().is_hidden(None));
    }

    #[test]
    fn test_transform_runs_before_visibility() {
        let hide_all: TransformFn = Arc::new(|input: TransformInput<'_>| TransformOutput {
            schema: Some(json!({ "hide": true })),
            url: Some(format!("{}/v2", input.url)),
        });
        let r = route(json!({ "tags": ["users"] }));
        assert!(prepare(&r, Some(&hide_all), &Visibility::default()).is_none());
    }

    #[test]
    fn test_transform_can_drop_the_schema() {
        let strip: TransformFn = Arc::new(|_: TransformInput<'_>| TransformOutput::default());
        let r = route(json!({ "summary": "orig", "tags": ["users"] }));
        let prepared = prepare(&r, Some(&strip), &Visibility::default()).unwrap();
        assert!(prepared.schema.is_none());
        assert_eq!(prepared.url, "/r");
    }

    #[test]
    fn test_route_override_beats_document_transform() {
        let rename: TransformFn = Arc::new(|_: TransformInput<'_>| TransformOutput {
            schema: None,
            url: Some("/renamed".into()),
        });

        let disabled = Arc::new(
            RouteDescriptor::new(Method::GET, "/r").with_transform(RouteTransform::Disabled),
        );
        let prepared = prepare(&disabled, Some(&rename), &Visibility::default()).unwrap();
        assert_eq!(prepared.url, "/r");

        let custom = Arc::new(RouteDescriptor::new(Method::GET, "/r").with_transform(
            RouteTransform::custom(|_| TransformOutput {
                schema: Some(json!({ "summary": "custom" })),
                url: None,
            }),
        ));
        let prepared = prepare(&custom, Some(&rename), &Visibility::default()).unwrap();
        assert_eq!(prepared.url, "/r");
        assert_eq!(prepared.schema.unwrap()["summary"], "custom");

        let plain = route(json!({}));
        let prepared = prepare(&plain, Some(&rename), &Visibility::default()).unwrap();
        assert_eq!(prepared.url, "/renamed");
    }
}
