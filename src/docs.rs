//! Documentation endpoints: the document as JSON and YAML plus a Swagger UI
//! index page.
//!
//! These are framework agnostic. The host server registers
//! [`DocumentationRoutes::paths`] with its router and forwards matching
//! requests to [`DocumentationRoutes::handle`], writing the returned
//! [`DocResponse`] back. The routes themselves are never part of the
//! generated document.

use crate::generator::SpecGenerator;
use http::{Method, StatusCode};
use minijinja::{context, Environment};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, error};

/// Prefix used when none is given.
pub const DEFAULT_ROUTE_PREFIX: &str = "/documentation";

// no extension: auto-escaping would mangle the document url
const UI_TEMPLATE_NAME: &str = "swagger_ui";

const UI_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>{{ title }}</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.onload = () => {
      window.ui = SwaggerUIBundle({ url: "{{ spec_url }}", dom_id: "#swagger-ui" });
    };
  </script>
</body>
</html>
"##;

/// Response produced by a documentation endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocResponse {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub etag: Option<String>,
    pub body: Vec<u8>,
}

impl DocResponse {
    fn ok(content_type: &'static str, body: Vec<u8>, etag: Option<String>) -> Self {
        Self {
            status: StatusCode::OK,
            content_type,
            etag,
            body,
        }
    }

    fn not_modified(etag: String) -> Self {
        Self {
            status: StatusCode::NOT_MODIFIED,
            content_type: "text/plain",
            etag: Some(etag),
            body: Vec::new(),
        }
    }

    fn internal_error(message: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            content_type: "application/json",
            etag: None,
            body: json!({ "error": message }).to_string().into_bytes(),
        }
    }
}

/// The documentation routes under one prefix.
#[derive(Debug, Clone)]
pub struct DocumentationRoutes {
    generator: Arc<SpecGenerator>,
    prefix: String,
    title: String,
}

impl DocumentationRoutes {
    /// Routes under `prefix` (trailing slash ignored).
    pub fn new(generator: Arc<SpecGenerator>, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into().trim_end_matches('/').to_string();
        Self {
            generator,
            prefix,
            title: "API Documentation".to_string(),
        }
    }

    /// Page title of the UI.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn json_path(&self) -> String {
        format!("{}/json", self.prefix)
    }

    #[must_use]
    pub fn yaml_path(&self) -> String {
        format!("{}/yaml", self.prefix)
    }

    /// Every path the host should route here.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        if self.prefix.is_empty() {
            return vec!["/".to_string(), self.json_path(), self.yaml_path()];
        }
        vec![
            self.prefix.clone(),
            format!("{}/", self.prefix),
            self.json_path(),
            self.yaml_path(),
        ]
    }

    /// Serve a request, or `None` when the path is not a documentation route.
    ///
    /// `if_none_match` is the request's `If-None-Match` header; a match yields
    /// `304 Not Modified`.
    #[must_use]
    pub fn handle(
        &self,
        method: &Method,
        path: &str,
        if_none_match: Option<&str>,
    ) -> Option<DocResponse> {
        if *method != Method::GET && *method != Method::HEAD {
            return None;
        }
        let is_index = path == self.prefix
            || path.strip_prefix(self.prefix.as_str()) == Some("/");
        let response = if path == self.json_path() {
            self.json_endpoint(if_none_match)
        } else if path == self.yaml_path() {
            self.yaml_endpoint(if_none_match)
        } else if is_index {
            self.ui_endpoint()
        } else {
            return None;
        };
        debug!(path, status = response.status.as_u16(), "Served documentation route");
        Some(response)
    }

    fn json_endpoint(&self, if_none_match: Option<&str>) -> DocResponse {
        match self.generator.json() {
            Ok(text) => conditional("application/json", text.as_bytes().to_vec(), if_none_match),
            Err(err) => {
                error!(error = %err, "Failed to generate JSON document");
                DocResponse::internal_error(&err.to_string())
            }
        }
    }

    fn yaml_endpoint(&self, if_none_match: Option<&str>) -> DocResponse {
        match self.generator.yaml() {
            Ok(text) => conditional("application/x-yaml", text.as_bytes().to_vec(), if_none_match),
            Err(err) => {
                error!(error = %err, "Failed to generate YAML document");
                DocResponse::internal_error(&err.to_string())
            }
        }
    }

    fn ui_endpoint(&self) -> DocResponse {
        match self.render_ui() {
            Ok(html) => DocResponse::ok("text/html", html.into_bytes(), None),
            Err(err) => {
                error!(error = %err, "Failed to render documentation page");
                DocResponse::internal_error(&err.to_string())
            }
        }
    }

    fn render_ui(&self) -> Result<String, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(UI_TEMPLATE_NAME, UI_TEMPLATE)?;
        let template = env.get_template(UI_TEMPLATE_NAME)?;
        template.render(context! {
            title => &self.title,
            spec_url => self.json_path(),
        })
    }
}

fn conditional(
    content_type: &'static str,
    body: Vec<u8>,
    if_none_match: Option<&str>,
) -> DocResponse {
    let tag = etag(&body);
    let matches = if_none_match.is_some_and(|header| {
        header.split(',').map(str::trim).any(|candidate| candidate == tag || candidate == "*")
    });
    if matches {
        DocResponse::not_modified(tag)
    } else {
        DocResponse::ok(content_type, body, Some(tag))
    }
}

/// Strong ETag from the first 16 hex digits of the body's SHA-256.
fn etag(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    let hex: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
    format!("\"{hex}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorOptions;
    use crate::package::PackageInfo;
    use crate::registry::RegistrationSink;

    fn routes() -> DocumentationRoutes {
        let sink = Arc::new(RegistrationSink::new());
        sink.complete_registration();
        let generator = SpecGenerator::new(
            sink,
            GeneratorOptions::default().with_package(PackageInfo::default()),
        );
        DocumentationRoutes::new(Arc::new(generator), "/docs/")
    }

    #[test]
    fn test_paths() {
        let r = routes();
        assert_eq!(r.paths(), ["/docs", "/docs/", "/docs/json", "/docs/yaml"]);
    }

    #[test]
    fn test_json_and_yaml_endpoints() {
        let r = routes();
        let json = r.handle(&Method::GET, "/docs/json", None).unwrap();
        assert_eq!(json.status, StatusCode::OK);
        assert_eq!(json.content_type, "application/json");
        let doc: serde_json::Value = serde_json::from_slice(&json.body).unwrap();
        assert_eq!(doc["swagger"], "2.0");

        let yaml = r.handle(&Method::GET, "/docs/yaml", None).unwrap();
        assert!(String::from_utf8(yaml.body).unwrap().contains("swagger: '2.0'"));
    }

    #[test]
    fn test_etag_round_trip() {
        let r = routes();
        let first = r.handle(&Method::GET, "/docs/json", None).unwrap();
        let tag = first.etag.clone().unwrap();
        let second = r.handle(&Method::GET, "/docs/json", Some(&tag)).unwrap();
        assert_eq!(second.status, StatusCode::NOT_MODIFIED);
        assert!(second.body.is_empty());
    }

    #[test]
    fn test_ui_page_points_at_json() {
        let r = routes().with_title("Pets");
        let page = r.handle(&Method::GET, "/docs", None).unwrap();
        let html = String::from_utf8(page.body).unwrap();
        assert_eq!(page.content_type, "text/html");
        assert!(html.contains("<title>Pets</title>"));
        assert!(html.contains("/docs/json"));
        assert!(html.contains(r##"dom_id: "#swagger-ui""##));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_unrelated_paths_and_methods() {
        let r = routes();
        assert!(r.handle(&Method::GET, "/users", None).is_none());
        assert!(r.handle(&Method::POST, "/docs/json", None).is_none());
    }
}
