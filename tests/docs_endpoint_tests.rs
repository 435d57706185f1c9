#![allow(clippy::unwrap_used, clippy::expect_used)]

use http::{Method, StatusCode};
use routedoc::{
    DocumentationRoutes, GeneratorOptions, OpenApiOptions, PackageInfo, RegistrationSink,
    RouteDescriptor, SpecGenerator,
};
use std::sync::Arc;

fn routes(complete: bool) -> DocumentationRoutes {
    let sink = Arc::new(RegistrationSink::new());
    sink.record_route(sink.root_scope(), RouteDescriptor::new(Method::GET, "/pets/:id"))
        .unwrap();
    if complete {
        sink.complete_registration();
    }
    let options = GeneratorOptions::openapi(OpenApiOptions {
        openapi: Some("3.0.3".into()),
        ..Default::default()
    })
    .with_package(PackageInfo::default());
    DocumentationRoutes::new(Arc::new(SpecGenerator::new(sink, options)), "/documentation")
}

#[test]
fn test_yaml_endpoint_serves_cached_text() {
    let docs = routes(true);
    let first = docs.handle(&Method::GET, "/documentation/yaml", None).unwrap();
    let second = docs.handle(&Method::GET, "/documentation/yaml", None).unwrap();
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.content_type, "application/x-yaml");
    assert_eq!(first.body, second.body);
    assert_eq!(first.etag, second.etag);

    let text = String::from_utf8(first.body).unwrap();
    assert!(text.starts_with("openapi:"));
    assert!(text.contains("3.0.3"));
    assert!(text.contains("/pets/{id}"));
}

#[test]
fn test_head_and_conditional_requests() {
    let docs = routes(true);
    let head = docs.handle(&Method::HEAD, "/documentation/json", None).unwrap();
    let tag = head.etag.unwrap();
    assert!(tag.starts_with('"') && tag.ends_with('"'));

    let cached = docs
        .handle(&Method::GET, "/documentation/json", Some(&format!("\"stale\", {tag}")))
        .unwrap();
    assert_eq!(cached.status, StatusCode::NOT_MODIFIED);

    let fresh = docs
        .handle(&Method::GET, "/documentation/json", Some("\"stale\""))
        .unwrap();
    assert_eq!(fresh.status, StatusCode::OK);
}

#[test]
fn test_index_with_and_without_trailing_slash() {
    let docs = routes(true);
    for path in ["/documentation", "/documentation/"] {
        let page = docs.handle(&Method::GET, path, None).unwrap();
        assert_eq!(page.content_type, "text/html");
        assert!(String::from_utf8(page.body).unwrap().contains("SwaggerUIBundle"));
    }
}

#[test]
fn test_generation_failure_is_a_server_error() {
    let docs = routes(false);
    let response = docs.handle(&Method::GET, "/documentation/json", None).unwrap();
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert!(body["error"].as_str().unwrap().contains("complete_registration"));
}
