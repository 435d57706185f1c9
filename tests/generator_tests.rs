#![allow(clippy::unwrap_used, clippy::expect_used)]

use http::Method;
use routedoc::{
    GenerateOptions, GeneratedDocument, GeneratorOptions, OpenApiOptions, PackageInfo,
    RegistrationSink, RouteDescriptor, RouteTransform, SpecError, SpecGenerator, TransformOutput,
};
use serde_json::json;
use std::sync::Arc;
use std::thread;

fn package() -> PackageInfo {
    PackageInfo {
        name: Some("pets".to_string()),
        version: Some("2.1.0".to_string()),
        description: None,
    }
}

fn swagger(sink: &Arc<RegistrationSink>) -> SpecGenerator {
    SpecGenerator::new(
        Arc::clone(sink),
        GeneratorOptions::default().with_package(package()),
    )
}

fn openapi(sink: &Arc<RegistrationSink>) -> SpecGenerator {
    SpecGenerator::new(
        Arc::clone(sink),
        GeneratorOptions::openapi(OpenApiOptions {
            openapi: Some("3.0.3".to_string()),
            ..Default::default()
        })
        .with_package(package()),
    )
}

#[test]
fn test_route_without_schema_gets_default_response() {
    let sink = Arc::new(RegistrationSink::new());
    sink.record_route(sink.root_scope(), RouteDescriptor::new(Method::GET, "/health"))
        .unwrap();
    sink.complete_registration();

    let doc = swagger(&sink).document().unwrap();
    assert_eq!(doc["info"]["title"], "pets");
    assert_eq!(doc["info"]["version"], "2.1.0");
    assert_eq!(
        doc["paths"]["/health"]["get"]["responses"]["200"]["description"],
        "Default Response"
    );
}

#[test]
fn test_yaml_is_cached_and_matches_document() {
    let sink = Arc::new(RegistrationSink::new());
    sink.record_route(
        sink.root_scope(),
        RouteDescriptor::new(Method::POST, "/pets").with_schema(json!({
            "body": { "type": "object", "properties": { "name": { "type": "string" } } }
        })),
    )
    .unwrap();
    sink.complete_registration();

    let generator = swagger(&sink);
    let first = generator.generate(GenerateOptions { yaml: true }).unwrap();
    let second = generator.generate(GenerateOptions { yaml: true }).unwrap();
    let (GeneratedDocument::Yaml(a), GeneratedDocument::Yaml(b)) = (first, second) else {
        panic!("expected YAML output");
    };
    assert!(Arc::ptr_eq(&a, &b));

    let reparsed: serde_json::Value = serde_yaml::from_str(&a).unwrap();
    assert_eq!(&reparsed, generator.document().unwrap().as_ref());
}

#[test]
fn test_concurrent_first_calls_share_one_document() {
    let sink = Arc::new(RegistrationSink::new());
    sink.record_route(sink.root_scope(), RouteDescriptor::new(Method::GET, "/a"))
        .unwrap();
    sink.complete_registration();
    let generator = Arc::new(openapi(&sink));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let generator = Arc::clone(&generator);
            thread::spawn(move || generator.document().unwrap())
        })
        .collect();
    let docs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for doc in &docs[1..] {
        assert!(Arc::ptr_eq(&docs[0], doc));
    }
}

#[test]
fn test_hidden_routes_are_skipped() {
    let sink = Arc::new(RegistrationSink::new());
    let root = sink.root_scope();
    sink.record_route(
        root,
        RouteDescriptor::new(Method::GET, "/secret").with_schema(json!({ "hide": true })),
    )
    .unwrap();
    sink.record_route(
        root,
        RouteDescriptor::new(Method::GET, "/internal")
            .with_schema(json!({ "tags": ["X-HIDDEN", "admin"] })),
    )
    .unwrap();
    sink.record_route(
        root,
        RouteDescriptor::new(Method::GET, "/public").with_schema(json!({ "tags": ["pets"] })),
    )
    .unwrap();
    sink.complete_registration();

    let doc = swagger(&sink).document().unwrap();
    let paths = doc["paths"].as_object().unwrap();
    assert_eq!(paths.keys().collect::<Vec<_>>(), ["/public"]);
}

#[test]
fn test_hide_untagged_option() {
    let sink = Arc::new(RegistrationSink::new());
    let root = sink.root_scope();
    sink.record_route(root, RouteDescriptor::new(Method::GET, "/bare"))
        .unwrap();
    sink.record_route(
        root,
        RouteDescriptor::new(Method::GET, "/tagged").with_schema(json!({ "tags": ["t"] })),
    )
    .unwrap();
    sink.complete_registration();

    let generator = SpecGenerator::new(
        Arc::clone(&sink),
        GeneratorOptions::default()
            .with_package(package())
            .with_hide_untagged(true),
    );
    let doc = generator.document().unwrap();
    assert!(doc["paths"].get("/bare").is_none());
    assert!(doc["paths"]["/tagged"]["get"].is_object());
}

#[test]
fn test_first_registration_wins_across_nested_scopes() {
    let sink = Arc::new(RegistrationSink::new());
    let root = sink.root_scope();
    let child = sink.open_scope(root).unwrap();
    let grandchild = sink.open_scope(child).unwrap();

    sink.record_schema(root, json!({ "$id": "Shared", "type": "string" }))
        .unwrap();
    sink.record_schema(child, json!({ "$id": "Shared", "type": "integer" }))
        .unwrap();
    sink.record_schema(grandchild, json!({ "$id": "Shared", "type": "boolean" }))
        .unwrap();
    sink.record_schema(grandchild, json!({ "$id": "Leaf", "type": "number" }))
        .unwrap();
    sink.complete_registration();

    let doc = swagger(&sink).document().unwrap();
    assert_eq!(doc["definitions"]["Shared"]["type"], "string");
    assert_eq!(doc["definitions"]["Leaf"]["type"], "number");
}

#[test]
fn test_deep_definitions_pointer_moves_to_components() {
    let sink = Arc::new(RegistrationSink::new());
    let root = sink.root_scope();
    sink.record_schema(
        root,
        json!({
            "$id": "Catalog",
            "definitions": {
                "Foo": { "type": "object", "properties": { "id": { "type": "integer" } } }
            },
            "type": "object",
            "properties": { "foo": { "$ref": "#/definitions/Foo" } }
        }),
    )
    .unwrap();
    sink.record_route(
        root,
        RouteDescriptor::new(Method::GET, "/catalog")
            .with_schema(json!({ "response": { "200": { "$ref": "Catalog#" } } })),
    )
    .unwrap();
    sink.complete_registration();

    let doc = openapi(&sink).document().unwrap();
    let text = serde_json::to_string(doc.as_ref()).unwrap();
    assert!(!text.contains("#/definitions/"));
    assert_eq!(
        doc["paths"]["/catalog"]["get"]["responses"]["200"]["content"]["application/json"]
            ["schema"]["$ref"],
        "#/components/schemas/Catalog"
    );
}

#[test]
fn test_unresolved_reference_fails_and_retries() {
    let sink = Arc::new(RegistrationSink::new());
    sink.record_route(
        sink.root_scope(),
        RouteDescriptor::new(Method::GET, "/x")
            .with_schema(json!({ "response": { "200": { "$ref": "Nope#" } } })),
    )
    .unwrap();
    sink.complete_registration();

    let generator = swagger(&sink);
    assert!(matches!(
        generator.document(),
        Err(SpecError::UnresolvedRef { .. })
    ));
    // nothing was cached, the next call fails the same way
    assert!(generator.document().is_err());
}

#[test]
fn test_route_transform_rewrites_and_can_be_disabled() {
    let sink = Arc::new(RegistrationSink::new());
    let root = sink.root_scope();
    sink.record_route(
        root,
        RouteDescriptor::new(Method::GET, "/v1/users").with_schema(json!({ "summary": "list" })),
    )
    .unwrap();
    sink.record_route(
        root,
        RouteDescriptor::new(Method::GET, "/v1/raw").with_transform(RouteTransform::Disabled),
    )
    .unwrap();
    sink.complete_registration();

    let generator = SpecGenerator::new(
        Arc::clone(&sink),
        GeneratorOptions::default()
            .with_package(package())
            .with_transform(|input| TransformOutput {
                schema: input.schema.cloned(),
                url: Some(input.url.replacen("/v1", "", 1)),
            }),
    );
    let doc = generator.document().unwrap();
    assert_eq!(doc["paths"]["/users"]["get"]["summary"], "list");
    assert!(doc["paths"]["/v1/raw"]["get"].is_object());
}

#[test]
fn test_route_transform_replaces_the_schema() {
    let sink = Arc::new(RegistrationSink::new());
    sink.record_route(
        sink.root_scope(),
        RouteDescriptor::new(Method::GET, "/pets").with_schema(json!({ "summary": "orig" })),
    )
    .unwrap();
    sink.complete_registration();

    let generator = SpecGenerator::new(
        Arc::clone(&sink),
        GeneratorOptions::default()
            .with_package(package())
            .with_transform(|_| TransformOutput {
                schema: None,
                url: None,
            }),
    );
    let doc = generator.document().unwrap();
    let op = &doc["paths"]["/pets"]["get"];
    assert!(op.get("summary").is_none());
    assert_eq!(op["responses"]["200"]["description"], "Default Response");
}

#[test]
fn test_registration_is_frozen_after_completion() {
    let sink = Arc::new(RegistrationSink::new());
    let root = sink.root_scope();
    let first = sink.complete_registration();
    let second = sink.complete_registration();
    assert!(Arc::ptr_eq(&first, &second));

    let err = sink
        .record_route(root, RouteDescriptor::new(Method::GET, "/late"))
        .unwrap_err();
    assert!(matches!(err, SpecError::RegistryFrozen { .. }));
    assert!(sink.open_scope(root).is_err());
}
