//! # routedoc
//!
//! **routedoc** builds a [Swagger 2.0](https://swagger.io/specification/v2/) or
//! [OpenAPI 3](https://spec.openapis.org/oas/v3.0.3) document from the routes a web framework
//! registered, using the JSON Schemas attached to each route.
//!
//! ## Overview
//!
//! The host framework records every route and every shared schema into a
//! [`RegistrationSink`] while it sets up. Once it signals that registration is complete
//! the sink freezes, and a [`SpecGenerator`] turns the frozen snapshot into a document.
//! Nothing is read from a spec file: the routes are the source of truth.
//!
//! ## Architecture
//!
//! - **[`registry`]** - Scoped route and schema registries, frozen on completion
//! - **[`url_template`]** - `/users/:id` to `/users/{id}` conversion
//! - **[`resolver`]** - Flattens shared schemas into named definitions and rewrites `$ref`s
//! - **[`filter`]** - Hidden-route filtering and the per-route transform hook
//! - **[`assembler`]** - Swagger 2.0 and OpenAPI 3 operation and envelope builders
//! - **[`generator`]** - Runs the pipeline and caches the structured and YAML documents
//! - **[`docs`]** - JSON, YAML and Swagger UI endpoints for the host server
//! - **[`config`]** - Generator options, loadable from YAML or JSON
//! - **[`package`]** - `info` fallback from the crate manifest
//! - **[`logging`]** - `tracing` subscriber setup for the binary
//! - **[`cli`]** - The `routedoc` command
//!
//! ### Generation Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host as Host framework
//!     participant Sink as RegistrationSink
//!     participant Gen as SpecGenerator
//!     participant Res as Resolver
//!     participant Asm as Assembler
//!
//!     Host->>Sink: record_schema / record_route
//!     Host->>Sink: complete_registration()
//!     Host->>Gen: generate(GenerateOptions)
//!     Gen->>Sink: snapshot()
//!     Gen->>Res: build(schemas, user definitions)
//!     Gen->>Asm: build_envelope(package, resolver)
//!     loop every visible route
//!         Gen->>Asm: build_operation(route, path, resolver)
//!     end
//!     Gen-->>Host: cached document (Arc)
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use routedoc::{GeneratorOptions, OpenApiOptions, RegistrationSink, RouteDescriptor, SpecGenerator};
//! use http::Method;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let sink = Arc::new(RegistrationSink::new());
//! let root = sink.root_scope();
//! sink.record_schema(root, json!({ "$id": "User", "type": "object" })).unwrap();
//! sink.record_route(
//!     root,
//!     RouteDescriptor::new(Method::GET, "/users/:id")
//!         .with_schema(json!({ "response": { "200": { "$ref": "User#" } } })),
//! )
//! .unwrap();
//! sink.complete_registration();
//!
//! let options = GeneratorOptions::openapi(OpenApiOptions {
//!     openapi: Some("3.0.3".into()),
//!     ..Default::default()
//! });
//! let generator = SpecGenerator::new(sink, options);
//! let doc = generator.document().unwrap();
//! assert_eq!(
//!     doc["paths"]["/users/{id}"]["get"]["responses"]["200"]["content"]["application/json"]["schema"]["$ref"],
//!     "#/components/schemas/User"
//! );
//! ```
//!
//! ## Dialects
//!
//! A non-empty `openapi` block in [`GeneratorOptions`] selects OpenAPI 3; otherwise the
//! document is Swagger 2.0. The choice is fixed when the generator is created.
//!
//! ## Concurrency
//!
//! The sink and the generator are `Send + Sync`. Share them as `Arc`s; concurrent first
//! calls to the generator build the document once.

pub mod assembler;
pub mod cli;
pub mod config;
pub mod docs;
pub mod error;
pub mod filter;
pub mod generator;
pub mod logging;
pub mod package;
pub mod registry;
pub mod resolver;
pub mod url_template;

pub use config::{load_options, GeneratorOptions, OpenApiOptions, SwaggerOptions};
pub use docs::{DocResponse, DocumentationRoutes};
pub use error::{Result, SpecError};
pub use filter::{RouteTransform, TransformInput, TransformOutput};
pub use generator::{GenerateOptions, GeneratedDocument, SpecGenerator};
pub use package::PackageInfo;
pub use registry::{RegistrationSink, RegistrySnapshot, RouteDescriptor, ScopeId};
pub use resolver::RefNaming;
pub use url_template::format_url_template;
