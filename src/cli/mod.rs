//! # CLI Module
//!
//! Command-line front end of the `routedoc` binary.
//!
//! ## Overview
//!
//! The library is meant to be embedded in a web framework that records its
//! routes into a [`RegistrationSink`](crate::RegistrationSink). The CLI fills
//! the same sink from a route manifest file instead, which makes it handy for
//! previewing documents and for checking generator options in CI.
//!
//! ## Commands
//!
//! ### `generate`
//!
//! Build a document from a route manifest:
//!
//! ```bash
//! routedoc generate --manifest routes.yaml --config options.yaml --format yaml
//! ```
//!
//! Options:
//! - `--manifest <FILE>` - Route manifest, YAML or JSON (required)
//! - `--config <FILE>` - Generator options, YAML or JSON (default: Swagger 2.0)
//! - `--format <FORMAT>` - `json` or `yaml` (default: json)
//! - `--output <FILE>` - Write to a file instead of stdout
//!
//! ### `format-url`
//!
//! Print the OpenAPI form of a route pattern:
//!
//! ```bash
//! routedoc format-url '/users/:id(^\d+)/files/*'
//! # /users/{id}/files/{wildcard}
//! ```
//!
//! ## Manifest Format
//!
//! ```yaml
//! schemas:
//!   - $id: User
//!     type: object
//! routes:
//!   - method: GET
//!     url: /users/:id
//!     schema:
//!       response:
//!         200: { $ref: "User#" }
//! scopes:
//!   - schemas: []
//!     routes:
//!       - method: [GET, HEAD]
//!         url: /health
//! ```
//!
//! Scopes nest; a schema registered in a scope is visible to its descendants.

mod commands;
mod manifest;
#[cfg(test)]
mod tests;

pub use commands::{execute, run_cli, Cli, Commands, OutputFormat};
pub use manifest::{load_manifest, RouteManifest};
