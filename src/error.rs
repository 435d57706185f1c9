//! Error type shared by every stage of document generation.
//!
//! Configuration and usage errors abort the whole `generate()` call and nothing
//! is cached. Soft conditions (missing package metadata, missing responses,
//! malformed callbacks) never reach this type; they resolve to documented
//! defaults where they occur.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SpecError>;

/// Everything that can make document generation fail.
#[derive(Debug, Error)]
pub enum SpecError {
    /// A `$ref` points at a schema identifier (or JSON pointer) that is not registered.
    #[error("unresolved $ref '{reference}': no schema named '{target}' is registered")]
    UnresolvedRef {
        /// The `$ref` string exactly as written
        reference: String,
        /// The identifier or pointer that could not be located
        target: String,
    },

    /// Swagger 2.0 cannot express structured (e.g. JSON) query/header serialization.
    #[error(
        "complex serialization is not supported by Swagger 2.0: remove \"x-consume\" from \
         the '{property}' {location} schema of route '{route}' or switch the document to OpenAPI 3"
    )]
    ComplexSerialization {
        /// Route URL the property belongs to
        route: String,
        /// Parameter location (`querystring` or `headers`)
        location: String,
        /// Offending property name
        property: String,
    },

    /// A route declares OpenAPI links while generating a Swagger 2.0 document.
    #[error(
        "route '{route}' declares links, which Swagger 2.0 does not support; \
         configure an `openapi` block to generate an OpenAPI 3 document instead"
    )]
    LinksUnsupported {
        /// Route URL declaring the links
        route: String,
    },

    /// A link was declared for a status code the route does not document.
    #[error("missing status code {status} in route '{route}': links require a declared response")]
    MissingLinkStatus {
        /// Status code key used in `links`
        status: String,
        /// Route URL declaring the links
        route: String,
    },

    /// A server URL uses a template variable that has no default value.
    #[error("server url '{url}' uses variable '{variable}' which has no default value")]
    ServerVariableDefault {
        /// Server URL template
        url: String,
        /// Variable name without braces
        variable: String,
    },

    /// `generate()` was called before the registration-complete signal fired.
    #[error("the route and schema registries are not ready: complete_registration() has not been called")]
    NotReady,

    /// A route or schema was recorded after the registration-complete signal.
    #[error("cannot record {what} after complete_registration(): the registries are frozen")]
    RegistryFrozen {
        /// What was being recorded (`route` or `schema`)
        what: &'static str,
    },

    /// A scope handle does not belong to this sink.
    #[error("unknown registration scope {0}")]
    UnknownScope(usize),

    /// A named schema was registered without a string `$id`.
    #[error("shared schemas must carry a string `$id`")]
    MissingSchemaId,

    /// The structured document could not be serialized to text.
    #[error("failed to serialize document: {0}")]
    Serialize(String),
}

impl From<serde_yaml::Error> for SpecError {
    fn from(err: serde_yaml::Error) -> Self {
        SpecError::Serialize(err.to_string())
    }
}

impl From<serde_json::Error> for SpecError {
    fn from(err: serde_json::Error) -> Self {
        SpecError::Serialize(err.to_string())
    }
}
