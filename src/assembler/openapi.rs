//! OpenAPI 3 assembler.
//!
//! Differences from Swagger 2.0 worth knowing:
//! - parameters wrap their schema (`{in, name, required, schema}`) and may be
//!   serialized as a media type (`content`) when marked with `x-consume`
//! - the body is a `requestBody` with one entry per consumed media type
//! - `2XX` and `200` are distinct response keys
//! - parameters implied by a security scheme are left out of the operation
//! - links and callbacks are supported

use super::{
    copy_operation_metadata, copy_vendor_extensions, default_responses, finish_path,
    insert_if_some, response_description, status_key, strip_base_path, Assembler,
    RESPONSE_DESCRIPTION_KEY,
};
use crate::config::{vendor_extensions, OpenApiOptions};
use crate::error::{Result, SpecError};
use crate::filter::PreparedRoute;
use crate::package::PackageInfo;
use crate::resolver::{ParamSet, Resolver, SchemaDialect};
use crate::url_template::{generated_params_schema, has_params};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::debug;
use url::Url;

/// Version written when the options do not name one.
pub const DEFAULT_OPENAPI_VERSION: &str = "3.0.3";

const DEFAULT_MEDIA_TYPE: &str = "application/json";

/// Keyword holding ready-made OpenAPI example objects.
const X_EXAMPLES: &str = "x-examples";

static SERVER_VARIABLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^{}]+)\}").expect("server variable regex should be valid"));

#[derive(Debug, Clone)]
pub struct OpenApiAssembler {
    options: OpenApiOptions,
    strip_base_path: bool,
}

/// Parameters implied by security schemes, as (location, name).
#[derive(Debug, Default)]
struct SecurityIgnores(Vec<(String, String)>);

impl SecurityIgnores {
    fn contains(&self, location: &str, name: &str) -> bool {
        self.0.iter().any(|(loc, ignored)| {
            loc == location
                && if location == "header" {
                    ignored.eq_ignore_ascii_case(name)
                } else {
                    ignored == name
                }
        })
    }
}

impl OpenApiAssembler {
    #[must_use]
    pub fn new(options: OpenApiOptions, strip_base_path: bool) -> Self {
        Self {
            options,
            strip_base_path,
        }
    }

    fn security_schemes(&self) -> Option<&Map<String, Value>> {
        self.options
            .components
            .as_ref()?
            .get("securitySchemes")?
            .as_object()
    }

    /// Parameters covered by the operation's and the document's security
    /// requirements. Requirements naming an unknown scheme are skipped.
    fn security_ignores(&self, schema: &Map<String, Value>) -> SecurityIgnores {
        let mut ignores = SecurityIgnores::default();
        let Some(schemes) = self.security_schemes() else {
            return ignores;
        };

        let operation_security = schema.get("security").and_then(Value::as_array);
        let requirements = operation_security
            .into_iter()
            .flatten()
            .chain(self.options.security.iter().flatten());

        for requirement in requirements.filter_map(Value::as_object) {
            for label in requirement.keys() {
                let Some(scheme) = schemes.get(label) else {
                    debug!(scheme = %label, "Security requirement names an unknown scheme");
                    continue;
                };
                let kind = scheme.get("type").and_then(Value::as_str);
                let is_bearer = kind == Some("http")
                    && scheme
                        .get("scheme")
                        .and_then(Value::as_str)
                        .is_some_and(|s| s.eq_ignore_ascii_case("bearer"));
                if is_bearer {
                    ignores.0.push(("header".into(), "authorization".into()));
                } else if kind == Some("apiKey") {
                    let location = scheme.get("in").and_then(Value::as_str);
                    let name = scheme.get("name").and_then(Value::as_str);
                    if let (Some(location), Some(name)) = (location, name) {
                        ignores.0.push((location.to_string(), name.to_string()));
                    }
                }
            }
        }
        ignores
    }

    fn push_parameters(
        &self,
        location: &str,
        set: &ParamSet,
        ignores: &SecurityIgnores,
        always_required: bool,
        out: &mut Vec<Value>,
    ) {
        for param in set {
            if ignores.contains(location, &param.name) {
                debug!(location, name = %param.name, "Parameter covered by security scheme");
                continue;
            }

            let mut entry = Map::new();
            entry.insert("in".to_string(), json!(location));
            entry.insert("name".to_string(), json!(param.name));
            entry.insert("required".to_string(), json!(always_required || param.required));

            let mut schema = param.schema.clone();
            if let Value::Object(obj) = &mut schema {
                insert_if_some(&mut entry, "description", obj.shift_remove("description"));
            }
            for (key, value) in &set.serialization {
                entry.insert(key.clone(), value.clone());
            }

            match param.consumed_media_type().map(str::to_string) {
                Some(media_type) => {
                    if let Value::Object(obj) = &mut schema {
                        obj.shift_remove(crate::resolver::COMPLEX_SERIALIZATION_KEY);
                        insert_if_some(obj, "required", param.original_required.clone());
                    }
                    let mut content = Map::new();
                    content.insert(media_type, Value::Object(schema_to_media(schema)));
                    entry.insert("content".to_string(), Value::Object(content));
                }
                None => entry.extend(schema_to_media(schema)),
            }
            out.push(Value::Object(entry));
        }
    }

    fn request_body(
        &self,
        body: &Value,
        consumes: &[String],
        resolver: &Resolver,
    ) -> Result<Value> {
        let mut request_body = Map::new();

        if let Some(Value::Object(content)) = body.get("content") {
            insert_if_some(&mut request_body, "description", body.get("description").cloned());
            if body.get("required").and_then(Value::as_bool) == Some(true) {
                request_body.insert("required".to_string(), json!(true));
            }
            request_body.insert(
                "content".to_string(),
                Value::Object(explicit_content(content, resolver)?),
            );
            return Ok(Value::Object(request_body));
        }

        let mut resolved = resolver.resolve(body)?;
        let description = resolved
            .as_object_mut()
            .and_then(|obj| obj.shift_remove("description"));
        let required = resolved
            .get("required")
            .and_then(Value::as_array)
            .is_some_and(|r| !r.is_empty());

        insert_if_some(&mut request_body, "description", description);
        if required {
            request_body.insert("required".to_string(), json!(true));
        }
        let mut content = Map::new();
        for media_type in consumes {
            content.insert(
                media_type.clone(),
                Value::Object(schema_to_media(resolved.clone())),
            );
        }
        request_body.insert("content".to_string(), Value::Object(content));
        Ok(Value::Object(request_body))
    }

    fn responses(
        &self,
        response: Option<&Value>,
        produces: &[String],
        resolver: &Resolver,
    ) -> Result<Map<String, Value>> {
        let Some(declared) = response.and_then(Value::as_object).filter(|r| !r.is_empty()) else {
            return Ok(default_object("200"));
        };

        let mut responses = Map::new();
        for (raw_key, raw) in declared {
            let mut entry = Map::new();
            entry.insert("description".to_string(), json!(response_description(raw)));

            if let Some(Value::Object(content)) = raw.get("content") {
                if let Some(Value::Object(headers)) = raw.get("headers") {
                    entry.insert("headers".to_string(), response_headers(headers, resolver)?);
                }
                entry.insert(
                    "content".to_string(),
                    Value::Object(explicit_content(content, resolver)?),
                );
                responses.insert(status_key(raw_key), Value::Object(entry));
                continue;
            }

            let mut resolved = resolver.resolve(raw)?;
            if let Value::Object(schema) = &mut resolved {
                schema.shift_remove("description");
                schema.shift_remove(RESPONSE_DESCRIPTION_KEY);
                if let Some(Value::Object(headers)) = schema.shift_remove("headers") {
                    entry.insert("headers".to_string(), response_headers(&headers, resolver)?);
                }
                let is_null = schema.get("type").and_then(Value::as_str) == Some("null");
                if !is_null && !schema.is_empty() {
                    let mut content = Map::new();
                    for media_type in produces {
                        content.insert(
                            media_type.clone(),
                            Value::Object(schema_to_media(resolved.clone())),
                        );
                    }
                    entry.insert("content".to_string(), Value::Object(content));
                }
            }
            responses.insert(status_key(raw_key), Value::Object(entry));
        }
        Ok(responses)
    }

    /// Callback operations; entries that are not objects are skipped.
    fn callbacks(&self, callbacks: &Map<String, Value>, resolver: &Resolver) -> Result<Value> {
        let mut out = Map::new();
        for (event, expressions) in callbacks {
            let Some(expressions) = expressions.as_object() else {
                debug!(event = %event, "Skipping malformed callback");
                continue;
            };
            let mut event_out = Map::new();
            for (expression, methods) in expressions {
                let Some(methods) = methods.as_object() else {
                    debug!(event = %event, expression = %expression, "Skipping malformed callback");
                    continue;
                };
                let mut path_item = Map::new();
                for (method, operation) in methods {
                    let Some(operation) = operation.as_object() else {
                        debug!(event = %event, method = %method, "Skipping malformed callback");
                        continue;
                    };
                    let mut callback_op = Map::new();
                    for (key, value) in operation {
                        let value = match key.as_str() {
                            "requestBody" => resolver.resolve(value)?,
                            "responses" => continue,
                            _ => value.clone(),
                        };
                        callback_op.insert(key.clone(), value);
                    }
                    let responses = match operation.get("responses") {
                        Some(Value::Object(r)) if !r.is_empty() => {
                            resolver.resolve(&Value::Object(r.clone()))?
                        }
                        _ => default_responses("2XX"),
                    };
                    callback_op.insert("responses".to_string(), responses);
                    path_item.insert(method.to_ascii_lowercase(), Value::Object(callback_op));
                }
                event_out.insert(expression.clone(), Value::Object(path_item));
            }
            out.insert(event.clone(), Value::Object(event_out));
        }
        Ok(Value::Object(out))
    }

    /// Path component of every server URL, variables substituted.
    fn server_base_paths(&self) -> Result<Vec<String>> {
        let mut paths = Vec::new();
        for server in self.options.servers.iter().flatten() {
            let Some(template) = server.get("url").and_then(Value::as_str) else {
                continue;
            };
            let resolved = resolve_server_url(template, server.get("variables"))?;
            let parsed = if resolved.starts_with('/') {
                Url::parse(&format!("http://dummy{resolved}"))
            } else {
                Url::parse(&resolved).or_else(|_| Url::parse(&format!("http://dummy/{resolved}")))
            };
            match parsed {
                Ok(url) => {
                    let path = url.path().trim_end_matches('/');
                    if !path.is_empty() {
                        paths.push(path.to_string());
                    }
                }
                Err(err) => debug!(url = %resolved, error = %err, "Unparseable server url"),
            }
        }
        Ok(paths)
    }
}

impl Assembler for OpenApiAssembler {
    fn schema_dialect(&self) -> SchemaDialect {
        SchemaDialect::OpenApi3
    }

    fn user_schemas(&self) -> Map<String, Value> {
        self.options
            .components
            .as_ref()
            .and_then(|c| c.get("schemas"))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    fn normalize_url(&self, url: &str) -> Result<String> {
        if self.strip_base_path {
            for base in self.server_base_paths()? {
                if let Some(stripped) = strip_base_path(url, &base) {
                    return Ok(finish_path(&stripped));
                }
            }
        }
        Ok(finish_path(url))
    }

    fn build_operation(
        &self,
        route: &PreparedRoute,
        path: &str,
        resolver: &Resolver,
    ) -> Result<Value> {
        let mut operation = Map::new();
        let mut parameters = Vec::new();
        let mut request_body = None;
        let schema = route.schema.as_ref().and_then(Value::as_object);
        let mut has_path_params = false;

        if let Some(schema) = schema {
            copy_operation_metadata(schema, &mut operation);
            let ignores = self.security_ignores(schema);

            if let Some(query) = schema.get("querystring") {
                let set = resolver.resolve_params(query)?;
                self.push_parameters("query", &set, &ignores, false, &mut parameters);
            }

            if let Some(body) = schema.get("body") {
                let consumes = media_types(schema.get("consumes"));
                request_body = Some(self.request_body(body, &consumes, resolver)?);
            }

            if let Some(params) = schema.get("params") {
                has_path_params = true;
                let set = resolver.resolve_params(params)?;
                self.push_parameters("path", &set, &ignores, true, &mut parameters);
            }

            if let Some(headers) = schema.get("headers") {
                let set = resolver.resolve_params(headers)?;
                self.push_parameters("header", &set, &ignores, false, &mut parameters);
            }

            if let Some(cookies) = schema.get("cookies") {
                let set = resolver.resolve_params(cookies)?;
                self.push_parameters("cookie", &set, &ignores, false, &mut parameters);
            }
        }

        if !has_path_params && has_params(path) {
            let set = resolver.resolve_params(&generated_params_schema(path))?;
            self.push_parameters("path", &set, &SecurityIgnores::default(), true, &mut parameters);
        }

        if !parameters.is_empty() {
            operation.insert("parameters".to_string(), Value::Array(parameters));
        }
        insert_if_some(&mut operation, "requestBody", request_body);

        let produces = media_types(schema.and_then(|s| s.get("produces")));
        let mut responses =
            self.responses(schema.and_then(|s| s.get("response")), &produces, resolver)?;

        if let Some(links) = &route.route.links {
            let declared: Vec<String> = schema
                .and_then(|s| s.get("response"))
                .and_then(Value::as_object)
                .map(|r| r.keys().map(|k| status_key(k)).collect())
                .unwrap_or_default();
            for (status, status_links) in links {
                let key = status_key(status);
                let response = match responses.get_mut(&key) {
                    Some(Value::Object(response)) if declared.contains(&key) => response,
                    _ => {
                        return Err(SpecError::MissingLinkStatus {
                            status: status.clone(),
                            route: route.url.clone(),
                        })
                    }
                };
                response.insert("links".to_string(), status_links.clone());
            }
        }
        operation.insert("responses".to_string(), Value::Object(responses));

        if let Some(schema) = schema {
            if let Some(Value::Object(callbacks)) = schema.get("callbacks") {
                operation.insert("callbacks".to_string(), self.callbacks(callbacks, resolver)?);
            }
            for key in ["deprecated", "security", "servers"] {
                insert_if_some(&mut operation, key, schema.get(key).cloned());
            }
            copy_vendor_extensions(schema, &mut operation);
        }

        Ok(Value::Object(operation))
    }

    fn build_envelope(
        &self,
        package: &PackageInfo,
        resolver: &Resolver,
    ) -> Result<Map<String, Value>> {
        let opts = &self.options;
        let mut doc = Map::new();
        doc.insert(
            "openapi".to_string(),
            json!(opts.openapi.as_deref().unwrap_or(DEFAULT_OPENAPI_VERSION)),
        );
        doc.insert(
            "info".to_string(),
            opts.info.clone().unwrap_or_else(|| package.to_info()),
        );
        insert_if_some(&mut doc, "servers", opts.servers.clone().map(Value::Array));

        let mut components = Map::new();
        components.insert("schemas".to_string(), Value::Object(resolver.container()));
        for (key, value) in opts.components.iter().flatten() {
            if key != "schemas" {
                components.insert(key.clone(), value.clone());
            }
        }
        doc.insert("components".to_string(), Value::Object(components));
        doc.insert("paths".to_string(), Value::Object(Map::new()));

        insert_if_some(&mut doc, "security", opts.security.clone().map(Value::Array));
        insert_if_some(&mut doc, "tags", opts.tags.clone().map(Value::Array));
        insert_if_some(&mut doc, "externalDocs", opts.external_docs.clone());
        for (key, value) in vendor_extensions(&opts.extensions) {
            doc.insert(key.clone(), value.clone());
        }
        Ok(doc)
    }
}

fn default_object(status: &str) -> Map<String, Value> {
    match default_responses(status) {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// `consumes`/`produces` list, `application/json` when absent or empty.
fn media_types(declared: Option<&Value>) -> Vec<String> {
    let types: Vec<String> = declared
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();
    if types.is_empty() {
        vec![DEFAULT_MEDIA_TYPE.to_string()]
    } else {
        types
    }
}

/// Media type object for a schema, lifting JSON Schema `examples` into
/// OpenAPI `example` / `examples`.
fn schema_to_media(mut schema: Value) -> Map<String, Value> {
    let mut examples = None;
    let mut example = None;
    if let Value::Object(obj) = &mut schema {
        if let Some(x_examples) = obj.shift_remove(X_EXAMPLES) {
            obj.shift_remove("examples");
            examples = Some(x_examples);
        } else if let Some(Value::Array(list)) = obj.get("examples").cloned() {
            obj.shift_remove("examples");
            match list.len() {
                0 => {}
                1 => example = list.into_iter().next(),
                _ => {
                    let named: Map<String, Value> = list
                        .into_iter()
                        .enumerate()
                        .map(|(i, value)| (format!("example{}", i + 1), json!({ "value": value })))
                        .collect();
                    examples = Some(Value::Object(named));
                }
            }
        }
    }

    let mut media = Map::new();
    media.insert("schema".to_string(), schema);
    insert_if_some(&mut media, "example", example);
    insert_if_some(&mut media, "examples", examples);
    media
}

/// An explicit `content` map: each media type's `schema` resolved.
fn explicit_content(content: &Map<String, Value>, resolver: &Resolver) -> Result<Map<String, Value>> {
    let mut out = Map::new();
    for (media_type, media) in content {
        let mut entry = match media.get("schema") {
            Some(schema) => schema_to_media(resolver.resolve(schema)?),
            None => Map::new(),
        };
        if let Some(media) = media.as_object() {
            for (key, value) in media {
                if key != "schema" {
                    entry.insert(key.clone(), value.clone());
                }
            }
        }
        out.insert(media_type.clone(), Value::Object(entry));
    }
    Ok(out)
}

/// `{name: {schema, description?}}` response headers.
fn response_headers(headers: &Map<String, Value>, resolver: &Resolver) -> Result<Value> {
    let mut out = Map::new();
    for (name, header) in headers {
        let mut schema = resolver.resolve(header)?;
        let mut entry = Map::new();
        if let Value::Object(obj) = &mut schema {
            insert_if_some(&mut entry, "description", obj.shift_remove("description"));
        }
        entry.insert("schema".to_string(), schema);
        out.insert(name.clone(), Value::Object(entry));
    }
    Ok(Value::Object(out))
}

/// Substitute `{var}` placeholders with each variable's default.
fn resolve_server_url(template: &str, variables: Option<&Value>) -> Result<String> {
    let mut missing = None;
    let resolved = SERVER_VARIABLE_REGEX.replace_all(template, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        let default = variables
            .and_then(|vars| vars.get(name))
            .and_then(|var| var.get("default"))
            .and_then(|d| match d {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });
        match default {
            Some(value) => value,
            None => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });
    match missing {
        Some(variable) => Err(SpecError::ServerVariableDefault {
            url: template.to_string(),
            variable,
        }),
        None => Ok(resolved.into_owned()),
    }
}
