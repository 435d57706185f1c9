//! Swagger 2.0 assembler.

use super::{
    copy_operation_metadata, copy_vendor_extensions, default_responses, finish_path,
    insert_if_some, is_status_class, response_description, status_key, strip_base_path,
    Assembler, RESPONSE_DESCRIPTION_KEY,
};
use crate::config::{vendor_extensions, SwaggerOptions};
use crate::error::{Result, SpecError};
use crate::filter::PreparedRoute;
use crate::package::PackageInfo;
use crate::resolver::{ParamSet, Resolver, SchemaDialect};
use crate::url_template::{generated_params_schema, has_params};
use serde_json::{json, Map, Value};
use tracing::debug;

/// Body media types that turn body properties into `formData` parameters.
const FORM_MEDIA_TYPES: &[&str] = &["application/x-www-form-urlencoded", "multipart/form-data"];

/// Header parameter fields Swagger 2.0 keeps.
const HEADER_FIELDS: &[&str] = &["description", "type"];

#[derive(Debug, Clone)]
pub struct SwaggerAssembler {
    options: SwaggerOptions,
    strip_base_path: bool,
}

impl SwaggerAssembler {
    #[must_use]
    pub fn new(options: SwaggerOptions, strip_base_path: bool) -> Self {
        Self {
            options,
            strip_base_path,
        }
    }

    fn query_parameters(&self, route: &str, set: &ParamSet, out: &mut Vec<Value>) -> Result<()> {
        for param in set {
            if param.is_complex() {
                return Err(SpecError::ComplexSerialization {
                    route: route.to_string(),
                    location: "querystring".to_string(),
                    property: param.name.clone(),
                });
            }
            out.push(parameter("query", &param.name, param.required, &param.schema));
        }
        Ok(())
    }

    fn body_parameters(
        &self,
        body: &Value,
        consumes: Option<&Value>,
        resolver: &Resolver,
        out: &mut Vec<Value>,
    ) -> Result<()> {
        if is_form_only(consumes) {
            for param in &resolver.resolve_params(body)? {
                let mut schema = param.schema.clone();
                if let Value::Object(obj) = &mut schema {
                    if obj.get("contentEncoding").and_then(Value::as_str) == Some("binary") {
                        obj.shift_remove("contentEncoding");
                        obj.insert("type".to_string(), json!("file"));
                    }
                }
                out.push(parameter("formData", &param.name, param.required, &schema));
            }
            return Ok(());
        }

        let resolved = resolver.resolve(body)?;
        let mut param = Map::new();
        param.insert("name".to_string(), json!("body"));
        param.insert("in".to_string(), json!("body"));
        insert_if_some(&mut param, "description", resolved.get("description").cloned());
        param.insert("schema".to_string(), resolved);
        out.push(Value::Object(param));
        Ok(())
    }

    fn responses(&self, response: Option<&Value>, resolver: &Resolver) -> Result<Value> {
        let Some(declared) = response.and_then(Value::as_object).filter(|r| !r.is_empty()) else {
            return Ok(default_responses("200"));
        };

        let keys: Vec<String> = declared.keys().map(|k| status_key(k)).collect();
        let mut responses = Map::new();
        for (raw_key, raw) in declared {
            let key = status_key(raw_key);
            if is_status_class(&key) {
                let exact = format!("{}00", &key[..1]);
                if keys.contains(&exact) {
                    debug!(status = %key, "Dropping status class shadowed by {}", exact);
                    continue;
                }
            }

            let mut entry = Map::new();
            entry.insert("description".to_string(), json!(response_description(raw)));

            let mut resolved = resolver.resolve(raw)?;
            if let Value::Object(schema) = &mut resolved {
                schema.shift_remove("description");
                schema.shift_remove(RESPONSE_DESCRIPTION_KEY);
                insert_if_some(&mut entry, "headers", schema.shift_remove("headers"));
                let is_null = schema.get("type").and_then(Value::as_str) == Some("null");
                if !is_null && !schema.is_empty() {
                    entry.insert("schema".to_string(), resolved);
                }
            }
            responses.insert(key, Value::Object(entry));
        }
        Ok(Value::Object(responses))
    }
}

impl Assembler for SwaggerAssembler {
    fn schema_dialect(&self) -> SchemaDialect {
        SchemaDialect::Swagger2
    }

    fn user_schemas(&self) -> Map<String, Value> {
        self.options.definitions.clone().unwrap_or_default()
    }

    fn normalize_url(&self, url: &str) -> Result<String> {
        let stripped = match &self.options.base_path {
            Some(base) if self.strip_base_path => strip_base_path(url, base),
            _ => None,
        };
        Ok(finish_path(stripped.as_deref().unwrap_or(url)))
    }

    fn build_operation(
        &self,
        route: &PreparedRoute,
        path: &str,
        resolver: &Resolver,
    ) -> Result<Value> {
        if route.route.links.as_ref().is_some_and(|links| !links.is_empty()) {
            return Err(SpecError::LinksUnsupported {
                route: route.url.clone(),
            });
        }

        let mut operation = Map::new();
        let mut parameters = Vec::new();
        let schema = route.schema.as_ref().and_then(Value::as_object);
        let mut has_path_params = false;

        if let Some(schema) = schema {
            copy_operation_metadata(schema, &mut operation);

            if let Some(query) = schema.get("querystring") {
                self.query_parameters(&route.url, &resolver.resolve_params(query)?, &mut parameters)?;
            }

            if let Some(body) = schema.get("body") {
                let consumes = schema
                    .get("consumes")
                    .cloned()
                    .or_else(|| self.options.consumes.as_ref().map(|c| json!(c)));
                self.body_parameters(body, consumes.as_ref(), resolver, &mut parameters)?;
            }

            if let Some(params) = schema.get("params") {
                has_path_params = true;
                for param in &resolver.resolve_params(params)? {
                    parameters.push(parameter("path", &param.name, true, &param.schema));
                }
            }

            if let Some(headers) = schema.get("headers") {
                for param in &resolver.resolve_params(headers)? {
                    parameters.push(header_parameter(&param.name, param.required, &param.schema));
                }
            }

            if schema.contains_key("cookies") {
                debug!(url = %route.url, "Swagger 2.0 has no cookie parameters, skipping");
            }
        }

        if !has_path_params && has_params(path) {
            for param in &resolver.resolve_params(&generated_params_schema(path))? {
                parameters.push(parameter("path", &param.name, true, &param.schema));
            }
        }

        if !parameters.is_empty() {
            operation.insert("parameters".to_string(), Value::Array(parameters));
        }

        if let Some(schema) = schema {
            for key in ["consumes", "produces", "deprecated", "security", "schemes"] {
                insert_if_some(&mut operation, key, schema.get(key).cloned());
            }
        }

        operation.insert(
            "responses".to_string(),
            self.responses(schema.and_then(|s| s.get("response")), resolver)?,
        );

        if let Some(schema) = schema {
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
        doc.insert("swagger".to_string(), json!("2.0"));
        doc.insert(
            "info".to_string(),
            opts.info.clone().unwrap_or_else(|| package.to_info()),
        );
        insert_if_some(&mut doc, "host", opts.host.clone().map(Value::String));
        insert_if_some(&mut doc, "basePath", opts.base_path.clone().map(Value::String));
        insert_if_some(&mut doc, "schemes", opts.schemes.as_ref().map(|s| json!(s)));
        insert_if_some(&mut doc, "consumes", opts.consumes.as_ref().map(|c| json!(c)));
        insert_if_some(&mut doc, "produces", opts.produces.as_ref().map(|p| json!(p)));
        doc.insert("definitions".to_string(), Value::Object(resolver.container()));
        doc.insert("paths".to_string(), Value::Object(Map::new()));
        insert_if_some(&mut doc, "securityDefinitions", opts.security_definitions.clone());
        insert_if_some(&mut doc, "security", opts.security.clone().map(Value::Array));
        insert_if_some(&mut doc, "tags", opts.tags.clone().map(Value::Array));
        insert_if_some(&mut doc, "externalDocs", opts.external_docs.clone());
        for (key, value) in vendor_extensions(&opts.extensions) {
            doc.insert(key.clone(), value.clone());
        }
        Ok(doc)
    }
}

/// `consumes` is exactly one form media type.
fn is_form_only(consumes: Option<&Value>) -> bool {
    match consumes.and_then(Value::as_array).map(Vec::as_slice) {
        Some([only]) => only.as_str().is_some_and(|mt| FORM_MEDIA_TYPES.contains(&mt)),
        _ => false,
    }
}

/// `{name, in, required, ...schema}`: Swagger 2.0 parameters carry the
/// schema keywords inline.
fn parameter(location: &str, name: &str, required: bool, schema: &Value) -> Value {
    let mut param = Map::new();
    param.insert("name".to_string(), json!(name));
    param.insert("in".to_string(), json!(location));
    param.insert("required".to_string(), json!(required));
    if let Some(schema) = schema.as_object() {
        for (key, value) in schema {
            if !param.contains_key(key) {
                param.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(param)
}

fn header_parameter(name: &str, required: bool, schema: &Value) -> Value {
    let mut param = Map::new();
    param.insert("name".to_string(), json!(name));
    param.insert("in".to_string(), json!("header"));
    param.insert("required".to_string(), json!(required));
    for key in HEADER_FIELDS {
        insert_if_some(&mut param, key, schema.get(*key).cloned());
    }
    Value::Object(param)
}
