//! Target-dialect details the resolver needs: where references point and how
//! a JSON Schema is narrowed to the OpenAPI 3.0 schema subset.

use serde_json::{json, Value};

/// Keywords whose values are data, not schemas. Never descend into these.
const DATA_KEYWORDS: &[&str] = &["enum", "const", "default", "example", "examples"];

/// Keywords whose values map arbitrary names to schemas.
const NAMED_SCHEMA_MAPS: &[&str] = &[
    "properties",
    "patternProperties",
    "definitions",
    "$defs",
    "dependentSchemas",
];

/// Which schema container references are rewritten into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaDialect {
    /// `#/definitions/...`
    Swagger2,
    /// `#/components/schemas/...`
    OpenApi3,
}

impl SchemaDialect {
    /// Prefix of every rewritten `$ref`, including the trailing slash.
    #[must_use]
    pub fn ref_prefix(self) -> &'static str {
        match self {
            SchemaDialect::Swagger2 => "#/definitions/",
            SchemaDialect::OpenApi3 => "#/components/schemas/",
        }
    }

    /// Build a reference to a container entry, with an optional pointer tail.
    #[must_use]
    pub fn reference(self, name: &str, tail: &str) -> String {
        format!("{}{name}{tail}", self.ref_prefix())
    }

    /// Apply the dialect's keyword fixups in place.
    pub fn apply_fixups(self, schema: &mut Value) {
        if self == SchemaDialect::OpenApi3 {
            to_openapi_schema(schema);
        }
    }
}

pub(crate) fn is_data_keyword(key: &str) -> bool {
    DATA_KEYWORDS.contains(&key)
}

pub(crate) fn is_named_schema_map(key: &str) -> bool {
    NAMED_SCHEMA_MAPS.contains(&key)
}

/// Rewrite JSON Schema keywords OpenAPI 3.0 does not accept.
///
/// - `patternProperties` becomes `additionalProperties` (an `anyOf` of the
///   pattern schemas when there is more than one)
/// - `const: X` becomes `enum: [X]`
/// - `$id` and `$schema` are removed at every level
pub fn to_openapi_schema(value: &mut Value) {
    match value {
        Value::Object(obj) => {
            obj.shift_remove("$id");
            obj.shift_remove("$schema");

            if let Some(constant) = obj.shift_remove("const") {
                if !obj.contains_key("enum") {
                    obj.insert("enum".to_string(), json!([constant]));
                }
            }

            if let Some(Value::Object(patterns)) = obj.shift_remove("patternProperties") {
                let mut schemas: Vec<Value> = patterns.into_iter().map(|(_, s)| s).collect();
                let additional = match schemas.len() {
                    0 => None,
                    1 => schemas.pop(),
                    _ => Some(json!({ "anyOf": schemas })),
                };
                if let Some(additional) = additional {
                    obj.insert("additionalProperties".to_string(), additional);
                }
            }

            for (key, child) in obj.iter_mut() {
                if is_data_keyword(key) {
                    continue;
                }
                if is_named_schema_map(key) {
                    if let Value::Object(named) = child {
                        named.values_mut().for_each(to_openapi_schema);
                    }
                    continue;
                }
                to_openapi_schema(child);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(to_openapi_schema),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pattern_becomes_additional_properties() {
        let mut schema = json!({
            "type": "object",
            "patternProperties": { "^x-": { "type": "string" } }
        });
        to_openapi_schema(&mut schema);
        assert_eq!(
            schema,
            json!({ "type": "object", "additionalProperties": { "type": "string" } })
        );
    }

    #[test]
    fn test_multiple_patterns_become_any_of() {
        let mut schema = json!({
            "patternProperties": {
                "^s_": { "type": "string" },
                "^n_": { "type": "number" }
            }
        });
        to_openapi_schema(&mut schema);
        assert_eq!(
            schema["additionalProperties"],
            json!({ "anyOf": [{ "type": "string" }, { "type": "number" }] })
        );
    }

    #[test]
    fn test_const_and_ids_are_rewritten_recursively() {
        let mut schema = json!({
            "$id": "Outer",
            "$schema": "http://json-schema.org/draft-07/schema#",
            "properties": {
                "kind": { "$id": "Inner", "const": "cat" },
                "const": { "type": "string" }
            },
            "default": { "$id": "kept", "const": "kept" }
        });
        to_openapi_schema(&mut schema);
        assert!(schema.get("$id").is_none());
        assert!(schema.get("$schema").is_none());
        assert_eq!(schema["properties"]["kind"], json!({ "enum": ["cat"] }));
        // a property named "const" is a name, not the keyword
        assert_eq!(schema["properties"]["const"], json!({ "type": "string" }));
        assert_eq!(schema["default"], json!({ "$id": "kept", "const": "kept" }));
    }

    #[test]
    fn test_swagger_dialect_leaves_schema_alone() {
        let mut schema = json!({ "const": 1 });
        SchemaDialect::Swagger2.apply_fixups(&mut schema);
        assert_eq!(schema, json!({ "const": 1 }));
    }

    #[test]
    fn test_reference_prefixes() {
        assert_eq!(SchemaDialect::Swagger2.reference("Foo", ""), "#/definitions/Foo");
        assert_eq!(
            SchemaDialect::OpenApi3.reference("Foo", "/properties/a"),
            "#/components/schemas/Foo/properties/a"
        );
    }
}
