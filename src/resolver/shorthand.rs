//! Unwraps a `querystring` / `params` / `headers` / `cookies` fragment into a
//! flat list of parameters.
//!
//! Accepted fragment shapes:
//! - an object schema with `properties` (and an optional `required` array)
//! - a top-level `$ref` to a registered schema or a pointer inside one
//! - `oneOf` / `anyOf` / `allOf`, every branch merged, later branches winning
//! - the bare shorthand `{ name: { type: ... }, ... }`
//!
//! Property-level `$ref`s are inlined since parameters cannot carry references.

use super::Resolver;
use crate::error::Result;
use serde_json::{Map, Value};
use tracing::debug;

/// Property keyword marking a parameter serialized as a media type (e.g. a
/// JSON-encoded query value). Its value is the media type.
pub const COMPLEX_SERIALIZATION_KEY: &str = "x-consume";

/// Serialization keywords copied from the fragment onto every parameter.
const SERIALIZATION_KEYS: &[&str] = &["style", "explode", "allowReserved"];

/// One unwrapped parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    /// Whether the parent listed this property as required
    pub required: bool,
    /// Property schema with references inlined and `required` removed
    pub schema: Value,
    /// The property's own `required` value before unwrapping
    pub original_required: Option<Value>,
}

impl ParamSpec {
    /// Media type of a complex-serialized parameter.
    #[must_use]
    pub fn consumed_media_type(&self) -> Option<&str> {
        self.schema
            .get(COMPLEX_SERIALIZATION_KEY)
            .and_then(Value::as_str)
    }

    /// Whether the parameter carries the complex-serialization marker.
    #[must_use]
    pub fn is_complex(&self) -> bool {
        self.schema.get(COMPLEX_SERIALIZATION_KEY).is_some()
    }
}

/// Parameters of one slot, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ParamSet {
    params: Vec<ParamSpec>,
    /// `style` / `explode` / `allowReserved` declared on the fragment
    pub serialization: Map<String, Value>,
}

impl ParamSet {
    /// Insert, or replace a parameter of the same name in place.
    fn upsert(&mut self, param: ParamSpec) {
        match self.params.iter_mut().find(|p| p.name == param.name) {
            Some(existing) => *existing = param,
            None => self.params.push(param),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParamSpec> {
        self.params.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

impl<'a> IntoIterator for &'a ParamSet {
    type Item = &'a ParamSpec;
    type IntoIter = std::slice::Iter<'a, ParamSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

impl Resolver {
    /// Unwrap a parameter slot fragment.
    pub fn resolve_params(&self, fragment: &Value) -> Result<ParamSet> {
        let mut set = ParamSet::default();
        if let Some(obj) = fragment.as_object() {
            for key in SERIALIZATION_KEYS {
                if let Some(value) = obj.get(*key) {
                    set.serialization.insert((*key).to_string(), value.clone());
                }
            }
        }
        let mut visiting = Vec::new();
        self.unwrap_into(fragment, None, &mut set, &mut visiting)?;
        Ok(set)
    }

    fn unwrap_into(
        &self,
        fragment: &Value,
        ctx: Option<&str>,
        set: &mut ParamSet,
        visiting: &mut Vec<String>,
    ) -> Result<()> {
        let Some(obj) = fragment.as_object() else {
            return Ok(());
        };

        if let Some(Value::Object(properties)) = obj.get("properties") {
            let required: Vec<&str> = obj
                .get("required")
                .and_then(Value::as_array)
                .map(|names| names.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            for (name, property) in properties {
                let (schema, original_required) = self.param_schema(property, ctx, visiting)?;
                set.upsert(ParamSpec {
                    name: name.clone(),
                    required: required.contains(&name.as_str()),
                    schema,
                    original_required,
                });
            }
            return Ok(());
        }

        let mut combined = false;
        for key in ["oneOf", "anyOf", "allOf"] {
            if let Some(Value::Array(branches)) = obj.get(key) {
                combined = true;
                for branch in branches {
                    self.unwrap_into(branch, ctx, set, visiting)?;
                }
            }
        }
        if combined {
            return Ok(());
        }

        if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
            let key = visit_key(reference, ctx);
            if visiting.contains(&key) {
                debug!(reference, "Reference cycle while unwrapping parameters");
                return Ok(());
            }
            let (target, owner) = self.lookup(reference, ctx)?;
            visiting.push(key);
            self.unwrap_into(&target, owner.as_deref(), set, visiting)?;
            visiting.pop();
            return Ok(());
        }

        if obj.contains_key("type") {
            return Ok(());
        }

        // bare `{ name: schema }` shorthand
        for (name, property) in obj {
            if name.starts_with('$') || !property.is_object() {
                continue;
            }
            let (schema, original_required) = self.param_schema(property, ctx, visiting)?;
            let required = original_required.as_ref().and_then(Value::as_bool) == Some(true);
            set.upsert(ParamSpec {
                name: name.clone(),
                required,
                schema,
                original_required,
            });
        }
        Ok(())
    }

    /// Property schema with references inlined, plus its detached `required`.
    fn param_schema(
        &self,
        property: &Value,
        ctx: Option<&str>,
        visiting: &mut Vec<String>,
    ) -> Result<(Value, Option<Value>)> {
        let mut schema = self.inline(property, ctx, visiting)?;
        let mut original_required = None;
        if let Value::Object(obj) = &mut schema {
            original_required = obj.shift_remove("required");
            obj.shift_remove("$id");
            obj.shift_remove("definitions");
            obj.shift_remove("$defs");
        }
        self.dialect.apply_fixups(&mut schema);
        Ok((schema, original_required))
    }

    fn inline(&self, property: &Value, ctx: Option<&str>, visiting: &mut Vec<String>) -> Result<Value> {
        if let Some(reference) = property.get("$ref").and_then(Value::as_str) {
            let key = visit_key(reference, ctx);
            if !visiting.contains(&key) {
                let (target, owner) = self.lookup(reference, ctx)?;
                visiting.push(key);
                let mut inlined = self.inline(&target, owner.as_deref(), visiting)?;
                visiting.pop();

                if let (Value::Object(dst), Some(src)) = (&mut inlined, property.as_object()) {
                    for (k, v) in src {
                        if k == "$ref" {
                            continue;
                        }
                        let mut v = v.clone();
                        self.rewrite_refs(&mut v, ctx)?;
                        dst.insert(k.clone(), v);
                    }
                }
                return Ok(inlined);
            }
        }
        let mut schema = property.clone();
        self.rewrite_refs(&mut schema, ctx)?;
        Ok(schema)
    }
}

fn visit_key(reference: &str, ctx: Option<&str>) -> String {
    format!("{}|{reference}", ctx.unwrap_or_default())
}
