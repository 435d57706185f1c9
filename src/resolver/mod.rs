//! # Reference Resolver
//!
//! Flattens every registered schema into one container (`definitions` for
//! Swagger 2.0, `components.schemas` for OpenAPI 3) and rewrites each `$ref`
//! so it points into that container.
//!
//! ## Reference forms
//!
//! | Written as                    | Meaning                                        |
//! |-------------------------------|------------------------------------------------|
//! | `User#`                       | the schema registered with `$id: User`         |
//! | `User#/properties/name`       | a JSON pointer inside it                       |
//! | `#/definitions/User`          | container entry `User` (either dialect)        |
//! | `#/components/schemas/User`   | container entry `User` (either dialect)        |
//! | `#/definitions/Address`       | inside `User`: its own nested definition first |
//!
//! Nested `definitions` / `$defs` are hoisted into the container under names
//! chosen by a [`RefNaming`] strategy and removed from the visible copy of
//! their parent.
//!
//! An identifier that is not registered, or a pointer that does not exist in
//! its target, fails with [`SpecError::UnresolvedRef`].

pub mod dialect;
pub mod naming;
pub mod shorthand;

pub use dialect::SchemaDialect;
pub use naming::{DefaultRefNaming, RefNaming};
pub use shorthand::{ParamSet, ParamSpec, COMPLEX_SERIALIZATION_KEY};

use crate::error::{Result, SpecError};
use dialect::{is_data_keyword, is_named_schema_map};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

/// Pointer prefixes that address a container entry by name.
const CONTAINER_PREFIXES: &[&str] = &["/definitions/", "/$defs/", "/components/schemas/"];

/// Sub-maps holding nested definitions.
const NESTED_KEYS: &[&str] = &["definitions", "$defs"];

#[derive(Debug)]
struct Entry {
    /// Container name
    name: String,
    /// `$id` of the registered document this entry lives in; `None` for
    /// user-supplied container entries
    owner: Option<String>,
    /// Schema as registered, used for pointer lookups and inlining
    raw: Value,
    /// Hoisted out of another schema's `definitions` / `$defs`
    hoisted: bool,
}

/// Resolves references against one frozen set of schemas.
#[derive(Debug)]
pub struct Resolver {
    dialect: SchemaDialect,
    entries: Vec<Entry>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<String, usize>,
    /// owner `$id` → (pointer inside owner, entry) for hoisted nested definitions
    nested: HashMap<String, Vec<(String, usize)>>,
    external: Map<String, Value>,
    definitions: Map<String, Value>,
}

impl Resolver {
    /// Build a resolver for a frozen schema registry.
    ///
    /// # Arguments
    ///
    /// * `schemas` - Registered schemas keyed by `$id`, in registration order
    /// * `external` - Container entries supplied by the user (`definitions` or
    ///   `components.schemas` options); their names are fixed
    /// * `dialect` - Target namespace and keyword fixups
    /// * `naming` - Strategy naming every hoisted schema
    ///
    /// # Errors
    ///
    /// [`SpecError::UnresolvedRef`] if any schema references something unknown.
    pub fn build(
        schemas: &Map<String, Value>,
        external: &Map<String, Value>,
        dialect: SchemaDialect,
        naming: &dyn RefNaming,
    ) -> Result<Self> {
        let mut resolver = Resolver {
            dialect,
            entries: Vec::new(),
            by_name: HashMap::new(),
            by_id: HashMap::new(),
            nested: HashMap::new(),
            external: Map::new(),
            definitions: Map::new(),
        };

        for (name, schema) in external {
            resolver.push_entry(name.clone(), None, schema.clone(), false);
        }

        let mut index = 0;
        for (id, schema) in schemas {
            let name = naming.local_reference(schema, id, "", index);
            index += 1;
            let idx = resolver.push_entry(name, Some(id.clone()), schema.clone(), false);
            resolver.claim_id(id, idx);
            resolver.hoist_nested(id, "", schema, naming, &mut index);
        }

        let mut external_out = Map::new();
        let mut definitions = Map::new();
        for (idx, entry) in resolver.entries.iter().enumerate() {
            let mut visible = entry.raw.clone();
            if let Value::Object(obj) = &mut visible {
                if entry.owner.is_some() {
                    obj.shift_remove("$id");
                    for key in NESTED_KEYS {
                        obj.shift_remove(*key);
                    }
                }
            }
            resolver.rewrite_refs(&mut visible, entry.owner.as_deref())?;
            dialect.apply_fixups(&mut visible);

            match entry.owner {
                None => {
                    external_out.insert(entry.name.clone(), visible);
                }
                Some(_) => {
                    if external.contains_key(&entry.name)
                        || resolver.by_name.get(&entry.name) != Some(&idx)
                    {
                        debug!(name = %entry.name, "Container name already taken, keeping first");
                        continue;
                    }
                    definitions.insert(entry.name.clone(), visible);
                }
            }
        }
        resolver.external = external_out;
        resolver.definitions = definitions;

        debug!(
            definitions = resolver.definitions.len(),
            external = resolver.external.len(),
            "Resolved shared schemas"
        );
        Ok(resolver)
    }

    /// Registered entries take a name over hoisted ones; otherwise first wins.
    fn push_entry(
        &mut self,
        name: String,
        owner: Option<String>,
        raw: Value,
        hoisted: bool,
    ) -> usize {
        let idx = self.entries.len();
        let taken = self.by_name.get(&name).map(|&held| self.entries[held].hoisted);
        if taken.is_none() || (taken == Some(true) && !hoisted) {
            self.by_name.insert(name.clone(), idx);
        }
        self.entries.push(Entry {
            name,
            owner,
            raw,
            hoisted,
        });
        idx
    }

    fn claim_id(&mut self, id: &str, idx: usize) {
        let hoisted = self.entries[idx].hoisted;
        let taken = self.by_id.get(id).map(|&held| self.entries[held].hoisted);
        if taken.is_none() || (taken == Some(true) && !hoisted) {
            self.by_id.insert(id.to_string(), idx);
        }
    }

    fn hoist_nested(
        &mut self,
        owner: &str,
        pointer: &str,
        schema: &Value,
        naming: &dyn RefNaming,
        index: &mut usize,
    ) {
        for key in NESTED_KEYS {
            let Some(Value::Object(nested)) = schema.get(*key) else {
                continue;
            };
            for (nested_name, nested_schema) in nested {
                let nested_pointer = format!("{pointer}/{key}/{}", encode_token(nested_name));
                let name = naming.local_reference(nested_schema, owner, &nested_pointer, *index);
                *index += 1;
                let idx =
                    self.push_entry(name, Some(owner.to_string()), nested_schema.clone(), true);
                if let Some(id) = nested_schema.get("$id").and_then(Value::as_str) {
                    self.claim_id(id, idx);
                }
                self.nested
                    .entry(owner.to_string())
                    .or_default()
                    .push((nested_pointer.clone(), idx));
                self.hoist_nested(owner, &nested_pointer, nested_schema, naming, index);
            }
        }
    }

    /// Target dialect of this resolver.
    #[must_use]
    pub fn dialect(&self) -> SchemaDialect {
        self.dialect
    }

    /// Flattened registered schemas, by container name.
    #[must_use]
    pub fn definitions(&self) -> &Map<String, Value> {
        &self.definitions
    }

    /// The full schema container: user-supplied entries first, then the
    /// flattened registry without overwriting any of them.
    #[must_use]
    pub fn container(&self) -> Map<String, Value> {
        let mut container = self.external.clone();
        for (name, schema) in &self.definitions {
            if !container.contains_key(name) {
                container.insert(name.clone(), schema.clone());
            }
        }
        container
    }

    /// Resolve a route-level fragment (`body`, one response, callback parts).
    ///
    /// Every nested `$ref` is rewritten into the container and the dialect
    /// fixups are applied.
    pub fn resolve(&self, fragment: &Value) -> Result<Value> {
        let mut resolved = fragment.clone();
        self.rewrite_refs(&mut resolved, None)?;
        if let Value::Object(obj) = &mut resolved {
            obj.shift_remove("$id");
        }
        self.dialect.apply_fixups(&mut resolved);
        Ok(resolved)
    }

    /// Rewrite all `$ref`s below `value`. `ctx` is the `$id` of the document
    /// `value` belongs to, used for `#/...` pointers.
    pub(crate) fn rewrite_refs(&self, value: &mut Value, ctx: Option<&str>) -> Result<()> {
        match value {
            Value::Object(obj) => {
                if let Some(Value::String(reference)) = obj.get_mut("$ref") {
                    let rewritten = self.rewrite_ref(reference, ctx)?;
                    *reference = rewritten;
                }
                for (key, child) in obj.iter_mut() {
                    if is_data_keyword(key) {
                        continue;
                    }
                    if is_named_schema_map(key) {
                        if let Value::Object(named) = child {
                            for schema in named.values_mut() {
                                self.rewrite_refs(schema, ctx)?;
                            }
                        }
                        continue;
                    }
                    self.rewrite_refs(child, ctx)?;
                }
                Ok(())
            }
            Value::Array(items) => items
                .iter_mut()
                .try_for_each(|item| self.rewrite_refs(item, ctx)),
            _ => Ok(()),
        }
    }

    fn rewrite_ref(&self, reference: &str, ctx: Option<&str>) -> Result<String> {
        let (base, fragment) = split_reference(reference);
        if base.is_empty() && ctx.is_none() && split_container_pointer(fragment).is_none() {
            // pointer into an anonymous route fragment, nothing to relocate
            return Ok(reference.to_string());
        }
        let (idx, tail) = self.locate(reference, ctx)?;
        Ok(self
            .dialect
            .reference(&encode_token(&self.entries[idx].name), &tail))
    }

    /// The schema a reference points at, as registered, and the `$id` of the
    /// document it lives in.
    pub(crate) fn lookup(
        &self,
        reference: &str,
        ctx: Option<&str>,
    ) -> Result<(Value, Option<String>)> {
        let (idx, tail) = self.locate(reference, ctx)?;
        let entry = &self.entries[idx];
        let target = if tail.is_empty() {
            entry.raw.clone()
        } else {
            entry
                .raw
                .pointer(&tail)
                .cloned()
                .ok_or_else(|| unresolved(reference, &format!("{}#{tail}", entry.name)))?
        };
        Ok((target, entry.owner.clone()))
    }

    /// Find the entry a reference addresses and the pointer left inside it.
    fn locate(&self, reference: &str, ctx: Option<&str>) -> Result<(usize, String)> {
        let (base, fragment) = split_reference(reference);

        if base.is_empty() {
            if let Some(owner) = ctx {
                if let Some(hit) = self.nested_lookup(owner, fragment) {
                    return self.checked(reference, hit.0, hit.1);
                }
            }
            if let Some((name, tail)) = split_container_pointer(fragment) {
                let idx = self
                    .by_id
                    .get(&name)
                    .or_else(|| self.by_name.get(&name))
                    .copied()
                    .ok_or_else(|| unresolved(reference, &name))?;
                return self.checked(reference, idx, tail.to_string());
            }
            let owner = ctx.ok_or_else(|| unresolved(reference, fragment))?;
            let idx = *self
                .by_id
                .get(owner)
                .ok_or_else(|| unresolved(reference, owner))?;
            return self.checked(reference, idx, fragment.to_string());
        }

        let idx = *self
            .by_id
            .get(base)
            .ok_or_else(|| unresolved(reference, base))?;
        if let Some(hit) = self.nested_lookup(base, fragment) {
            return self.checked(reference, hit.0, hit.1);
        }
        self.checked(reference, idx, fragment.to_string())
    }

    /// Longest hoisted nested definition of `owner` that `fragment` points into.
    fn nested_lookup(&self, owner: &str, fragment: &str) -> Option<(usize, String)> {
        self.nested
            .get(owner)?
            .iter()
            .filter(|(pointer, _)| {
                fragment == pointer
                    || fragment
                        .strip_prefix(pointer.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|(pointer, _)| pointer.len())
            .map(|(pointer, idx)| (*idx, fragment[pointer.len()..].to_string()))
    }

    fn checked(&self, reference: &str, idx: usize, tail: String) -> Result<(usize, String)> {
        if !tail.is_empty() && self.entries[idx].raw.pointer(&tail).is_none() {
            return Err(unresolved(
                reference,
                &format!("{}#{tail}", self.entries[idx].name),
            ));
        }
        Ok((idx, tail))
    }
}

fn unresolved(reference: &str, target: &str) -> SpecError {
    SpecError::UnresolvedRef {
        reference: reference.to_string(),
        target: target.to_string(),
    }
}

/// Split `base#fragment`; a reference without `#` is all base.
fn split_reference(reference: &str) -> (&str, &str) {
    reference.split_once('#').unwrap_or((reference, ""))
}

/// `/definitions/Name/tail` → (`Name`, `/tail`), for any container prefix.
fn split_container_pointer(fragment: &str) -> Option<(String, &str)> {
    CONTAINER_PREFIXES.iter().find_map(|prefix| {
        let rest = fragment.strip_prefix(prefix)?;
        let (name, tail) = match rest.find('/') {
            Some(pos) => rest.split_at(pos),
            None => (rest, ""),
        };
        (!name.is_empty()).then(|| (decode_token(name), tail))
    })
}

fn encode_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn decode_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry(schemas: Vec<Value>) -> Map<String, Value> {
        schemas
            .into_iter()
            .map(|s| (s["$id"].as_str().unwrap().to_string(), s))
            .collect()
    }

    fn build(schemas: Vec<Value>, dialect: SchemaDialect) -> Result<Resolver> {
        Resolver::build(&registry(schemas), &Map::new(), dialect, &DefaultRefNaming)
    }

    #[test]
    fn test_id_references_are_rewritten() {
        let resolver = build(
            vec![
                json!({ "$id": "Address", "type": "object" }),
                json!({
                    "$id": "User",
                    "type": "object",
                    "properties": {
                        "home": { "$ref": "Address#" },
                        "city": { "$ref": "Address#/type" }
                    }
                }),
            ],
            SchemaDialect::Swagger2,
        )
        .unwrap();

        let user = &resolver.definitions()["User"];
        assert!(user.get("$id").is_none());
        assert_eq!(user["properties"]["home"]["$ref"], "#/definitions/Address");
        assert_eq!(user["properties"]["city"]["$ref"], "#/definitions/Address/type");
    }

    #[test]
    fn test_definitions_refs_move_to_components() {
        let resolver = build(
            vec![
                json!({ "$id": "Foo", "type": "string" }),
                json!({
                    "$id": "Deep",
                    "properties": {
                        "a": { "items": { "anyOf": [{ "$ref": "#/definitions/Foo" }] } }
                    }
                }),
            ],
            SchemaDialect::OpenApi3,
        )
        .unwrap();

        assert_eq!(
            resolver.definitions()["Deep"]["properties"]["a"]["items"]["anyOf"][0]["$ref"],
            "#/components/schemas/Foo"
        );
    }

    #[test]
    fn test_nested_definitions_are_hoisted() {
        let resolver = build(
            vec![json!({
                "$id": "Order",
                "type": "object",
                "definitions": { "line": { "type": "object" } },
                "properties": {
                    "lines": { "type": "array", "items": { "$ref": "#/definitions/line" } }
                }
            })],
            SchemaDialect::OpenApi3,
        )
        .unwrap();

        let defs = resolver.definitions();
        assert!(defs["Order"].get("definitions").is_none());
        assert_eq!(defs["def-1"], json!({ "type": "object" }));
        assert_eq!(
            defs["Order"]["properties"]["lines"]["items"]["$ref"],
            "#/components/schemas/def-1"
        );
    }

    #[test]
    fn test_registered_id_beats_nested_id() {
        let resolver = build(
            vec![
                json!({
                    "$id": "Team",
                    "definitions": { "member": { "$id": "User", "title": "nested" } },
                    "properties": { "lead": { "$ref": "User#" } }
                }),
                json!({ "$id": "User", "type": "object", "title": "registered" }),
            ],
            SchemaDialect::Swagger2,
        )
        .unwrap();

        let defs = resolver.definitions();
        assert_eq!(defs["User"]["title"], "registered");
        assert_eq!(defs["Team"]["properties"]["lead"]["$ref"], "#/definitions/User");
        let resolved = resolver.resolve(&json!({ "$ref": "User#/title" })).unwrap();
        assert_eq!(resolved["$ref"], "#/definitions/User/title");
    }

    #[test]
    fn test_unknown_id_is_fatal() {
        let err = build(
            vec![json!({ "$id": "A", "properties": { "b": { "$ref": "Missing#" } } })],
            SchemaDialect::Swagger2,
        )
        .unwrap_err();
        assert!(matches!(err, SpecError::UnresolvedRef { ref target, .. } if target == "Missing"));
    }

    #[test]
    fn test_dangling_pointer_is_fatal() {
        let err = build(
            vec![
                json!({ "$id": "A", "type": "object" }),
                json!({ "$id": "B", "properties": { "x": { "$ref": "A#/properties/nope" } } }),
            ],
            SchemaDialect::Swagger2,
        )
        .unwrap_err();
        assert!(matches!(err, SpecError::UnresolvedRef { .. }));
    }

    #[test]
    fn test_cyclic_references_are_rewritten_not_followed() {
        let resolver = build(
            vec![json!({
                "$id": "Node",
                "properties": { "next": { "$ref": "Node#" } }
            })],
            SchemaDialect::Swagger2,
        )
        .unwrap();
        assert_eq!(
            resolver.definitions()["Node"]["properties"]["next"]["$ref"],
            "#/definitions/Node"
        );
    }

    #[test]
    fn test_user_entries_are_never_overwritten() {
        let mut external = Map::new();
        external.insert("User".into(), json!({ "type": "string", "title": "mine" }));
        let resolver = Resolver::build(
            &registry(vec![json!({ "$id": "User", "type": "object" })]),
            &external,
            SchemaDialect::Swagger2,
            &DefaultRefNaming,
        )
        .unwrap();

        let container = resolver.container();
        assert_eq!(container.len(), 1);
        assert_eq!(container["User"]["title"], "mine");
    }

    #[test]
    fn test_custom_naming_strategy() {
        let naming = |_: &Value, base: &str, _: &str, i: usize| format!("{base}_{i}");
        let resolver = Resolver::build(
            &registry(vec![
                json!({ "$id": "A", "type": "string" }),
                json!({ "$id": "B", "properties": { "a": { "$ref": "A#" } } }),
            ]),
            &Map::new(),
            SchemaDialect::Swagger2,
            &naming,
        )
        .unwrap();
        assert!(resolver.definitions().contains_key("A_0"));
        assert_eq!(
            resolver.definitions()["B_1"]["properties"]["a"]["$ref"],
            "#/definitions/A_0"
        );
    }

    #[test]
    fn test_resolve_route_fragment() {
        let resolver = build(
            vec![json!({ "$id": "User", "type": "object" })],
            SchemaDialect::OpenApi3,
        )
        .unwrap();
        let resolved = resolver
            .resolve(&json!({
                "type": "array",
                "items": { "$ref": "User#" },
                "example": [{ "$ref": "not a reference" }]
            }))
            .unwrap();
        assert_eq!(resolved["items"]["$ref"], "#/components/schemas/User");
        assert_eq!(resolved["example"][0]["$ref"], "not a reference");
    }
}
