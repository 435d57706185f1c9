use serde_json::Value;

/// Chooses the container name for each schema hoisted into
/// `definitions` / `components.schemas`.
///
/// `base_uri` is the `$id` of the registered schema the entry comes from and
/// `fragment` is the JSON pointer inside it (`""` for the schema itself,
/// `/definitions/Address` for a nested definition). `index` counts every
/// hoisted schema in discovery order.
pub trait RefNaming: Send + Sync {
    fn local_reference(&self, schema: &Value, base_uri: &str, fragment: &str, index: usize)
        -> String;
}

/// Uses the schema's own `$id`, or `def-{index}` when it has none.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRefNaming;

impl RefNaming for DefaultRefNaming {
    fn local_reference(
        &self,
        schema: &Value,
        _base_uri: &str,
        _fragment: &str,
        index: usize,
    ) -> String {
        schema
            .get("$id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("def-{index}"))
    }
}

impl<F> RefNaming for F
where
    F: Fn(&Value, &str, &str, usize) -> String + Send + Sync,
{
    fn local_reference(
        &self,
        schema: &Value,
        base_uri: &str,
        fragment: &str,
        index: usize,
    ) -> String {
        self(schema, base_uri, fragment, index)
    }
}
