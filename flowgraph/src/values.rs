//! Values carried along edges: inputs, outputs and static configuration.
//!
//! Every port value is JSON. A node's inputs, outputs and configuration are all
//! objects keyed by port name; `null` is treated as "no value" when wiring.

use serde_json::{json, Map, Value};

/// Port name to value map used for inputs, outputs and configuration.
pub type Values = Map<String, Value>;

/// Output port on which a failed handler reports its error.
pub const ERROR_PORT: &str = "$error";

/// Builds the sentinel outputs a node produces when its handler fails.
///
/// Shape: `{ "$error": { "kind": "error", "error": { "message": <message> } } }`.
/// Downstream edges with `out = "$error"` receive the inner object.
pub fn error_outputs(message: impl Into<String>) -> Values {
    let mut outputs = Values::new();
    outputs.insert(
        ERROR_PORT.to_string(),
        json!({ "kind": "error", "error": { "message": message.into() } }),
    );
    outputs
}

/// Returns the error message when `outputs` is a handler-error sentinel.
pub fn error_message(outputs: &Values) -> Option<String> {
    let error = outputs.get(ERROR_PORT)?;
    let message = error
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());
    Some(message)
}

/// Copies `overlay` on top of `base`, key by key (later wins).
pub fn merge(base: &Values, overlay: &Values) -> Values {
    let mut merged = base.clone();
    for (key, value) in overlay {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Drops keys whose value is `null`.
pub fn without_nulls(values: &Values) -> Values {
    values
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
