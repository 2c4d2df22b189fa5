//! What `run_until_stop` hands back to the caller.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MissingInputs, RunError};
use crate::path::InvocationPath;
use crate::values::Values;

/// The run needs a value from outside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRequest {
    /// The input node (or, for a bubbled request, the inner node) asking.
    pub node: String,
    /// Inputs wired to the node so far.
    pub inputs: Values,
    /// JSON schema from the node's `schema` configuration, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    pub path: InvocationPath,
    /// Raised by a handler mid-invocation rather than by an input node.
    #[serde(default)]
    pub bubbled: bool,
}

impl InputRequest {
    /// Keys listed in the schema's `required` array.
    pub fn required_keys(&self) -> Vec<String> {
        self.schema
            .as_ref()
            .and_then(|s| s.get("required"))
            .and_then(Value::as_array)
            .map(|keys| {
                keys.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A set of outputs delivered to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputResult {
    pub node: String,
    pub outputs: Values,
    pub path: InvocationPath,
    /// Streamed by a handler through its output provider.
    #[serde(default)]
    pub bubbled: bool,
}

/// Final report of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub steps: usize,
    /// Nodes whose last visit was a skip.
    pub incomplete: Vec<MissingInputs>,
}

impl RunSummary {
    pub fn is_complete(&self) -> bool {
        self.incomplete.is_empty()
    }

    /// Turns an incomplete run into `RunError::Incomplete`.
    pub fn ensure_complete(self) -> Result<Self, RunError> {
        if self.incomplete.is_empty() {
            Ok(self)
        } else {
            Err(RunError::Incomplete(self.incomplete))
        }
    }
}

/// Why `run_until_stop` returned.
#[derive(Debug, Clone, PartialEq)]
pub enum RunStop {
    /// Suspended; call `provide_input` then `run_until_stop` again.
    Input(InputRequest),
    /// Outputs for the caller; the run can continue.
    Output(OutputResult),
    /// No work left.
    Done(RunSummary),
}
