//! Resumption token encoding.
//!
//! A token is a JSON object tagged with [`TOKEN_SCHEMA`] and [`TOKEN_VERSION`].
//! It carries the run's traversal (committed outputs and both opportunity
//! queues), the stage the run stopped in, and the counters needed to continue
//! with the same invocation paths. Decoding checks the schema and version
//! before anything else and never attempts a partial restore.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::path::InvocationPath;
use crate::resume::blob::BlobStore;
use crate::resume::error::CodecError;
use crate::traversal::Traversal;
use crate::values::Values;

pub const TOKEN_SCHEMA: &str = "flowgraph/resume";
pub const TOKEN_VERSION: u32 = 1;

/// Key of the placeholder object that replaces an externalized value.
pub const BLOB_KEY: &str = "$blob";

/// Where the run stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stage {
    /// Between steps.
    Ready,
    /// Suspended on an input node, holding the node's wired inputs.
    InputWait {
        node: String,
        inputs: Values,
        path: InvocationPath,
    },
}

/// Location of an externalized value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlobLocation {
    /// An output port of a committed node.
    Output { node: String, port: String },
    /// An input of the node the run is waiting on.
    PendingInput { port: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobRef {
    pub location: BlobLocation,
    pub handle: String,
}

/// Decoded contents of a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeToken {
    pub schema: String,
    pub version: u32,
    pub stage: Stage,
    /// Whether `graphstart` has been reported.
    pub started: bool,
    /// Last invocation index handed out.
    pub invocation_id: usize,
    pub steps: usize,
    pub traversal: Traversal,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub externalized: Vec<BlobRef>,
}

impl ResumeToken {
    pub fn new(stage: Stage, started: bool, invocation_id: usize, steps: usize, traversal: Traversal) -> Self {
        Self {
            schema: TOKEN_SCHEMA.to_string(),
            version: TOKEN_VERSION,
            stage,
            started,
            invocation_id,
            steps,
            traversal,
            externalized: Vec::new(),
        }
    }

    /// Encodes the token. Values whose JSON form is longer than `threshold`
    /// bytes are moved to `blobs` and replaced with `{"$blob": handle}`.
    pub async fn encode(mut self, blobs: &dyn BlobStore, threshold: Option<usize>) -> Result<Vec<u8>, CodecError> {
        if let Some(threshold) = threshold {
            self.externalize(blobs, threshold).await?;
        }
        serde_json::to_vec(&self).map_err(|e| CodecError::Corrupt(e.to_string()))
    }

    /// Decodes a token and re-inflates externalized values from `blobs`.
    pub async fn decode(bytes: &[u8], blobs: &dyn BlobStore) -> Result<Self, CodecError> {
        let raw: Value = serde_json::from_slice(bytes).map_err(|e| CodecError::Corrupt(e.to_string()))?;
        let schema = raw.get("schema").and_then(Value::as_str);
        if schema != Some(TOKEN_SCHEMA) {
            return Err(CodecError::SchemaMismatch(schema.map(str::to_string)));
        }
        let found = raw
            .get("version")
            .and_then(Value::as_u64)
            .ok_or_else(|| CodecError::Corrupt("missing version".to_string()))?;
        if found != u64::from(TOKEN_VERSION) {
            return Err(CodecError::VersionMismatch {
                expected: TOKEN_VERSION,
                found: u32::try_from(found).unwrap_or(u32::MAX),
            });
        }
        let mut token: ResumeToken =
            serde_json::from_value(raw).map_err(|e| CodecError::Corrupt(e.to_string()))?;
        token.inflate(blobs).await?;
        Ok(token)
    }

    async fn externalize(&mut self, blobs: &dyn BlobStore, threshold: usize) -> Result<(), CodecError> {
        let mut refs = Vec::new();
        for (node, outputs) in self.traversal.state_mut().outputs_mut() {
            for (port, value) in outputs.iter_mut() {
                if let Some(handle) = stash(value, blobs, threshold).await? {
                    refs.push(BlobRef {
                        location: BlobLocation::Output {
                            node: node.clone(),
                            port: port.clone(),
                        },
                        handle,
                    });
                }
            }
        }
        if let Stage::InputWait { inputs, .. } = &mut self.stage {
            for (port, value) in inputs.iter_mut() {
                if let Some(handle) = stash(value, blobs, threshold).await? {
                    refs.push(BlobRef {
                        location: BlobLocation::PendingInput { port: port.clone() },
                        handle,
                    });
                }
            }
        }
        self.externalized = refs;
        Ok(())
    }

    async fn inflate(&mut self, blobs: &dyn BlobStore) -> Result<(), CodecError> {
        for blob in std::mem::take(&mut self.externalized) {
            let slot = match &blob.location {
                BlobLocation::Output { node, port } => self
                    .traversal
                    .state_mut()
                    .output_mut(node)
                    .and_then(|outputs| outputs.get_mut(port)),
                BlobLocation::PendingInput { port } => match &mut self.stage {
                    Stage::InputWait { inputs, .. } => inputs.get_mut(port),
                    Stage::Ready => None,
                },
            };
            let slot = slot.ok_or_else(|| {
                CodecError::Corrupt(format!("blob {} points at a missing value", blob.handle))
            })?;
            if slot.get(BLOB_KEY).and_then(Value::as_str) != Some(blob.handle.as_str()) {
                return Err(CodecError::Corrupt(format!(
                    "blob {} placeholder does not match",
                    blob.handle
                )));
            }
            *slot = blobs
                .get(&blob.handle)
                .await?
                .ok_or_else(|| CodecError::MissingBlob(blob.handle.clone()))?;
        }
        Ok(())
    }
}

/// Moves `value` to `blobs` when it is larger than `threshold`.
async fn stash(value: &mut Value, blobs: &dyn BlobStore, threshold: usize) -> Result<Option<String>, CodecError> {
    let size = serde_json::to_vec(value)
        .map_err(|e| CodecError::Corrupt(e.to_string()))?
        .len();
    if size <= threshold {
        return Ok(None);
    }
    let handle = blobs.put(value).await?;
    *value = json!({ BLOB_KEY: handle.clone() });
    Ok(Some(handle))
}
