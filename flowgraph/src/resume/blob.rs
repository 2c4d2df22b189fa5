//! Blob stores for values externalized from resumption tokens.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use uuid::Uuid;

use crate::resume::error::BlobError;

/// Storage for large values referenced from a token by handle.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `value` and returns its handle.
    async fn put(&self, value: &Value) -> Result<String, BlobError>;

    /// Loads the value for `handle`; `None` if unknown.
    async fn get(&self, handle: &str) -> Result<Option<Value>, BlobError>;
}

/// In-memory blob store. Contents are lost when the store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    data: DashMap<String, Value>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, value: &Value) -> Result<String, BlobError> {
        let handle = Uuid::new_v4().to_string();
        self.data.insert(handle.clone(), value.clone());
        Ok(handle)
    }

    async fn get(&self, handle: &str) -> Result<Option<Value>, BlobError> {
        Ok(self.data.get(handle).map(|v| v.value().clone()))
    }
}

/// Directory-backed blob store: one `<handle>.json` file per value.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    dir: PathBuf,
}

impl FsBlobStore {
    /// Uses `dir`, which is created on first `put` if missing.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, handle: &str) -> Result<PathBuf, BlobError> {
        let id = Uuid::parse_str(handle).map_err(|_| BlobError::InvalidHandle(handle.to_string()))?;
        Ok(self.dir.join(format!("{}.json", id)))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, value: &Value) -> Result<String, BlobError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let handle = Uuid::new_v4().to_string();
        let bytes = serde_json::to_vec(value).map_err(|e| BlobError::Serialization(e.to_string()))?;
        tokio::fs::write(self.file_for(&handle)?, bytes).await?;
        Ok(handle)
    }

    async fn get(&self, handle: &str) -> Result<Option<Value>, BlobError> {
        let path = self.file_for(handle)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| BlobError::Serialization(e.to_string()))
    }
}
