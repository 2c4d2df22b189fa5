//! Resumption token and blob store errors.

use thiserror::Error;

/// Error from a blob store.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blob serialization error: {0}")]
    Serialization(String),

    /// A handle that this store could not have issued.
    #[error("invalid blob handle: {0}")]
    InvalidHandle(String),
}

/// Error encoding or decoding a resumption token. Always fatal.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("resumption token version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("not a resumption token: schema {0:?}")]
    SchemaMismatch(Option<String>),

    #[error("corrupt resumption token: {0}")]
    Corrupt(String),

    #[error("blob {0} referenced by the token is missing")]
    MissingBlob(String),

    #[error(transparent)]
    Blob(#[from] BlobError),

    /// The run is in a phase that cannot be captured (handler in flight, finished).
    #[error("run cannot be saved now: {0}")]
    NotResumable(String),
}
