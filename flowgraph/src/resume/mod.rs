//! Pause/resume: versioned resumption tokens and blob stores.
//!
//! `RunController::save` produces a token at an input suspension (or between
//! steps); `RunController::resume` restores a controller from it. Large values
//! can be moved to a [`BlobStore`] while saving.

mod blob;
mod error;
mod token;

pub use blob::{BlobStore, FsBlobStore, InMemoryBlobStore};
pub use error::{BlobError, CodecError};
pub use token::{BlobLocation, BlobRef, ResumeToken, Stage, BLOB_KEY, TOKEN_SCHEMA, TOKEN_VERSION};
