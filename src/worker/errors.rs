use thiserror::Error;
use tokio::io::Error as IoError;

use crate::blobstore::BlobStoreError;

/// Outcome taxonomy of a note command. Every command resolves with exactly
/// one success value or one of these; none of them is fatal to the worker.
#[derive(Debug, Error)]
pub enum NoteError {
    #[error("note not found")]
    NotFound,

    #[error("user does not have the required permission")]
    NoAccess,

    #[error("note with this id exists")]
    IdUsed,

    #[error(transparent)]
    IoError(#[from] IoError),
}

impl From<BlobStoreError> for NoteError {
    fn from(e: BlobStoreError) -> Self {
        match e {
            BlobStoreError::NotFound => NoteError::NotFound,
            BlobStoreError::IoError(e) => NoteError::IoError(e),
        }
    }
}
