use thiserror::Error;
use tokio::io::Error as IoError;

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("no blob stored under this key")]
    NotFound,

    #[error(transparent)]
    IoError(#[from] IoError),
}
