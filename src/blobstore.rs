mod errors;
mod internal;
#[cfg(test)] pub mod testing;

pub use errors::BlobStoreError;
pub use internal::{load_all, BlobStore, FsBlobStore};
