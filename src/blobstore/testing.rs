use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io;

use crate::blobstore::{BlobStore, BlobStoreError};

/// In-memory [`BlobStore`] for tests. Supports seeding contents and
/// injecting a one-shot io failure for the next operation.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    fail_next: Mutex<Option<io::ErrorKind>>,
    stat_calls: AtomicUsize,
    all_keys_taken: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(entries: &[(&str, &str)]) -> Self {
        let store = Self::new();
        {
            let mut blobs = store.blobs.lock().unwrap();
            for (key, content) in entries {
                blobs.insert(key.to_string(), content.as_bytes().to_vec());
            }
        }
        store
    }

    /// Contents currently stored under `key`, if any.
    pub fn contents(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.lock().unwrap().get(key).cloned()
    }

    /// Makes the next store operation fail with an io error of `kind`.
    pub fn fail_next(&self, kind: io::ErrorKind) {
        *self.fail_next.lock().unwrap() = Some(kind);
    }

    pub fn stat_calls(&self) -> usize {
        self.stat_calls.load(Ordering::Relaxed)
    }

    /// Makes `stat` report every key as existing, for exercising id
    /// collision handling.
    pub fn mark_all_keys_taken(&self) {
        self.all_keys_taken.store(true, Ordering::Relaxed);
    }

    fn take_failure(&self) -> Result<(), BlobStoreError> {
        match self.fail_next.lock().unwrap().take() {
            Some(kind) => Err(io::Error::from(kind).into()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn open(
        &self,
        key: &str,
    ) -> Result<Box<dyn io::AsyncRead + Unpin + Send>, BlobStoreError> {
        self.take_failure()?;
        let contents = self
            .blobs
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or(BlobStoreError::NotFound)?;
        Ok(Box::new(Cursor::new(contents)))
    }

    async fn overwrite(&self, key: &str, content: &[u8]) -> Result<(), BlobStoreError> {
        self.take_failure()?;
        self.blobs
            .lock()
            .unwrap()
            .insert(key.to_string(), content.to_vec());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), BlobStoreError> {
        self.take_failure()?;
        self.blobs
            .lock()
            .unwrap()
            .remove(key)
            .map(|_| ())
            .ok_or(BlobStoreError::NotFound)
    }

    async fn stat(&self, key: &str) -> Result<bool, BlobStoreError> {
        self.stat_calls.fetch_add(1, Ordering::Relaxed);
        self.take_failure()?;
        if self.all_keys_taken.load(Ordering::Relaxed) {
            return Ok(true);
        }
        Ok(self.blobs.lock().unwrap().contains_key(key))
    }
}
