use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::{fs, io};

use crate::blobstore::BlobStoreError;
use crate::rng::make_uuid;
use crate::username_string::UsernameString;


/// Byte storage for one owner's note contents, keyed by opaque note id.
///
/// The storage worker is the only caller during normal operation, so
/// implementations do not need internal coordination between operations
/// on the same key.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Opens the blob for reading. Fails with
    /// [`BlobStoreError::NotFound`] if no blob exists under `key`.
    async fn open(
        &self,
        key: &str,
    ) -> Result<Box<dyn io::AsyncRead + Unpin + Send>, BlobStoreError>;

    /// Replaces the blob's contents in full, creating it if absent.
    async fn overwrite(&self, key: &str, content: &[u8]) -> Result<(), BlobStoreError>;

    /// Removes the blob. The command surface only ever soft-deletes, so
    /// the daemon itself never calls this.
    async fn remove(&self, key: &str) -> Result<(), BlobStoreError>;

    /// True if a blob exists under `key`.
    async fn stat(&self, key: &str) -> Result<bool, BlobStoreError>;
}

// The worker takes ownership of the store map; going through Arc lets
// other parts of the process keep a handle to the same store.
#[async_trait]
impl<B: BlobStore + ?Sized> BlobStore for std::sync::Arc<B> {
    async fn open(
        &self,
        key: &str,
    ) -> Result<Box<dyn io::AsyncRead + Unpin + Send>, BlobStoreError> {
        (**self).open(key).await
    }

    async fn overwrite(&self, key: &str, content: &[u8]) -> Result<(), BlobStoreError> {
        (**self).overwrite(key, content).await
    }

    async fn remove(&self, key: &str) -> Result<(), BlobStoreError> {
        (**self).remove(key).await
    }

    async fn stat(&self, key: &str) -> Result<bool, BlobStoreError> {
        (**self).stat(key).await
    }
}

/// One directory per owner, one file per note id.
pub struct FsBlobStore {
    dir: PathBuf,
}

impl FsBlobStore {
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self, BlobStoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(FsBlobStore { dir })
    }

    // Ids come from untrusted request paths; anything that could escape
    // the owner directory or shadow a temp file maps to NotFound.
    fn key_path(&self, key: &str) -> Result<PathBuf, BlobStoreError> {
        let safe = !key.is_empty()
            && !key.starts_with('.')
            && !key.contains(['/', '\\'])
            && !key.contains('\0');
        if safe {
            Ok(self.dir.join(key))
        } else {
            Err(BlobStoreError::NotFound)
        }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn open(
        &self,
        key: &str,
    ) -> Result<Box<dyn io::AsyncRead + Unpin + Send>, BlobStoreError> {
        let path = self.key_path(key)?;
        let file = fs::File::open(&path).await.map_err(absent_to_not_found)?;
        Ok(Box::new(file))
    }

    async fn overwrite(&self, key: &str, content: &[u8]) -> Result<(), BlobStoreError> {
        let path = self.key_path(key)?;
        // write-then-rename, so a crashed write never leaves a torn blob
        let tmp_path = self
            .dir
            .join(format!(".tmp.{}", make_uuid(&mut rand::rng())));
        fs::write(&tmp_path, content).await?;
        if let Err(e) = fs::rename(&tmp_path, &path).await {
            if let Err(cleanup) = fs::remove_file(&tmp_path).await {
                log::error!(
                    "failed to clean up temp blob {}: {cleanup}",
                    tmp_path.display(),
                );
            }
            return Err(e.into());
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), BlobStoreError> {
        let path = self.key_path(key)?;
        fs::remove_file(&path).await.map_err(absent_to_not_found)
    }

    async fn stat(&self, key: &str) -> Result<bool, BlobStoreError> {
        let path = match self.key_path(key) {
            Ok(path) => path,
            Err(_) => return Ok(false),
        };
        match fs::metadata(&path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn absent_to_not_found(e: io::Error) -> BlobStoreError {
    if e.kind() == ErrorKind::NotFound {
        BlobStoreError::NotFound
    } else {
        BlobStoreError::IoError(e)
    }
}

/// Opens one store per known user under `root`. Stores exist only for the
/// users present at startup; there is no way to add one to a running
/// worker, so a freshly signed-up user needs a restart to get storage.
pub async fn load_all(
    root: &Path,
    users: &[UsernameString],
) -> Result<HashMap<UsernameString, FsBlobStore>, BlobStoreError> {
    let mut stores = HashMap::new();
    for user in users {
        let store = FsBlobStore::new(root.join(user as &str)).await?;
        stores.insert(user.clone(), store);
    }
    Ok(stores)
}
