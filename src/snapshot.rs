use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

use crate::data::NoteRecord;
use crate::rng::make_uuid;
use crate::username_string::UsernameString;


#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    IoError(#[from] tokio::io::Error),

    #[error("snapshot is not valid json: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// On-disk image of everything but note contents: the known users and the
/// flat metadata index keyed `"owner/id"`. Saved on a fixed interval and
/// at shutdown; there is no journal in between, so a crash loses at most
/// one interval of metadata churn. Blob contents are written by the blob
/// store independently and survive regardless.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Snapshot {
    #[serde(default)]
    pub users: Vec<UsernameString>,
    #[serde(default)]
    pub notes: HashMap<String, NoteRecord>,
}

impl Snapshot {
    /// Reads the snapshot at `path`. A missing file is a fresh install and
    /// yields an empty snapshot; anything else unreadable is an error.
    pub async fn load(path: &Path) -> Result<Snapshot, SnapshotError> {
        match fs::read(path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!(
                    "snapshot file {} does not exist, will create",
                    path.display(),
                );
                Ok(Snapshot::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Writes the snapshot through a temp file and rename, so an
    /// interrupted save leaves the previous snapshot intact.
    pub async fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let bytes = serde_json::to_vec(self)?;
        let tmp_path =
            path.with_extension(format!("tmp.{}", make_uuid(&mut rand::rng())));
        fs::write(&tmp_path, &bytes).await?;
        if let Err(e) = fs::rename(&tmp_path, path).await {
            if let Err(cleanup) = fs::remove_file(&tmp_path).await {
                log::error!(
                    "failed to clean up temp snapshot {}: {cleanup}",
                    tmp_path.display(),
                );
            }
            return Err(e.into());
        }
        Ok(())
    }
}
