use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::blobstore::BlobStore;
use crate::clock::{Clock, SystemClock};
use crate::data::{AuthPrincipal, NoteKey, NoteRecord, PermissionLevel};
use crate::lib_constants::CREATE_ID_ATTEMPTS;
use crate::metadata::MetadataStoreImpl;
use crate::rng::make_uuid;
use crate::username_string::UsernameString;
use crate::worker::{NoteError, NoteWorker, ReadCommand, WriteCommand};


pub type NoteService = NoteServiceImpl<SystemClock>;

/// Caller-facing surface over the storage worker and the metadata index.
///
/// Content operations are synchronous round trips through the worker's
/// queues. Listing and sharing operations touch only metadata and go to
/// the index directly under its own lock; they may observe a command's
/// metadata effects slightly before or after its blob effect, which is an
/// accepted trade for not queueing read-mostly traffic.
pub struct NoteServiceImpl<C: Clock> {
    metadata: Arc<MetadataStoreImpl<C>>,
    reads: mpsc::Sender<ReadCommand>,
    writes: mpsc::Sender<WriteCommand>,
}

impl<C: Clock + 'static> NoteServiceImpl<C> {
    /// Wires a service to a freshly spawned worker over `stores`.
    pub fn start<B: BlobStore + 'static>(
        metadata: Arc<MetadataStoreImpl<C>>,
        stores: HashMap<UsernameString, B>,
        queue_depth: usize,
    ) -> (Self, JoinHandle<()>) {
        let (reads, writes, handle) =
            NoteWorker::new(metadata.clone(), stores).spawn(queue_depth);
        (NoteServiceImpl { metadata, reads, writes }, handle)
    }

    /// Creates an empty note owned by the principal and returns its fresh
    /// id. Id collisions are retried with a new uuid a bounded number of
    /// times before giving up with [`NoteError::IdUsed`].
    pub async fn create_note(
        &self,
        principal: &AuthPrincipal,
    ) -> Result<String, NoteError> {
        let Some(owner) = principal.authenticated_username() else {
            return Err(NoteError::NoAccess);
        };

        for _ in 0..CREATE_ID_ATTEMPTS {
            let id = make_uuid(&mut rand::rng()).to_string();
            let sent = self
                .roundtrip_write(
                    owner.to_string(),
                    owner.clone(),
                    id.clone(),
                    true,
                    false,
                    String::new(),
                )
                .await;
            match sent {
                Ok(()) => {
                    let now = self.metadata.now();
                    self.metadata
                        .set(
                            owner,
                            &id,
                            NoteRecord {
                                owner: owner.to_string(),
                                public: PermissionLevel::None,
                                created: Some(now),
                                modified: Some(now),
                                accessed: Some(now),
                                deleted: false,
                            },
                        )
                        .await;
                    return Ok(id);
                }
                Err(NoteError::IdUsed) => {
                    log::warn!("note id collision: ~{owner}/{id}");
                }
                Err(e) => return Err(e),
            }
        }
        Err(NoteError::IdUsed)
    }

    pub async fn read_note(
        &self,
        principal: &AuthPrincipal,
        owner: &UsernameString,
        id: &str,
    ) -> Result<String, NoteError> {
        self.roundtrip_read(principal, owner, id, false).await
    }

    pub async fn read_trash_note(
        &self,
        principal: &AuthPrincipal,
        owner: &UsernameString,
        id: &str,
    ) -> Result<String, NoteError> {
        self.roundtrip_read(principal, owner, id, true).await
    }

    /// Replaces the note's contents in full.
    pub async fn write_note(
        &self,
        principal: &AuthPrincipal,
        owner: &UsernameString,
        id: &str,
        content: String,
    ) -> Result<(), NoteError> {
        let Some(acting) = principal.authenticated_username() else {
            return Err(NoteError::NoAccess);
        };
        self.roundtrip_write(
            acting.to_string(),
            owner.clone(),
            id.to_string(),
            false,
            false,
            content,
        )
        .await
    }

    /// Moves the note to the trash. The contents stay in the blob store;
    /// there is no way to restore or purge a trashed note yet.
    pub async fn delete_note(
        &self,
        principal: &AuthPrincipal,
        owner: &UsernameString,
        id: &str,
    ) -> Result<(), NoteError> {
        let Some(acting) = principal.authenticated_username() else {
            return Err(NoteError::NoAccess);
        };
        self.roundtrip_write(
            acting.to_string(),
            owner.clone(),
            id.to_string(),
            false,
            true,
            String::new(),
        )
        .await
    }

    /// Changes the access level offered to non-owners. Only the owner may
    /// share a note; requiring Write here is exactly that check, since the
    /// public level is capped below Write for everyone else. Anonymous
    /// callers are rejected up front: an absent note's default record has
    /// an empty owner, which would otherwise match the anonymous username.
    pub async fn set_public_level(
        &self,
        principal: &AuthPrincipal,
        owner: &UsernameString,
        id: &str,
        level: PermissionLevel,
    ) -> Result<(), NoteError> {
        let Some(acting) = principal.authenticated_username() else {
            return Err(NoteError::NoAccess);
        };
        let permitted = self
            .metadata
            .check_permission(owner, id, acting, PermissionLevel::Write)
            .await;
        if !permitted {
            return Err(NoteError::NoAccess);
        }
        self.metadata.set_public_level(owner, id, level).await;
        Ok(())
    }

    /// Owner's live notes the principal may see at all.
    pub async fn list_notes(
        &self,
        principal: &AuthPrincipal,
        owner: &UsernameString,
    ) -> Vec<(NoteKey, NoteRecord)> {
        let requester = principal.effective_username();
        self.metadata
            .list_live(owner)
            .await
            .into_iter()
            .filter(|(_, record)| {
                record.effective_level(requester) != PermissionLevel::None
            })
            .collect()
    }

    /// The principal's own trashed notes.
    pub async fn list_trash(
        &self,
        principal: &AuthPrincipal,
    ) -> Result<Vec<(NoteKey, NoteRecord)>, NoteError> {
        let Some(owner) = principal.authenticated_username() else {
            return Err(NoteError::NoAccess);
        };
        Ok(self.metadata.list_trash(owner).await)
    }

    async fn roundtrip_read(
        &self,
        principal: &AuthPrincipal,
        owner: &UsernameString,
        id: &str,
        from_trash: bool,
    ) -> Result<String, NoteError> {
        let (resp, rx) = oneshot::channel();
        self.reads
            .send(ReadCommand {
                acting_user: principal.effective_username().to_string(),
                owner: owner.clone(),
                id: id.to_string(),
                from_trash,
                resp,
            })
            .await
            .map_err(|_| worker_gone())?;
        rx.await.map_err(|_| worker_gone())?
    }

    async fn roundtrip_write(
        &self,
        acting_user: String,
        owner: UsernameString,
        id: String,
        create: bool,
        delete: bool,
        content: String,
    ) -> Result<(), NoteError> {
        let (resp, rx) = oneshot::channel();
        self.writes
            .send(WriteCommand {
                acting_user,
                owner,
                id,
                create,
                delete,
                content,
                resp,
            })
            .await
            .map_err(|_| worker_gone())?;
        rx.await.map_err(|_| worker_gone())?
    }
}

fn worker_gone() -> NoteError {
    NoteError::IoError(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "storage worker is not running",
    ))
}
