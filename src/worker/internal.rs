use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::blobstore::BlobStore;
use crate::clock::Clock;
use crate::data::PermissionLevel;
use crate::metadata::MetadataStoreImpl;
use crate::username_string::UsernameString;
use crate::worker::NoteError;


/// Request to read one note's contents. `from_trash` selects which side of
/// the soft-delete partition the note must be on: a live note is invisible
/// through the trash path and vice versa.
pub struct ReadCommand {
    pub acting_user: String,
    pub owner: UsernameString,
    pub id: String,
    pub from_trash: bool,
    pub resp: oneshot::Sender<Result<String, NoteError>>,
}

/// Request to create, overwrite or soft-delete one note. With `create`
/// set the id must be unused; with `delete` set the content is ignored
/// and the note is moved to the trash without touching its blob.
pub struct WriteCommand {
    pub acting_user: String,
    pub owner: UsernameString,
    pub id: String,
    pub create: bool,
    pub delete: bool,
    pub content: String,
    pub resp: oneshot::Sender<Result<(), NoteError>>,
}

/// The single sequential executor for all note commands.
///
/// The worker owns the per-owner blob stores outright, so exactly one
/// storage operation is ever in flight: whoever wants at the blobs has to
/// go through the queues, and the loop below finishes one command before
/// taking the next. The metadata store stays shared because its own lock
/// already makes per-key mutation atomic; listings read it directly
/// without queueing here.
pub struct NoteWorker<C: Clock, B: BlobStore> {
    metadata: Arc<MetadataStoreImpl<C>>,
    stores: HashMap<UsernameString, B>,
}

impl<C, B> NoteWorker<C, B>
where
    C: Clock + 'static,
    B: BlobStore + 'static,
{
    pub fn new(
        metadata: Arc<MetadataStoreImpl<C>>,
        stores: HashMap<UsernameString, B>,
    ) -> Self {
        NoteWorker { metadata, stores }
    }

    /// Spawns the worker loop and hands back the command queues. The loop
    /// stops once both senders are dropped and all queued commands have
    /// been answered.
    pub fn spawn(
        self,
        queue_depth: usize,
    ) -> (
        mpsc::Sender<ReadCommand>,
        mpsc::Sender<WriteCommand>,
        JoinHandle<()>,
    ) {
        let (read_tx, read_rx) = mpsc::channel(queue_depth);
        let (write_tx, write_rx) = mpsc::channel(queue_depth);
        let handle = tokio::spawn(self.run(read_rx, write_rx));
        (read_tx, write_tx, handle)
    }

    /// Drains both queues one command at a time, with no priority between
    /// them when both are ready. A failed command answers its requester
    /// and the loop moves on; nothing a command can do stops the worker.
    async fn run(
        self,
        mut reads: mpsc::Receiver<ReadCommand>,
        mut writes: mpsc::Receiver<WriteCommand>,
    ) {
        loop {
            tokio::select! {
                Some(cmd) = reads.recv() => {
                    let result = self.execute_read(&cmd).await;
                    if let Err(e) = &result {
                        log::debug!(
                            "read of {}/{} by {:?} failed: {e}",
                            cmd.owner, cmd.id, cmd.acting_user,
                        );
                    }
                    if cmd.resp.send(result).is_err() {
                        log::warn!("read requester went away before the reply");
                    }
                }
                Some(cmd) = writes.recv() => {
                    let result = self.execute_write(&cmd).await;
                    if let Err(e) = &result {
                        log::debug!(
                            "write to {}/{} by {:?} failed: {e}",
                            cmd.owner, cmd.id, cmd.acting_user,
                        );
                    }
                    if cmd.resp.send(result).is_err() {
                        log::warn!("write requester went away before the reply");
                    }
                }
                else => break,
            }
        }
        log::debug!("storage worker stopped");
    }

    async fn execute_read(&self, cmd: &ReadCommand) -> Result<String, NoteError> {
        let permitted = self
            .metadata
            .check_permission(
                &cmd.owner,
                &cmd.id,
                &cmd.acting_user,
                PermissionLevel::Read,
            )
            .await
            && self.metadata.is_deleted(&cmd.owner, &cmd.id).await == cmd.from_trash;
        if !permitted {
            return Err(NoteError::NoAccess);
        }

        if cmd.acting_user == &*cmd.owner {
            self.metadata.bump(&cmd.owner, &cmd.id, false).await;
        }

        let store = self.store_for(&cmd.owner)?;
        let mut reader = store.open(&cmd.id).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(decode_utf8_lossy(buf))
    }

    async fn execute_write(&self, cmd: &WriteCommand) -> Result<(), NoteError> {
        if cmd.create {
            // collision probe happens before any mutation, so a used id
            // leaves both metadata and blob exactly as they were
            let store = self.store_for(&cmd.acting_user)?;
            if store.stat(&cmd.id).await? {
                return Err(NoteError::IdUsed);
            }
        } else if !self
            .metadata
            .check_permission(
                &cmd.owner,
                &cmd.id,
                &cmd.acting_user,
                PermissionLevel::Write,
            )
            .await
        {
            return Err(NoteError::NoAccess);
        }

        self.metadata.bump(&cmd.owner, &cmd.id, true).await;

        if cmd.delete {
            // soft delete: the blob keeps its last contents
            self.metadata.set_deleted(&cmd.owner, &cmd.id, true).await;
            return Ok(());
        }

        let store = self.store_for(&cmd.owner)?;
        store.overwrite(&cmd.id, cmd.content.as_bytes()).await?;
        Ok(())
    }

    fn store_for(&self, owner: &str) -> Result<&B, NoteError> {
        self.stores.get(owner).ok_or_else(|| {
            log::warn!("no blob store provisioned for user {owner:?}");
            NoteError::NotFound
        })
    }
}

// note contents are not required to be valid utf-8 on disk
fn decode_utf8_lossy(buf: Vec<u8>) -> String {
    match String::from_utf8_lossy(&buf) {
        Cow::Borrowed(_) => unsafe { String::from_utf8_unchecked(buf) },
        owned @ Cow::Owned(_) => owned.into_owned(),
    }
}
