use std::collections::HashMap;
use std::str::FromStr;

use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::clock::{Clock, SystemClock};
use crate::data::{NoteKey, NoteRecord, PermissionLevel};
use crate::username_string::UsernameString;

#[cfg(test)] mod tests;

pub type MetadataStore = MetadataStoreImpl<SystemClock>;

/// Keyed index of note metadata, shared between the storage worker and the
/// listing read path. One readers/writer lock guards the whole map: every
/// per-key operation is atomic under a single lock acquisition, and listings
/// scan the full index under the read lock. The full scan is fine at the
/// note counts this is built for; it is the first thing to revisit if an
/// index ever grows large.
pub struct MetadataStoreImpl<C: Clock> {
    clock: C,
    notes: RwLock<HashMap<NoteKey, NoteRecord>>,
}

impl MetadataStore {
    pub fn new() -> MetadataStore {
        Self::with_clock(SystemClock)
    }
}

impl Default for MetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MetadataStoreImpl<C> {
    pub fn with_clock(clock: C) -> Self {
        MetadataStoreImpl {
            clock,
            notes: RwLock::new(HashMap::new()),
        }
    }

    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    /// Returns the record for `(owner, id)`, or a default record if there
    /// is none. An absent note is indistinguishable from an all-default
    /// record here; callers that care about existence check the blob store.
    pub async fn get(&self, owner: &UsernameString, id: &str) -> NoteRecord {
        self.notes
            .read()
            .await
            .get(&NoteKey::new(owner.clone(), id))
            .cloned()
            .unwrap_or_default()
    }

    /// Replaces the record for `(owner, id)` wholesale.
    pub async fn set(&self, owner: &UsernameString, id: &str, record: NoteRecord) {
        self.notes
            .write()
            .await
            .insert(NoteKey::new(owner.clone(), id), record);
    }

    /// Touches the note's timers: `created` is set lazily the first time
    /// the record is ever bumped and never overwritten afterwards,
    /// `modified` moves only for write accesses, `accessed` moves always.
    pub async fn bump(&self, owner: &UsernameString, id: &str, write: bool) {
        let now = self.clock.now();
        let mut notes = self.notes.write().await;
        let record = notes.entry(NoteKey::new(owner.clone(), id)).or_default();
        if record.created.is_none() {
            record.created = Some(now);
        }
        if write {
            record.modified = Some(now);
        }
        record.accessed = Some(now);
    }

    pub async fn set_public_level(
        &self,
        owner: &UsernameString,
        id: &str,
        level: PermissionLevel,
    ) {
        let mut notes = self.notes.write().await;
        notes
            .entry(NoteKey::new(owner.clone(), id))
            .or_default()
            .public = level;
    }

    pub async fn set_deleted(&self, owner: &UsernameString, id: &str, deleted: bool) {
        let mut notes = self.notes.write().await;
        notes
            .entry(NoteKey::new(owner.clone(), id))
            .or_default()
            .deleted = deleted;
    }

    pub async fn is_deleted(&self, owner: &UsernameString, id: &str) -> bool {
        self.notes
            .read()
            .await
            .get(&NoteKey::new(owner.clone(), id))
            .is_some_and(|record| record.deleted)
    }

    /// True if `accessor`'s effective level on the note reaches `required`.
    pub async fn check_permission(
        &self,
        owner: &UsernameString,
        id: &str,
        accessor: &str,
        required: PermissionLevel,
    ) -> bool {
        self.get(owner, id).await.effective_level(accessor) >= required
    }

    /// Owner's notes that are not in the trash. No defined order.
    pub async fn list_live(&self, owner: &UsernameString) -> Vec<(NoteKey, NoteRecord)> {
        self.list(owner, false).await
    }

    /// Owner's trashed notes, the exact complement of [`Self::list_live`].
    pub async fn list_trash(&self, owner: &UsernameString) -> Vec<(NoteKey, NoteRecord)> {
        self.list(owner, true).await
    }

    async fn list(&self, owner: &UsernameString, deleted: bool) -> Vec<(NoteKey, NoteRecord)> {
        self.notes
            .read()
            .await
            .iter()
            .filter(|(key, record)| {
                key.owner == *owner && record.deleted == deleted
            })
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect()
    }

    /// Flattens the index into the persisted `"owner/id"` key form.
    pub async fn export(&self) -> HashMap<String, NoteRecord> {
        self.notes
            .read()
            .await
            .iter()
            .map(|(key, record)| {
                (format!("{}/{}", key.owner, key.id), record.clone())
            })
            .collect()
    }

    /// Rebuilds an index from a persisted snapshot. Entries whose key does
    /// not parse as `"owner/id"` are dropped with a warning instead of
    /// failing the whole load.
    pub fn restore(clock: C, entries: HashMap<String, NoteRecord>) -> Self {
        let notes = entries
            .into_iter()
            .filter_map(|(key, record)| {
                let parsed = key
                    .split_once('/')
                    .and_then(|(owner, id)| {
                        UsernameString::from_str(owner)
                            .ok()
                            .map(|owner| NoteKey::new(owner, id))
                    });
                if parsed.is_none() {
                    log::warn!("dropping note metadata with bad key {key:?}");
                }
                parsed.map(|key| (key, record))
            })
            .collect();
        MetadataStoreImpl {
            clock,
            notes: RwLock::new(notes),
        }
    }
}
