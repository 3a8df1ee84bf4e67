use std::str::FromStr;

use crate::clock::testing::SteppingClock;
use crate::data::PermissionLevel;

use super::*;

fn store() -> MetadataStoreImpl<SteppingClock> {
    MetadataStoreImpl::with_clock(SteppingClock::default())
}

fn user(name: &str) -> UsernameString {
    UsernameString::from_str(name).expect("valid username")
}

#[tokio::test]
async fn get_absent_returns_default_record() {
    let store = store();
    let record = store.get(&user("alice"), "missing").await;
    assert_eq!(record, NoteRecord::default());
}

#[tokio::test]
async fn set_then_get_round_trips() {
    let store = store();
    let alice = user("alice");
    let record = NoteRecord {
        owner: "alice".to_string(),
        public: PermissionLevel::Read,
        ..NoteRecord::default()
    };
    store.set(&alice, "x", record.clone()).await;
    assert_eq!(store.get(&alice, "x").await, record);
}

#[tokio::test]
async fn bump_sets_created_exactly_once() {
    let store = store();
    let alice = user("alice");
    store.bump(&alice, "x", true).await;
    let created = store.get(&alice, "x").await.created;
    assert!(created.is_some());

    store.bump(&alice, "x", true).await;
    store.bump(&alice, "x", false).await;
    assert_eq!(store.get(&alice, "x").await.created, created);
}

#[tokio::test]
async fn read_bump_leaves_modified_alone() {
    let store = store();
    let alice = user("alice");
    store.bump(&alice, "x", true).await;
    let before = store.get(&alice, "x").await;

    store.bump(&alice, "x", false).await;
    let after = store.get(&alice, "x").await;
    assert_eq!(after.modified, before.modified);
    assert!(after.accessed > before.accessed, "accessed should advance");
}

#[tokio::test]
async fn write_bump_advances_modified_and_accessed() {
    let store = store();
    let alice = user("alice");
    store.bump(&alice, "x", true).await;
    let before = store.get(&alice, "x").await;

    store.bump(&alice, "x", true).await;
    let after = store.get(&alice, "x").await;
    assert!(after.modified > before.modified);
    assert!(after.accessed > before.accessed);
}

#[tokio::test]
async fn deletion_partitions_live_and_trash_listings() {
    let store = store();
    let alice = user("alice");
    for id in ["live", "gone"] {
        store
            .set(
                &alice,
                id,
                NoteRecord {
                    owner: "alice".to_string(),
                    ..NoteRecord::default()
                },
            )
            .await;
    }
    store.set_deleted(&alice, "gone", true).await;

    let live = store.list_live(&alice).await;
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].0.id, "live");

    let trash = store.list_trash(&alice).await;
    assert_eq!(trash.len(), 1);
    assert_eq!(trash[0].0.id, "gone");

    assert!(store.is_deleted(&alice, "gone").await);
    assert!(!store.is_deleted(&alice, "live").await);
}

#[tokio::test]
async fn listings_are_scoped_to_the_owner() {
    let store = store();
    let alice = user("alice");
    let bob = user("bob");
    store.set(&alice, "x", NoteRecord::default()).await;
    store.set(&bob, "x", NoteRecord::default()).await;

    assert_eq!(store.list_live(&alice).await.len(), 1);
    assert_eq!(store.list_live(&bob).await.len(), 1);
    assert!(store.list_trash(&alice).await.is_empty());
}

#[tokio::test]
async fn check_permission_uses_the_effective_level() {
    let store = store();
    let alice = user("alice");
    store
        .set(
            &alice,
            "x",
            NoteRecord {
                owner: "alice".to_string(),
                public: PermissionLevel::Write,
                ..NoteRecord::default()
            },
        )
        .await;

    assert!(
        store
            .check_permission(&alice, "x", "alice", PermissionLevel::Write)
            .await
    );
    // public Write caps at Read for everyone else
    assert!(
        store
            .check_permission(&alice, "x", "bob", PermissionLevel::Read)
            .await
    );
    assert!(
        !store
            .check_permission(&alice, "x", "bob", PermissionLevel::Write)
            .await
    );
}

#[tokio::test]
async fn set_public_level_changes_only_the_level() {
    let store = store();
    let alice = user("alice");
    store.bump(&alice, "x", true).await;
    let before = store.get(&alice, "x").await;

    store
        .set_public_level(&alice, "x", PermissionLevel::Read)
        .await;
    let after = store.get(&alice, "x").await;
    assert_eq!(after.public, PermissionLevel::Read);
    assert_eq!(after.created, before.created);
    assert_eq!(after.modified, before.modified);
    assert!(!after.deleted);
}

#[tokio::test]
async fn export_uses_the_owner_slash_id_key_form() {
    let store = store();
    let alice = user("alice");
    store.set(&alice, "x", NoteRecord::default()).await;

    let exported = store.export().await;
    assert_eq!(exported.len(), 1);
    assert!(exported.contains_key("alice/x"));
}

#[tokio::test]
async fn restore_round_trips_and_drops_bad_keys() {
    let store = store();
    let alice = user("alice");
    store
        .set(
            &alice,
            "x",
            NoteRecord {
                owner: "alice".to_string(),
                public: PermissionLevel::Read,
                ..NoteRecord::default()
            },
        )
        .await;

    let mut exported = store.export().await;
    exported.insert("no-separator".to_string(), NoteRecord::default());
    exported.insert("BAD OWNER/x".to_string(), NoteRecord::default());

    let restored =
        MetadataStoreImpl::restore(SteppingClock::default(), exported);
    let record = restored.get(&alice, "x").await;
    assert_eq!(record.public, PermissionLevel::Read);
    assert_eq!(restored.export().await.len(), 1);
}

#[tokio::test]
async fn ids_may_contain_separators_after_the_owner() {
    let store = store();
    let alice = user("alice");
    store.set(&alice, "a/b", NoteRecord::default()).await;

    let exported = store.export().await;
    let restored =
        MetadataStoreImpl::restore(SteppingClock::default(), exported);
    assert_eq!(restored.get(&alice, "a/b").await, NoteRecord::default());
}
