use std::sync::Arc;

use common::storage::Tier;
use vault::VaultError;
use vault::catalog::{BlobCatalog, MemoryCatalog};
use vault::models::NewBlob;
use vault::naming::{self, NameUpdate};

use crate::harness::{FlakyCatalog, Harness, at, png};

fn new_blob(names: &[&str]) -> NewBlob {
    NewBlob::new("u", "Middle Earth", "image/png").with_names(names.iter().copied())
}

#[tokio::test]
async fn attach_stores_under_descriptive_name() {
    let h = Harness::memory().await;
    let blob = h
        .state
        .service()
        .attach(new_blob(&["Ring"]), png(24))
        .await
        .unwrap();

    let expected = format!("middle_earth__ring__{}.png", blob.key);
    assert_eq!(blob.descriptive_name.as_deref(), Some(expected.as_str()));
    assert!(h.local_file(&blob).exists());
    assert!(h.local_file(&blob).ends_with(&expected));
}

#[tokio::test]
async fn retag_moves_local_file() {
    let h = Harness::memory().await;
    let service = h.state.service();
    let blob = service.attach(new_blob(&["Ring"]), png(24)).await.unwrap();
    let old_path = h.local_file(&blob);
    assert!(old_path.exists());

    let (updated, outcome) = service
        .retag(blob.id, vec!["Sword".into(), "Ring".into()])
        .await
        .unwrap();

    let new_name = format!("middle_earth__ring__sword__{}.png", blob.key);
    assert_eq!(
        outcome,
        NameUpdate::Renamed {
            from: blob.descriptive_name.clone().unwrap(),
            to: new_name.clone(),
        }
    );
    assert!(!old_path.exists());
    assert!(h.local_file(&updated).exists());

    let stored = h.catalog.get(blob.id).await.unwrap().unwrap();
    assert_eq!(stored.descriptive_name.as_deref(), Some(new_name.as_str()));
    assert_eq!(stored.associated_names, vec!["Sword".to_string(), "Ring".to_string()]);

    // Reads follow the new name.
    assert_eq!(service.fetch(blob.id).await.unwrap(), png(24));
}

#[tokio::test]
async fn retag_without_local_file_only_records() {
    let h = Harness::memory().await;
    let service = h.state.service();
    let blob = service.attach(new_blob(&[]), png(24)).await.unwrap();
    std::fs::remove_file(h.local_file(&blob)).unwrap();

    let (updated, outcome) = service.retag(blob.id, vec!["Elf".into()]).await.unwrap();
    assert!(matches!(outcome, NameUpdate::Recorded { .. }));
    assert!(!h.local_file(&updated).exists());
    assert!(
        updated
            .descriptive_name
            .as_deref()
            .unwrap()
            .starts_with("middle_earth__elf__")
    );
}

#[tokio::test]
async fn unchanged_names_do_no_io() {
    let h = Harness::memory().await;
    let service = h.state.service();
    let blob = service.attach(new_blob(&["Ring"]), png(24)).await.unwrap();

    let (_, outcome) = service.retag(blob.id, vec!["Ring".into()]).await.unwrap();
    assert!(matches!(outcome, NameUpdate::Unchanged { .. }));
    assert!(h.local_file(&blob).exists());
}

#[tokio::test]
async fn rename_failure_is_not_fatal() {
    let h = Harness::memory().await;
    let service = h.state.service();
    let blob = service.attach(new_blob(&["Ring"]), png(24)).await.unwrap();
    let old_path = h.local_file(&blob);

    // Occupy the target shard directory with a regular file.
    let target = naming::generate("Middle Earth", &["Orc".to_string()], &blob.key, Some("png"));
    let shard = service.naming().local_path_for(&target);
    let shard_dir = shard.parent().unwrap();
    std::fs::create_dir_all(shard_dir.parent().unwrap()).unwrap();
    std::fs::write(shard_dir, b"blocker").unwrap();

    let (updated, outcome) = service.retag(blob.id, vec!["Orc".into()]).await.unwrap();
    assert!(matches!(outcome, NameUpdate::RenameFailed { .. }));
    assert_eq!(updated.descriptive_name.as_deref(), Some(target.as_str()));
    assert!(old_path.exists(), "stale file stays in place");

    let stored = h.catalog.get(blob.id).await.unwrap().unwrap();
    assert_eq!(stored.descriptive_name.as_deref(), Some(target.as_str()));
}

#[tokio::test]
async fn rejected_name_update_leaves_file_where_record_points() {
    let catalog = Arc::new(FlakyCatalog::new(Arc::new(MemoryCatalog::new())));
    let h = Harness::with_catalog(tempfile::tempdir().unwrap(), catalog.clone()).await;
    let service = h.state.service();
    let blob = service.attach(new_blob(&["Ring"]), png(24)).await.unwrap();
    let old_path = h.local_file(&blob);

    catalog.reject_name_updates(true);
    let err = service.retag(blob.id, vec!["Orc".into()]).await.unwrap_err();
    assert!(matches!(err, VaultError::Catalog(_)), "{err}");

    let stored = h.catalog.get(blob.id).await.unwrap().unwrap();
    assert_eq!(stored.descriptive_name, blob.descriptive_name);
    assert!(old_path.exists());
    let local = h.state.store.local();
    assert!(local.exists(&blob.key).await.unwrap());
    assert_eq!(local.get(&blob.key).await.unwrap(), png(24));

    catalog.reject_name_updates(false);
    let (updated, outcome) = service.retag(blob.id, vec!["Orc".into()]).await.unwrap();
    assert!(matches!(outcome, NameUpdate::Renamed { .. }));
    assert!(!old_path.exists());
    assert!(h.local_file(&updated).exists());
}

#[tokio::test]
async fn unnamed_blob_is_renamed_from_its_key() {
    let h = Harness::memory().await;
    let mut blob = h.seed("u", "c1", &png(12), at(0)).await;
    // Forget the cached name and put the file under the key.
    let named_path = h.local_file(&blob);
    h.catalog
        .update_names(blob.id, &blob.associated_names, None)
        .await
        .unwrap();
    blob.descriptive_name = None;
    let key_path = h.local_file(&blob);
    std::fs::create_dir_all(key_path.parent().unwrap()).unwrap();
    std::fs::rename(&named_path, &key_path).unwrap();

    let change = h.state.service().refresh_name(blob.id).await.unwrap();
    match change.update {
        NameUpdate::Renamed { from, to } => {
            assert_eq!(from, blob.key);
            assert_eq!(to, format!("scope_u__untagged__{}.png", blob.key));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(!key_path.exists());
}

#[tokio::test]
async fn refresh_all_reports_only_changes() {
    let h = Harness::memory().await;
    let service = h.state.service();
    let a = service.attach(new_blob(&["Ring"]), png(24)).await.unwrap();
    let b = service.attach(new_blob(&["Sword"]), png(30)).await.unwrap();
    h.catalog
        .update_names(b.id, &b.associated_names, Some("stale_name.png"))
        .await
        .unwrap();

    let changes = service.refresh_all_names(1).await.unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].id, b.id);
    assert!(matches!(changes[0].update, NameUpdate::Recorded { .. }));
    assert!(h.local_file(&a).exists());
}
