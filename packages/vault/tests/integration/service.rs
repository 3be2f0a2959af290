use bytes::Bytes;
use common::storage::{ContentHash, Disposition, UrlOptions};
use uuid::Uuid;
use vault::VaultError;
use vault::catalog::BlobCatalog;
use vault::models::NewBlob;

use crate::harness::{FlakyTier, Harness, png};

fn new_blob() -> NewBlob {
    NewBlob::new("u", "Universe", "image/png").with_names(["Dragon"])
}

mod attach {
    use super::*;

    #[tokio::test]
    async fn records_checksum_and_writes_both_tiers() {
        let h = Harness::memory().await;
        let content = png(40);
        let blob = h
            .state
            .service()
            .attach(new_blob(), content.clone())
            .await
            .unwrap();

        assert_eq!(blob.checksum, ContentHash::compute(&content).to_hex());
        assert_eq!(blob.byte_size, 40);
        assert_eq!(blob.key.len(), 32);
        assert_eq!(h.catalog.find_by_key(&blob.key).await.unwrap(), Some(blob.clone()));
        assert!(h.local_file(&blob).exists());
        assert!(h.remote_file(&blob).exists());
    }

    #[tokio::test]
    async fn keys_are_unique_for_identical_content() {
        let h = Harness::memory().await;
        let service = h.state.service();
        let a = service.attach(new_blob(), png(40)).await.unwrap();
        let b = service.attach(new_blob(), png(40)).await.unwrap();
        assert_ne!(a.key, b.key);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[tokio::test]
    async fn rejects_bad_signature_without_storing() {
        let h = Harness::memory().await;
        let err = h
            .state
            .service()
            .attach(new_blob(), Bytes::from_static(b"GIF89a not a png"))
            .await
            .unwrap_err();

        assert!(matches!(err, VaultError::InvalidContentSignature(_)));
        assert!(h.catalog.list_batch(None, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_declared_checksum_mismatch() {
        let h = Harness::memory().await;
        let mut new = new_blob();
        new.declared_checksum = Some("00".repeat(32));

        let err = h.state.service().attach(new, png(40)).await.unwrap_err();
        assert!(matches!(err, VaultError::InvalidContentSignature(_)));
    }

    #[tokio::test]
    async fn failed_upload_removes_record() {
        let h = Harness::memory().await;
        std::fs::remove_dir_all(h.local_root()).unwrap();
        FlakyTier::set(&h.remote.fail_writes, true);

        let err = h.state.service().attach(new_blob(), png(40)).await.unwrap_err();
        assert!(matches!(err, VaultError::StorageWriteFailure { .. }));
        assert!(h.catalog.list_batch(None, 10).await.unwrap().is_empty());
    }
}

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn fetch_falls_back_to_remote() {
        let h = Harness::memory().await;
        let service = h.state.service();
        let blob = service.attach(new_blob(), png(40)).await.unwrap();
        std::fs::remove_file(h.local_file(&blob)).unwrap();

        assert_eq!(service.fetch(blob.id).await.unwrap(), png(40));
    }

    #[tokio::test]
    async fn purge_removes_bytes_and_record() {
        let h = Harness::memory().await;
        let service = h.state.service();
        let blob = service.attach(new_blob(), png(40)).await.unwrap();

        service.purge(blob.id).await.unwrap();
        assert!(h.catalog.get(blob.id).await.unwrap().is_none());
        assert!(!h.local_file(&blob).exists());
        assert!(!h.remote_file(&blob).exists());
    }

    #[tokio::test]
    async fn url_carries_download_filename() {
        let h = Harness::memory().await;
        let service = h.state.service();
        let blob = service.attach(new_blob(), png(40)).await.unwrap();

        let opts = UrlOptions {
            disposition: Disposition::Attachment,
            filename: Some("dragon map.png".into()),
            ..UrlOptions::default()
        };
        let url = service.url(blob.id, &opts).await.unwrap();
        assert!(url.starts_with("file://"), "{url}");
        assert!(url.contains(blob.descriptive_name.as_deref().unwrap()));
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let h = Harness::memory().await;
        let service = h.state.service();
        let id = Uuid::now_v7();

        assert!(service.fetch(id).await.unwrap_err().is_not_found());
        assert!(service.purge(id).await.unwrap_err().is_not_found());
        assert!(service.retag(id, vec![]).await.unwrap_err().is_not_found());
    }
}
