//! レビュー〜アップロードの通しテスト
//!
//! マニフェスト → 台帳同期 → 承認/却下 → アウトボックスへのアップロード

use fashion_remix::error::RemixError;
use fashion_remix::manifest;
use fashion_remix::review::{self, ReviewStore};
use fashion_remix::upload::{upload_approved, OutboxUploader};
use fashion_remix_common::{
    ApprovalStatus, ImageResult, ImageStatus, Manifest, ManifestStatus, PostRecord,
};
use std::path::Path;
use tempfile::tempdir;

/// 生成済みの投稿を1件書き出す（クロップ画像は実ファイル）
fn write_generated(generated_dir: &Path, shortcode: &str) {
    let post = PostRecord {
        post_url: format!("https://www.instagram.com/p/{}/", shortcode),
        shortcode: shortcode.to_string(),
        caption: "coffee".to_string(),
        ..Default::default()
    };
    let img_dir = generated_dir.join(shortcode).join("img1");
    std::fs::create_dir_all(&img_dir).unwrap();
    let cropped = img_dir.join("generated-cropped.jpg");
    std::fs::write(&cropped, b"jpeg").unwrap();

    let mut manifest = Manifest::for_post(&post, "2026-01-18T00:00:00Z");
    manifest.status = ManifestStatus::Generated;
    manifest.images.push(ImageResult {
        status: ImageStatus::Success,
        cropped_path: Some(cropped.display().to_string()),
        ..ImageResult::new(1, "https://cdn.example.com/1.jpg")
    });
    manifest::save(generated_dir, &mut manifest, "2026-01-18T00:00:00Z").unwrap();
}

#[test]
fn test_review_approve_upload() {
    let dir = tempdir().expect("Failed to create temp dir");
    let generated = dir.path().join("generated");
    write_generated(&generated, "AAA");
    write_generated(&generated, "BBB");

    let store = ReviewStore::new(&dir.path().join("review"));
    review::show(&generated, &store).unwrap();

    let ledger = store.load().unwrap();
    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger.get("AAA").unwrap().status, ApprovalStatus::Pending);
    assert_eq!(ledger.get("AAA").unwrap().images.len(), 1);

    store.approve("AAA").unwrap();
    store.reject("BBB").unwrap();

    let outbox = dir.path().join("outbox");
    let summary = upload_approved(&store, &OutboxUploader::new(&outbox), "@mine").unwrap();
    assert_eq!(summary.uploaded, vec!["AAA".to_string()]);
    assert!(summary.failed.is_empty());
    assert!(outbox.join("mine").join("AAA").join("01.jpg").exists());
    assert!(!outbox.join("mine").join("BBB").exists());

    let ledger = store.load().unwrap();
    let entry = ledger.get("AAA").unwrap();
    assert_eq!(entry.status, ApprovalStatus::Uploaded);
    assert_eq!(entry.uploaded_to.as_deref(), Some("@mine"));
    assert_eq!(ledger.get("BBB").unwrap().status, ApprovalStatus::Rejected);
}

/// 再同期しても既存の判定は上書きされない
#[test]
fn test_resync_keeps_decisions() {
    let dir = tempdir().expect("Failed to create temp dir");
    let generated = dir.path().join("generated");
    write_generated(&generated, "AAA");

    let store = ReviewStore::new(&dir.path().join("review"));
    review::show(&generated, &store).unwrap();
    store.approve("AAA").unwrap();

    write_generated(&generated, "CCC");
    review::show(&generated, &store).unwrap();

    let ledger = store.load().unwrap();
    assert_eq!(ledger.get("AAA").unwrap().status, ApprovalStatus::Approved);
    assert_eq!(ledger.get("CCC").unwrap().status, ApprovalStatus::Pending);
}

/// 却下済みは承認できず、台帳も変わらない
#[test]
fn test_rejected_cannot_be_approved() {
    let dir = tempdir().expect("Failed to create temp dir");
    let generated = dir.path().join("generated");
    write_generated(&generated, "AAA");

    let store = ReviewStore::new(&dir.path().join("review"));
    review::show(&generated, &store).unwrap();
    store.reject("AAA").unwrap();
    let before = std::fs::read_to_string(store.path()).unwrap();

    let result = store.approve("AAA");
    assert!(matches!(result, Err(RemixError::Common(_))));
    assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
}

/// 台帳がない状態での承認・アップロード
#[test]
fn test_missing_ledger() {
    let dir = tempdir().expect("Failed to create temp dir");
    let store = ReviewStore::new(&dir.path().join("review"));

    assert!(matches!(store.approve("AAA"), Err(RemixError::FileNotFound(_))));

    let result = upload_approved(&store, &OutboxUploader::new(dir.path().join("outbox")), "mine");
    assert!(matches!(result, Err(RemixError::FileNotFound(_))));
    assert!(!store.path().exists());
}
