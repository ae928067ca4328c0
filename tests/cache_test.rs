//! キャッシュ機能テスト
//!
//! 説明結果キャッシュの動作を検証

use fashion_remix::gemini::{cache_key, DescriptionCache};
use serde_json::json;
use tempfile::tempdir;

/// 空のキャッシュファイル
#[test]
fn test_cache_file_empty() {
    let dir = tempdir().expect("Failed to create temp dir");
    let cache = DescriptionCache::load(dir.path());

    assert_eq!(cache.len(), 0);
    assert!(cache.is_empty());
}

/// キャッシュの保存と読み込み
#[test]
fn test_cache_save_and_load() {
    let dir = tempdir().expect("Failed to create temp dir");

    let mut cache = DescriptionCache::load(dir.path());
    let key = cache_key("https://cdn.example.com/a.jpg", None);
    cache.insert(
        key.clone(),
        "https://cdn.example.com/a.jpg",
        "gemini-2.0-flash",
        "2026-01-18T00:00:00Z",
        json!({"scene": {"location": "cafe"}}),
    );
    cache.save(dir.path()).expect("キャッシュ保存失敗");

    let loaded = DescriptionCache::load(dir.path());
    assert_eq!(loaded.len(), 1);
    let cached = loaded.get(&key).expect("キャッシュが見つからない");
    assert_eq!(cached["scene"]["location"], "cafe");
}

/// URLは文字列、ローカルファイルは内容でキーが決まる
#[test]
fn test_cache_key_sources() {
    let url = "https://cdn.example.com/a.jpg";
    assert_eq!(cache_key(url, None), cache_key(url, Some(b"ignored")));

    // 同じ内容なら別パスでも同じキー
    assert_eq!(
        cache_key("/tmp/a.jpg", Some(b"same bytes")),
        cache_key("/other/b.jpg", Some(b"same bytes"))
    );
    assert_ne!(
        cache_key("/tmp/a.jpg", Some(b"one")),
        cache_key("/tmp/a.jpg", Some(b"two"))
    );
}

/// キャッシュの上書き
#[test]
fn test_cache_overwrite() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut cache = DescriptionCache::load(dir.path());

    cache.insert("same".into(), "a.jpg", "m", "t1", json!({"v": 1}));
    cache.insert("same".into(), "a.jpg", "m", "t2", json!({"v": 2}));

    assert_eq!(cache.get("same").unwrap()["v"], 2);
    assert_eq!(cache.len(), 1);
}

/// キャッシュファイルが破損している場合
#[test]
fn test_cache_corrupted_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(DescriptionCache::cache_path(dir.path()), "{ invalid json }").unwrap();

    let cache = DescriptionCache::load(dir.path());
    assert!(cache.is_empty());
}

/// 古いバージョンのキャッシュは空として扱う
#[test]
fn test_cache_version_mismatch() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(
        DescriptionCache::cache_path(dir.path()),
        r#"{"version": 0, "entries": {}}"#,
    )
    .unwrap();

    assert!(DescriptionCache::load(dir.path()).is_empty());
}

/// キャッシュの削除
#[test]
fn test_cache_clear() {
    let dir = tempdir().expect("Failed to create temp dir");
    assert!(!DescriptionCache::clear(dir.path()).unwrap());

    let mut cache = DescriptionCache::load(dir.path());
    cache.insert("k".into(), "a.jpg", "m", "t", json!({}));
    cache.save(dir.path()).unwrap();

    assert!(DescriptionCache::clear(dir.path()).unwrap());
    assert!(!DescriptionCache::cache_path(dir.path()).exists());
}
