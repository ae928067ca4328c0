//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use fashion_remix::config::Config;
use fashion_remix::error::RemixError;
use fashion_remix::imaging::{self, CropSpec};
use fashion_remix::review;
use std::path::Path;
use tempfile::tempdir;

/// 存在しないフォルダをクロップした場合
#[test]
fn test_crop_nonexistent_folder() {
    let dir = tempdir().expect("Failed to create temp dir");
    let result = imaging::crop_directory(
        Path::new("/nonexistent/path/12345"),
        &dir.path().join("out"),
        CropSpec::default(),
    );

    assert!(matches!(result, Err(RemixError::FolderNotFound(_))));
}

/// 画像でないファイルのクロップ
#[test]
fn test_crop_invalid_image() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input = dir.path().join("broken.jpg");
    std::fs::write(&input, b"not an image").unwrap();

    let result = imaging::crop_file(&input, &dir.path().join("out.jpg"), CropSpec::default());
    assert!(result.is_err());
}

/// 生成ディレクトリがない場合のレビュー
#[test]
fn test_review_missing_generated_dir() {
    let result = review::scan_manifests(Path::new("/nonexistent/generated"));
    assert!(matches!(result, Err(RemixError::FolderNotFound(_))));
}

/// APIキー未設定
#[test]
fn test_missing_api_key() {
    let config = Config {
        api_key: None,
        ..Default::default()
    };
    assert!(matches!(config.get_api_key(None), Err(RemixError::MissingApiKey)));
    assert!(matches!(config.get_api_key(Some("  ")), Err(RemixError::MissingApiKey)));
    assert_eq!(config.get_api_key(Some("cli-key")).unwrap(), "cli-key");
}

/// RemixErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        RemixError::Config("テスト設定エラー".to_string()),
        RemixError::FileNotFound("test.csv".to_string()),
        RemixError::FolderNotFound("/path/to/folder".to_string()),
        RemixError::ApiCall("API呼び出し失敗".to_string()),
        RemixError::Scrape("スクレイプ失敗".to_string()),
        RemixError::NotLoggedIn("jane".to_string()),
        RemixError::SessionNotFound("main".to_string()),
        RemixError::Upload("アップロード失敗".to_string()),
        RemixError::Download {
            url: "https://cdn.example.com/a.jpg".to_string(),
            status: 404,
        },
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "エラーメッセージが空: {:?}", err);
    }
}

/// MissingApiKeyエラーのメッセージ確認
#[test]
fn test_missing_api_key_message() {
    let display = format!("{}", RemixError::MissingApiKey);

    assert!(display.contains("APIキー"));
    assert!(display.contains("GEMINI_API_KEY"));
    assert!(display.contains("remix config"));
}

/// ダウンロード失敗にはステータスとURLが含まれる
#[test]
fn test_download_error_message() {
    let err = RemixError::Download {
        url: "https://cdn.example.com/a.jpg".to_string(),
        status: 403,
    };
    let display = format!("{}", err);
    assert!(display.contains("403"));
    assert!(display.contains("https://cdn.example.com/a.jpg"));
}

/// IOエラーからの変換
#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: RemixError = io_err.into();

    assert!(matches!(err, RemixError::Io(_)));
    assert!(format!("{}", err).contains("IO"));
}

/// JSONエラーからの変換
#[test]
fn test_json_error_conversion() {
    let json_err = serde_json::from_str::<serde_json::Value>("{ invalid }").unwrap_err();
    let err: RemixError = json_err.into();

    assert!(matches!(err, RemixError::JsonParse(_)));
}

/// common::Errorは透過的に表示される
#[test]
fn test_common_error_transparent() {
    let common_err = fashion_remix_common::Error::InvalidTransition {
        id: "ABC".to_string(),
        from: "rejected".to_string(),
        to: "approved".to_string(),
    };
    let err: RemixError = common_err.into();

    assert!(matches!(err, RemixError::Common(_)));
    assert_eq!(format!("{}", err), "Cannot move ABC from rejected to approved");
}
