//! 説明・生成・リポジトリ構築・ミックス・デイリーの各パイプライン
//!
//! ネットワーク呼び出しはすべて逐次。各呼び出しの間は設定の待機時間だけ止まる。

pub mod daily;
pub mod describe;
pub mod generate;
pub mod mix;
pub mod repository;

use crate::error::{RemixError, Result};
use crate::gemini::InlineImage;
use crate::imaging::{self, CropOutcome, CropSpec};
use chrono::Utc;
use fashion_remix_common::{load_posts, AspectRatio, CropAnchor, PostRecord};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const GENERATED_FILE_NAME: &str = "generated.jpg";
pub const CROPPED_FILE_NAME: &str = "generated-cropped.jpg";

pub(crate) fn now() -> String {
    Utc::now().to_rfc3339()
}

pub(crate) async fn pause(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

/// 整形JSONで書き出し（親ディレクトリも作る）
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// CSVを読み込み（存在しなければ `FileNotFound`）
pub(crate) fn load_csv(path: &Path) -> Result<Vec<PostRecord>> {
    if !path.exists() {
        return Err(RemixError::FileNotFound(path.display().to_string()));
    }
    Ok(load_posts(path)?)
}

/// 参照人物画像を読み込む
pub(crate) fn load_identity(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(RemixError::FileNotFound(path.display().to_string()));
    }
    Ok(std::fs::read(path)?)
}

pub(crate) fn require_identity(identity: Option<&Path>, mode: &str) -> Result<Vec<u8>> {
    match identity {
        Some(path) => load_identity(path),
        None => Err(RemixError::Config(format!(
            "{} には --identity（参照人物画像）が必要です",
            mode
        ))),
    }
}

/// 生成画像1枚の保存先
#[derive(Debug, Clone, PartialEq)]
pub struct SavedImage {
    pub generated: PathBuf,
    pub cropped: PathBuf,
    /// クロップに失敗して元画像をコピーした
    pub copied: bool,
}

/// `<dir>/generated.jpg` に保存し、4:5（上基準）で `generated-cropped.jpg` を作る
pub(crate) fn save_and_crop(image: &InlineImage, dir: &Path, side_percent: f64) -> Result<SavedImage> {
    std::fs::create_dir_all(dir)?;
    let generated = dir.join(GENERATED_FILE_NAME);
    let cropped = dir.join(CROPPED_FILE_NAME);
    std::fs::write(&generated, &image.data)?;

    let spec = CropSpec {
        ratio: AspectRatio::PORTRAIT,
        side_percent,
        anchor: CropAnchor::Top,
    };
    let copied = match imaging::crop_or_copy(&generated, &cropped, spec)? {
        CropOutcome::Cropped(_) => false,
        CropOutcome::Copied { reason } => {
            warn!("クロップせずに保存 {}: {}", cropped.display(), reason);
            true
        }
    };

    Ok(SavedImage {
        generated,
        cropped,
        copied,
    })
}

/// 画像を `<dir>/<prefix>_<n>.<ext>` として保存（1始まり）
pub(crate) fn save_images(images: &[InlineImage], dir: &Path, prefix: &str) -> Result<Vec<String>> {
    std::fs::create_dir_all(dir)?;
    let mut saved = Vec::with_capacity(images.len());
    for (i, image) in images.iter().enumerate() {
        let path = dir.join(format!("{}_{}.{}", prefix, i + 1, image.extension()));
        std::fs::write(&path, &image.data)?;
        saved.push(path.display().to_string());
    }
    Ok(saved)
}
