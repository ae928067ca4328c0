//! 投稿ごとのマニフェスト（`<out>/<shortcode>-manifest.json`）の読み書き

use crate::error::Result;
use fashion_remix_common::{safe_file_stem, Manifest, PostRecord};
use std::path::{Path, PathBuf};
use tracing::warn;

const MANIFEST_SUFFIX: &str = "-manifest.json";

/// `<out>/<shortcode>-manifest.json`（ショートコードはファイル名用に変換）
pub fn manifest_path(output_dir: &Path, shortcode: &str) -> PathBuf {
    output_dir.join(format!("{}{}", safe_file_stem(shortcode), MANIFEST_SUFFIX))
}

/// 読めなかったマニフェストの退避先（`<name>.bak`）
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".bak");
    path.with_file_name(name)
}

/// ファイル名がマニフェストならショートコードを返す
pub fn shortcode_from_manifest_path(path: &Path) -> Option<String> {
    path.file_name()?
        .to_str()?
        .strip_suffix(MANIFEST_SUFFIX)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn load(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// 既存のマニフェストを読み込むか、投稿から新規作成する
///
/// 壊れたファイルは `.bak` に退避してから作り直す。
pub fn load_or_create(output_dir: &Path, post: &PostRecord, now: &str) -> Result<Manifest> {
    let path = manifest_path(output_dir, &post.shortcode);
    if path.exists() {
        match load(&path) {
            Ok(manifest) => return Ok(manifest),
            Err(e) => {
                let backup = backup_path(&path);
                std::fs::rename(&path, &backup)?;
                warn!(
                    "マニフェストを読み込めないため再作成します {}: {}（退避: {}）",
                    path.display(),
                    e,
                    backup.display()
                );
            }
        }
    }
    Ok(Manifest::for_post(post, now))
}

/// 全体を書き戻す（`updatedAt` を更新）
pub fn save(output_dir: &Path, manifest: &mut Manifest, now: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    manifest.updated_at = now.to_string();
    if manifest.created_at.is_empty() {
        manifest.created_at = now.to_string();
    }

    let path = manifest_path(output_dir, &manifest.shortcode);
    std::fs::write(&path, serde_json::to_string_pretty(manifest)?)?;
    Ok(path)
}
