//! 衣装・シーンのリポジトリ構築
//!
//! ```text
//! <repo>/outfits/<handle>/<shortcode>.json
//! <repo>/scenes/<handle>/<shortcode>/img<n>.json
//! ```

use super::{load_csv, now, pause, write_json};
use crate::config::Config;
use crate::error::{RemixError, Result};
use crate::gemini::GeminiClient;
use fashion_remix_common::prompts::{OUTFIT_PROMPT, SCENE_PROMPT};
use fashion_remix_common::{is_placeholder, PostRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const OUTFITS_DIR: &str = "outfits";
pub const SCENES_DIR: &str = "scenes";

/// 衣装ファイル
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutfitRecord {
    pub handle: String,
    pub shortcode: String,
    pub source_url: String,
    pub extracted_at: String,
    pub outfit: Value,
}

/// シーンファイル（1画像につき1つ）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    pub handle: String,
    pub shortcode: String,
    /// 1始まり
    pub image_index: usize,
    pub source_url: String,
    pub extracted_at: String,
    pub scene: Value,
}

pub fn outfit_path(repo: &Path, handle: &str, shortcode: &str) -> PathBuf {
    repo.join(OUTFITS_DIR).join(handle).join(format!("{}.json", shortcode))
}

pub fn scene_dir(repo: &Path, handle: &str, shortcode: &str) -> PathBuf {
    repo.join(SCENES_DIR).join(handle).join(shortcode)
}

pub fn scene_path(repo: &Path, handle: &str, shortcode: &str, image_index: usize) -> PathBuf {
    scene_dir(repo, handle, shortcode).join(format!("img{}.json", image_index))
}

/// `data/jane-scraped.csv` → `jane`
pub fn handle_from_csv(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let handle = stem.strip_suffix("-scraped").unwrap_or(stem);
    (!handle.is_empty()).then(|| handle.to_string())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractSummary {
    pub posts: usize,
    pub outfits: usize,
    pub scenes: usize,
    pub failed: usize,
}

/// 1投稿分: 1枚目から衣装、全画像からシーン
async fn extract_post(
    client: &GeminiClient,
    config: &Config,
    repo: &Path,
    handle: &str,
    post: &PostRecord,
    summary: &mut ExtractSummary,
) -> Result<()> {
    let shortcode = post.safe_shortcode();
    let Some(first_url) = post.images.first() else {
        return Ok(());
    };

    println!("  📸 1枚目から衣装を抽出...");
    let first = client.load_image(first_url).await?;
    let outfit = client.extract(&first, OUTFIT_PROMPT).await?;
    if is_placeholder(&outfit) {
        warn!("衣装をJSONとして解釈できません（raw を保存）: {}", shortcode);
    }
    write_json(
        &outfit_path(repo, handle, &shortcode),
        &OutfitRecord {
            handle: handle.to_string(),
            shortcode: shortcode.clone(),
            source_url: first_url.clone(),
            extracted_at: now(),
            outfit,
        },
    )?;
    summary.outfits += 1;
    println!("  ✔ 衣装を保存");

    for (i, url) in post.images.iter().enumerate() {
        pause(config.request_delay_ms).await;
        println!("  📸 img{} のシーンを抽出...", i + 1);

        let bytes = if i == 0 {
            first.clone()
        } else {
            match client.load_image(url).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("ダウンロード失敗 {}: {}", url, e);
                    println!("    ❌ {}", e);
                    summary.failed += 1;
                    continue;
                }
            }
        };

        match client.extract(&bytes, SCENE_PROMPT).await {
            Ok(scene) => {
                if is_placeholder(&scene) {
                    warn!("シーンをJSONとして解釈できません（raw を保存）: {} img{}", shortcode, i + 1);
                }
                write_json(
                    &scene_path(repo, handle, &shortcode, i + 1),
                    &SceneRecord {
                        handle: handle.to_string(),
                        shortcode: shortcode.clone(),
                        image_index: i + 1,
                        source_url: url.clone(),
                        extracted_at: now(),
                        scene,
                    },
                )?;
                summary.scenes += 1;
                println!("    ✔ シーン img{} を保存", i + 1);
            }
            Err(e) => {
                warn!("シーン抽出失敗 {} img{}: {}", shortcode, i + 1, e);
                println!("    ❌ {}", e);
                summary.failed += 1;
            }
        }
    }
    Ok(())
}

/// `extract` コマンド本体
pub async fn run(
    client: &GeminiClient,
    config: &Config,
    input: &Path,
    handle: Option<&str>,
    limit: Option<usize>,
) -> Result<ExtractSummary> {
    let handle = match handle {
        Some(h) => h.trim_start_matches('@').to_string(),
        None => handle_from_csv(input).ok_or_else(|| {
            RemixError::Config(format!("ハンドルを特定できません（--handle を指定）: {}", input.display()))
        })?,
    };
    let repo = &config.repository_dir;

    println!("🏗️ リポジトリ構築: @{}", handle);
    println!("  入力: {}", input.display());
    println!("  出力: {}\n", repo.display());

    let mut posts = load_csv(input)?;
    if let Some(limit) = limit {
        posts.truncate(limit);
    }

    let mut summary = ExtractSummary::default();
    for (i, post) in posts.iter().enumerate() {
        println!("[{}/{}] 📄 {}: {}枚", i + 1, posts.len(), post.shortcode, post.images.len());
        if post.images.is_empty() {
            println!("  ⚠️ 画像なし");
            continue;
        }

        if let Err(e) = extract_post(client, config, repo, &handle, post, &mut summary).await {
            warn!("投稿の抽出に失敗 {}: {}", post.shortcode, e);
            println!("  ❌ {}", e);
            summary.failed += 1;
            continue;
        }
        summary.posts += 1;

        if i + 1 < posts.len() {
            pause(config.post_delay_ms).await;
        }
    }

    println!("\n✅ @{} 完了: 衣装 {}件 / シーン {}件（失敗 {}）", handle, summary.outfits, summary.scenes, summary.failed);
    println!("  衣装: {}", repo.join(OUTFITS_DIR).display());
    println!("  シーン: {}", repo.join(SCENES_DIR).display());
    Ok(summary)
}
