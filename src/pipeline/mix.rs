//! ランダムな衣装とシーン投稿を組み合わせて新しい投稿を生成する

use super::repository::{OutfitRecord, SceneRecord, OUTFITS_DIR, SCENES_DIR};
use super::{now, pause, require_identity, save_and_crop, write_json};
use crate::config::Config;
use crate::error::Result;
use crate::gemini::{GeminiClient, GenerationOutcome, Part};
use fashion_remix_common::prompts::{build_mix_first_prompt, build_mix_follow_prompt};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const GENERATED_POSTS_DIR: &str = "generated-posts";
pub const MIX_MANIFEST_NAME: &str = "manifest.json";
const POST_PREFIX: &str = "new-post-";
/// 1投稿あたりの最大生成枚数
pub const MAX_MIX_IMAGES: usize = 3;

/// シーンを持つ元投稿
#[derive(Debug, Clone, PartialEq)]
pub struct ScenePost {
    pub handle: String,
    pub shortcode: String,
    pub scenes: Vec<SceneRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub handle: String,
    pub shortcode: String,
}

/// `<repo>/generated-posts/new-post-NNN/manifest.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixManifest {
    pub post_id: String,
    pub created_at: String,
    pub outfit_source: SourceRef,
    pub scene_source: SourceRef,
    pub outfit: Value,
    pub scenes: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generated: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MixResult {
    pub post_id: String,
    pub generated: usize,
    pub scenes: usize,
}

/// 直下のディレクトリ名（名前順）
fn subdirs(dir: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect();
    dirs.sort();
    dirs
}

/// 直下の `*.json`（名前順）
fn json_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// ランダムなハンドルからランダムな衣装を1つ選ぶ
pub fn pick_outfit<R: Rng + ?Sized>(repo: &Path, rng: &mut R) -> Result<Option<OutfitRecord>> {
    let handles = subdirs(&repo.join(OUTFITS_DIR));
    let Some(handle) = handles.choose(rng) else {
        return Ok(None);
    };
    let files = json_files(handle);
    match files.choose(rng) {
        Some(file) => Ok(Some(read_json(file)?)),
        None => Ok(None),
    }
}

/// ランダムなハンドルからランダムな投稿を選び、そのシーンを画像順で返す
pub fn pick_scene_post<R: Rng + ?Sized>(repo: &Path, rng: &mut R) -> Result<Option<ScenePost>> {
    let handles = subdirs(&repo.join(SCENES_DIR));
    let Some(handle) = handles.choose(rng) else {
        return Ok(None);
    };
    let posts = subdirs(handle);
    let Some(post) = posts.choose(rng) else {
        return Ok(None);
    };

    let mut scenes = Vec::new();
    for file in json_files(post) {
        match read_json::<SceneRecord>(&file) {
            Ok(scene) => scenes.push(scene),
            Err(e) => warn!("シーンを読み込めません {}: {}", file.display(), e),
        }
    }
    scenes.sort_by_key(|s| s.image_index);

    Ok(Some(ScenePost {
        handle: dir_name(handle),
        shortcode: dir_name(post),
        scenes,
    }))
}

/// 既存の `new-post-NNN` の次の番号
pub fn next_post_index(output_dir: &Path) -> usize {
    subdirs(output_dir)
        .iter()
        .filter_map(|p| dir_name(p).strip_prefix(POST_PREFIX)?.parse::<usize>().ok())
        .max()
        .map_or(1, |n| n + 1)
}

pub fn post_id(index: usize) -> String {
    format!("{}{:03}", POST_PREFIX, index)
}

/// 画像1枚を生成（img1: 衣装＋シーン＋人物、以降: シーン＋img1のスタイル＋人物）
fn mix_parts(outfit: &Value, scene: &Value, identity: &[u8], style: Option<&[u8]>) -> Vec<Part> {
    match style {
        None => vec![
            Part::text(build_mix_first_prompt(outfit, scene)),
            Part::image(identity),
        ],
        Some(style) => vec![
            Part::text(build_mix_follow_prompt(scene)),
            Part::image(style),
            Part::text("STYLE REFERENCE"),
            Part::image(identity),
            Part::text("IDENTITY REFERENCE"),
        ],
    }
}

async fn generate_post<R: Rng + ?Sized>(
    client: &GeminiClient,
    config: &Config,
    identity: &[u8],
    output_dir: &Path,
    index: usize,
    rng: &mut R,
) -> Result<Option<MixResult>> {
    let repo = &config.repository_dir;
    let Some(outfit) = pick_outfit(repo, rng)? else {
        println!("❌ 衣装がありません（先に `remix extract` を実行してください）");
        return Ok(None);
    };
    let Some(scene_post) = pick_scene_post(repo, rng)? else {
        println!("❌ シーンがありません（先に `remix extract` を実行してください）");
        return Ok(None);
    };

    println!("🎲 ミックス:");
    println!("  衣装: @{} / {}", outfit.handle, outfit.shortcode);
    println!("  シーン: @{} / {}", scene_post.handle, scene_post.shortcode);
    println!("  画像: {}枚", scene_post.scenes.len());

    let id = post_id(index);
    let post_dir = output_dir.join(&id);
    let mut manifest = MixManifest {
        post_id: id.clone(),
        created_at: now(),
        outfit_source: SourceRef {
            handle: outfit.handle.clone(),
            shortcode: outfit.shortcode.clone(),
        },
        scene_source: SourceRef {
            handle: scene_post.handle.clone(),
            shortcode: scene_post.shortcode.clone(),
        },
        outfit: outfit.outfit.clone(),
        scenes: scene_post.scenes.iter().map(|s| s.scene.clone()).collect(),
        generated: Vec::new(),
    };
    let manifest_path = post_dir.join(MIX_MANIFEST_NAME);
    write_json(&manifest_path, &manifest)?;

    let mut style: Option<Vec<u8>> = None;
    for (i, scene) in scene_post.scenes.iter().enumerate() {
        if manifest.generated.len() >= MAX_MIX_IMAGES {
            break;
        }
        let img_index = i + 1;
        println!("  🎨 img{} を生成中...", img_index);

        let parts = mix_parts(&outfit.outfit, &scene.scene, identity, style.as_deref());
        let outcome = match client.generate_image(parts, None).await {
            Ok(outcome) => outcome,
            Err(e) => GenerationOutcome::Error {
                reason: e.to_string(),
            },
        };

        let GenerationOutcome::Success { images } = outcome else {
            println!("  ⚠️ img{} 失敗（{}）、この投稿は終了", img_index, outcome.reason().unwrap_or("Unknown"));
            break;
        };
        let Some(image) = images.into_iter().next() else {
            break;
        };

        let saved = save_and_crop(&image, &post_dir.join(format!("img{}", img_index)), config.side_crop_percent)?;
        manifest.generated.push(saved.cropped.display().to_string());
        println!("  ✅ img{} 生成", img_index);
        if style.is_none() {
            println!("  ⭐ img1 をスタイル基準に設定");
            style = Some(image.data);
        }

        if i + 1 < scene_post.scenes.len() && manifest.generated.len() < MAX_MIX_IMAGES {
            pause(config.request_delay_ms).await;
        }
    }

    write_json(&manifest_path, &manifest)?;
    debug!("ミックスマニフェスト: {}", manifest_path.display());
    println!("\n✅ {}/{}枚を生成", manifest.generated.len(), scene_post.scenes.len());

    Ok(Some(MixResult {
        post_id: id,
        generated: manifest.generated.len(),
        scenes: scene_post.scenes.len(),
    }))
}

/// `mix` コマンド本体
pub async fn run(
    client: &GeminiClient,
    config: &Config,
    count: usize,
    identity: Option<&Path>,
) -> Result<Vec<MixResult>> {
    let identity = require_identity(identity, "mix")?;
    let output_dir = config.repository_dir.join(GENERATED_POSTS_DIR);
    std::fs::create_dir_all(&output_dir)?;

    println!("🎨 ポストミキサー: {}件を生成\n", count);
    let start = next_post_index(&output_dir);
    let mut rng = rand::thread_rng();
    let mut results = Vec::new();

    for n in 0..count {
        println!("{}", "=".repeat(60));
        println!("新規投稿 #{}", start + n);
        println!("{}", "=".repeat(60));

        if let Some(result) = generate_post(client, config, &identity, &output_dir, start + n, &mut rng).await? {
            results.push(result);
        }

        if n + 1 < count {
            pause(config.post_delay_ms).await;
        }
    }

    println!("\n{}", "=".repeat(60));
    println!("サマリー");
    for r in &results {
        println!("  {}: {}枚", r.post_id, r.generated);
    }
    println!("\n出力: {}", output_dir.display());
    Ok(results)
}
