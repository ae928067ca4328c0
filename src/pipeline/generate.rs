//! CSVの投稿ごとに説明・顔差し替え・生成・リミックスを行い、マニフェストを更新する

use super::describe::describe_source;
use super::{load_csv, now, pause, require_identity, save_and_crop, save_images, write_json};
use crate::config::Config;
use crate::error::{RemixError, Result};
use crate::gemini::{GeminiClient, GenerationOutcome, Part};
use crate::manifest;
use fashion_remix_common::prompts::{
    build_generate_prompt, build_remix_first_prompt, build_remix_follow_prompt, describes_model,
    FACE_SWAP_VARIANTS, REMIX_DESCRIBE_PROMPT,
};
use fashion_remix_common::{ImageResult, ImageStatus, Manifest, ManifestStatus, PostRecord};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 生成モード
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GenerateMode {
    /// 説明のみ（レビュー前の下準備）
    #[default]
    Describe,
    /// 元画像の人物を参照人物に差し替え
    FaceSwap,
    /// プロンプト（またはキャプション）から生成
    Generate,
    /// ダウンロード→説明→参照人物で生成→4:5クロップ
    Remix,
}

impl std::str::FromStr for GenerateMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "describe" | "d" => Ok(GenerateMode::Describe),
            "face-swap" | "faceswap" | "swap" => Ok(GenerateMode::FaceSwap),
            "generate" | "gen" => Ok(GenerateMode::Generate),
            "remix" | "full" => Ok(GenerateMode::Remix),
            _ => Err(format!(
                "Unknown mode: {}. Use describe, face-swap, generate, or remix",
                s
            )),
        }
    }
}

impl std::fmt::Display for GenerateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerateMode::Describe => write!(f, "describe"),
            GenerateMode::FaceSwap => write!(f, "face-swap"),
            GenerateMode::Generate => write!(f, "generate"),
            GenerateMode::Remix => write!(f, "remix"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub mode: GenerateMode,
    pub identity: Option<PathBuf>,
    pub aspect_ratio: Option<String>,
    pub prompt: Option<String>,
    pub limit: Option<usize>,
    pub images_per_post: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateSummary {
    pub posts: usize,
    pub success: usize,
    pub blocked: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl GenerateSummary {
    fn record(&mut self, status: ImageStatus) {
        match status {
            ImageStatus::Success => self.success += 1,
            ImageStatus::Blocked => self.blocked += 1,
            ImageStatus::Error => self.failed += 1,
            ImageStatus::Pending => self.skipped += 1,
        }
    }
}

/// 1枚以上成功していれば generated、なければ failed
fn finish_status(manifest: &Manifest) -> ManifestStatus {
    if manifest.count_with(ImageStatus::Success) > 0 || !manifest.generated.is_empty() {
        ManifestStatus::Generated
    } else {
        ManifestStatus::Failed
    }
}

fn apply_outcome(result: &mut ImageResult, outcome: &GenerationOutcome) {
    result.status = outcome.status();
    result.error = outcome.reason().map(str::to_string);
}

/// `generate` コマンド本体
pub async fn run(
    client: &GeminiClient,
    config: &Config,
    options: &GenerateOptions,
) -> Result<GenerateSummary> {
    println!("🎨 画像生成 ({})", options.mode);
    println!("  入力: {}", options.input.display());
    println!("  出力: {}", options.output_dir.display());
    println!("  モデル: {} / {}", client.model(), client.image_model());
    if let Some(proxy) = &config.proxy {
        let host = url::Url::parse(proxy)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "?".into());
        println!("  プロキシ: {}", host);
    }
    println!();

    let identity = match options.mode {
        GenerateMode::FaceSwap | GenerateMode::Remix => {
            Some(require_identity(options.identity.as_deref(), &options.mode.to_string())?)
        }
        GenerateMode::Generate => options
            .identity
            .as_deref()
            .map(super::load_identity)
            .transpose()?,
        GenerateMode::Describe => None,
    };

    std::fs::create_dir_all(&options.output_dir)?;
    let mut posts = load_csv(&options.input)?;
    if let Some(limit) = options.limit {
        posts.truncate(limit);
    }
    println!("{}件の投稿を処理\n", posts.len());

    let mut summary = GenerateSummary::default();
    for (i, post) in posts.iter().enumerate() {
        println!("{}", "=".repeat(60));
        println!("[{}/{}] 📄 {}: {}枚", i + 1, posts.len(), post.shortcode, post.images.len());

        let mut manifest = manifest::load_or_create(&options.output_dir, post, &now())?;
        let result = match (options.mode, identity.as_deref()) {
            (GenerateMode::Describe, _) => describe_post(client, config, options, post, &mut manifest).await,
            (GenerateMode::FaceSwap, Some(id)) => {
                face_swap_post(client, config, options, post, id, &mut manifest, &mut summary).await
            }
            (GenerateMode::Remix, Some(id)) => {
                remix_post(client, config, options, post, id, &mut manifest, &mut summary).await
            }
            (GenerateMode::Generate, id) => {
                generate_post(client, options, post, id, &mut manifest, &mut summary).await
            }
            (mode, None) => Err(RemixError::Config(format!(
                "{} には --identity（参照人物画像）が必要です",
                mode
            ))),
        };

        if let Err(e) = result {
            warn!("{} の処理に失敗: {}", post.shortcode, e);
            println!("  ❌ {}", e);
            manifest.status = ManifestStatus::Failed;
        }

        let path = manifest::save(&options.output_dir, &mut manifest, &now())?;
        info!("マニフェスト保存: {}", path.display());
        summary.posts += 1;

        if i + 1 < posts.len() {
            pause(config.post_delay_ms).await;
        }
    }

    println!("\n{}", "=".repeat(60));
    println!("📊 結果 ({}):", options.mode);
    println!("  投稿: {}件", summary.posts);
    if options.mode != GenerateMode::Describe {
        println!("  ✅ 成功: {}", summary.success);
        println!("  ⚠️ ブロック: {}", summary.blocked);
        println!("  ❌ エラー: {}", summary.failed);
        if summary.skipped > 0 {
            println!("  ⏭️ スキップ: {}", summary.skipped);
        }
    }
    println!("\n✅ 出力: {}", options.output_dir.display());
    Ok(summary)
}

/// 各画像を説明して `descriptions` に保存
async fn describe_post(
    client: &GeminiClient,
    config: &Config,
    options: &GenerateOptions,
    post: &PostRecord,
    manifest: &mut Manifest,
) -> Result<()> {
    let mut descriptions = Vec::with_capacity(post.images.len());
    let mut no_cache = None;

    for (idx, url) in post.images.iter().enumerate() {
        println!("  [{}] 説明中...", idx + 1);
        match describe_source(client, &mut no_cache, url).await {
            Ok((description, _)) => {
                let path = options
                    .output_dir
                    .join(format!("{}_img{}_desc.json", post.safe_shortcode(), idx));
                write_json(&path, &description)?;
                println!("    ✔ 保存");
                descriptions.push(description);
            }
            Err(e) => {
                warn!("説明に失敗 {} [{}]: {}", post.shortcode, idx, e);
                println!("    ❌ {}", e);
            }
        }
        pause(config.request_delay_ms).await;
    }

    manifest.status = if descriptions.is_empty() {
        ManifestStatus::Failed
    } else {
        ManifestStatus::Described
    };
    manifest.descriptions = descriptions;
    Ok(())
}

/// 元画像ごとに顔差し替えバリエーションを順に試す
async fn face_swap_post(
    client: &GeminiClient,
    config: &Config,
    options: &GenerateOptions,
    post: &PostRecord,
    identity: &[u8],
    manifest: &mut Manifest,
    summary: &mut GenerateSummary,
) -> Result<()> {
    let aspect = options.aspect_ratio.as_deref().unwrap_or("9:16");
    let post_dir = options.output_dir.join(post.safe_shortcode());
    let mut generated = Vec::new();
    let mut results = Vec::new();

    for (idx, url) in post.images.iter().take(options.images_per_post).enumerate() {
        println!("  [{}] 顔差し替え...", idx + 1);
        let mut result = ImageResult::new(idx, url);

        match client.load_image(url).await {
            Ok(source) => {
                let images = [Part::image(&source), Part::image(identity)];
                let attempt = client
                    .generate_with_variants(FACE_SWAP_VARIANTS, &images, Some(aspect))
                    .await;
                apply_outcome(&mut result, &attempt.outcome);
                result.prompt_index = attempt.prompt_index;

                match &attempt.outcome {
                    GenerationOutcome::Success { images } => {
                        let saved = save_images(images, &post_dir, &format!("img{}", idx))?;
                        result.generated_path = saved.first().cloned();
                        generated.extend(saved);
                        println!(
                            "    ✅ 成功（プロンプト {}）",
                            attempt.prompt_index.map(|i| i + 1).unwrap_or(0)
                        );
                    }
                    GenerationOutcome::Blocked { reason } => {
                        println!("    ⚠️ 全{}プロンプトがブロック: {}", attempt.attempts, reason);
                    }
                    GenerationOutcome::Error { reason } => println!("    ❌ {}", reason),
                }
            }
            Err(e) => {
                result.status = ImageStatus::Error;
                result.error = Some(e.to_string());
                println!("    ❌ {}", e);
            }
        }

        summary.record(result.status);
        results.push(result);
        pause(config.request_delay_ms).await;
    }

    manifest.generated = generated;
    manifest.images = results;
    manifest.status = finish_status(manifest);
    Ok(())
}

/// プロンプトの優先順位: `--prompt` > 既存の説明 > キャプション
fn generation_prompt(options: &GenerateOptions, post: &PostRecord, manifest: &Manifest) -> String {
    if let Some(prompt) = &options.prompt {
        return prompt.clone();
    }
    match manifest.descriptions.first() {
        Some(description) => build_generate_prompt(
            &serde_json::to_string_pretty(description).unwrap_or_else(|_| description.to_string()),
        ),
        None => post.caption.clone(),
    }
}

/// 投稿ごとに1回生成
async fn generate_post(
    client: &GeminiClient,
    options: &GenerateOptions,
    post: &PostRecord,
    identity: Option<&[u8]>,
    manifest: &mut Manifest,
    summary: &mut GenerateSummary,
) -> Result<()> {
    let prompt = generation_prompt(options, post, manifest);
    let mut parts = vec![Part::text(prompt)];
    if let Some(identity) = identity {
        parts.push(Part::image(identity));
    }

    let aspect = options.aspect_ratio.as_deref().unwrap_or("1:1");
    let outcome = client.generate_image(parts, Some(aspect)).await?;
    let mut result = ImageResult::new(0, &post.post_url);
    apply_outcome(&mut result, &outcome);

    if let GenerationOutcome::Success { images } = &outcome {
        let saved = save_images(images, &options.output_dir.join(post.safe_shortcode()), "generated")?;
        println!("  ✅ {}枚", saved.len());
        result.generated_path = saved.first().cloned();
        manifest.generated = saved;
    } else {
        println!("  ⚠️ {}", outcome.reason().unwrap_or("Unknown"));
    }

    summary.record(result.status);
    manifest.images = vec![result];
    manifest.status = finish_status(manifest);
    Ok(())
}

/// 1枚の元画像をリミックスして `result` を埋める
///
/// 成功時は生成画像のバイト列を返す（次の画像のスタイル参照になる）。
async fn remix_image(
    client: &GeminiClient,
    config: &Config,
    img_dir: &Path,
    identity: &[u8],
    style: Option<&[u8]>,
    result: &mut ImageResult,
) -> Result<Option<Vec<u8>>> {
    println!("    📥 ダウンロード中...");
    let source = client.load_image(&result.original_url).await?;
    std::fs::create_dir_all(img_dir)?;
    std::fs::write(img_dir.join("original-reference.jpg"), &source)?;

    println!("    📝 解析中...");
    let description = client.describe_text(&source, REMIX_DESCRIBE_PROMPT).await?;
    if !describes_model(&description) {
        println!("    ⏭️ 人物が写っていないためスキップ");
        result.error = Some("NO_MODEL".into());
        return Ok(None);
    }
    std::fs::write(img_dir.join("description.txt"), &description)?;
    result.description = Some(description.clone());
    pause(config.request_delay_ms).await;

    println!("    🎨 生成中...");
    let parts = match style {
        None => vec![Part::text(build_remix_first_prompt(&description)), Part::image(identity)],
        Some(style) => vec![
            Part::text(build_remix_follow_prompt(&description)),
            Part::image(style),
            Part::text("STYLE REFERENCE"),
            Part::image(identity),
            Part::text("IDENTITY REFERENCE"),
        ],
    };
    let outcome = client.generate_image(parts, None).await?;
    apply_outcome(result, &outcome);

    match outcome {
        GenerationOutcome::Success { images } => {
            let Some(image) = images.into_iter().next() else {
                return Ok(None);
            };
            let saved = save_and_crop(&image, img_dir, config.side_crop_percent)?;
            result.generated_path = Some(saved.generated.display().to_string());
            result.cropped_path = Some(saved.cropped.display().to_string());
            println!("    ✅ 生成: {}", saved.cropped.display());
            Ok(Some(image.data))
        }
        GenerationOutcome::Blocked { reason } => {
            println!("    ⚠️ ブロック: {}", reason);
            Ok(None)
        }
        GenerationOutcome::Error { reason } => {
            println!("    ❌ {}", reason);
            Ok(None)
        }
    }
}

/// 成功が `images_per_post` 枚に達するまで元画像を順に処理
async fn remix_post(
    client: &GeminiClient,
    config: &Config,
    options: &GenerateOptions,
    post: &PostRecord,
    identity: &[u8],
    manifest: &mut Manifest,
    summary: &mut GenerateSummary,
) -> Result<()> {
    let post_dir = options.output_dir.join(post.safe_shortcode());
    let mut style: Option<Vec<u8>> = None;
    let mut results = Vec::new();
    let mut successes = 0;

    for (idx, url) in post.images.iter().enumerate() {
        if successes >= options.images_per_post {
            break;
        }
        println!("\n  📸 画像 {}/{}", idx + 1, post.images.len());

        let mut result = ImageResult::new(idx + 1, url);
        let img_dir = post_dir.join(format!("img{}", idx + 1));
        match remix_image(client, config, &img_dir, identity, style.as_deref(), &mut result).await {
            Ok(Some(data)) => {
                successes += 1;
                if style.is_none() {
                    println!("    ⭐ 1枚目をスタイル基準に設定");
                    style = Some(data);
                }
            }
            Ok(None) => {}
            Err(e) => {
                result.status = ImageStatus::Error;
                result.error = Some(e.to_string());
                println!("    ❌ {}", e);
            }
        }

        summary.record(result.status);
        results.push(result);
        pause(config.request_delay_ms).await;
    }

    manifest.generated = results
        .iter()
        .filter(|r| r.status == ImageStatus::Success)
        .filter_map(|r| r.generated_path.clone())
        .collect();
    manifest.images = results;
    manifest.status = finish_status(manifest);
    println!(
        "\n  📊 結果: ✅{}/{}",
        manifest.count_with(ImageStatus::Success),
        manifest.images.len()
    );
    Ok(())
}
