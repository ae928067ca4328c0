//! 画像の構造化説明（単一画像 / CSVバッチ）

use super::{load_csv, now, pause, write_json};
use crate::config::Config;
use crate::error::Result;
use crate::gemini::{cache_key, DescriptionCache, GeminiClient};
use fashion_remix_common::is_placeholder;
use fashion_remix_common::prompts::DESCRIBE_PROMPT;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
pub const SINGLE_OUTPUT_NAME: &str = "single_image_desc.json";
pub const MASTER_OUTPUT_NAME: &str = "all_descriptions.json";

/// 入力の種類
#[derive(Debug, Clone, PartialEq)]
pub enum DescribeInput {
    Image(String),
    Csv(PathBuf),
}

impl DescribeInput {
    /// URL・画像拡張子なら単一画像、それ以外はCSV
    pub fn classify(input: &str) -> Self {
        if input.starts_with("http://") || input.starts_with("https://") {
            return DescribeInput::Image(input.to_string());
        }
        let is_image = Path::new(input)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()));
        if is_image {
            DescribeInput::Image(input.to_string())
        } else {
            DescribeInput::Csv(PathBuf::from(input))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescribeSummary {
    pub posts: usize,
    pub images: usize,
    pub failed: usize,
    pub cached: usize,
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// 1枚を説明する（キャッシュがあれば参照・更新）
///
/// 戻り値の `bool` はキャッシュヒットかどうか。
pub(crate) async fn describe_source(
    client: &GeminiClient,
    cache: &mut Option<DescriptionCache>,
    source: &str,
) -> Result<(Value, bool)> {
    // パース失敗のプレースホルダーは再利用しない
    let lookup = |cache: &Option<DescriptionCache>, key: &str| {
        cache
            .as_ref()
            .and_then(|c| c.get(key))
            .filter(|hit| !is_placeholder(hit))
            .cloned()
    };

    let url_key = is_remote(source).then(|| cache_key(source, None));
    if let Some(hit) = url_key.as_deref().and_then(|key| lookup(cache, key)) {
        return Ok((hit, true));
    }

    let bytes = client.load_image(source).await?;
    let key = url_key.unwrap_or_else(|| cache_key(source, Some(&bytes)));
    if let Some(hit) = lookup(cache, &key) {
        return Ok((hit, true));
    }

    let description = client.describe(&bytes, DESCRIBE_PROMPT).await?;
    if is_placeholder(&description) {
        warn!("説明をJSONとして解釈できません（キャッシュしません）: {}", source);
    } else if let Some(cache) = cache.as_mut() {
        cache.insert(key, source, client.model(), &now(), description.clone());
    }
    Ok((description, false))
}

fn field<'a>(value: &'a Value, section: &str, key: &str) -> &'a str {
    value
        .get(section)
        .and_then(|s| s.get(key))
        .and_then(Value::as_str)
        .unwrap_or("N/A")
}

/// `{url, index, ...description}`
fn image_entry(url: &str, index: usize, description: Value) -> Value {
    let mut entry = Map::new();
    entry.insert("url".into(), json!(url));
    entry.insert("index".into(), json!(index));
    match description {
        Value::Object(fields) => entry.extend(fields),
        other => {
            entry.insert("description".into(), other);
        }
    }
    Value::Object(entry)
}

/// `describe` コマンド本体
pub async fn run(
    client: &GeminiClient,
    config: &Config,
    input: &str,
    output_dir: &Path,
    use_cache: bool,
) -> Result<DescribeSummary> {
    println!("🔍 画像の説明");
    println!("  入力: {}", input);
    println!("  出力: {}", output_dir.display());
    println!("  モデル: {}{}\n", client.model(), if use_cache { " (キャッシュ有効)" } else { "" });

    std::fs::create_dir_all(output_dir)?;
    let mut cache = use_cache.then(|| DescriptionCache::load(output_dir));

    let summary = match DescribeInput::classify(input) {
        DescribeInput::Image(source) => describe_single(client, &mut cache, &source, output_dir).await?,
        DescribeInput::Csv(path) => describe_csv(client, config, &mut cache, &path, output_dir).await?,
    };

    if let Some(cache) = &cache {
        cache.save(output_dir)?;
        debug!("キャッシュ件数: {}", cache.len());
    }
    Ok(summary)
}

async fn describe_single(
    client: &GeminiClient,
    cache: &mut Option<DescriptionCache>,
    source: &str,
    output_dir: &Path,
) -> Result<DescribeSummary> {
    println!("モード: 単一画像\n");
    let (description, cached) = describe_source(client, cache, source).await?;

    let output = output_dir.join(SINGLE_OUTPUT_NAME);
    write_json(&output, &description)?;

    println!("📋 説明:");
    println!("{}", serde_json::to_string_pretty(&description)?);
    println!("\n✅ 保存: {}", output.display());

    Ok(DescribeSummary {
        posts: 0,
        images: 1,
        failed: 0,
        cached: usize::from(cached),
    })
}

async fn describe_csv(
    client: &GeminiClient,
    config: &Config,
    cache: &mut Option<DescriptionCache>,
    csv_path: &Path,
    output_dir: &Path,
) -> Result<DescribeSummary> {
    let posts = load_csv(csv_path)?;
    println!("モード: CSVバッチ（{}件）", posts.len());

    let mut summary = DescribeSummary::default();
    let mut all_posts = Vec::with_capacity(posts.len());

    for (post_idx, post) in posts.iter().enumerate() {
        println!("\n📄 {}: {}枚", post.shortcode, post.images.len());
        let safe = post.safe_shortcode();
        let mut entries = Vec::with_capacity(post.images.len());

        for (idx, url) in post.images.iter().enumerate() {
            println!("  [{}] 解析中...", idx + 1);
            match describe_source(client, cache, url).await {
                Ok((description, cached)) => {
                    write_json(&output_dir.join(format!("{}_img{}.json", safe, idx)), &description)?;
                    println!(
                        "    ✔ 品質: {}{}",
                        field(&description, "meta", "quality"),
                        if cached { "（キャッシュ）" } else { "" }
                    );
                    println!("      シーン: {}", field(&description, "scene", "location"));
                    println!("      動作: {}", field(&description, "subject", "action"));

                    if cached {
                        summary.cached += 1;
                    } else {
                        pause(config.request_delay_ms).await;
                    }
                    entries.push(image_entry(url, idx, description));
                }
                Err(e) => {
                    warn!("説明に失敗 {} [{}]: {}", post.shortcode, idx, e);
                    println!("    ❌ {}", e);
                    summary.failed += 1;
                    entries.push(json!({ "url": url, "index": idx, "error": e.to_string() }));
                }
            }
        }

        summary.images += entries.len();
        let post_json = json!({
            "shortcode": post.shortcode,
            "postUrl": post.post_url,
            "caption": post.caption,
            "images": entries,
            "timestamp": now(),
        });
        write_json(&output_dir.join(format!("{}_all.json", safe)), &post_json)?;
        all_posts.push(post_json);

        if let Some(cache) = cache.as_ref() {
            cache.save(output_dir)?;
        }
        if post_idx + 1 < posts.len() {
            pause(config.post_delay_ms).await;
        }
    }
    summary.posts = all_posts.len();

    let master = output_dir.join(MASTER_OUTPUT_NAME);
    write_json(
        &master,
        &json!({
            "totalPosts": summary.posts,
            "totalImages": summary.images,
            "posts": all_posts,
            "timestamp": now(),
        }),
    )?;

    println!("\n{}", "=".repeat(60));
    println!("✅ バッチ解析完了");
    println!("  投稿: {}件 / 画像: {}枚（失敗 {}、キャッシュ {}）", summary.posts, summary.images, summary.failed, summary.cached);
    println!("  出力:");
    println!("    - {}", master.display());
    println!("    - {}/*_img*.json", output_dir.display());
    println!("    - {}/*_all.json", output_dir.display());

    Ok(summary)
}
