//! デイリーワークフロー: スクレイプ → 生成 → レビュー同期

use super::generate::{self, GenerateMode, GenerateOptions};
use crate::config::Config;
use crate::error::{RemixError, Result};
use crate::gemini::GeminiClient;
use crate::review::{self, ReviewStore};
use crate::scraper::{self, ProfileTarget};
use crate::session::Session;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct DailyOptions {
    pub source: String,
    pub dest: String,
    pub rescrape: bool,
    pub mode: GenerateMode,
    pub identity: Option<PathBuf>,
    pub limit: Option<usize>,
}

fn banner(title: &str) {
    println!("{}", "═".repeat(60));
    println!("{}", title);
    println!("{}", "═".repeat(60));
}

/// 既存CSVがあり再スクレイプ指定がなければスクレイプを省略する
pub fn should_scrape(csv_path: &std::path::Path, rescrape: bool) -> bool {
    rescrape || !csv_path.exists()
}

pub async fn run(
    client: &GeminiClient,
    config: &Config,
    options: &DailyOptions,
    session: Option<&Session>,
) -> Result<()> {
    let target = ProfileTarget::parse(&options.source)?;
    let csv_path = target.csv_path(&config.data_dir);

    println!("🔄 デイリーワークフロー: {} → {}\n", options.source, options.dest);

    if should_scrape(&csv_path, options.rescrape) {
        banner("STEP 1: スクレイプ");
        scraper::scrape_to_csv(config, &options.source, None, &config.data_dir, session).await?;
    } else {
        banner("STEP 1: スクレイプ（既存CSVを使用）");
        println!("使用: {}\n", csv_path.display());
    }

    if !csv_path.exists() {
        return Err(RemixError::Scrape(format!(
            "スクレイプ結果がありません: {}",
            csv_path.display()
        )));
    }

    println!();
    banner("STEP 2: 生成");
    let generate_options = GenerateOptions {
        input: csv_path,
        output_dir: config.generated_dir.clone(),
        mode: options.mode,
        identity: options.identity.clone(),
        aspect_ratio: None,
        prompt: None,
        limit: options.limit,
        images_per_post: config.images_per_post,
    };
    generate::run(client, config, &generate_options).await?;

    println!();
    banner("STEP 3: レビュー");
    let store = ReviewStore::new(&config.review_dir);
    review::show(&config.generated_dir, &store)?;

    println!("\n📸 生成結果を確認して投稿を承認してください");
    println!("  承認: remix review approve --id <post-id>");
    println!("  投稿: remix upload --account {}", options.dest);
    Ok(())
}
