use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use fashion_remix::cli::{Cli, Commands, ReviewAction, SessionAction};
use fashion_remix::config::{proxy_host, Config};
use fashion_remix::gemini::{DescriptionCache, GeminiClient};
use fashion_remix::imaging::{self, CropSpec};
use fashion_remix::pipeline::{daily, describe, generate, mix, repository};
use fashion_remix::review::{self, ReviewStore};
use fashion_remix::session::{self, Session, SessionStore};
use fashion_remix::upload::{self, OutboxUploader};
use fashion_remix::scraper;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "fashion_remix=info,fashion_remix_common=info"
    } else {
        "fashion_remix=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}

fn client(config: &Config, cli_key: Option<&str>) -> anyhow::Result<GeminiClient> {
    let api_key = config.get_api_key(cli_key)?;
    Ok(GeminiClient::new(api_key, config)?)
}

fn load_session(config: &Config, name: Option<&str>) -> anyhow::Result<Option<Session>> {
    match name {
        Some(name) => {
            let session = SessionStore::new(&config.sessions_dir)
                .load(name)
                .with_context(|| format!("セッション {} を読み込めません", name))?;
            Ok(Some(session))
        }
        None => Ok(None),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load().context("設定の読み込みに失敗しました")?;
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    let api_key = cli.api_key.as_deref();

    match cli.command {
        Commands::Scrape { target, limit, output, session } => {
            println!("📸 fashion-remix - スクレイプ\n");
            let session = load_session(&config, session.as_deref())?;
            let output = output.unwrap_or_else(|| config.data_dir.clone());

            match scraper::scrape_to_csv(&config, &target, limit, &output, session.as_ref()).await? {
                Some(path) => println!("\n✅ 完了: {}", path.display()),
                None => println!("\n⚠️ 保存する投稿がありませんでした"),
            }
        }

        Commands::Describe { input, output, use_cache } => {
            let client = client(&config, api_key)?;
            describe::run(&client, &config, &input, &output, use_cache).await?;
        }

        Commands::Generate {
            input,
            output,
            mode,
            identity,
            aspect_ratio,
            prompt,
            limit,
            images_per_post,
        } => {
            let client = client(&config, api_key)?;
            let options = generate::GenerateOptions {
                input,
                output_dir: output.unwrap_or_else(|| config.generated_dir.clone()),
                mode,
                identity,
                aspect_ratio,
                prompt,
                limit,
                images_per_post: images_per_post.unwrap_or(config.images_per_post),
            };
            generate::run(&client, &config, &options).await?;
        }

        Commands::Review { action } => {
            let store = ReviewStore::new(&config.review_dir);
            match action {
                ReviewAction::Show { input } => {
                    let input = input.unwrap_or_else(|| config.generated_dir.clone());
                    review::show(&input, &store)?;
                }
                ReviewAction::Approve { id } => {
                    store.approve(&id)?;
                    println!("✔ 承認しました: {}", id);
                }
                ReviewAction::Reject { id } => {
                    store.reject(&id)?;
                    println!("✔ 却下しました: {}", id);
                }
                ReviewAction::Pending => review::print_status(&store)?,
            }
        }

        Commands::Upload { account } => {
            let store = ReviewStore::new(&config.review_dir);
            let uploader = OutboxUploader::new(&config.outbox_dir);
            let summary = upload::upload_approved(&store, &uploader, &account)?;
            if !summary.failed.is_empty() {
                anyhow::bail!("{}件のアップロードに失敗しました", summary.failed.len());
            }
        }

        Commands::Daily { source, dest, rescrape, mode, identity, limit, session } => {
            let client = client(&config, api_key)?;
            let session = load_session(&config, session.as_deref())?;
            let options = daily::DailyOptions {
                source,
                dest,
                rescrape,
                mode,
                identity,
                limit,
            };
            daily::run(&client, &config, &options, session.as_ref()).await?;
        }

        Commands::Session { action } => {
            let store = SessionStore::new(&config.sessions_dir);
            match action {
                SessionAction::List => {
                    let sessions = store.list()?;
                    if sessions.is_empty() {
                        println!("セッションがありません: {}", store.root().display());
                        println!("  作成: remix session create --name <name>");
                    } else {
                        println!("🔐 セッション一覧:");
                        for s in sessions {
                            println!("  • {} ({})", s.name, s.created_at);
                        }
                    }
                }
                SessionAction::Create { name, cookie } => {
                    let cookie = match cookie {
                        Some(cookie) => cookie,
                        None => session::prompt_cookie()?,
                    };
                    let created = store.create(&name, &cookie, &Utc::now().to_rfc3339())?;
                    println!("✔ セッションを作成しました: {}", created.name);
                    println!("  使用: remix scrape <target> --session {}", created.name);
                }
                SessionAction::Delete { name } => {
                    store.delete(&name)?;
                    println!("✔ セッションを削除しました: {}", name);
                }
            }
        }

        Commands::Extract { input, handle, limit } => {
            let client = client(&config, api_key)?;
            repository::run(&client, &config, &input, handle.as_deref(), limit).await?;
        }

        Commands::Mix { count, identity } => {
            let client = client(&config, api_key)?;
            mix::run(&client, &config, count, Some(&identity)).await?;
        }

        Commands::Crop { input, ratio, side, anchor, output } => {
            let spec = CropSpec {
                ratio,
                side_percent: side.unwrap_or(config.side_crop_percent),
                anchor,
            };
            println!("✂️ クロップ: {} ({}, 左右{}%, {})\n", input.display(), ratio, spec.side_percent, anchor);

            if input.is_dir() {
                let output = output.unwrap_or_else(|| input.join("cropped"));
                let results = imaging::crop_directory(&input, &output, spec)?;
                let mut failed = 0;
                for (path, result) in &results {
                    match result {
                        Ok(rect) => println!("  ✔ {} → {}x{}", path.display(), rect.width, rect.height),
                        Err(e) => {
                            failed += 1;
                            println!("  ❌ {}: {}", path.display(), e);
                        }
                    }
                }
                println!("\n✅ {}枚をクロップ（失敗 {}）: {}", results.len() - failed, failed, output.display());
            } else {
                let output = output.unwrap_or_else(|| {
                    input.with_file_name(imaging::cropped_name(&input))
                });
                let rect = imaging::crop_file(&input, &output, spec)?;
                println!(
                    "✅ {}x{}+{}+{} → {}",
                    rect.width,
                    rect.height,
                    rect.left,
                    rect.top,
                    output.display()
                );
            }
        }

        Commands::Config { set_api_key, set_proxy, show } => {
            // 環境変数の値をファイルに書き込まないよう、ファイルの内容だけを編集する
            let path = Config::config_path()?;
            let mut stored = Config::load_from(&path)?;

            if let Some(key) = set_api_key {
                stored.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }
            if let Some(proxy) = set_proxy {
                stored.set_proxy(Some(proxy))?;
                match &stored.proxy {
                    Some(p) => println!("✔ プロキシを設定しました: {}", proxy_host(p)),
                    None => println!("✔ プロキシを解除しました"),
                }
            }

            if show {
                // 更新後のファイル内容に環境変数とCLI引数を重ねて表示
                let mut shown = stored.clone();
                shown.apply_env();
                if let Some(model) = &cli.model {
                    shown.model = model.clone();
                }
                println!("設定 ({}):", path.display());
                for line in shown.summary_lines() {
                    println!("  {}", line);
                }
            }
        }

        Commands::Cache { clear, folder, info } => {
            let target = folder.unwrap_or_else(|| PathBuf::from("./descriptions"));
            let cache_path = DescriptionCache::cache_path(&target);

            if info || !clear {
                if cache_path.exists() {
                    let cache = DescriptionCache::load(&target);
                    println!("キャッシュ情報:");
                    println!("  パス: {}", cache_path.display());
                    println!("  件数: {}", cache.len());
                    if let Ok(meta) = std::fs::metadata(&cache_path) {
                        println!("  サイズ: {} bytes", meta.len());
                    }
                } else {
                    println!("キャッシュファイルが存在しません: {}", cache_path.display());
                }
            }

            if clear {
                match DescriptionCache::clear(&target) {
                    Ok(true) => println!("✔ キャッシュを削除しました: {}", cache_path.display()),
                    Ok(false) => println!("キャッシュファイルが存在しません"),
                    Err(e) => println!("キャッシュ削除エラー: {}", e),
                }
            }
        }
    }

    Ok(())
}
