mod extract;

pub use extract::{collect_post_links, extract_post, is_content_image, parse_likes, PostPage};

use crate::config::Config;
use crate::error::{RemixError, Result};
use crate::gemini::build_http_client;
use crate::session::Session;
use extract::INSTAGRAM_BASE;
use fashion_remix_common::{save_posts, shortcode_from_url, PostRecord};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::COOKIE;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// スクレイプ対象のプロフィール
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileTarget {
    pub url: String,
    pub username: String,
}

impl ProfileTarget {
    /// `@name` / `name` / プロフィールURL を正規化
    pub fn parse(target: &str) -> Result<Self> {
        let target = target.trim();

        let url = if target.starts_with("http") {
            target.to_string()
        } else {
            format!("{}/{}/", INSTAGRAM_BASE, target.trim_start_matches('@'))
        };

        let parsed = Url::parse(&url)
            .map_err(|e| RemixError::Config(format!("不正なプロフィールURL {}: {}", url, e)))?;
        let username: String = parsed.path().chars().filter(|c| *c != '/').collect();

        if username.is_empty() {
            return Err(RemixError::Config(format!("ユーザー名を特定できません: {}", target)));
        }

        Ok(Self { url, username })
    }

    /// 出力CSVのパス（`<out>/<username>-scraped.csv`）
    pub fn csv_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(format!("{}-scraped.csv", self.username))
    }
}

/// プロフィール・投稿ページのスクレイパー
pub struct InstagramScraper {
    http: reqwest::Client,
    cookie: Option<String>,
    post_delay: Duration,
}

impl InstagramScraper {
    pub fn new(config: &Config, session: Option<&Session>) -> Result<Self> {
        Ok(Self {
            http: build_http_client(config.proxy.as_deref(), config.timeout_seconds)?,
            cookie: session.map(|s| s.cookie.clone()),
            post_delay: Duration::from_millis(config.post_delay_ms),
        })
    }

    /// ページ取得（ログインページへのリダイレクトは `NotLoggedIn`）
    async fn fetch_page(&self, url: &str) -> Result<String> {
        let mut request = self.http.get(url);
        if let Some(cookie) = &self.cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await?;
        if response.url().path().starts_with("/accounts/login") {
            return Err(RemixError::NotLoggedIn(url.to_string()));
        }

        let status = response.status();
        if !status.is_success() {
            return Err(RemixError::Download {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }

    /// 投稿1件を取得して `PostRecord` にする
    pub async fn scrape_post(&self, post_url: &str) -> Result<PostRecord> {
        let html = self.fetch_page(post_url).await?;
        let page = extract_post(&html)?;

        Ok(PostRecord {
            post_url: post_url.to_string(),
            shortcode: shortcode_from_url(post_url).unwrap_or_default(),
            caption: page.caption,
            date: page.date,
            likes: page.likes,
            is_video: page.is_video,
            images: page.image_urls,
        })
    }

    /// プロフィールの投稿を順に取得
    ///
    /// 投稿ごとの失敗はログに出してスキップする。画像のない投稿も除外。
    pub async fn scrape_profile(
        &self,
        target: &ProfileTarget,
        limit: Option<usize>,
    ) -> Result<Vec<PostRecord>> {
        println!("🌐 プロフィールを読み込み中...");
        let html = self.fetch_page(&target.url).await?;
        let links = collect_post_links(&html, limit)?;
        println!("✔ {}件の投稿を検出\n", links.len());

        let pb = ProgressBar::new(links.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let mut posts = Vec::new();
        for (i, link) in links.iter().enumerate() {
            pb.set_message(link.clone());
            match self.scrape_post(link).await {
                Ok(post) if post.images.is_empty() => {
                    pb.println(format!("  ⚠️ 画像なし: {}", link));
                }
                Ok(post) => {
                    debug!("{}: {}枚", post.shortcode, post.images.len());
                    posts.push(post);
                }
                Err(e @ RemixError::NotLoggedIn(_)) => {
                    pb.finish_and_clear();
                    return Err(e);
                }
                Err(e) => {
                    warn!("投稿の取得に失敗 {}: {}", link, e);
                    pb.println(format!("  ❌ {}: {}", link, e));
                }
            }
            pb.inc(1);

            if i + 1 < links.len() {
                tokio::time::sleep(self.post_delay).await;
            }
        }
        pb.finish_and_clear();

        Ok(posts)
    }
}

/// スクレイプしてCSVに保存（1件も取れなければ `None`）
pub async fn scrape_to_csv(
    config: &Config,
    target: &str,
    limit: Option<usize>,
    output_dir: &Path,
    session: Option<&Session>,
) -> Result<Option<PathBuf>> {
    let target = ProfileTarget::parse(target)?;
    println!("🎯 スクレイプ: {}", target.username);
    if let Some(limit) = limit {
        println!("  上限: {}件", limit);
    }
    println!("  出力: {}", output_dir.display());
    if let Some(session) = session {
        println!("  セッション: {}", session.name);
    }
    println!();

    let scraper = InstagramScraper::new(config, session)?;
    let posts = scraper.scrape_profile(&target, limit).await?;

    if posts.is_empty() {
        println!("⚠️ 投稿を取得できませんでした");
        return Ok(None);
    }

    let csv_path = target.csv_path(output_dir);
    save_posts(&csv_path, &posts)?;
    println!("✔ {}件を保存: {}", posts.len(), csv_path.display());
    Ok(Some(csv_path))
}
