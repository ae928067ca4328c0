//! HTMLからの投稿情報抽出
//!
//! ネットワークに依存しない純粋関数のみ。ページ取得は `scraper/mod.rs`。

use crate::error::{RemixError, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

pub const INSTAGRAM_BASE: &str = "https://www.instagram.com";

/// アバター画像のパス
const AVATAR_MARKER: &str = "/t51.2885-19/";
/// サムネイルのサイズ指定
const THUMBNAIL_MARKER: &str = "s150x150";
const IMAGE_HOSTS: &[&str] = &["instagram.com", "cdninstagram.com", "fbcdn.net"];

/// 投稿ページから抽出した情報
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostPage {
    pub caption: String,
    pub date: String,
    pub likes: String,
    pub is_video: bool,
    pub image_urls: Vec<String>,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| RemixError::Scrape(format!("セレクタ {}: {}", css, e)))
}

fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn meta_content(document: &Html, property: &str) -> Result<Option<String>> {
    let sel = selector(&format!(r#"meta[property="{}"]"#, property))?;
    Ok(document
        .select(&sel)
        .filter_map(|m| m.value().attr("content"))
        .map(str::to_string)
        .next())
}

/// プロフィールページから投稿URLを収集
///
/// クエリを除去し、出現順を保ったまま重複を除く。相対パスは絶対URLにする。
pub fn collect_post_links(html: &str, limit: Option<usize>) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let links = selector(r#"a[href*="/p/"]"#)?;

    let mut seen = std::collections::HashSet::new();
    let mut urls = Vec::new();
    for href in document.select(&links).filter_map(|a| a.value().attr("href")) {
        let path = href.split(['?', '#']).next().unwrap_or(href);
        let absolute = if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", INSTAGRAM_BASE, path)
        };

        if seen.insert(absolute.clone()) {
            urls.push(absolute);
        }
    }

    if let Some(limit) = limit {
        urls.truncate(limit);
    }
    Ok(urls)
}

/// 投稿画像として扱うURLか（アバター・サムネイル・外部ホストは除外）
pub fn is_content_image(src: &str) -> bool {
    if src.contains(AVATAR_MARKER) || src.contains(THUMBNAIL_MARKER) {
        return false;
    }

    let Ok(url) = Url::parse(src) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    // 完全一致かサブドメインのみ
    IMAGE_HOSTS.iter().any(|allowed| {
        host == *allowed
            || host
                .strip_suffix(*allowed)
                .map_or(false, |prefix| prefix.ends_with('.'))
    })
}

lazy_static::lazy_static! {
    static ref LIKES_RE: Regex = Regex::new(r"(?i)([\d][\d,.]*\s*[KkMm]?)\s+likes?\b").unwrap();
}

/// 「1,234 likes」形式から件数部分を取り出す
pub fn parse_likes(text: &str) -> Option<String> {
    LIKES_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// og:description（`N likes, M comments - user on DATE: "caption"`）からキャプション部分
fn caption_from_og(description: &str) -> String {
    match description.split_once(": \"") {
        Some((_, rest)) => rest.trim_end().trim_end_matches('.').trim_end_matches('"').to_string(),
        None => description.trim().to_string(),
    }
}

/// 投稿ページを解析
pub fn extract_post(html: &str) -> Result<PostPage> {
    let document = Html::parse_document(html);
    let og_description = meta_content(&document, "og:description")?;

    let caption = document
        .select(&selector("article h1")?)
        .map(text_of)
        .find(|t| !t.is_empty())
        .or_else(|| og_description.as_deref().map(caption_from_og))
        .unwrap_or_default();

    let date = document
        .select(&selector("time[datetime]")?)
        .filter_map(|t| t.value().attr("datetime"))
        .map(str::to_string)
        .next()
        .unwrap_or_default();

    let likes = document
        .select(&selector("section span")?)
        .map(text_of)
        .find_map(|t| parse_likes(&t))
        .or_else(|| og_description.as_deref().and_then(parse_likes))
        .unwrap_or_default();

    let is_video = document.select(&selector("video")?).next().is_some()
        || meta_content(&document, "og:video")?.is_some();

    let mut image_urls: Vec<String> = Vec::new();
    let img_selector = selector("img[src]")?;
    let img_srcs = document
        .select(&img_selector)
        .filter_map(|img| img.value().attr("src"))
        .map(str::to_string);
    let og_image = meta_content(&document, "og:image")?;

    for src in img_srcs.chain(og_image) {
        if is_content_image(&src) && !image_urls.contains(&src) {
            image_urls.push(src);
        }
    }

    Ok(PostPage {
        caption,
        date,
        likes,
        is_video,
        image_urls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE_HTML: &str = r#"
        <html><body>
          <a href="/p/AAA111/?img_index=1">one</a>
          <a href="/p/BBB222/">two</a>
          <a href="/p/AAA111/">dup</a>
          <a href="/explore/">explore</a>
          <a href="https://www.instagram.com/p/CCC333/">abs</a>
        </body></html>"#;

    const POST_HTML: &str = r#"
        <html><head>
          <meta property="og:description" content="1,234 likes, 12 comments - jane on January 1, 2024: &quot;Sunday linen&quot;.">
          <meta property="og:image" content="https://scontent.cdninstagram.com/v/t51.29350-15/og.jpg?stp=dst">
        </head><body>
          <article>
            <h1>Sunday   linen
              set</h1>
            <time datetime="2024-01-01T10:00:00.000Z">Jan 1</time>
            <img src="https://scontent.cdninstagram.com/v/t51.2885-19/avatar.jpg">
            <img src="https://scontent-lax3-1.xx.fbcdn.net/v/t51.29350-15/a.jpg?x=1&amp;y=2">
            <img src="https://scontent-lax3-1.xx.fbcdn.net/v/t51.29350-15/a.jpg?x=1&amp;y=2">
            <img src="https://scontent.cdninstagram.com/v/s150x150/thumb.jpg">
            <img src="https://evil.example.com/instagram.com/x.jpg">
          </article>
          <section><span>Liked by friends</span><span>1,234 likes</span></section>
        </body></html>"#;

    #[test]
    fn test_collect_post_links() {
        let links = collect_post_links(PROFILE_HTML, None).unwrap();
        assert_eq!(
            links,
            vec![
                "https://www.instagram.com/p/AAA111/",
                "https://www.instagram.com/p/BBB222/",
                "https://www.instagram.com/p/CCC333/",
            ]
        );

        let limited = collect_post_links(PROFILE_HTML, Some(1)).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_extract_post() {
        let post = extract_post(POST_HTML).unwrap();
        assert_eq!(post.caption, "Sunday linen set");
        assert_eq!(post.date, "2024-01-01T10:00:00.000Z");
        assert_eq!(post.likes, "1,234");
        assert!(!post.is_video);
        assert_eq!(
            post.image_urls,
            vec![
                "https://scontent-lax3-1.xx.fbcdn.net/v/t51.29350-15/a.jpg?x=1&y=2",
                "https://scontent.cdninstagram.com/v/t51.29350-15/og.jpg?stp=dst",
            ]
        );
    }

    #[test]
    fn test_caption_falls_back_to_og_description() {
        let html = r#"<html><head>
            <meta property="og:description" content="10 likes, 0 comments - jane on March 3, 2024: &quot;Beach day&quot;.">
            <meta property="og:video" content="https://video.example/v.mp4">
        </head><body></body></html>"#;
        let post = extract_post(html).unwrap();
        assert_eq!(post.caption, "Beach day");
        assert_eq!(post.likes, "10");
        assert!(post.is_video);
        assert!(post.image_urls.is_empty());
    }

    #[test]
    fn test_is_content_image() {
        assert!(is_content_image("https://instagram.com/a.jpg"));
        assert!(is_content_image("https://scontent.cdninstagram.com/a.jpg"));
        assert!(is_content_image("https://x.fbcdn.net/a.jpg"));
        assert!(!is_content_image("https://x.fbcdn.net/v/t51.2885-19/a.jpg"));
        assert!(!is_content_image("https://x.fbcdn.net/s150x150/a.jpg"));
        assert!(!is_content_image("https://example.com/instagram.com/a.jpg"));
        assert!(!is_content_image("data:image/png;base64,AAAA"));
    }

    #[test]
    fn test_lookalike_hosts_rejected() {
        assert!(!is_content_image("https://instagram.com.evil.net/a.jpg"));
        assert!(!is_content_image("https://evilinstagram.com/a.jpg"));
        assert!(!is_content_image("https://fbcdn.net.example.org/a.jpg"));
        assert!(is_content_image("https://scontent-nrt1-1.cdninstagram.com/v/t51.29350-15/a.jpg"));
        assert!(is_content_image("https://www.instagram.com/a.jpg"));
    }

    #[test]
    fn test_parse_likes() {
        assert_eq!(parse_likes("1,234 likes").as_deref(), Some("1,234"));
        assert_eq!(parse_likes("1 like").as_deref(), Some("1"));
        assert_eq!(parse_likes("12.5K likes, 3 comments").as_deref(), Some("12.5K"));
        assert!(parse_likes("Liked by friends").is_none());
    }
}
