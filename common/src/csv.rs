//! スクレイプ結果CSVの読み書き
//!
//! ヘッダー付き（`post_url,shortcode,...,image_urls`）と
//! ヘッダーなしの旧形式（位置指定）の両方を読める。

use crate::error::Result;
use crate::parser::shortcode_from_url;
use crate::types::PostRecord;
use std::collections::HashMap;
use std::path::Path;

/// 書き出し時のヘッダー
pub const CSV_HEADERS: &[&str] = &[
    "post_url",
    "shortcode",
    "caption",
    "date",
    "likes",
    "is_video",
    "image_count",
    "image_urls",
];

/// 画像URLの区切り文字
pub const IMAGE_URL_SEPARATOR: char = '|';

/// CSV行をパース（ダブルクォート、`""` エスケープ対応）
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }

    fields.push(current.trim().to_string());
    fields
}

/// パイプ区切りの画像URLを分割（空要素は除外、順序保持）
pub fn split_image_urls(value: &str) -> Vec<String> {
    value
        .split(IMAGE_URL_SEPARATOR)
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

fn is_header(fields: &[String]) -> bool {
    fields.iter().any(|f| {
        let key = normalize_header(f);
        key == "shortcode" || key == "post_url" || key == "image_urls"
    })
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE" | "yes")
}

fn record_from_map(map: &HashMap<String, String>) -> PostRecord {
    let get = |key: &str| map.get(key).cloned().unwrap_or_default();

    let post_url = if map.contains_key("post_url") { get("post_url") } else { get("url") };
    let images_raw = if map.contains_key("image_urls") { get("image_urls") } else { get("images") };

    PostRecord {
        shortcode: get("shortcode"),
        post_url,
        caption: get("caption"),
        date: get("date"),
        likes: get("likes"),
        is_video: parse_flag(&get("is_video")),
        images: split_image_urls(&images_raw),
    }
}

/// ヘッダーなし旧形式:
/// `url,shortcode,caption,date,likes,image_count,image_urls`
/// （8列の場合は `is_video` を6列目に含む）
fn record_from_positional(fields: &[String]) -> Option<PostRecord> {
    if fields.len() < 7 {
        return None;
    }
    let field = |i: usize| fields.get(i).cloned().unwrap_or_default();

    Some(PostRecord {
        post_url: field(0),
        shortcode: field(1),
        caption: field(2),
        date: field(3),
        likes: field(4),
        is_video: fields.len() >= 8 && parse_flag(&field(5)),
        images: split_image_urls(fields.last().map(String::as_str).unwrap_or("")),
    })
}

/// CSV文字列から投稿一覧を取得
///
/// ショートコードが空の行は `post_url` から補完し、それでも取れない行は除外する。
pub fn parse_posts(content: &str) -> Vec<PostRecord> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty())
        .collect();

    let Some(first) = lines.first() else {
        return Vec::new();
    };

    let first_fields = parse_csv_line(first);
    let mut posts: Vec<PostRecord> = if is_header(&first_fields) {
        let headers: Vec<String> = first_fields.iter().map(|h| normalize_header(h)).collect();
        lines[1..]
            .iter()
            .map(|line| {
                let values = parse_csv_line(line);
                let map: HashMap<String, String> = headers
                    .iter()
                    .enumerate()
                    .map(|(idx, h)| (h.clone(), values.get(idx).cloned().unwrap_or_default()))
                    .collect();
                record_from_map(&map)
            })
            .collect()
    } else {
        lines
            .iter()
            .filter_map(|line| record_from_positional(&parse_csv_line(line)))
            .collect()
    };

    for post in &mut posts {
        if post.shortcode.is_empty() {
            if let Some(code) = shortcode_from_url(&post.post_url) {
                post.shortcode = code;
            }
        }
    }

    posts.retain(|p| !p.shortcode.is_empty());
    posts
}

/// CSVファイルから投稿一覧を読み込み
pub fn load_posts(path: &Path) -> Result<Vec<PostRecord>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_posts(&content))
}

fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// 投稿一覧をCSV文字列に変換（キャプションの改行はスペースに置換）
pub fn posts_to_csv(posts: &[PostRecord]) -> String {
    let mut lines = vec![CSV_HEADERS.join(",")];

    for post in posts {
        let caption = post.caption.replace(['\r', '\n'], " ");
        let image_urls = post.images.join("|");
        let row = [
            escape_field(&post.post_url),
            escape_field(&post.shortcode),
            escape_field(&caption),
            escape_field(&post.date),
            escape_field(&post.likes),
            if post.is_video { "1".to_string() } else { "0".to_string() },
            post.images.len().to_string(),
            escape_field(&image_urls),
        ];
        lines.push(row.join(","));
    }

    lines.join("\n")
}

/// 投稿一覧をCSVファイルに保存
pub fn save_posts(path: &Path, posts: &[PostRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, posts_to_csv(posts))?;
    Ok(())
}
