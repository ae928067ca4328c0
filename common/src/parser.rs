//! APIレスポンスパーサー
//!
//! Geminiのテキスト応答からJSONを取り出す。
//! 取り出せない場合も失敗させず `{raw, error}` 形式のプレースホルダーを返す。

use serde_json::{json, Value};

/// テキスト応答からJSON候補文字列を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. ``` ... ``` ブロック
/// 3. 応答全体
///
/// # Examples
/// ```
/// use fashion_remix_common::extract_json_block;
///
/// let text = "Result:\n```json\n{\"a\": 1}\n```";
/// assert_eq!(extract_json_block(text), "{\"a\": 1}");
/// ```
pub fn extract_json_block(text: &str) -> &str {
    if let Some(start_marker) = text.find("```json") {
        let start = start_marker + "```json".len();
        if let Some(end_offset) = text[start..].find("```") {
            return text[start..start + end_offset].trim();
        }
    }

    if let Some(start_marker) = text.find("```") {
        let start = start_marker + 3;
        if let Some(end_offset) = text[start..].find("```") {
            return text[start..start + end_offset].trim();
        }
    }

    text.trim()
}

/// 文中の最外側 `{...}` を探す
fn find_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// テキスト応答をJSONとして解釈（失敗しない）
///
/// パースに失敗した場合は `{ raw_key: text, error_key: message }` を返す。
pub fn parse_extraction(text: &str, raw_key: &str, error_key: &str) -> Value {
    let candidate = extract_json_block(text);

    let err = match serde_json::from_str::<Value>(candidate) {
        Ok(value) => return value,
        Err(e) => e,
    };

    if let Some(object) = find_object(candidate) {
        if let Ok(value) = serde_json::from_str::<Value>(object) {
            return value;
        }
    }

    let mut placeholder = serde_json::Map::new();
    placeholder.insert(raw_key.to_string(), json!(text));
    placeholder.insert(error_key.to_string(), json!(format!("Failed to parse JSON: {}", err)));
    Value::Object(placeholder)
}

/// 構造化説明（describe）用のパース
pub fn parse_description(text: &str) -> Value {
    parse_extraction(text, "raw_description", "parse_error")
}

/// プレースホルダー（パース失敗）かどうか
pub fn is_placeholder(value: &Value) -> bool {
    (value.get("raw").is_some() && value.get("error").is_some())
        || (value.get("raw_description").is_some() && value.get("parse_error").is_some())
}

/// 投稿URLからショートコードを抽出
///
/// `/p/<code>/` または `/reel/<code>/` のセグメントを返す。
pub fn shortcode_from_url(url: &str) -> Option<String> {
    let rest = ["/p/", "/reel/"]
        .iter()
        .find_map(|marker| url.find(marker).map(|pos| &url[pos + marker.len()..]))?;

    let code: String = rest
        .chars()
        .take_while(|c| !matches!(c, '/' | '?' | '#'))
        .collect();

    (!code.is_empty()).then_some(code)
}
