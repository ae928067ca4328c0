use super::types::{
    Content, GenerateRequest, GenerateResponse, GenerationConfig, GenerationOutcome, Part,
    VariantOutcome,
};
use crate::config::Config;
use crate::error::{RemixError, Result};
use fashion_remix_common::parser::{parse_description, parse_extraction};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Gemini generateContent クライアント
///
/// 説明・抽出・画像生成・画像ダウンロードはすべてこのクライアントを通す。
/// プロキシとタイムアウトは全リクエストに適用される。
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    image_model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, config: &Config) -> Result<Self> {
        let http = build_http_client(config.proxy.as_deref(), config.timeout_seconds)?;
        Ok(Self {
            http,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: config.model.clone(),
            image_model: config.image_model.clone(),
        })
    }

    /// エンドポイントを差し替える（テスト用）
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// URLから画像を取得（リダイレクト追従、非2xxはエラー）
    pub async fn download_image(&self, url: &str) -> Result<Vec<u8>> {
        debug!("画像ダウンロード: {}", url);
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemixError::Download {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// URLまたはローカルパスから画像を読み込み
    pub async fn load_image(&self, source: &str) -> Result<Vec<u8>> {
        if source.starts_with("http://") || source.starts_with("https://") {
            return self.download_image(source).await;
        }

        let path = Path::new(source);
        if !path.exists() {
            return Err(RemixError::FileNotFound(source.to_string()));
        }
        Ok(tokio::fs::read(path).await?)
    }

    /// generateContent を1回呼ぶ
    ///
    /// レスポンスの `error.message` は `ApiCall` エラーになる。
    pub async fn generate_content(
        &self,
        model: &str,
        parts: Vec<Part>,
        generation_config: Option<GenerationConfig>,
    ) -> Result<GenerateResponse> {
        let request = GenerateRequest {
            contents: vec![Content { parts }],
            generation_config,
        };

        // APIキーを含むURLをエラーメッセージに出さない
        let response = self
            .http
            .post(self.endpoint(model))
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| RemixError::Http(e.without_url()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RemixError::Http(e.without_url()))?;

        let parsed: GenerateResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => return Err(e.into()),
            Err(_) => {
                return Err(RemixError::ApiCall(format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    body.chars().take(200).collect::<String>()
                )))
            }
        };

        if let Some(err) = &parsed.error {
            return Err(RemixError::ApiCall(err.message.clone()));
        }

        Ok(parsed)
    }

    /// 画像＋プロンプトでテキスト応答を得る
    pub async fn describe_text(&self, image: &[u8], prompt: &str) -> Result<String> {
        let parts = vec![Part::image(image), Part::text(prompt)];
        let response = self
            .generate_content(&self.model, parts, Some(GenerationConfig::text()))
            .await?;
        Ok(response.text())
    }

    /// 構造化説明（パース失敗時は `{raw_description, parse_error}`）
    pub async fn describe(&self, image: &[u8], prompt: &str) -> Result<Value> {
        let text = self.describe_text(image, prompt).await?;
        Ok(parse_description(&text))
    }

    /// 衣装/シーン抽出（パース失敗時は `{raw, error}`）
    pub async fn extract(&self, image: &[u8], prompt: &str) -> Result<Value> {
        let text = self.describe_text(image, prompt).await?;
        Ok(parse_extraction(&text, "raw", "error"))
    }

    /// 画像生成して結果を分類
    pub async fn generate_image(
        &self,
        parts: Vec<Part>,
        aspect_ratio: Option<&str>,
    ) -> Result<GenerationOutcome> {
        let response = self
            .generate_content(
                &self.image_model,
                parts,
                Some(GenerationConfig::image(aspect_ratio)),
            )
            .await?;
        Ok(GenerationOutcome::classify(&response))
    }

    /// プロンプトバリエーションを順に試す
    ///
    /// ブロック以外の結果（成功またはエラー）が出た時点で止める。
    /// 全バリエーションがブロックされた場合は最後のブロック結果を返す。
    pub async fn generate_with_variants(
        &self,
        variants: &[&str],
        images: &[Part],
        aspect_ratio: Option<&str>,
    ) -> VariantOutcome {
        let mut last = VariantOutcome {
            outcome: GenerationOutcome::Error {
                reason: "No prompt variants".into(),
            },
            prompt_index: None,
            attempts: 0,
        };

        for (index, prompt) in variants.iter().enumerate() {
            let mut parts = Vec::with_capacity(images.len() + 1);
            parts.push(Part::text(*prompt));
            parts.extend_from_slice(images);

            let outcome = match self.generate_image(parts, aspect_ratio).await {
                Ok(outcome) => outcome,
                Err(e) => GenerationOutcome::Error {
                    reason: e.to_string(),
                },
            };

            last = VariantOutcome {
                outcome,
                prompt_index: Some(index),
                attempts: index + 1,
            };

            if !last.outcome.is_blocked() {
                break;
            }
            warn!("プロンプト {} がブロックされました", index + 1);
        }

        last
    }
}

/// プロキシ・タイムアウト付きのHTTPクライアント
pub fn build_http_client(proxy: Option<&str>, timeout_seconds: u64) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .cookie_store(true)
        .timeout(Duration::from_secs(timeout_seconds));

    if let Some(proxy) = proxy {
        let proxy = reqwest::Proxy::all(proxy)
            .map_err(|e| RemixError::Config(format!("プロキシURLが不正です: {}", e)))?;
        builder = builder.proxy(proxy);
    }

    Ok(builder.build()?)
}
