//! generateContent のリクエスト/レスポンス型

use base64::Engine;
use fashion_remix_common::ImageStatus;
use serde::{Deserialize, Serialize};

/// 安全フィルタによるブロックを示す finishReason
pub const BLOCK_REASONS: &[&str] = &["IMAGE_SAFETY", "SAFETY", "PROHIBITED_CONTENT"];

#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

/// リクエストのパート（テキストまたはbase64画像）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    Image { inline_data: InlineData },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    /// 画像バイト列から作成（MIMEはバイト列から推定）
    pub fn image(bytes: &[u8]) -> Self {
        Part::Image {
            inline_data: InlineData {
                mime_type: guess_mime_type(bytes).to_string(),
                data: base64::engine::general_purpose::STANDARD.encode(bytes),
            },
        }
    }
}

/// 画像のMIMEタイプを推定（不明ならJPEG扱い）
pub fn guess_mime_type(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Png) => "image/png",
        Ok(image::ImageFormat::WebP) => "image/webp",
        Ok(image::ImageFormat::Gif) => "image/gif",
        _ => "image/jpeg",
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl GenerationConfig {
    pub fn text() -> Self {
        Self {
            response_modalities: Some(vec!["TEXT".into()]),
            ..Default::default()
        }
    }

    pub fn image(aspect_ratio: Option<&str>) -> Self {
        Self {
            response_modalities: Some(vec!["IMAGE".into()]),
            image_config: aspect_ratio.map(|r| ImageConfig {
                aspect_ratio: r.to_string(),
            }),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub aspect_ratio: String,
}

// ---- レスポンス ----

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateResponse {
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Candidate {
    pub content: Option<ResponseContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResponseContent {
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponsePart {
    pub text: Option<String>,
    pub inline_data: Option<ResponseInlineData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponseInlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiError {
    pub code: Option<i64>,
    pub message: String,
    pub status: Option<String>,
}

impl GenerateResponse {
    fn first_candidate(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.first_candidate()?.finish_reason.as_deref()
    }

    /// 最初の候補のテキストパートを連結
    pub fn text(&self) -> String {
        self.first_candidate()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }

    /// 全候補の画像パートをデコード（不正なbase64は捨てる）
    pub fn images(&self) -> Vec<InlineImage> {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|content| content.parts.iter())
            .filter_map(|p| p.inline_data.as_ref())
            .filter_map(|d| {
                base64::engine::general_purpose::STANDARD
                    .decode(&d.data)
                    .ok()
                    .map(|data| InlineImage {
                        mime_type: d.mime_type.clone(),
                        data,
                    })
            })
            .collect()
    }
}

/// デコード済みの生成画像
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl InlineImage {
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            _ => "jpg",
        }
    }
}

/// 画像生成の結果
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Success { images: Vec<InlineImage> },
    Blocked { reason: String },
    Error { reason: String },
}

impl GenerationOutcome {
    /// レスポンスを分類
    ///
    /// - STOP かつ画像あり → Success
    /// - IMAGE_SAFETY / SAFETY / PROHIBITED_CONTENT → Blocked
    /// - それ以外 → Error（STOPで画像なしは "No image data"）
    pub fn classify(response: &GenerateResponse) -> Self {
        if let Some(err) = &response.error {
            return GenerationOutcome::Error {
                reason: err.message.clone(),
            };
        }

        let Some(reason) = response.finish_reason() else {
            if let Some(block) = response
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.clone())
            {
                return GenerationOutcome::Blocked { reason: block };
            }
            return GenerationOutcome::Error {
                reason: "Unknown".into(),
            };
        };

        if reason == "STOP" {
            let images = response.images();
            return if images.is_empty() {
                GenerationOutcome::Error {
                    reason: "No image data".into(),
                }
            } else {
                GenerationOutcome::Success { images }
            };
        }

        if BLOCK_REASONS.contains(&reason) {
            GenerationOutcome::Blocked {
                reason: reason.to_string(),
            }
        } else {
            GenerationOutcome::Error {
                reason: reason.to_string(),
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GenerationOutcome::Success { .. })
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, GenerationOutcome::Blocked { .. })
    }

    pub fn status(&self) -> ImageStatus {
        match self {
            GenerationOutcome::Success { .. } => ImageStatus::Success,
            GenerationOutcome::Blocked { .. } => ImageStatus::Blocked,
            GenerationOutcome::Error { .. } => ImageStatus::Error,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            GenerationOutcome::Success { .. } => None,
            GenerationOutcome::Blocked { reason } | GenerationOutcome::Error { reason } => {
                Some(reason)
            }
        }
    }
}

/// プロンプトバリエーションを順に試した結果
#[derive(Debug, Clone)]
pub struct VariantOutcome {
    pub outcome: GenerationOutcome,
    /// 最後に試したバリエーション（0始まり）
    pub prompt_index: Option<usize>,
    pub attempts: usize,
}
