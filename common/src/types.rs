//! パイプラインの型定義
//!
//! 各段で読み書きされるレコード:
//! - PostRecord: スクレイプ結果CSVの1行
//! - Manifest / ImageResult: 投稿ごとの生成結果
//! - ApprovalEntry: レビュー台帳の1エントリ

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// スクレイプした投稿（CSVの1行）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub post_url: String,
    pub shortcode: String,
    pub caption: String,
    pub date: String,
    pub likes: String,
    pub is_video: bool,
    /// 画像URL（CSVではパイプ区切り、順序保持）
    pub images: Vec<String>,
}

/// ファイル名に使える形へ変換（英数字・`_`・`-` 以外は `_`）
///
/// `/` や `.` も置き換わるので、結果は常に1つのパス要素に収まる。
pub fn safe_file_stem(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

impl PostRecord {
    /// ファイル名に使える形へ変換したショートコード
    pub fn safe_shortcode(&self) -> String {
        safe_file_stem(&self.shortcode)
    }
}

/// 画像1枚ごとの生成ステータス
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    #[default]
    Pending,
    Success,
    Blocked,
    Error,
}

/// マニフェスト全体のステータス
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestStatus {
    #[default]
    Pending,
    Described,
    Generated,
    Failed,
}

/// 画像1枚の生成結果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageResult {
    pub index: usize,
    pub original_url: String,
    pub status: ImageStatus,
    /// 成功したプロンプトのインデックス（0始まり）
    pub prompt_index: Option<usize>,
    pub description: Option<String>,
    pub generated_path: Option<String>,
    pub cropped_path: Option<String>,
    pub error: Option<String>,
}

impl ImageResult {
    pub fn new(index: usize, original_url: &str) -> Self {
        Self {
            index,
            original_url: original_url.to_string(),
            ..Default::default()
        }
    }
}

/// 投稿ごとのマニフェスト（`<shortcode>-manifest.json`）
///
/// 再実行のたびに読み込み→更新→全体書き戻しされる。
/// 未知のフィールドは `extra` に保持する。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Manifest {
    pub shortcode: String,
    pub original_post: String,
    pub caption: String,
    pub date: String,
    pub created_at: String,
    pub updated_at: String,
    pub status: ManifestStatus,
    pub generated: Vec<String>,
    pub descriptions: Vec<Value>,
    pub images: Vec<ImageResult>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Manifest {
    pub fn for_post(post: &PostRecord, now: &str) -> Self {
        Self {
            shortcode: post.shortcode.clone(),
            original_post: post.post_url.clone(),
            caption: post.caption.clone(),
            date: post.date.clone(),
            created_at: now.to_string(),
            updated_at: now.to_string(),
            ..Default::default()
        }
    }

    pub fn count_with(&self, status: ImageStatus) -> usize {
        self.images.iter().filter(|i| i.status == status).count()
    }
}

/// 承認ステータス
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Uploaded,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
            ApprovalStatus::Uploaded => "uploaded",
        }
    }

    /// 許可された遷移か
    ///
    /// pending → approved → uploaded、pending → rejected のみ
    pub fn can_transition_to(&self, next: ApprovalStatus) -> bool {
        matches!(
            (self, next),
            (ApprovalStatus::Pending, ApprovalStatus::Approved)
                | (ApprovalStatus::Pending, ApprovalStatus::Rejected)
                | (ApprovalStatus::Approved, ApprovalStatus::Uploaded)
        )
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 承認台帳の1エントリ
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApprovalEntry {
    pub status: ApprovalStatus,
    pub images: Vec<String>,
    pub manifest_path: Option<String>,
    pub reviewed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_to: Option<String>,
}
