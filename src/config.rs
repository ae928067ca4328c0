use crate::error::{RemixError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 設定ファイル（~/.config/fashion-remix/config.json）
///
/// 優先順位: CLI引数 > 環境変数 > 設定ファイル > デフォルト
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    /// 説明・抽出用モデル
    pub model: String,
    /// 画像生成用モデル
    pub image_model: String,
    /// 全リクエストに適用するプロキシ（http/https/socks5）
    pub proxy: Option<String>,
    pub timeout_seconds: u64,
    /// 画像ごとの待機
    pub request_delay_ms: u64,
    /// 投稿ごとの待機
    pub post_delay_ms: u64,
    pub side_crop_percent: f64,
    pub images_per_post: usize,
    pub data_dir: PathBuf,
    pub generated_dir: PathBuf,
    pub review_dir: PathBuf,
    pub sessions_dir: PathBuf,
    pub outbox_dir: PathBuf,
    pub repository_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".into(),
            image_model: "gemini-3-pro-image-preview".into(),
            proxy: None,
            timeout_seconds: 120,
            request_delay_ms: 2000,
            post_delay_ms: 3000,
            side_crop_percent: 4.0,
            images_per_post: 3,
            data_dir: PathBuf::from("./data"),
            generated_dir: PathBuf::from("./generated"),
            review_dir: PathBuf::from("./review"),
            sessions_dir: PathBuf::from("./sessions"),
            outbox_dir: PathBuf::from("./outbox"),
            repository_dir: PathBuf::from("./repository"),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env();
        Ok(config)
    }

    /// 指定パスから読み込み（存在しなければデフォルト）
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| RemixError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("fashion-remix").join("config.json"))
    }

    /// 環境変数で上書き
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("GEMINI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(proxy) = non_empty("REMIX_PROXY") {
            self.proxy = Some(proxy);
        }
        if let Some(model) = non_empty("REMIX_MODEL") {
            self.model = model;
        }
        if let Some(model) = non_empty("REMIX_IMAGE_MODEL") {
            self.image_model = model;
        }
    }

    /// APIキーを取得（CLI引数を優先）
    pub fn get_api_key(&self, cli_key: Option<&str>) -> Result<String> {
        cli_key
            .filter(|k| !k.trim().is_empty())
            .map(str::to_string)
            .or_else(|| self.api_key.clone())
            .ok_or(RemixError::MissingApiKey)
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }

    pub fn set_proxy(&mut self, proxy: Option<String>) -> Result<()> {
        self.proxy = proxy.filter(|p| !p.trim().is_empty());
        self.save()
    }

    /// `config --show` の表示行（APIキーとプロキシ認証情報は伏せる）
    pub fn summary_lines(&self) -> Vec<String> {
        vec![
            format!("モデル: {}", self.model),
            format!("画像モデル: {}", self.image_model),
            format!(
                "APIキー: {}",
                if self.api_key.is_some() { "設定済み" } else { "未設定" }
            ),
            format!(
                "プロキシ: {}",
                self.proxy.as_deref().map(proxy_host).unwrap_or_else(|| "なし".into())
            ),
            format!("タイムアウト: {}秒", self.timeout_seconds),
            format!("待機: 画像 {}ms / 投稿 {}ms", self.request_delay_ms, self.post_delay_ms),
            format!("左右クロップ: {}%", self.side_crop_percent),
            format!("1投稿あたり: {}枚", self.images_per_post),
            format!("data: {}", self.data_dir.display()),
            format!("generated: {}", self.generated_dir.display()),
            format!("review: {}", self.review_dir.display()),
            format!("sessions: {}", self.sessions_dir.display()),
            format!("outbox: {}", self.outbox_dir.display()),
            format!("repository: {}", self.repository_dir.display()),
        ]
    }
}

/// プロキシURLから認証情報を除いたホスト部分だけを返す
pub fn proxy_host(proxy: &str) -> String {
    url::Url::parse(proxy)
        .ok()
        .and_then(|u| u.host_str().map(|h| format!("{}://{}", u.scheme(), h)))
        .unwrap_or_else(|| "（不正なURL）".into())
}
