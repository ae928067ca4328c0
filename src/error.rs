use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemixError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("Gemini APIキーが設定されていません。GEMINI_API_KEY を設定するか `remix config --set-api-key YOUR_KEY` を実行してください")]
    MissingApiKey,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("画像処理エラー: {0}")]
    Image(#[from] image::ImageError),

    #[error("ダウンロード失敗 ({status}): {url}")]
    Download { url: String, status: u16 },

    #[error("API呼び出しエラー: {0}")]
    ApiCall(String),

    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("スクレイプエラー: {0}")]
    Scrape(String),

    #[error("ログインしていません（セッション切れの可能性）: {0}")]
    NotLoggedIn(String),

    #[error("セッションが見つかりません: {0}")]
    SessionNotFound(String),

    #[error("セッションは既に存在します: {0}（先に削除してください）")]
    SessionExists(String),

    #[error("アップロード失敗: {0}")]
    Upload(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("入力エラー: {0}")]
    Input(String),

    #[error(transparent)]
    Common(#[from] fashion_remix_common::Error),
}

pub type Result<T> = std::result::Result<T, RemixError>;
