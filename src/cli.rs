use crate::pipeline::generate::GenerateMode;
use clap::{Parser, Subcommand};
use fashion_remix_common::{AspectRatio, CropAnchor};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "remix")]
#[command(about = "Instagramファッション写真のスクレイプ・AI再生成・レビュー/投稿ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Gemini APIキー（環境変数・設定ファイルより優先）
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// 説明・抽出に使うモデル
    #[arg(long, global = true)]
    pub model: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// プロフィールの投稿をスクレイプしてCSVに保存
    Scrape {
        /// 対象（@name / name / プロフィールURL）
        #[arg(required = true)]
        target: String,

        /// 最大投稿数
        #[arg(short, long)]
        limit: Option<usize>,

        /// 出力ディレクトリ（デフォルト: 設定の data_dir）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 使用するセッション名
        #[arg(short, long)]
        session: Option<String>,
    },

    /// 画像（パス/URL）またはCSVの全画像を構造化説明
    Describe {
        /// 画像パス・画像URL・CSVファイル
        #[arg(short, long, required = true)]
        input: String,

        /// 出力ディレクトリ
        #[arg(short, long, default_value = "./descriptions")]
        output: PathBuf,

        /// キャッシュを使用（説明済みの画像をスキップ）
        #[arg(long)]
        use_cache: bool,
    },

    /// CSVの投稿から画像を生成してマニフェストを更新
    Generate {
        /// スクレイプ済みCSV
        #[arg(short, long, required = true)]
        input: PathBuf,

        /// 出力ディレクトリ（デフォルト: 設定の generated_dir）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// モード (describe/face-swap/generate/remix)
        #[arg(short, long, default_value = "describe")]
        mode: GenerateMode,

        /// 参照人物画像（face-swap/remix では必須）
        #[arg(long)]
        identity: Option<PathBuf>,

        /// 生成画像のアスペクト比（例: 9:16）
        #[arg(long)]
        aspect_ratio: Option<String>,

        /// generate モードのプロンプト（省略時は説明またはキャプション）
        #[arg(short, long)]
        prompt: Option<String>,

        /// 処理する最大投稿数
        #[arg(short, long)]
        limit: Option<usize>,

        /// 1投稿あたりの生成枚数（デフォルト: 設定の images_per_post）
        #[arg(long)]
        images_per_post: Option<usize>,
    },

    /// 生成結果のレビューと承認
    Review {
        #[command(subcommand)]
        action: ReviewAction,
    },

    /// 承認済みの投稿をアップロード
    Upload {
        /// 投稿先アカウント
        #[arg(short, long, required = true)]
        account: String,
    },

    /// スクレイプ→生成→レビュー同期を一括実行
    Daily {
        /// 元アカウント
        #[arg(long, required = true)]
        source: String,

        /// 投稿先アカウント
        #[arg(long, required = true)]
        dest: String,

        /// 既存CSVがあっても再スクレイプ
        #[arg(long)]
        rescrape: bool,

        /// 生成モード
        #[arg(short, long, default_value = "describe")]
        mode: GenerateMode,

        /// 参照人物画像
        #[arg(long)]
        identity: Option<PathBuf>,

        /// 処理する最大投稿数
        #[arg(short, long)]
        limit: Option<usize>,

        /// 使用するセッション名
        #[arg(short, long)]
        session: Option<String>,
    },

    /// ログインセッション管理
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// 衣装・シーンを抽出してリポジトリに保存
    Extract {
        /// スクレイプ済みCSV
        #[arg(short, long, required = true)]
        input: PathBuf,

        /// ハンドル（省略時はCSV名 `<handle>-scraped.csv` から）
        #[arg(long)]
        handle: Option<String>,

        /// 処理する最大投稿数
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// ランダムな衣装とシーンを組み合わせて新しい投稿を生成
    Mix {
        /// 生成する投稿数
        #[arg(short, long, default_value = "1")]
        count: usize,

        /// 参照人物画像
        #[arg(long, required = true)]
        identity: PathBuf,
    },

    /// 画像（ファイル/ディレクトリ）を指定比率にクロップ
    Crop {
        /// 入力ファイルまたはディレクトリ
        #[arg(required = true)]
        input: PathBuf,

        /// 比率 (4:5/1:1/9:16/16:9 または W:H)
        #[arg(short, long, default_value = "4:5")]
        ratio: AspectRatio,

        /// 左右から削る割合（%、デフォルト: 設定の side_crop_percent）
        #[arg(short, long)]
        side: Option<f64>,

        /// 縦方向の基準 (top/center)
        #[arg(short, long, default_value = "top")]
        anchor: CropAnchor,

        /// 出力先（ファイル入力ならファイル、ディレクトリ入力ならディレクトリ）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// プロキシを設定（空文字で解除）
        #[arg(long)]
        set_proxy: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },

    /// 説明キャッシュ管理
    Cache {
        /// キャッシュを削除
        #[arg(long)]
        clear: bool,

        /// 対象フォルダ（省略時は ./descriptions）
        #[arg(short, long)]
        folder: Option<PathBuf>,

        /// キャッシュ情報を表示
        #[arg(long)]
        info: bool,
    },
}

#[derive(Subcommand)]
pub enum ReviewAction {
    /// 生成結果を一覧表示して台帳に同期
    Show {
        /// 生成ディレクトリ（デフォルト: 設定の generated_dir）
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// 投稿を承認
    Approve {
        #[arg(long, required = true)]
        id: String,
    },

    /// 投稿を却下
    Reject {
        #[arg(long, required = true)]
        id: String,
    },

    /// 件数と保留中の一覧
    Pending,
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// 保存済みセッションの一覧
    List,

    /// セッションを作成（Cookie省略時は対話入力）
    Create {
        #[arg(short, long, required = true)]
        name: String,

        /// ブラウザからコピーしたCookieヘッダー
        #[arg(long)]
        cookie: Option<String>,
    },

    /// セッションを削除
    Delete {
        #[arg(short, long, required = true)]
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_generate() {
        let cli = Cli::try_parse_from([
            "remix", "generate", "-i", "data/jane-scraped.csv", "--mode", "remix", "--identity",
            "face.png", "--limit", "2", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Generate { mode, limit, identity, .. } => {
                assert_eq!(mode, GenerateMode::Remix);
                assert_eq!(limit, Some(2));
                assert_eq!(identity, Some(PathBuf::from("face.png")));
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_parse_crop_defaults() {
        let cli = Cli::try_parse_from(["remix", "crop", "out/img1"]).unwrap();
        match cli.command {
            Commands::Crop { ratio, anchor, side, .. } => {
                assert_eq!(ratio, AspectRatio::PORTRAIT);
                assert_eq!(anchor, CropAnchor::Top);
                assert!(side.is_none());
            }
            _ => panic!("expected crop"),
        }
    }

    #[test]
    fn test_parse_review_and_global_key() {
        let cli = Cli::try_parse_from(["remix", "review", "approve", "--id", "ABC", "--api-key", "k"])
            .unwrap();
        assert_eq!(cli.api_key.as_deref(), Some("k"));
        assert!(matches!(
            cli.command,
            Commands::Review { action: ReviewAction::Approve { ref id } } if id == "ABC"
        ));
    }

    #[test]
    fn test_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["remix", "generate", "-i", "x.csv", "-m", "paint"]).is_err());
    }
}
