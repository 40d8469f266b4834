use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "wishlist-identify")]
#[command(about = "商品写真からウィッシュリスト用の商品名を推定するツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 写真から商品を識別
    Identify {
        /// 写真ファイルのパス
        #[arg(required = true)]
        photo: PathBuf,

        /// 国コード（設定値を上書き）
        #[arg(long)]
        country: Option<String>,

        /// 通貨コード（設定値を上書き）
        #[arg(long)]
        currency: Option<String>,

        /// 言語コード（設定値を上書き）
        #[arg(long)]
        language: Option<String>,

        /// 出力形式 (text/json)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// 候補選択・下書き編集を行わない
        #[arg(long)]
        no_interactive: bool,
    },

    /// テキストだけでフォールバック推定を試す
    Fallback {
        /// 検出テキスト
        #[arg(required = true)]
        text: String,

        /// ブランド一覧JSONファイル（文字列配列）
        #[arg(long)]
        brands: Option<PathBuf>,
    },

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// 国コードを設定（例: JP）
        #[arg(long)]
        set_country: Option<String>,

        /// 通貨コードを設定（例: JPY）
        #[arg(long)]
        set_currency: Option<String>,

        /// 言語コードを設定（例: ja）
        #[arg(long)]
        set_language: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
