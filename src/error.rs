use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentifyError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("APIキーが設定されていません。`wishlist-identify config --set-api-key YOUR_KEY` で設定してください")]
    MissingApiKey,

    #[error("国コードが設定されていません。`wishlist-identify config --set-country JP` で位置情報を設定してください")]
    LocationRequired,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("対応していない写真形式です: {0}")]
    UnsupportedPhoto(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("識別サービス通信エラー: {0}")]
    RemoteTransport(String),

    #[error("識別サービスの応答が不正: {message}")]
    MalformedResponse {
        message: String,
        /// 不正な応答から取り出せた検出テキスト
        detected_text: Option<String>,
    },

    #[error("入力エラー: {0}")]
    Prompt(String),

    #[error("候補番号が範囲外です: {0}")]
    InvalidSelection(usize),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),
}

impl IdentifyError {
    /// 再試行で解消しうるエラーか（位置情報未設定はユーザー操作が必要）
    pub fn is_recoverable_by_retry(&self) -> bool {
        matches!(
            self,
            IdentifyError::RemoteTransport(_) | IdentifyError::MalformedResponse { .. }
        )
    }

    /// 失敗前に得られていた検出テキスト
    pub fn partial_detected_text(&self) -> Option<&str> {
        match self {
            IdentifyError::MalformedResponse { detected_text, .. } => detected_text.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for IdentifyError {
    fn from(e: reqwest::Error) -> Self {
        IdentifyError::RemoteTransport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IdentifyError>;
