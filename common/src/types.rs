//! 識別結果の型定義
//!
//! CLIと将来のフロントエンドで共有される型:
//! - IdentifyResponse: リモート識別サービスの応答
//! - IdentificationResult: パイプラインの最終出力（リモート/フォールバック共通）
//! - AnalysisState: 解析状態マシン
//! - EditableDraft: ユーザーが編集する下書き

use serde::{Deserialize, Serialize};

/// リモート識別サービスが返すクエリ情報
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteQuery {
    pub detected_text: Option<String>,
    pub detected_brand: Option<String>,
    pub guessed_category: Option<String>,
}

/// リモート識別サービスの候補1件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteMatch {
    pub name: String,

    #[serde(default)]
    pub image_url: Option<String>,

    #[serde(default)]
    pub confidence: f64,

    /// 商品ページURL（サービスが返す場合のみ）
    #[serde(default)]
    pub url: Option<String>,
}

/// リモート識別サービスの応答
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyResponse {
    #[serde(default)]
    pub query: RemoteQuery,

    pub matches: Vec<RemoteMatch>,
}

impl IdentifyResponse {
    /// 検出テキスト（空白のみは未検出扱い）
    pub fn detected_text(&self) -> Option<&str> {
        self.query
            .detected_text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }
}

/// 候補商品（リモート候補1件に対応、順序は応答順）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedProduct {
    pub title: String,
    pub image_url: Option<String>,
    pub likely_url: Option<String>,
}

/// 識別結果
///
/// 解析のたびに新しく生成され、書き換えられない。
/// `suggested_products` が空であることはフォールバック経路の結果であることを意味する。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentificationResult {
    pub best_guess_title: Option<String>,
    pub best_guess_category: Option<String>,
    pub keywords: Vec<String>,
    /// 0.0〜1.0
    pub confidence: f64,
    pub suggested_products: Vec<SuggestedProduct>,
}

impl IdentificationResult {
    /// テキストが何も得られなかった場合の結果
    pub fn empty() -> Self {
        Self::default()
    }

    /// フォールバック経路の結果か
    pub fn is_fallback(&self) -> bool {
        self.suggested_products.is_empty()
    }
}

/// 解析状態
///
/// 同時に有効な状態は常に1つ。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum AnalysisState {
    #[default]
    Idle,
    Analyzing,
    ResolvedWithMatches,
    ResolvedEmpty,
    Failed { reason: String },
    Skipped,
}

impl AnalysisState {
    pub fn is_analyzing(&self) -> bool {
        matches!(self, AnalysisState::Analyzing)
    }

    /// 今回の試行が終わった状態か（Failedを含む）
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            AnalysisState::ResolvedWithMatches
                | AnalysisState::ResolvedEmpty
                | AnalysisState::Failed { .. }
                | AnalysisState::Skipped
        )
    }

    /// 再試行を受け付ける状態か
    pub fn can_retry(&self) -> bool {
        self.is_settled()
    }
}

impl std::fmt::Display for AnalysisState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisState::Idle => write!(f, "待機中"),
            AnalysisState::Analyzing => write!(f, "解析中"),
            AnalysisState::ResolvedWithMatches => write!(f, "候補あり"),
            AnalysisState::ResolvedEmpty => write!(f, "候補なし"),
            AnalysisState::Failed { reason } => write!(f, "失敗: {}", reason),
            AnalysisState::Skipped => write!(f, "スキップ"),
        }
    }
}

/// 編集用下書き
///
/// 識別結果から一度だけ初期値が入り、以降はユーザーが所有する。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditableDraft {
    pub title: String,
    pub image_url: Option<String>,
    pub price: Option<f64>,
    pub currency: String,
    pub notes: String,
}

impl EditableDraft {
    /// タイトルと画像を初期化する（価格・メモはユーザー入力を保持）
    pub fn seed(&mut self, title: impl Into<String>, image_url: Option<String>) {
        self.title = title.into();
        self.image_url = image_url;
    }

    /// 新しい試行の開始時にタイトルと画像を消去
    pub fn clear_prefill(&mut self) {
        self.title.clear();
        self.image_url = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify_response_deserialize() {
        let json = r#"{
            "query": {"detectedText": "Nike Air", "detectedBrand": "Nike", "guessedCategory": "Shoes"},
            "matches": [
                {"name": "Nike Air Max", "imageUrl": "https://img/1.jpg", "confidence": 0.92}
            ]
        }"#;

        let response: IdentifyResponse = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert_eq!(response.query.detected_brand.as_deref(), Some("Nike"));
        assert_eq!(response.matches.len(), 1);
        assert_eq!(response.matches[0].name, "Nike Air Max");
        assert_eq!(response.matches[0].url, None);
        assert!((response.matches[0].confidence - 0.92).abs() < 1e-9);
    }

    #[test]
    fn test_identify_response_missing_query() {
        let json = r#"{"matches": []}"#;

        let response: IdentifyResponse = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert_eq!(response.query, RemoteQuery::default());
        assert!(response.matches.is_empty());
    }

    #[test]
    fn test_detected_text_blank_is_none() {
        let response = IdentifyResponse {
            query: RemoteQuery {
                detected_text: Some("   ".to_string()),
                ..Default::default()
            },
            matches: Vec::new(),
        };
        assert_eq!(response.detected_text(), None);
    }

    #[test]
    fn test_identification_result_serialize() {
        let result = IdentificationResult {
            best_guess_title: Some("Nike Air Max".to_string()),
            confidence: 0.9,
            ..Default::default()
        };

        let json = serde_json::to_string(&result).expect("シリアライズ失敗");
        assert!(json.contains("\"bestGuessTitle\":\"Nike Air Max\""));
        assert!(json.contains("\"suggestedProducts\":[]"));
        assert!(result.is_fallback());
    }

    #[test]
    fn test_analysis_state_serialize_tagged() {
        let state = AnalysisState::Failed {
            reason: "timeout".to_string(),
        };
        let json = serde_json::to_string(&state).expect("シリアライズ失敗");
        assert_eq!(json, r#"{"state":"failed","reason":"timeout"}"#);
    }

    #[test]
    fn test_analysis_state_retry_rules() {
        assert!(!AnalysisState::Idle.can_retry());
        assert!(!AnalysisState::Analyzing.can_retry());
        assert!(AnalysisState::ResolvedEmpty.can_retry());
        assert!(AnalysisState::Skipped.can_retry());
        assert!(AnalysisState::Failed { reason: String::new() }.can_retry());
    }

    #[test]
    fn test_draft_clear_keeps_user_fields() {
        let mut draft = EditableDraft {
            title: "Old".to_string(),
            image_url: Some("https://img".to_string()),
            price: Some(12.5),
            currency: "EUR".to_string(),
            notes: "gift".to_string(),
        };
        draft.clear_prefill();
        assert!(draft.title.is_empty());
        assert!(draft.image_url.is_none());
        assert_eq!(draft.price, Some(12.5));
        assert_eq!(draft.notes, "gift");
    }
}
