//! ローカルフォールバック
//!
//! リモート識別が使えない・候補が空の場合に、検出テキストから
//! 編集可能なタイトルを組み立てる。
//!
//! ## 処理フロー
//! 1. テキストなし → 汎用タイトル（信頼度0）
//! 2. 正規化 → ブランド照合
//! 3. ブランドなし → 意味のある語の抽出
//! 4. 語なし → 「検出あり」汎用タイトル
//!
//! 各段は全域関数で、失敗しない。

use crate::brand::BrandMatcher;
use crate::normalizer::{normalize_text, tokenize};
use crate::types::IdentificationResult;
use crate::words::extract_default;

/// テキストが得られなかった場合のタイトル
pub const GENERIC_TITLE: &str = "Product - Please specify";
/// テキストはあったが使えなかった場合のタイトル
pub const DETECTED_TITLE: &str = "Product (detected) - Please specify";
/// テキストがある場合の固定信頼度
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// どの段で決着したか
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackBranch {
    NoText,
    Brand(String),
    Words { partial: bool },
    Unusable,
}

/// フォールバック結果
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackOutcome {
    pub result: IdentificationResult,
    /// 下書きに入れるタイトル（呼び出し側が使うのはこれだけ）
    pub title: String,
    pub branch: FallbackBranch,
}

impl FallbackOutcome {
    /// テキストなしの汎用結果
    pub fn generic() -> Self {
        Self {
            result: IdentificationResult::empty(),
            title: GENERIC_TITLE.to_string(),
            branch: FallbackBranch::NoText,
        }
    }
}

/// ブランド検出時のタイトル
pub fn brand_title(brand: &str) -> String {
    format!("{} (detected) - Please specify product", brand)
}

/// 検出テキストからフォールバック結果を組み立てる
pub fn run_cascade(detected_text: Option<&str>, brands: &BrandMatcher) -> FallbackOutcome {
    let raw = match detected_text {
        Some(text) if !text.trim().is_empty() => text,
        _ => return FallbackOutcome::generic(),
    };

    let normalized = normalize_text(raw);

    let (title, branch) = if let Some(brand) = brands.find(&normalized) {
        (brand_title(&brand), FallbackBranch::Brand(brand))
    } else if let Some(phrase) = extract_default(&normalized) {
        (phrase.text, FallbackBranch::Words { partial: phrase.partial })
    } else {
        (DETECTED_TITLE.to_string(), FallbackBranch::Unusable)
    };

    FallbackOutcome {
        result: IdentificationResult {
            best_guess_title: Some(raw.to_string()),
            best_guess_category: None,
            keywords: tokenize(&normalized),
            confidence: FALLBACK_CONFIDENCE,
            suggested_products: Vec::new(),
        },
        title,
        branch,
    }
}
