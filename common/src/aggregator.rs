//! 結果の集約
//!
//! リモート候補またはフォールバック出力を共通の `IdentificationResult` に揃え、
//! 下書きに入れるタイトル・画像を決める。

use crate::fallback::{FallbackOutcome, GENERIC_TITLE};
use crate::normalizer::{normalize_text, tokenize};
use crate::types::{IdentificationResult, IdentifyResponse, RemoteQuery, SuggestedProduct};

/// 下書きの初期値
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftSeed {
    pub title: String,
    pub image_url: Option<String>,
}

impl DraftSeed {
    /// 空タイトルは汎用タイトルに置き換える
    fn new(title: &str, image_url: Option<String>) -> Self {
        let title = title.trim();
        Self {
            title: if title.is_empty() {
                GENERIC_TITLE.to_string()
            } else {
                title.to_string()
            },
            image_url,
        }
    }
}

/// 集約結果
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregated {
    pub result: IdentificationResult,
    pub seed: DraftSeed,
}

/// 信頼度を [0, 1] に収める（NaNは0）
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// リモート候補から結果を作る
///
/// 候補が0件の場合は `None`（フォールバックへ回す）。
pub fn aggregate_remote(response: &IdentifyResponse) -> Option<Aggregated> {
    let first = response.matches.first()?;

    let suggested_products: Vec<SuggestedProduct> = response
        .matches
        .iter()
        .map(|m| SuggestedProduct {
            title: m.name.trim().to_string(),
            image_url: m.image_url.clone(),
            likely_url: m.url.clone(),
        })
        .collect();

    let keyword_source = response.detected_text().unwrap_or(first.name.as_str());

    let result = IdentificationResult {
        best_guess_title: Some(first.name.trim().to_string()),
        best_guess_category: response.query.guessed_category.clone(),
        keywords: tokenize(&normalize_text(keyword_source)),
        confidence: clamp_confidence(first.confidence),
        suggested_products,
    };

    Some(Aggregated {
        seed: DraftSeed::new(&first.name, first.image_url.clone()),
        result,
    })
}

/// フォールバック出力から結果を作る
///
/// リモートがカテゴリだけ推定していた場合はそれを引き継ぐ。
pub fn aggregate_fallback(outcome: FallbackOutcome, query: Option<&RemoteQuery>) -> Aggregated {
    let FallbackOutcome { mut result, title, .. } = outcome;

    if result.best_guess_category.is_none() {
        result.best_guess_category = query
            .and_then(|q| q.guessed_category.clone())
            .filter(|c| !c.trim().is_empty());
    }
    result.confidence = clamp_confidence(result.confidence);
    result.suggested_products.clear();

    Aggregated {
        seed: DraftSeed::new(&title, None),
        result,
    }
}

/// 選択された候補から下書きの初期値を作る
pub fn seed_for_selection(result: &IdentificationResult, index: usize) -> Option<DraftSeed> {
    result
        .suggested_products
        .get(index)
        .map(|p| DraftSeed::new(&p.title, p.image_url.clone()))
}
