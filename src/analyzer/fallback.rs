//! ローカルフォールバックエンジン
//!
//! 検出テキストの取得（API由来 → 端末内認識）と、共通ライブラリの
//! フォールバック段（正規化 → ブランド → 語抽出 → 汎用）をつなぐ。

use super::recognizer::{NoopRecognizer, TextRecognizer};
use crate::photo::PhotoRef;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use wishlist_identify_common::{run_cascade, BrandMatcher, FallbackBranch, FallbackOutcome};

pub struct LocalFallbackEngine {
    recognizer: Arc<dyn TextRecognizer>,
    brands: BrandMatcher,
}

impl LocalFallbackEngine {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, brands: BrandMatcher) -> Self {
        Self { recognizer, brands }
    }

    /// フォールバック結果を作る（失敗しない）
    ///
    /// `api_detected_text` が空でなければそれを使い、なければ端末内認識を試す。
    pub async fn run_fallback(
        &self,
        photo: &PhotoRef,
        api_detected_text: Option<&str>,
    ) -> FallbackOutcome {
        let text = match api_detected_text.filter(|t| !t.trim().is_empty()) {
            Some(text) => Some(text.to_string()),
            None => self.recognize_locally(photo).await,
        };

        let brands = &self.brands;
        let cascade = catch_unwind(AssertUnwindSafe(|| run_cascade(text.as_deref(), brands)));
        let outcome = match cascade {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::error!(
                    photo = %photo.file_name,
                    "フォールバック処理で予期しないパニック、汎用タイトルを使用"
                );
                FallbackOutcome::generic()
            }
        };

        let photo_name = photo.file_name.as_str();
        match &outcome.branch {
            FallbackBranch::NoText => tracing::info!(photo = photo_name, "検出テキストなし"),
            FallbackBranch::Brand(brand) => {
                tracing::info!(photo = photo_name, %brand, "ブランド検出")
            }
            FallbackBranch::Words { partial } => {
                tracing::info!(photo = photo_name, title = %outcome.title, partial, "キーワード抽出")
            }
            FallbackBranch::Unusable => {
                tracing::info!(photo = photo_name, "検出テキストから語を抽出できず")
            }
        }

        outcome
    }

    /// 端末内認識（失敗・パニックは未検出扱い）
    async fn recognize_locally(&self, photo: &PhotoRef) -> Option<String> {
        let recognizer = Arc::clone(&self.recognizer);
        let target = photo.clone();
        let joined = tokio::spawn(async move { recognizer.recognize(&target).await }).await;

        match joined {
            Ok(Ok(text)) => text.filter(|t| !t.trim().is_empty()),
            Ok(Err(e)) => {
                tracing::warn!(photo = %photo.file_name, error = %e, "端末内テキスト認識に失敗");
                None
            }
            Err(e) => {
                tracing::error!(
                    photo = %photo.file_name,
                    error = %e,
                    "端末内テキスト認識が異常終了"
                );
                None
            }
        }
    }
}

impl Default for LocalFallbackEngine {
    fn default() -> Self {
        Self::new(Arc::new(NoopRecognizer), BrandMatcher::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IdentifyError, Result};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use wishlist_identify_common::{GENERIC_TITLE, DETECTED_TITLE};

    struct FixedRecognizer(&'static str);

    #[async_trait]
    impl TextRecognizer for FixedRecognizer {
        async fn recognize(&self, _photo: &PhotoRef) -> Result<Option<String>> {
            Ok(Some(self.0.to_string()))
        }
    }

    struct BrokenRecognizer;

    #[async_trait]
    impl TextRecognizer for BrokenRecognizer {
        async fn recognize(&self, _photo: &PhotoRef) -> Result<Option<String>> {
            Err(IdentifyError::ImageLoad("camera unavailable".into()))
        }
    }

    struct PanickingRecognizer;

    #[async_trait]
    impl TextRecognizer for PanickingRecognizer {
        async fn recognize(&self, _photo: &PhotoRef) -> Result<Option<String>> {
            panic!("recognizer crashed");
        }
    }

    fn engine_with(recognizer: impl TextRecognizer + 'static) -> LocalFallbackEngine {
        LocalFallbackEngine::new(Arc::new(recognizer), BrandMatcher::default())
    }

    fn photo() -> PhotoRef {
        PhotoRef {
            path: PathBuf::from("/tmp/item.jpg"),
            file_name: "item.jpg".to_string(),
            fingerprint: "abc".to_string(),
        }
    }

    #[tokio::test]
    async fn test_api_text_takes_priority() {
        let engine = engine_with(FixedRecognizer("Dyson V15"));
        let outcome = engine.run_fallback(&photo(), Some("Kerastase Elixir Ultime 100ml")).await;
        assert_eq!(outcome.title, "Kerastase (detected) - Please specify product");
    }

    #[tokio::test]
    async fn test_recognizer_used_when_api_text_missing() {
        let engine = engine_with(FixedRecognizer("Dyson V15 Detect"));
        let outcome = engine.run_fallback(&photo(), Some("  ")).await;
        assert_eq!(outcome.title, "Dyson (detected) - Please specify product");
    }

    #[tokio::test]
    async fn test_default_engine_without_text() {
        let engine = LocalFallbackEngine::default();
        let outcome = engine.run_fallback(&photo(), None).await;
        assert_eq!(outcome.title, GENERIC_TITLE);
        assert_eq!(outcome.result.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_recognizer_error_is_no_text() {
        let engine = LocalFallbackEngine::new(Arc::new(BrokenRecognizer), BrandMatcher::default());
        let outcome = engine.run_fallback(&photo(), None).await;
        assert_eq!(outcome.branch, FallbackBranch::NoText);
    }

    #[tokio::test]
    async fn test_recognizer_panic_is_no_text() {
        let engine = engine_with(PanickingRecognizer);
        let outcome = engine.run_fallback(&photo(), None).await;
        assert_eq!(outcome.branch, FallbackBranch::NoText);
        assert_eq!(outcome.title, GENERIC_TITLE);
    }

    #[tokio::test]
    async fn test_unusable_text() {
        let engine = LocalFallbackEngine::default();
        let outcome = engine.run_fallback(&photo(), Some("100 ml")).await;
        assert_eq!(outcome.title, DETECTED_TITLE);
        assert_eq!(outcome.result.confidence, 0.5);
    }
}
