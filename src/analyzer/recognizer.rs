//! 端末内テキスト認識の差し込み口
//!
//! 現状はリモートが返した検出テキストしか使わないため、既定実装は何も返さない。

use crate::error::Result;
use crate::photo::PhotoRef;
use async_trait::async_trait;

#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// 写真からテキストを読み取る（読み取れなければ `None`）
    async fn recognize(&self, photo: &PhotoRef) -> Result<Option<String>>;
}

/// 何も認識しない既定実装
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecognizer;

#[async_trait]
impl TextRecognizer for NoopRecognizer {
    async fn recognize(&self, _photo: &PhotoRef) -> Result<Option<String>> {
        Ok(None)
    }
}
