//! リモート識別サービス
//!
//! 外部の画像解析サービスを呼び出す境界。国コードがない状態では
//! リクエスト自体を組み立てられないため、サービスが呼ばれることはない。

mod http;

pub use http::HttpIdentifier;

use crate::error::{IdentifyError, Result};
use crate::photo::PhotoRef;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wishlist_identify_common::IdentifyResponse;

/// 位置情報・通貨・言語
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Locale {
    pub country_code: Option<String>,
    pub currency_code: String,
    pub language_code: String,
}

/// 識別リクエスト（国コード必須）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifyRequest {
    pub photo: PhotoRef,
    pub country_code: String,
    pub currency_code: String,
    pub language_code: String,
}

impl IdentifyRequest {
    /// 国コードが未設定なら `LocationRequired`
    pub fn new(photo: &PhotoRef, locale: &Locale) -> Result<Self> {
        let country_code = locale
            .country_code
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or(IdentifyError::LocationRequired)?;

        Ok(Self {
            photo: photo.clone(),
            country_code: country_code.to_string(),
            currency_code: locale.currency_code.clone(),
            language_code: locale.language_code.clone(),
        })
    }
}

/// 画像解析サービス
///
/// 通信失敗は `RemoteTransport`、応答の形式不正は `MalformedResponse` で返す。
#[async_trait]
pub trait RemoteIdentifier: Send + Sync {
    async fn identify(&self, request: &IdentifyRequest) -> Result<IdentifyResponse>;
}
