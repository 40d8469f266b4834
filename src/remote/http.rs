//! HTTP経由の識別サービス呼び出し

use super::{IdentifyRequest, RemoteIdentifier};
use crate::config::Config;
use crate::error::{IdentifyError, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use std::time::Duration;
use wishlist_identify_common::{parse_identify_response, salvage_detected_text, IdentifyResponse};

/// エラーメッセージに含める応答本文の最大文字数
const BODY_PREVIEW_CHARS: usize = 200;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdentifyBody<'a> {
    image: String,
    country_code: &'a str,
    currency_code: &'a str,
    language_code: &'a str,
}

/// 識別サービスのHTTPクライアント
pub struct HttpIdentifier {
    client: Client,
    endpoint: Url,
    /// 未設定なら呼び出し時に `MissingApiKey`
    api_key: Option<String>,
    max_image_size: u32,
}

impl HttpIdentifier {
    pub fn new(
        endpoint: &str,
        api_key: Option<&str>,
        timeout_secs: u64,
        max_image_size: u32,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("wishlist-identify/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let endpoint = Url::parse(endpoint)
            .map_err(|e| IdentifyError::Config(format!("不正なAPI URL '{}': {}", endpoint, e)))?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.map(str::to_owned),
            max_image_size,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.get_api_key().ok();
        Self::new(
            &config.api_url,
            api_key.as_deref(),
            config.timeout_seconds,
            config.max_image_size,
        )
    }

    async fn encode_photo(&self, request: &IdentifyRequest) -> Result<String> {
        let photo = request.photo.clone();
        let max_size = self.max_image_size;
        tokio::task::spawn_blocking(move || photo.encode_for_upload(max_size))
            .await
            .map_err(|e| {
                IdentifyError::ImageLoad(format!("エンコード処理が中断されました: {}", e))
            })?
    }
}

#[async_trait]
impl RemoteIdentifier for HttpIdentifier {
    async fn identify(&self, request: &IdentifyRequest) -> Result<IdentifyResponse> {
        let api_key = self.api_key.as_deref().ok_or(IdentifyError::MissingApiKey)?;
        let image = self.encode_photo(request).await?;
        let body = IdentifyBody {
            image,
            country_code: &request.country_code,
            currency_code: &request.currency_code,
            language_code: &request.language_code,
        };

        tracing::debug!(
            endpoint = %self.endpoint,
            photo = %request.photo.file_name,
            country = %request.country_code,
            "識別サービスへ送信"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let preview: String = text.chars().take(BODY_PREVIEW_CHARS).collect();
            return Err(IdentifyError::RemoteTransport(format!(
                "HTTP {}: {}",
                status.as_u16(),
                preview
            )));
        }

        parse_identify_response(&text).map_err(|e| IdentifyError::MalformedResponse {
            message: e.to_string(),
            detected_text: salvage_detected_text(&text),
        })
    }
}
