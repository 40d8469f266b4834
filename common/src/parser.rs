//! 識別サービス応答パーサー
//!
//! 応答本文からJSONオブジェクトを抽出し、`IdentifyResponse` にパースする。
//! パースに失敗しても、検出テキストだけは取り出せる場合がある。

use crate::error::{Error, Result};
use crate::types::IdentifyResponse;

/// 応答からJSON部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 生の {...} オブジェクト
/// 3. エラー
///
/// # Examples
/// ```
/// use wishlist_identify_common::extract_json;
///
/// let body = "result: {\"matches\": []}";
/// assert_eq!(extract_json(body).unwrap(), "{\"matches\": []}");
/// ```
pub fn extract_json(response: &str) -> Result<&str> {
    // ```json ... ``` ブロックを探す
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7; // "```json" の長さ
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    // 生の {...} を探す
    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if end >= start {
                return Ok(&response[start..=end]);
            }
        }
    }

    Err(Error::Parse("JSONが見つかりません".into()))
}

/// 識別サービスの応答をパース
pub fn parse_identify_response(response: &str) -> Result<IdentifyResponse> {
    let json_str = extract_json(response)?;
    let parsed: IdentifyResponse = serde_json::from_str(json_str.trim())?;
    Ok(parsed)
}

/// 形式不正な応答から `query.detectedText` だけを取り出す
pub fn salvage_detected_text(response: &str) -> Option<String> {
    let json_str = extract_json(response).ok()?;
    let value: serde_json::Value = serde_json::from_str(json_str.trim()).ok()?;
    value
        .get("query")?
        .get("detectedText")?
        .as_str()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
