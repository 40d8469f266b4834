//! 意味のある語の抽出
//!
//! ブランドが見つからない場合に、正規化済みテキストから
//! 商品名らしいフレーズを組み立てる。

use crate::normalizer::title_case;

pub const DEFAULT_MIN_WORDS: usize = 2;
pub const DEFAULT_MAX_WORDS: usize = 6;

/// 除外語（冠詞・代名詞・助動詞・単位など）
const STOP_WORDS: &[&str] = &[
    // 冠詞・前置詞・接続詞
    "the", "and", "for", "with", "from", "into", "onto", "per", "via", "but", "nor", "yet",
    // 代名詞
    "you", "your", "yours", "our", "ours", "his", "her", "hers", "its", "they", "them", "their",
    "this", "that", "these", "those", "who", "what", "which",
    // 助動詞
    "are", "was", "were", "been", "being", "has", "have", "had", "does", "did", "can", "could",
    "will", "would", "shall", "should", "may", "might", "must",
    // 単位・属性
    "ml", "oz", "kg", "mg", "cm", "mm", "ltr", "lbs", "pcs", "pack", "size", "color", "colour",
    "net", "wt", "fl", "qty",
];

fn is_meaningful(token: &str) -> bool {
    if token.chars().count() <= 2 {
        return false;
    }
    if token.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    !STOP_WORDS.contains(&token)
}

/// 抽出したフレーズ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    pub text: String,
    pub word_count: usize,
    /// `min_words` に届かなかった
    pub partial: bool,
}

/// 意味のある語を抽出してタイトルケースで連結する
///
/// 残った語が `min_words` 未満でも、1語以上あればそのまま返す。
/// 1語も残らなければ `None`。
pub fn extract_meaningful_words(
    normalized: &str,
    min_words: usize,
    max_words: usize,
) -> Option<Phrase> {
    let words: Vec<&str> = normalized
        .split_whitespace()
        .filter(|token| is_meaningful(token))
        .take(max_words)
        .collect();

    if words.is_empty() {
        return None;
    }

    Some(Phrase {
        text: title_case(&words.join(" ")),
        word_count: words.len(),
        partial: words.len() < min_words,
    })
}

/// 既定の語数（2〜6語）で抽出
pub fn extract_default(normalized: &str) -> Option<Phrase> {
    extract_meaningful_words(normalized, DEFAULT_MIN_WORDS, DEFAULT_MAX_WORDS)
}
