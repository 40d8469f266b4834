//! 検出テキストの正規化
//!
//! - 小文字化
//! - 英数字・空白・`&` 以外を空白に置換
//! - 連続空白を1つに、前後の空白を除去

use regex::Regex;

/// 検出テキストを正規化する
///
/// 出力は `[a-z0-9 &]` のみで構成され、連続空白を含まない。
///
/// # Examples
/// ```
/// use wishlist_identify_common::normalize_text;
///
/// assert_eq!(normalize_text("  Kérastase, Elixir!  "), "k rastase elixir");
/// ```
pub fn normalize_text(raw: &str) -> String {
    lazy_static::lazy_static! {
        static ref DISALLOWED_RE: Regex = Regex::new(r"[^a-z0-9&\s]").unwrap();
        static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
    }

    if raw.is_empty() {
        return String::new();
    }

    let lowered = raw.to_lowercase();
    let replaced = DISALLOWED_RE.replace_all(&lowered, " ");
    let collapsed = WHITESPACE_RE.replace_all(&replaced, " ");
    collapsed.trim().to_string()
}

/// 正規化済みテキストをトークンに分割
pub fn tokenize(normalized: &str) -> Vec<String> {
    normalized.split_whitespace().map(str::to_string).collect()
}

/// 単語ごとに先頭を大文字、残りを小文字にする
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
