//! ブランド名照合
//!
//! 正規化済みテキストに含まれるブランド名を最長一致で探す。
//! 複数語のブランド（"new balance"等）を、それに含まれる短い語より優先する。

use crate::normalizer::title_case;

/// 組み込みブランド一覧（ロケール非依存）
pub const DEFAULT_BRANDS: &[&str] = &[
    "yves saint laurent",
    "la roche posay",
    "the north face",
    "dolce & gabbana",
    "tommy hilfiger",
    "louis vuitton",
    "saint laurent",
    "ralph lauren",
    "estee lauder",
    "calvin klein",
    "under armour",
    "the ordinary",
    "new balance",
    "playstation",
    "kitchenaid",
    "le creuset",
    "nespresso",
    "kerastase",
    "patagonia",
    "clinique",
    "converse",
    "nintendo",
    "olaplex",
    "samsung",
    "lancome",
    "garmin",
    "fitbit",
    "cerave",
    "uniqlo",
    "adidas",
    "reebok",
    "philips",
    "chanel",
    "hermes",
    "canon",
    "nikon",
    "dyson",
    "nivea",
    "rolex",
    "casio",
    "asics",
    "braun",
    "prada",
    "gucci",
    "apple",
    "nike",
    "sony",
    "lego",
    "bose",
    "ikea",
    "zara",
    "puma",
    "dior",
    "vans",
];

/// ブランド照合器
///
/// キーワードは文字数の降順に安定ソートして保持する。
/// 同じ長さのキーワードが両方一致した場合は、元の並びで先にあるものが勝つ。
#[derive(Debug, Clone)]
pub struct BrandMatcher {
    keywords: Vec<String>,
}

impl BrandMatcher {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keywords: Vec<String> = keywords
            .into_iter()
            .map(Into::into)
            .filter(|k: &String| !k.trim().is_empty())
            .collect();
        // sort_by は安定ソート
        keywords.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
        Self { keywords }
    }

    /// ソート済みキーワード
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// 最初に一致したキーワードをタイトルケースで返す
    pub fn find(&self, normalized: &str) -> Option<String> {
        if normalized.is_empty() {
            return None;
        }

        self.keywords
            .iter()
            .find(|keyword| normalized.contains(keyword.to_lowercase().as_str()))
            .map(|keyword| title_case(keyword))
    }
}

impl Default for BrandMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_BRANDS.iter().copied())
    }
}

/// キーワード一覧からブランドを探す（一回限りの照合用）
pub fn match_brand(normalized: &str, keywords: &[&str]) -> Option<String> {
    BrandMatcher::new(keywords.iter().copied()).find(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_brand_simple() {
        let matcher = BrandMatcher::default();
        assert_eq!(
            matcher.find("kerastase elixir ultime 100ml"),
            Some("Kerastase".to_string())
        );
    }

    #[test]
    fn test_match_brand_prefers_longest() {
        let keywords = ["laurent", "saint laurent", "yves saint laurent"];
        assert_eq!(
            match_brand("yves saint laurent libre", &keywords),
            Some("Yves Saint Laurent".to_string())
        );
        assert_eq!(
            match_brand("saint laurent bag", &keywords),
            Some("Saint Laurent".to_string())
        );
    }

    #[test]
    fn test_match_brand_case_insensitive_keywords() {
        assert_eq!(
            match_brand("new balance 574", &["New Balance"]),
            Some("New Balance".to_string())
        );
    }

    #[test]
    fn test_match_brand_tie_break_is_stable() {
        // 同じ長さ（4文字）の場合は入力順で先のものが勝つ
        let keywords = ["sony", "nike"];
        let text = "nike and sony bundle";
        for _ in 0..10 {
            assert_eq!(match_brand(text, &keywords), Some("Sony".to_string()));
        }

        let reversed = ["nike", "sony"];
        assert_eq!(match_brand(text, &reversed), Some("Nike".to_string()));
    }

    #[test]
    fn test_match_brand_none() {
        let matcher = BrandMatcher::default();
        assert_eq!(matcher.find("plain ceramic mug"), None);
        assert_eq!(matcher.find(""), None);
    }

    #[test]
    fn test_keywords_sorted_descending() {
        let matcher = BrandMatcher::default();
        let lengths: Vec<usize> = matcher.keywords().iter().map(|k| k.chars().count()).collect();
        assert!(lengths.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_empty_keywords_ignored() {
        let matcher = BrandMatcher::new(["", "  ", "dyson"]);
        assert_eq!(matcher.keywords().len(), 1);
        assert_eq!(matcher.find("any text"), None);
    }
}
