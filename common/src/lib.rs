//! Product Identification Common Library
//!
//! CLIと将来のフロントエンドで共有される型と、I/Oを持たない識別ロジック

pub mod types;
pub mod error;
pub mod normalizer;
pub mod brand;
pub mod words;
pub mod fallback;
pub mod aggregator;
pub mod parser;

pub use types::{
    AnalysisState, EditableDraft, IdentificationResult, IdentifyResponse, RemoteMatch, RemoteQuery,
    SuggestedProduct,
};
pub use error::{Error, Result};
pub use normalizer::{normalize_text, title_case, tokenize};
pub use brand::{match_brand, BrandMatcher, DEFAULT_BRANDS};
pub use words::{extract_meaningful_words, Phrase};
pub use fallback::{
    run_cascade, FallbackBranch, FallbackOutcome, DETECTED_TITLE, FALLBACK_CONFIDENCE,
    GENERIC_TITLE,
};
pub use aggregator::{
    aggregate_fallback, aggregate_remote, clamp_confidence, seed_for_selection, Aggregated,
    DraftSeed,
};
pub use parser::{extract_json, parse_identify_response, salvage_detected_text};
