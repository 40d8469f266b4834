mod coordinator;
mod fallback;
mod recognizer;

pub use coordinator::{AnalysisCoordinator, AnalysisSnapshot, AttemptOutcome, Notice};
pub use fallback::LocalFallbackEngine;
pub use recognizer::{NoopRecognizer, TextRecognizer};
