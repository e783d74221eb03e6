use crate::core::types::{MatchMode, WordCategory};
use crate::lang::LanguageSet;

/// One candidate or selected search term
#[derive(Debug, Clone)]
pub struct TermElement {
    /// Normalized form; what the index is searched with
    pub string: String,
    /// The surface form the user wrote
    pub original_string: String,
    pub language: LanguageSet,
    pub match_mode: MatchMode,
    pub category: WordCategory,
    pub scale: f64,
    pub df: u32,
    /// Term weight value from seed-document statistics
    pub twv: f64,
    /// Term selection value; zero means not selected
    pub tsv: f64,
    /// Token position in the source text
    pub position: usize,
}

impl TermElement {
    pub fn new(string: impl Into<String>) -> Self {
        let string = string.into();
        TermElement {
            original_string: string.clone(),
            string,
            language: LanguageSet::default(),
            match_mode: MatchMode::VoidMatch,
            category: WordCategory::Helpful,
            scale: 0.0,
            df: 0,
            twv: 0.0,
            tsv: 0.0,
            position: 0,
        }
    }
}
