use crate::core::types::{IndexingType, SearchType};
use crate::lang::LanguageSet;

/// Description of the full-text index a predicate is compiled against
#[derive(Debug, Clone)]
pub struct FullTextFileId {
    pub key_count: i32,
    pub indexing_type: IndexingType,
    pub nolocation: bool,
    pub default_language: LanguageSet,
    pub clustering: bool,
    pub resource_id: u32,
    /// The tuple carries a language column after the keys
    pub language_field: bool,
    /// The tuple carries a score-adjustment column
    pub score_field: bool,
}

impl FullTextFileId {
    pub fn new(indexing_type: IndexingType) -> Self {
        FullTextFileId {
            key_count: 1,
            indexing_type,
            nolocation: false,
            default_language: LanguageSet::default(),
            clustering: false,
            resource_id: 0,
            language_field: false,
            score_field: false,
        }
    }

    /// Column index of the language field, if any
    pub fn language_field_index(&self) -> Option<i32> {
        self.language_field.then_some(self.key_count)
    }

    /// Column index of the row id
    pub fn row_id_field_index(&self) -> i32 {
        let mut index = self.key_count;
        if self.language_field {
            index += 1;
        }
        if self.score_field {
            index += 1;
        }
        index
    }
}

/// Driver open option filled by the predicate compiler
#[derive(Debug, Default, Clone)]
pub struct OpenOption {
    pub search_type: Option<SearchType>,
    pub condition: Option<String>,
    /// Search cost estimate for the planner
    pub term_count: i32,
    pub row_id: Option<i32>,
    pub section_values: Vec<String>,
    pub section_languages: Vec<String>,
    pub search_fields: Vec<i32>,
    /// Projection pushdown
    pub field_select: bool,
    pub target_fields: Vec<i32>,
    pub open_mode_read: bool,
}

impl OpenOption {
    pub fn search_field_count(&self) -> usize {
        self.search_fields.len()
    }

    pub fn target_field_number(&self) -> usize {
        self.target_fields.len()
    }
}
