use serde::{Serialize, Deserialize};
use crate::lang::LanguageSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub u32);

impl DocId {
    pub fn new(id: u32) -> Self {
        DocId(id)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for DocId {
    fn from(id: u32) -> Self {
        DocId(id)
    }
}

/// Match style of one predicate element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchMode {
    VoidMatch,
    Equals,
    EqualsToNull,
    EqualsToNullAll,
    NotEquals,
    GreaterThan,
    GreaterThanEquals,
    LessThan,
    LessThanEquals,
    Like,
    Unknown,
}

impl MatchMode {
    pub fn is_equals(&self) -> bool {
        matches!(self, MatchMode::Equals | MatchMode::EqualsToNull | MatchMode::EqualsToNullAll)
    }
}

/// How the text column was tokenized at indexing time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexingType {
    Dual,
    Word,
    Ngram,
}

impl IndexingType {
    /// Match-mode letter emitted into #term / #freetext headers
    pub fn match_mode_char(&self) -> char {
        match self {
            IndexingType::Dual => 'm',
            IndexingType::Word => 'e',
            IndexingType::Ngram => 'n',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    Normal = 0,
    FreeText = 1,
    Equal = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending = 0,
    Descending = 1,
}

/// Word category of a wordlist element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WordCategory {
    Undefined,
    Essential,
    Important,
    Helpful,
    Prohibitive,
    EssentialRelated,
    ImportantRelated,
    HelpfulRelated,
    ProhibitiveRelated,
}

impl WordCategory {
    pub fn from_name(name: &str) -> WordCategory {
        match name {
            "Essential" => WordCategory::Essential,
            "Important" => WordCategory::Important,
            "Helpful" => WordCategory::Helpful,
            "Prohibitive" => WordCategory::Prohibitive,
            "EssentialRelated" => WordCategory::EssentialRelated,
            "ImportantRelated" => WordCategory::ImportantRelated,
            "HelpfulRelated" => WordCategory::HelpfulRelated,
            "ProhibitiveRelated" => WordCategory::ProhibitiveRelated,
            _ => WordCategory::Undefined,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WordCategory::Undefined => "Undefined",
            WordCategory::Essential => "Essential",
            WordCategory::Important => "Important",
            WordCategory::Helpful => "Helpful",
            WordCategory::Prohibitive => "Prohibitive",
            WordCategory::EssentialRelated => "EssentialRelated",
            WordCategory::ImportantRelated => "ImportantRelated",
            WordCategory::HelpfulRelated => "HelpfulRelated",
            WordCategory::ProhibitiveRelated => "ProhibitiveRelated",
        }
    }

    pub fn is_related(&self) -> bool {
        matches!(
            self,
            WordCategory::EssentialRelated
                | WordCategory::ImportantRelated
                | WordCategory::HelpfulRelated
                | WordCategory::ProhibitiveRelated
        )
    }
}

/// One word of a WORDLIST query, or one selected expansion term
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordData {
    pub term: String,
    pub language: LanguageSet,
    pub category: WordCategory,
    pub scale: f64,
    pub document_frequency: u32,
}

impl WordData {
    pub fn new(term: impl Into<String>) -> Self {
        WordData {
            term: term.into(),
            language: LanguageSet::default(),
            category: WordCategory::Undefined,
            scale: 0.0,
            document_frequency: 0,
        }
    }
}
