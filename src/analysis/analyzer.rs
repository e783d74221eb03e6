use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_segmentation::UnicodeSegmentation;
use crate::analysis::blocker::{GeneralBlocker, ScriptBlocker};
use crate::analysis::charclass;
use crate::analysis::token::Token;
use crate::core::types::IndexingType;
use crate::lang::LanguageSet;

/// Parameters handed to the analyzer, mirroring the tokenizer options of
/// the index definition.
#[derive(Debug, Clone)]
pub struct AnalyzerParams {
    pub normalize: bool,
    pub compound: bool,
    pub stemming: bool,
    pub ignore_carriage: bool,
    pub delete_space: bool,
}

impl Default for AnalyzerParams {
    fn default() -> Self {
        AnalyzerParams {
            normalize: true,
            compound: true,
            stemming: true,
            ignore_carriage: true,
            delete_space: false,
        }
    }
}

/// Capability boundary to the morphological analyzer. The engine only ever
/// talks to this trait; the real analyzer is selected by resource id.
pub trait NlpAnalyzer {
    /// Canonical form of a term under the index normalization rules
    fn normalize(&self, text: &str, lang: &LanguageSet) -> String;

    /// Tokens of a free-text string, honoring the indexing mode: word
    /// segmentation for word indexes, script-aware n-grams otherwise
    fn tokenize(&self, text: &str, lang: &LanguageSet, mode: IndexingType) -> Vec<Token>;

    /// Synonym expansion of one pattern; always contains the input itself
    fn expand_synonym(&self, pattern: &str, lang: &LanguageSet) -> Vec<String>;
}

/// Built-in analyzer used when no external resource is configured.
///
/// Normalization is lowercasing plus optional carriage and space removal.
/// Word-mode tokenization is Unicode word segmentation with optional
/// stemming; dual and n-gram modes run the script blockers instead.
pub struct DefaultAnalyzer {
    pub params: AnalyzerParams,
    synonyms: HashMap<String, Vec<String>>,
    dual_blocker: ScriptBlocker,
    ngram_blocker: ScriptBlocker,
}

impl DefaultAnalyzer {
    pub fn new(params: AnalyzerParams) -> Self {
        DefaultAnalyzer {
            params,
            synonyms: HashMap::new(),
            dual_blocker: ScriptBlocker::default(),
            ngram_blocker: ScriptBlocker {
                alnum: Some(GeneralBlocker::default()),
                ..ScriptBlocker::default()
            },
        }
    }

    pub fn add_synonyms(&mut self, word: &str, expansions: &[&str]) {
        self.synonyms
            .insert(word.to_string(), expansions.iter().map(|s| s.to_string()).collect());
    }

    fn stemmer_for(lang: &LanguageSet) -> Option<Stemmer> {
        if lang.contains("en") {
            Some(Stemmer::create(Algorithm::English))
        } else {
            None
        }
    }
}

impl NlpAnalyzer for DefaultAnalyzer {
    fn normalize(&self, text: &str, _lang: &LanguageSet) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            if self.params.ignore_carriage && (c == '\r' || c == '\n') {
                continue;
            }
            if self.params.delete_space && charclass::is_space(c) {
                continue;
            }
            if self.params.normalize {
                for l in c.to_lowercase() {
                    out.push(l);
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    fn tokenize(&self, text: &str, lang: &LanguageSet, mode: IndexingType) -> Vec<Token> {
        match mode {
            IndexingType::Word => {
                let stemmer = if self.params.stemming { Self::stemmer_for(lang) } else { None };
                let mut tokens = Vec::new();
                for (offset, word) in text.unicode_word_indices() {
                    let mut w = if self.params.normalize {
                        word.to_lowercase()
                    } else {
                        word.to_string()
                    };
                    if let Some(s) = &stemmer {
                        w = s.stem(&w).to_string();
                    }
                    tokens.push(Token::new(w, offset));
                }
                tokens
            }
            IndexingType::Dual => {
                self.dual_blocker.tokenize(&self.normalize(text, lang), true)
            }
            IndexingType::Ngram => {
                self.ngram_blocker.tokenize(&self.normalize(text, lang), true)
            }
        }
    }

    fn expand_synonym(&self, pattern: &str, lang: &LanguageSet) -> Vec<String> {
        let key = self.normalize(pattern, lang);
        let mut out = vec![pattern.to_string()];
        if let Some(more) = self.synonyms.get(&key) {
            for m in more {
                if !out.contains(m) {
                    out.push(m.clone());
                }
            }
        }
        out
    }
}

thread_local! {
    static ANALYZERS: RefCell<HashMap<u32, Rc<DefaultAnalyzer>>> = RefCell::new(HashMap::new());
}

/// Thread-local analyzer instance for a resource id, created on first use.
/// One instance lives per thread and dies with it.
pub fn thread_analyzer(resource_id: u32) -> Rc<DefaultAnalyzer> {
    ANALYZERS.with(|m| {
        m.borrow_mut()
            .entry(resource_id)
            .or_insert_with(|| Rc::new(DefaultAnalyzer::new(AnalyzerParams::default())))
            .clone()
    })
}
