use std::rc::Rc;
use std::sync::Arc;
use once_cell::sync::Lazy;
use regex::Regex;
use crate::analysis::analyzer::{thread_analyzer, NlpAnalyzer};
use crate::analysis::charclass;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::separator::BulkSeparator;
use crate::core::types::{IndexingType, MatchMode, WordCategory, WordData};
use crate::lang::LanguageSet;
use crate::query::open_option::FullTextFileId;
use crate::term::element::TermElement;
use crate::term::pool::{TermMap, TermPool};
use crate::term::resource::{self, TermResource};

static TERM_RSC: Lazy<Regex> = Lazy::new(|| Regex::new(r"@TERMRSCID:(\d+)").unwrap());
static UNA_RSC: Lazy<Regex> = Lazy::new(|| Regex::new(r"@UNARSCID:(\d+)").unwrap());
static NORM_RSC: Lazy<Regex> = Lazy::new(|| Regex::new(r"@NORMRSCID:(\d+)").unwrap());

/// Builds and weights the term pools of the natural-language query path:
/// free-text analysis, wordlist intake, and pseudo-relevance expansion
/// against seed documents.
pub struct TermProcessor {
    resource: Arc<TermResource>,
    analyzer: Rc<dyn NlpAnalyzer>,
    lang: LanguageSet,
    indexing_type: IndexingType,
    collection_size: f64,
    /// Initial search terms
    pool1: TermPool,
    /// Selected expansion terms
    pool2: TermPool,
    /// Expansion candidates from the seed documents
    cand2: Option<TermPool>,
    map: Option<TermMap>,
    term_resource_id: u32,
    analyzer_resource_id: u32,
    word_limit: usize,
    scale_parameter: f64,
}

impl TermProcessor {
    pub fn new(file_id: &FullTextFileId, collection_size: usize) -> Self {
        let resource = resource::get(0);
        let analyzer: Rc<dyn NlpAnalyzer> = thread_analyzer(file_id.resource_id);
        TermProcessor {
            pool1: TermPool::new(resource.max_term1),
            pool2: TermPool::new(resource.max_term2),
            cand2: None,
            map: None,
            analyzer,
            lang: file_id.default_language.clone(),
            indexing_type: file_id.indexing_type,
            collection_size: collection_size as f64,
            term_resource_id: 0,
            analyzer_resource_id: file_id.resource_id,
            word_limit: 0,
            scale_parameter: 0.0,
            resource,
        }
    }

    pub fn set_analyzer(&mut self, analyzer: Rc<dyn NlpAnalyzer>) {
        self.analyzer = analyzer;
    }

    /// Apply an extractor hint such as "@TERMRSCID:1 @UNARSCID:2"
    pub fn set_extractor(&mut self, extractor: &str) {
        if let Some(c) = TERM_RSC.captures(extractor) {
            self.term_resource_id = c[1].parse().unwrap_or(0);
            self.resource = resource::get(self.term_resource_id);
            self.pool1 = TermPool::new(self.resource.max_term1.max(self.word_limit));
            self.pool2 = TermPool::new(self.resource.max_term2);
        }
        if let Some(c) = UNA_RSC.captures(extractor).or_else(|| NORM_RSC.captures(extractor)) {
            self.analyzer_resource_id = c[1].parse().unwrap_or(0);
            self.analyzer = thread_analyzer(self.analyzer_resource_id);
        }
    }

    /// Cap the number of initial terms, overriding the resource profile
    pub fn set_word_limit(&mut self, limit: usize) {
        self.word_limit = limit;
        if limit != 0 {
            self.pool1 = TermPool::new(limit);
        }
    }

    pub fn set_scale_parameter(&mut self, scale: f64) {
        self.scale_parameter = scale;
    }

    /// Weight scale in effect: the query override, else the resource's
    fn effective_scale(&self) -> f64 {
        if self.scale_parameter != 0.0 {
            self.scale_parameter
        } else {
            self.resource.param_scale1
        }
    }

    /// Build the initial pool from a free-text query
    pub fn make_pool_text(&mut self, free_text: &str, lang: &LanguageSet) {
        let lang = if lang.is_empty() { self.lang.clone() } else { lang.clone() };
        let tokens = self.analyzer.tokenize(free_text, &lang, self.indexing_type);
        for (position, token) in tokens.into_iter().enumerate() {
            if self.resource.is_stopword(&token.text) {
                continue;
            }
            let mut e = TermElement::new(token.text);
            e.language = lang.clone();
            e.match_mode = MatchMode::VoidMatch;
            e.category = WordCategory::Helpful;
            e.position = position;
            self.pool1.insert_term(e);
        }
    }

    /// Build the initial pool from an explicit word list
    pub fn make_pool_words(&mut self, words: &[WordData]) {
        for (position, word) in words.iter().enumerate() {
            let lang =
                if word.language.is_empty() { self.lang.clone() } else { word.language.clone() };
            let mut e = TermElement::new(self.analyzer.normalize(&word.term, &lang));
            e.original_string = word.term.clone();
            e.language = lang;
            e.match_mode = MatchMode::VoidMatch;
            e.category = word.category;
            e.scale = word.scale;
            e.df = word.document_frequency;
            e.twv = 1.0;
            e.position = position;
            self.pool1.insert_term(e);
        }
        self.pool1.validate_pool();
    }

    /// Initial terms whose document frequency is still unknown
    pub fn get_candidate(&self) -> Vec<WordData> {
        self.pool1
            .iter()
            .filter(|e| e.df == 0 && !e.string.is_empty())
            .map(|e| {
                let mut w = WordData::new(e.string.clone());
                w.language = e.language.clone();
                w.category = e.category;
                w
            })
            .collect()
    }

    pub fn set_document_frequency(&mut self, words: &[WordData]) {
        for w in words {
            self.pool1.set_df(&w.term, w.document_frequency);
        }
    }

    /// Seed documents delivered as one separator-delimited bulk string;
    /// every piece shares the given language
    pub fn expand_pool_bulk(
        &mut self,
        bulk: &str,
        separator: &BulkSeparator,
        lang: &LanguageSet,
    ) -> Result<()> {
        let seeds: Vec<String> = separator
            .split(bulk)
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.to_string())
            .collect();
        let langs: Vec<LanguageSet> = if lang.is_empty() {
            Vec::new()
        } else {
            vec![lang.clone(); seeds.len()]
        };
        self.expand_pool(&seeds, &langs)
    }

    /// Analyze the seed documents, weight the initial terms against them
    /// and pool expansion candidates
    pub fn expand_pool(&mut self, seeds: &[String], langs: &[LanguageSet]) -> Result<()> {
        if !langs.is_empty() && seeds.len() != langs.len() {
            return Err(Error::new(
                ErrorKind::BadArgument,
                "seed documents and languages differ in number",
            ));
        }

        let mut map = TermMap::new();
        for (i, text) in seeds.iter().enumerate() {
            let lang = langs.get(i).cloned().unwrap_or_else(|| self.lang.clone());
            let tokens = self.analyzer.tokenize(text, &lang, self.indexing_type);
            for token in tokens {
                if self.resource.is_stopword(&token.text) {
                    continue;
                }
                let mut e = TermElement::new(token.text);
                e.language = lang.clone();
                e.match_mode = MatchMode::VoidMatch;
                map.insert(e, i as u32 + 1);
            }
        }

        // weight the initial terms
        let n = self.collection_size;
        let scale = self.effective_scale();
        for e in self.pool1.iter_mut() {
            if let Some(stats) = map.get(&e.string) {
                e.twv = term_weight(scale, stats.seed_frequency() as f64, n, e.df);
                e.tsv = e.twv;
            }
        }

        // pool expansion candidates
        let mut cand = TermPool::new(self.resource.max_candidate);
        for (_, stats) in map.iter() {
            if let Some(element) = &stats.element {
                let mut e = element.clone();
                e.twv = stats.seed_frequency() as f64;
                e.category = WordCategory::HelpfulRelated;
                cand.insert_term(e);
            }
        }
        self.cand2 = Some(cand);
        self.map = Some(map);
        Ok(())
    }

    /// Expansion candidates whose document frequency is still unknown
    pub fn get_related_candidate(&self) -> Vec<WordData> {
        let cand = match &self.cand2 {
            Some(c) => c,
            None => return Vec::new(),
        };
        cand.iter()
            .filter(|e| e.df == 0)
            .map(|e| {
                let mut w = WordData::new(e.string.clone());
                w.language = e.language.clone();
                w.category = WordCategory::HelpfulRelated;
                w
            })
            .collect()
    }

    /// Hand back candidate frequencies and select the expansion terms
    pub fn set_related_document_frequency(&mut self, words: &[WordData]) {
        let n = self.collection_size;
        let scale = self.effective_scale();
        let cand = match &mut self.cand2 {
            Some(c) => c,
            None => return,
        };
        for w in words {
            cand.set_df(&w.term, w.document_frequency);
        }

        // pick the heaviest candidates not already asked for
        let mut selected: Vec<TermElement> = Vec::new();
        for e in cand.iter() {
            if self.pool1.contains(&e.string) {
                continue;
            }
            let mut e = e.clone();
            let seed_tf = self
                .map
                .as_ref()
                .and_then(|m| m.get(&e.string))
                .map(|s| s.seed_frequency() as f64)
                .unwrap_or(e.twv);
            e.twv = term_weight(scale, seed_tf, n, e.df);
            selected.push(e);
        }
        selected.sort_by(|a, b| b.twv.total_cmp(&a.twv));
        for mut e in selected {
            e.tsv = e.twv;
            e.category = WordCategory::HelpfulRelated;
            self.pool2.insert_term(e);
        }
    }

    /// The final word set: selected initial terms (or all of them when
    /// nothing was selected) followed by the expansion terms
    pub fn get_selection(&self) -> Vec<WordData> {
        let mut out: Vec<WordData> =
            self.pool1.iter().filter(|e| e.tsv != 0.0).map(to_word_data).collect();
        if out.is_empty() {
            out = self.pool1.iter().map(to_word_data).collect();
        }
        out.extend(self.pool2.iter().filter(|e| e.tsv != 0.0).map(to_word_data));
        out
    }

    pub fn clear(&mut self) {
        self.pool1.clear();
        self.pool2.clear();
        self.cand2 = None;
        self.map = None;
    }

    /// CONTAINS fragment of one selected word
    pub fn get_formula(&self, word: &WordData) -> String {
        let proximity = if word.category.is_related() {
            self.resource.param_proximity2
        } else {
            self.resource.param_proximity1
        };

        let term = &word.term;
        let use_within = proximity != 0 && term.contains(' ');

        let mut s = String::new();
        if use_within {
            s.push_str("within(");
        }
        s.push('\'');

        let chars: Vec<char> = term.chars().collect();
        for (i, &c) in chars.iter().enumerate() {
            if c == '\'' {
                // double the quote to escape it
                s.push('\'');
            }
            if c == ' ' {
                if proximity == 0 {
                    if i == 0 || i + 1 == chars.len() {
                        // surrounding separators vanish
                    } else if charclass::is_alphabet(chars[i - 1])
                        && charclass::is_alphabet(chars[i + 1])
                    {
                        s.push(c);
                    } else if charclass::is_digit(chars[i - 1])
                        && charclass::is_digit(chars[i + 1])
                    {
                        s.push(c);
                    }
                    // a separator between mixed scripts vanishes
                } else {
                    s.push_str("' '");
                }
            } else {
                s.push(c);
            }
        }

        s.push('\'');
        if use_within {
            if proximity > 0 {
                s.push_str(&format!(" symmetric upper {})", proximity));
            } else {
                s.push_str(&format!(" asymmetric upper {})", -proximity));
            }
        }
        s
    }
}

/// Shared term weight of the initial and expansion selection:
/// scale · seed_tf · ln(1 + N/(df+1)), add-one smoothed so unknown
/// frequencies stay finite
fn term_weight(scale: f64, seed_tf: f64, n: f64, df: u32) -> f64 {
    scale * seed_tf * (1.0 + n / (df as f64 + 1.0)).ln()
}

fn to_word_data(e: &TermElement) -> WordData {
    WordData {
        term: e.original_string.clone(),
        language: e.language.clone(),
        category: e.category,
        scale: if e.scale == 0.0 { 1.0 } else { e.scale },
        document_frequency: e.df,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::IndexingType;
    use crate::term::resource::{register, TermResource};

    fn file_id() -> FullTextFileId {
        let mut f = FullTextFileId::new(IndexingType::Dual);
        f.default_language = LanguageSet::parse("en").unwrap();
        f
    }

    #[test]
    fn test_free_text_pool_drops_stopwords() {
        let mut t = TermProcessor::new(&file_id(), 1000);
        t.make_pool_text("the quick brown fox", &LanguageSet::default());
        let candidates = t.get_candidate();
        let terms: Vec<&str> = candidates.iter().map(|w| w.term.as_str()).collect();
        assert!(!terms.contains(&"the"));
        assert!(terms.contains(&"quick"));
    }

    #[test]
    fn test_word_list_pool_normalizes_and_validates() {
        let mut t = TermProcessor::new(&file_id(), 1000);
        let mut w1 = WordData::new("Tea");
        w1.category = WordCategory::Essential;
        let w2 = WordData::new("\r\n");
        t.make_pool_words(&[w1, w2]);

        // the empty normalization result was dropped
        let candidates = t.get_candidate();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].term, "tea");
        assert_eq!(candidates[0].category, WordCategory::Essential);
    }

    #[test]
    fn test_df_roundtrip() {
        let mut t = TermProcessor::new(&file_id(), 1000);
        t.make_pool_text("espresso machine", &LanguageSet::default());
        let mut candidates = t.get_candidate();
        assert_eq!(candidates.len(), 2);
        for (i, c) in candidates.iter_mut().enumerate() {
            c.document_frequency = (i as u32 + 1) * 10;
        }
        t.set_document_frequency(&candidates);
        // nothing left without a frequency
        assert!(t.get_candidate().is_empty());
    }

    #[test]
    fn test_expansion_selects_related_terms() {
        let mut t = TermProcessor::new(&file_id(), 1000);
        t.make_pool_text("tea ceremony", &LanguageSet::default());
        let mut c = t.get_candidate();
        for w in c.iter_mut() {
            w.document_frequency = 50;
        }
        t.set_document_frequency(&c);

        let seeds = vec![
            "tea ceremony with matcha powder".to_string(),
            "matcha powder whisk".to_string(),
        ];
        t.expand_pool(&seeds, &[]).unwrap();

        let mut related = t.get_related_candidate();
        assert!(related.iter().all(|w| w.category == WordCategory::HelpfulRelated));
        assert!(related.iter().any(|w| w.term == "matcha"));
        for w in related.iter_mut() {
            w.document_frequency = 5;
        }
        t.set_related_document_frequency(&related);

        let selection = t.get_selection();
        // initial terms come first, expansion terms follow
        assert!(selection.iter().any(|w| w.term == "tea"));
        assert!(selection
            .iter()
            .any(|w| w.term == "matcha" && w.category == WordCategory::HelpfulRelated));
        // initial terms are never duplicated into the expansion set
        assert_eq!(selection.iter().filter(|w| w.term == "tea").count(), 1);
    }

    #[test]
    fn test_ngram_index_pools_grams() {
        let mut f = FullTextFileId::new(IndexingType::Ngram);
        f.default_language = LanguageSet::parse("en").unwrap();
        let mut t = TermProcessor::new(&f, 1000);
        t.make_pool_text("abcd", &LanguageSet::default());
        let terms: Vec<String> = t.get_candidate().into_iter().map(|w| w.term).collect();
        // a character n-gram index pools grams, not words
        assert_eq!(terms, ["ab", "cd"]);
    }

    #[test]
    fn test_expand_pool_bulk_splits_seeds() {
        use crate::core::separator::BulkSeparator;

        let mut t = TermProcessor::new(&file_id(), 1000);
        t.make_pool_text("tea", &LanguageSet::default());
        let mut c = t.get_candidate();
        for w in c.iter_mut() {
            w.document_frequency = 50;
        }
        t.set_document_frequency(&c);

        let sep = BulkSeparator::new(&[";"]).unwrap();
        t.expand_pool_bulk("tea with matcha;matcha whisk;", &sep, &LanguageSet::default())
            .unwrap();

        let related = t.get_related_candidate();
        assert!(related.iter().any(|w| w.term == "matcha"));
        assert!(related.iter().any(|w| w.term == "whisk"));
    }

    #[test]
    fn test_initial_and_related_weights_share_the_formula() {
        let mut t = TermProcessor::new(&file_id(), 1000);
        t.make_pool_text("tea", &LanguageSet::default());
        let mut c = t.get_candidate();
        for w in c.iter_mut() {
            w.document_frequency = 9;
        }
        t.set_document_frequency(&c);

        t.expand_pool(&["tea matcha".to_string()], &[]).unwrap();
        let mut related = t.get_related_candidate();
        for w in related.iter_mut() {
            w.document_frequency = 9;
        }
        t.set_related_document_frequency(&related);

        // same seed frequency and df on both sides of the selection
        let expect = term_weight(1.0, 1.0, 1000.0, 9);
        let initial = t.pool1.iter().find(|e| e.string == "tea").unwrap();
        let expansion = t.pool2.iter().find(|e| e.string == "matcha").unwrap();
        assert!((initial.twv - expect).abs() < 1e-12);
        assert!((expansion.twv - expect).abs() < 1e-12);
    }

    #[test]
    fn test_expand_pool_language_count_mismatch() {
        let mut t = TermProcessor::new(&file_id(), 1000);
        let err = t
            .expand_pool(
                &["one".to_string(), "two".to_string()],
                &[LanguageSet::parse("en").unwrap()],
            )
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadArgument);
    }

    #[test]
    fn test_selection_falls_back_to_all_terms() {
        let mut t = TermProcessor::new(&file_id(), 1000);
        t.make_pool_text("solitary", &LanguageSet::default());
        // no weighting happened, so tsv is zero everywhere
        let selection = t.get_selection();
        assert_eq!(selection.len(), 1);
        assert_eq!(selection[0].term, "solitary");
        assert_eq!(selection[0].scale, 1.0);
    }

    #[test]
    fn test_extractor_hint() {
        let mut custom = TermResource::default();
        custom.param_proximity1 = 7;
        register(31, custom);

        let mut t = TermProcessor::new(&file_id(), 1000);
        t.set_extractor("@TERMRSCID:31 @UNARSCID:2");
        let w = WordData::new("green tea");
        assert_eq!(t.get_formula(&w), "within('green' 'tea' symmetric upper 7)");
    }

    #[test]
    fn test_formula_plain_and_quotes() {
        let t = TermProcessor::new(&file_id(), 1000);
        assert_eq!(t.get_formula(&WordData::new("tea")), "'tea'");
        assert_eq!(t.get_formula(&WordData::new("o'brien")), "'o''brien'");
    }

    #[test]
    fn test_formula_separator_rules_without_proximity() {
        let t = TermProcessor::new(&file_id(), 1000);
        // alphabetic neighbours keep the separator
        assert_eq!(t.get_formula(&WordData::new("green tea")), "'green tea'");
        // digits too
        assert_eq!(t.get_formula(&WordData::new("10 20")), "'10 20'");
        // mixed scripts drop it
        assert_eq!(t.get_formula(&WordData::new("日本 語")), "'日本語'");
        // surrounding separators vanish
        assert_eq!(t.get_formula(&WordData::new(" tea ")), "'tea'");
    }

    #[test]
    fn test_formula_asymmetric_proximity() {
        let mut custom = TermResource::default();
        custom.param_proximity2 = -4;
        register(32, custom);
        let mut t = TermProcessor::new(&file_id(), 1000);
        t.set_extractor("@TERMRSCID:32");

        let mut w = WordData::new("a b");
        w.category = WordCategory::HelpfulRelated;
        assert_eq!(t.get_formula(&w), "within('a' 'b' asymmetric upper 4)");
    }
}
