use std::rc::Rc;
use once_cell::sync::Lazy;
use regex::Regex;
use crate::analysis::analyzer::{thread_analyzer, NlpAnalyzer};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{SearchType, WordCategory};
use crate::lang::LanguageSet;
use crate::query::ast::{NodeType, TreeNode};
use crate::query::open_option::{FullTextFileId, OpenOption};
use crate::query::tea;

const COMBINERS: [&str; 5] = ["Sum", "ASum", "Prod", "Max", "Min"];
const CALCULATORS: [&str; 7] = [
    "NormalizedOkapiTfIdf",
    "NormalizedOkapiTf",
    "OkapiTfIdf",
    "OkapiTf",
    "NormalizedTfIdf",
    "TfIdf",
    "External",
];
const SCORE_FUNCTIONS: [&str; 3] = ["Sum", "Multiply", "Replace"];

pub(crate) fn check_combiner(name: &str) -> bool {
    COMBINERS.iter().any(|c| c.eq_ignore_ascii_case(name))
}

fn check_calculator(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    CALCULATORS.iter().any(|c| lower.starts_with(&c.to_ascii_lowercase()))
}

fn check_score_function(name: &str) -> bool {
    SCORE_FUNCTIONS.iter().any(|c| c.eq_ignore_ascii_case(name))
}

fn check_clustered_combiner(name: &str) -> bool {
    name.eq_ignore_ascii_case("avg")
}

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());
static FLOAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(\.\d+)?([eE]\d+)?$").unwrap());
static SCALE_ELEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d+)?(#\d+(\.\d+)?)*$").unwrap());

/// Validate a per-field numeric option list and re-emit it sorted by
/// field number: one value, or "[v,…]" with one value per field.
fn check_numeric_list(fields: &[i32], text: &str, pattern: &Regex) -> Option<String> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if parts.iter().any(|p| !pattern.is_match(p)) {
        return None;
    }
    if parts.is_empty() || (parts.len() != 1 && parts.len() != fields.len()) {
        return None;
    }
    if parts.len() > fields.len() {
        return None;
    }
    if parts.len() == 1 {
        return Some(parts[0].to_string());
    }
    let mut pairs: Vec<(i32, &str)> =
        fields.iter().copied().zip(parts.into_iter()).collect();
    pairs.sort_by_key(|&(f, _)| f);
    let mut out = String::from("[");
    for (i, (_, v)) in pairs.iter().enumerate() {
        if i != 0 {
            out.push(',');
        }
        out.push_str(v);
    }
    out.push(']');
    Some(out)
}

/// Validate a "concatinate|sum|max[:v,…]" score-combiner option, giving
/// the tea type slot and the per-field scale slot
fn check_score_combiner(fields: &[i32], text: &str) -> Option<(String, String)> {
    if fields.len() <= 1 {
        return None;
    }
    let (name, rest) = match text.split_once(':') {
        Some((n, r)) => (n.trim(), Some(r)),
        None => (text.trim(), None),
    };
    let tea_type = if name.eq_ignore_ascii_case("concatinate") {
        "cat"
    } else if name.eq_ignore_ascii_case("sum") {
        "or,sum"
    } else if name.eq_ignore_ascii_case("max") {
        "or,max"
    } else {
        return None;
    };

    let mut scale = String::new();
    if let Some(rest) = rest {
        let parts: Vec<&str> = rest.split(',').map(str::trim).collect();
        if parts.len() != fields.len() {
            return None;
        }
        for p in &parts {
            if !SCALE_ELEMENT.is_match(p) {
                return None;
            }
            if tea_type == "cat" && p.contains('#') {
                // concatenation cannot take adjustment terms
                return None;
            }
        }
        let mut pairs: Vec<(i32, &str)> =
            fields.iter().copied().zip(parts.into_iter()).collect();
        pairs.sort_by_key(|&(f, _)| f);
        scale.push('[');
        for (i, (_, v)) in pairs.iter().enumerate() {
            if i != 0 {
                scale.push(',');
            }
            scale.push_str(v);
        }
        scale.push(']');
    }
    Some((tea_type.to_string(), scale))
}

/// Compiles CONTAINS, LIKE and plain comparison predicates against a
/// full-text index into the driver open option.
pub struct OptionParser<'a> {
    pub(crate) file_id: &'a FullTextFileId,
    pub(crate) out: OpenOption,
    /// Current expansion word while re-emitting an ExpandSynonym operand
    pub(crate) expand_word: Option<String>,
    analyzer: Option<Rc<dyn NlpAnalyzer>>,
    pub(crate) query_max_len: usize,
}

impl<'a> OptionParser<'a> {
    pub fn new(file_id: &'a FullTextFileId) -> Self {
        OptionParser {
            file_id,
            out: OpenOption::default(),
            expand_word: None,
            analyzer: None,
            query_max_len: crate::core::config::Config::default().query_max_len,
        }
    }

    pub fn with_query_max_len(mut self, max: usize) -> Self {
        self.query_max_len = max;
        self
    }

    /// Replace the lazily created thread analyzer
    pub fn set_analyzer(&mut self, analyzer: Rc<dyn NlpAnalyzer>) {
        self.analyzer = Some(analyzer);
    }

    pub(crate) fn analyzer(&mut self) -> Rc<dyn NlpAnalyzer> {
        let resource_id = self.file_id.resource_id;
        self.analyzer
            .get_or_insert_with(|| {
                let analyzer: Rc<dyn NlpAnalyzer> = thread_analyzer(resource_id);
                analyzer
            })
            .clone()
    }

    /// Compile the predicate; false means the index cannot run it and
    /// the planner should fall back to a scan
    pub fn parse(&mut self, condition: &TreeNode) -> Result<bool> {
        let mut ok = match condition.node_type {
            NodeType::Contains => self.set_contains(condition)?,
            _ => self.set_normal(condition)?,
        };
        if !ok {
            // the predicate may still be the verify-time equality shape
            ok = self.set_equal(condition)?;
        }
        if ok {
            self.out.open_mode_read = true;
        }
        Ok(ok)
    }

    /// Result of the compilation
    pub fn into_open_option(self) -> OpenOption {
        self.out
    }

    pub(crate) fn set_contains(&mut self, condition: &TreeNode) -> Result<bool> {
        if condition.operands.len() != 2 {
            return Ok(false);
        }
        let mut field = &condition.operands[0];
        let mut cond = &condition.operands[1];
        if !matches!(field.node_type, NodeType::Field | NodeType::List) {
            std::mem::swap(&mut field, &mut cond);
        }

        // target fields, ascending
        let mut field_slot = String::new();
        let mut original_fields: Vec<i32> = Vec::new();
        if field.node_type == NodeType::List {
            let mut sorted = Vec::new();
            for f in &field.operands {
                let f = match f.as_int() {
                    Some(v) => v as i32,
                    None => return Ok(false),
                };
                if f >= self.file_id.key_count {
                    return Ok(false);
                }
                sorted.push(f);
                original_fields.push(f);
            }
            sorted.sort();
            field_slot.push('[');
            for (i, f) in sorted.iter().enumerate() {
                if i != 0 {
                    field_slot.push(',');
                }
                self.out.search_fields.push(*f);
                field_slot.push_str(&f.to_string());
            }
            field_slot.push(']');
        } else {
            let f = match field.as_int() {
                Some(v) => v as i32,
                None => return Ok(false),
            };
            if f >= self.file_id.key_count {
                return Ok(false);
            }
            original_fields.push(f);
            self.out.search_fields.push(f);
            field_slot.push_str(&f.to_string());
        }
        let field_count = original_fields.len();

        let mut tea_type = String::new();
        let mut calculator = String::new();
        let mut combiner = String::new();
        let mut average_length = String::new();
        let mut document_frequency = String::new();
        let mut word_limit: Option<i64> = None;
        let mut extractor = String::new();
        let mut score_method = String::new();
        let mut clustered_limit = 0.0f64;
        let mut scale = String::new();

        for option in &condition.options {
            match option.node_type {
                NodeType::Calculator => {
                    calculator = option.value.clone();
                    if !check_calculator(&calculator) {
                        return Err(Error::new(ErrorKind::WrongParameter, calculator));
                    }
                }
                NodeType::Combiner => {
                    combiner = option.value.clone();
                    if !check_combiner(&combiner) {
                        return Err(Error::new(ErrorKind::WrongParameter, combiner));
                    }
                }
                NodeType::AverageLength => {
                    average_length =
                        match check_numeric_list(&original_fields, &option.value, &FLOAT) {
                            Some(v) => v,
                            None => {
                                return Err(Error::new(
                                    ErrorKind::WrongParameter,
                                    option.value.clone(),
                                ));
                            }
                        };
                }
                NodeType::Df => {
                    document_frequency =
                        match check_numeric_list(&original_fields, &option.value, &NUMBER) {
                            Some(v) => v,
                            None => {
                                return Err(Error::new(
                                    ErrorKind::WrongParameter,
                                    option.value.clone(),
                                ));
                            }
                        };
                }
                NodeType::Expand => {
                    if !self.parse_expand(option, &mut word_limit)? {
                        return Ok(false);
                    }
                }
                NodeType::Extractor => {
                    extractor = option.value.clone();
                }
                NodeType::ScoreFunction => {
                    score_method = option.value.clone();
                    if !check_score_function(&score_method) {
                        return Err(Error::new(ErrorKind::WrongParameter, score_method));
                    }
                }
                NodeType::ClusteredLimit => {
                    if !self.file_id.clustering {
                        // no feature vectors were extracted at indexing time
                        return Ok(false);
                    }
                    clustered_limit = option.as_double().unwrap_or(0.0);
                }
                NodeType::ScoreCombiner => {
                    match check_score_combiner(&original_fields, &option.value) {
                        Some((t, s)) => {
                            if !tea_type.is_empty() && tea_type != t {
                                return Err(Error::new(
                                    ErrorKind::WrongParameter,
                                    option.value.clone(),
                                ));
                            }
                            tea_type = t;
                            if !s.is_empty() {
                                scale = s;
                            }
                        }
                        None => {
                            return Err(Error::new(
                                ErrorKind::WrongParameter,
                                option.value.clone(),
                            ));
                        }
                    }
                }
                NodeType::ClusteredCombiner => {
                    if !check_clustered_combiner(&option.value) {
                        return Err(Error::new(
                            ErrorKind::WrongParameter,
                            option.value.clone(),
                        ));
                    }
                }
                _ => {}
            }
        }

        if tea_type.is_empty() {
            tea_type = if field_count == 1 { "single".to_string() } else { "cat".to_string() };
        }
        if field_count != 1 {
            field_slot.push(',');
            field_slot.push_str(&scale);
        }

        let mut stream = String::new();
        stream.push_str("#contains[");
        stream.push_str(&tea_type);
        stream.push(',');
        stream.push_str(&field_slot);
        stream.push(',');
        stream.push_str(&average_length);
        stream.push(',');
        stream.push_str(&document_frequency);
        stream.push(',');
        stream.push_str(&calculator);
        stream.push(',');
        stream.push_str(&combiner);
        stream.push(',');
        if let Some(limit) = word_limit {
            stream.push_str(&limit.to_string());
        }
        stream.push(',');
        tea::append_escaped(&mut stream, &extractor);
        stream.push(',');
        stream.push_str(&score_method);
        stream.push(',');
        if clustered_limit != 0.0 {
            stream.push_str(&clustered_limit.to_string());
        }
        stream.push_str("](");

        let mut term_count = 0;
        match cond.node_type {
            NodeType::FreeText => {
                if !self.convert_free_text(&mut stream, cond, &mut term_count)? {
                    return Ok(false);
                }
                self.out.search_type = Some(SearchType::FreeText);
            }
            NodeType::WordList => {
                if !self.convert_word_list(&mut stream, cond, &mut term_count)? {
                    return Ok(false);
                }
                self.out.search_type = Some(SearchType::FreeText);
            }
            _ => {
                if !self.convert_contains(&mut stream, cond, &mut term_count)? {
                    return Ok(false);
                }
                self.out.search_type = Some(SearchType::Normal);
            }
        }
        stream.push(')');

        self.out.condition = Some(stream);
        self.out.term_count = term_count;
        Ok(true)
    }

    fn parse_expand(&mut self, option: &TreeNode, limit: &mut Option<i64>) -> Result<bool> {
        for o in &option.options {
            if o.node_type == NodeType::Limit {
                *limit = o.as_int();
            }
            // a sort key on the expansion is ignored
        }
        Ok(true)
    }

    pub(crate) fn convert_free_text(
        &mut self,
        stream: &mut String,
        condition: &TreeNode,
        term_count: &mut i32,
    ) -> Result<bool> {
        if condition.operands.len() != 1 || condition.options.len() > 3 {
            return Ok(false);
        }

        let mut lang = String::new();
        let mut scale_parameter = String::new();
        let mut word_limit = String::new();
        for option in &condition.options {
            match option.node_type {
                NodeType::Language => {
                    lang = LanguageSet::parse(&option.value)?.name();
                }
                NodeType::ScaleParameter => scale_parameter = option.value.clone(),
                NodeType::WordLimit => word_limit = option.value.clone(),
                _ => return Err(Error::new(ErrorKind::NotSupported, "bad freetext option")),
            }
        }

        let text = &condition.operands[0].value;
        stream.push_str("#freetext[");
        stream.push(self.file_id.indexing_type.match_mode_char());
        stream.push(',');
        stream.push_str(&lang);
        stream.push(',');
        stream.push_str(&scale_parameter);
        stream.push(',');
        stream.push_str(&word_limit);
        stream.push_str("](");
        tea::append_escaped(stream, text);
        stream.push(')');

        // rough cost estimate: one term per twenty characters
        *term_count += (text.chars().count() as i32 + 19) / 20;
        Ok(true)
    }

    pub(crate) fn convert_word_list(
        &mut self,
        stream: &mut String,
        condition: &TreeNode,
        term_count: &mut i32,
    ) -> Result<bool> {
        if condition.operands.is_empty() {
            return Ok(false);
        }
        stream.push_str("#wordlist[");
        stream.push_str(&condition.operands.len().to_string());
        stream.push_str("](");
        for node in &condition.operands {
            if !self.convert_word(stream, node, term_count)? {
                return Ok(false);
            }
        }
        stream.push(')');
        Ok(true)
    }

    fn convert_word(
        &mut self,
        stream: &mut String,
        condition: &TreeNode,
        term_count: &mut i32,
    ) -> Result<bool> {
        if condition.operands.len() != 1 {
            return Ok(false);
        }

        let mut match_mode = self.file_id.indexing_type.match_mode_char();
        let mut node = &condition.operands[0];
        if node.node_type != NodeType::Pattern {
            if node.operands.len() != 1 {
                return Ok(false);
            }
            match_mode = match node.node_type {
                NodeType::ExactWord => 'e',
                NodeType::SimpleWord => 's',
                NodeType::StringMode => 'n',
                NodeType::WordHead => 'h',
                NodeType::WordTail => 't',
                _ => return Ok(false),
            };
            node = &node.operands[0];
        }
        if node.node_type != NodeType::Pattern
            || node.operands.len() != 1
            || !node.options.is_empty()
        {
            return Ok(false);
        }

        let mut category = WordCategory::Helpful;
        let mut scale = 1.0f64;
        let mut language = String::new();
        let mut df = 0i64;
        for option in &condition.options {
            match option.node_type {
                NodeType::Category => {
                    let c = WordCategory::from_name(&option.value);
                    if c == WordCategory::Undefined {
                        return Ok(false);
                    }
                    category = c;
                }
                NodeType::Scale => scale = option.as_double().unwrap_or(1.0),
                NodeType::Language => {
                    language = LanguageSet::parse(&option.value)?.name();
                }
                NodeType::Df => df = option.as_int().unwrap_or(0),
                _ => {}
            }
        }

        stream.push_str("#word[");
        stream.push(match_mode);
        stream.push(',');
        stream.push_str(&language);
        stream.push(',');
        stream.push_str(category.name());
        stream.push(',');
        stream.push_str(&scale.to_string());
        stream.push(',');
        stream.push_str(&df.to_string());
        stream.push_str("](");
        tea::append_escaped(stream, &node.operands[0].value);
        stream.push(')');

        *term_count += 1;
        Ok(true)
    }

    pub(crate) fn convert_contains(
        &mut self,
        stream: &mut String,
        condition: &TreeNode,
        term_count: &mut i32,
    ) -> Result<bool> {
        match condition.node_type {
            NodeType::Within => {
                if self.file_id.nolocation {
                    // no positions, no proximity
                    return Ok(false);
                }
                let mut upper: Option<i64> = None;
                let mut lower = 0i64;
                let mut order = 'u';
                for option in &condition.options {
                    match option.node_type {
                        NodeType::Upper => upper = option.as_int(),
                        NodeType::Lower => lower = option.as_int().unwrap_or(0),
                        NodeType::Symmetric => {
                            if option.as_int() == Some(1) {
                                order = 'o';
                            }
                        }
                        _ => return Ok(false),
                    }
                }
                let upper = match upper {
                    Some(u) => u,
                    None => return Ok(false),
                };
                stream.push_str("#window[");
                stream.push_str(&lower.to_string());
                stream.push(',');
                stream.push_str(&upper.to_string());
                stream.push(',');
                stream.push(order);
                stream.push_str("](");
                for (i, node) in condition.operands.iter().enumerate() {
                    if i != 0 {
                        stream.push(',');
                    }
                    if !self.convert_contains(stream, node, term_count)? {
                        return Ok(false);
                    }
                }
                stream.push(')');
                Ok(true)
            }
            NodeType::And | NodeType::Or => {
                stream.push_str(if condition.node_type == NodeType::And {
                    "#and"
                } else {
                    "#or"
                });
                if !condition.options.is_empty() {
                    if condition.options.len() != 1 {
                        return Ok(false);
                    }
                    let combiner = &condition.options[0].value;
                    if !check_combiner(combiner) {
                        return Ok(false);
                    }
                    stream.push('[');
                    stream.push_str(combiner);
                    stream.push(']');
                }
                stream.push('(');
                for (i, node) in condition.operands.iter().enumerate() {
                    if i != 0 {
                        stream.push(',');
                    }
                    if !self.convert_contains(stream, node, term_count)? {
                        return Ok(false);
                    }
                }
                stream.push(')');
                Ok(true)
            }
            NodeType::AndNot => {
                if !condition.options.is_empty() {
                    if condition.options.len() != 1 {
                        return Ok(false);
                    }
                    if !check_combiner(&condition.options[0].value) {
                        return Ok(false);
                    }
                }
                let count = condition.operands.len();
                for _ in 0..count.saturating_sub(1) {
                    stream.push_str("#and-not(");
                }
                for (i, node) in condition.operands.iter().enumerate() {
                    if !self.convert_contains(stream, node, term_count)? {
                        return Ok(false);
                    }
                    if i == 0 {
                        stream.push(',');
                    } else {
                        stream.push(')');
                        if i != count - 1 {
                            stream.push(',');
                        }
                    }
                }
                Ok(true)
            }
            NodeType::Pattern => {
                if self.convert_pattern(stream, condition, None)? {
                    *term_count += 1;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            NodeType::Head => {
                if condition.operands.len() != 1 || self.file_id.nolocation {
                    return Ok(false);
                }
                stream.push_str("#location[1](");
                let ok = self.convert_contains(stream, &condition.operands[0], term_count)?;
                stream.push(')');
                Ok(ok)
            }
            NodeType::Tail => {
                if condition.operands.len() != 1 || self.file_id.nolocation {
                    return Ok(false);
                }
                stream.push_str("#end[0](");
                let ok = self.convert_contains(stream, &condition.operands[0], term_count)?;
                stream.push(')');
                Ok(ok)
            }
            NodeType::ExactWord => {
                if condition.operands.len() != 1 || self.file_id.nolocation {
                    return Ok(false);
                }
                self.convert_counted_pattern(stream, &condition.operands[0], 'e', term_count)
            }
            NodeType::SimpleWord => {
                if condition.operands.len() != 1 {
                    return Ok(false);
                }
                self.convert_counted_pattern(stream, &condition.operands[0], 's', term_count)
            }
            NodeType::StringMode => {
                if condition.operands.len() != 1 {
                    return Ok(false);
                }
                self.convert_counted_pattern(stream, &condition.operands[0], 'n', term_count)
            }
            NodeType::WordHead => {
                if condition.operands.len() != 1 || self.file_id.nolocation {
                    return Ok(false);
                }
                self.convert_counted_pattern(stream, &condition.operands[0], 'h', term_count)
            }
            NodeType::WordTail => {
                if condition.operands.len() != 1 {
                    return Ok(false);
                }
                self.convert_counted_pattern(stream, &condition.operands[0], 't', term_count)
            }
            NodeType::Weight => {
                if condition.operands.len() != 1 || condition.options.len() != 1 {
                    return Ok(false);
                }
                stream.push_str("#scale[");
                stream.push_str(&condition.options[0].value);
                stream.push_str("](");
                let ok = self.convert_contains(stream, &condition.operands[0], term_count)?;
                stream.push(')');
                Ok(ok)
            }
            NodeType::Synonym => {
                stream.push_str("#syn(");
                for (i, node) in condition.operands.iter().enumerate() {
                    if i != 0 {
                        stream.push(',');
                    }
                    if !self.convert_contains(stream, node, term_count)? {
                        return Ok(false);
                    }
                }
                stream.push(')');
                Ok(true)
            }
            NodeType::ExpandSynonym => {
                if condition.operands.len() != 1 {
                    return Ok(false);
                }
                let expansions = match self.get_expand_synonym(&condition.operands[0])? {
                    Some(e) => e,
                    None => return Ok(false),
                };
                if expansions.len() > 1 {
                    stream.push_str("#syn(");
                    for (i, word) in expansions.iter().enumerate() {
                        self.expand_word = Some(word.clone());
                        if i != 0 {
                            stream.push(',');
                        }
                        let ok =
                            self.convert_contains(stream, &condition.operands[0], term_count)?;
                        if !ok {
                            self.expand_word = None;
                            return Ok(false);
                        }
                    }
                    self.expand_word = None;
                    stream.push(')');
                } else if !self.convert_contains(stream, &condition.operands[0], term_count)? {
                    return Ok(false);
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn convert_counted_pattern(
        &mut self,
        stream: &mut String,
        node: &TreeNode,
        match_mode: char,
        term_count: &mut i32,
    ) -> Result<bool> {
        if self.convert_pattern(stream, node, Some(match_mode))? {
            *term_count += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Emit one #term; the match mode is constrained by the indexing type
    pub(crate) fn convert_pattern(
        &mut self,
        stream: &mut String,
        condition: &TreeNode,
        match_mode: Option<char>,
    ) -> Result<bool> {
        use crate::core::types::IndexingType;

        if condition.operands.len() != 1 {
            return Ok(false);
        }

        let match_mode = match self.file_id.indexing_type {
            IndexingType::Dual => match_mode.unwrap_or('m'),
            IndexingType::Word => match match_mode {
                None => 'e',
                Some(m) if m == 'e' || m == 'h' => m,
                Some(_) => return Ok(false),
            },
            IndexingType::Ngram => match match_mode {
                None => 'n',
                Some('n') => 'n',
                Some(_) => return Ok(false),
            },
        };

        let mut lang = self.file_id.default_language.name();
        for option in &condition.options {
            match option.node_type {
                NodeType::Language => lang = option.value.clone(),
                _ => return Ok(false),
            }
        }

        let mut value = condition.operands[0].value.clone();
        if let Some(word) = &self.expand_word {
            value = word.clone();
        }
        if value.is_empty() {
            return Ok(false);
        }

        stream.push_str("#term[");
        stream.push(match_mode);
        stream.push_str(",,");
        stream.push_str(&lang);
        stream.push_str("](");
        tea::append_escaped(stream, &value);
        stream.push(')');
        Ok(true)
    }

    /// Expand the pattern below an ExpandSynonym node via the analyzer
    fn get_expand_synonym(&mut self, node: &TreeNode) -> Result<Option<Vec<String>>> {
        if self.file_id.resource_id == 0 {
            return Err(Error::new(ErrorKind::NotSupported, "no analyzer resource"));
        }

        let mut pattern = String::new();
        let mut lang = self.file_id.default_language.clone();
        let mut p = Some(node);
        while let Some(n) = p {
            if n.node_type == NodeType::Pattern {
                for option in &n.options {
                    match option.node_type {
                        NodeType::Language => lang = LanguageSet::parse(&option.value)?,
                        _ => return Ok(None),
                    }
                }
                pattern = match n.operands.first() {
                    Some(operand) => operand.value.clone(),
                    None => return Ok(None),
                };
                break;
            }
            p = n.operands.first();
        }
        if pattern.is_empty() {
            return Ok(None);
        }

        let analyzer = self.analyzer();
        Ok(Some(analyzer.expand_synonym(&pattern, &lang)))
    }
}
