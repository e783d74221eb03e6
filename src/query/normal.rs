use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{IndexingType, SearchType};
use crate::lang::LanguageSet;
use crate::query::ast::{NodeType, TreeNode};
use crate::query::contains::OptionParser;
use crate::query::tea;

/// One '%'-separated segment of a LIKE pattern. `front`/`back` say
/// whether a wildcard may match before/after the segment; `regex` marks
/// an embedded '_'.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LikeTerm {
    pub value: String,
    pub front: bool,
    pub back: bool,
    pub regex: bool,
}

impl<'a> OptionParser<'a> {
    /// Compile AND/OR/LIKE predicates over one full-text column
    pub(crate) fn set_normal(&mut self, condition: &TreeNode) -> Result<bool> {
        let field = match check_field(condition) {
            Some(f) => f,
            None => return Ok(false),
        };
        if field >= self.file_id.key_count {
            return Ok(false);
        }

        let mut stream = format!("#contains[single,{},,,,,,,,](", field);
        let mut term_count = 0;
        if !self.convert_normal(&mut stream, condition, &mut term_count)? {
            return Ok(false);
        }
        stream.push(')');

        self.out.search_type = Some(SearchType::Normal);
        self.out.condition = Some(stream);
        self.out.term_count = term_count;
        self.out.search_fields.push(field);
        Ok(true)
    }

    fn convert_normal(
        &mut self,
        stream: &mut String,
        condition: &TreeNode,
        term_count: &mut i32,
    ) -> Result<bool> {
        match condition.node_type {
            NodeType::And => {
                // A and B and not C and not D
                // becomes #and-not(#and-not(#and(A,B),C),D)
                let not_count = condition
                    .operands
                    .iter()
                    .filter(|o| o.node_type == NodeType::Not)
                    .count();
                let positive_count = condition.operands.len() - not_count;
                if positive_count == 0 {
                    return Ok(false);
                }

                for _ in 0..not_count {
                    stream.push_str("#and-not(");
                }
                if positive_count > 1 {
                    stream.push_str("#and(");
                }
                let mut first = true;
                for node in &condition.operands {
                    if node.node_type == NodeType::Not {
                        continue;
                    }
                    if !first {
                        stream.push(',');
                    }
                    first = false;
                    if !self.convert_normal(stream, node, term_count)? {
                        return Ok(false);
                    }
                }
                if positive_count > 1 {
                    stream.push(')');
                }
                for node in &condition.operands {
                    if node.node_type != NodeType::Not {
                        continue;
                    }
                    stream.push(',');
                    if !self.convert_normal(stream, &node.operands[0], term_count)? {
                        return Ok(false);
                    }
                    stream.push(')');
                }
                Ok(true)
            }
            NodeType::Or => {
                stream.push_str("#or(");
                for (i, node) in condition.operands.iter().enumerate() {
                    if i != 0 {
                        stream.push(',');
                    }
                    if !self.convert_normal(stream, node, term_count)? {
                        return Ok(false);
                    }
                }
                stream.push(')');
                Ok(true)
            }
            NodeType::Like => self.convert_like(stream, condition, term_count),
            // a plain equality cannot run on the inverted file; the
            // caller retries the whole predicate as the verify shape
            NodeType::Equals => Ok(false),
            _ => Ok(false),
        }
    }

    fn convert_like(
        &mut self,
        stream: &mut String,
        condition: &TreeNode,
        term_count: &mut i32,
    ) -> Result<bool> {
        if self.file_id.nolocation {
            // the result of LIKE must not depend on whether the index is
            // used, and without positions only whole-token matches could
            // run; refuse so the planner evaluates it elsewhere
            return Ok(false);
        }
        if condition.operands.len() != 2 {
            return Ok(false);
        }
        let mut field = &condition.operands[0];
        let mut value = &condition.operands[1];
        if field.node_type != NodeType::Field {
            std::mem::swap(&mut field, &mut value);
        }
        let f = match field.as_int() {
            Some(v) => v as i32,
            None => return Ok(false),
        };
        if f >= self.file_id.key_count {
            return Ok(false);
        }

        let mut escape: Option<char> = None;
        let mut language: Option<String> = None;
        for option in &condition.options {
            if option.node_type == NodeType::Language {
                language = Some(option.value.clone());
            } else {
                let mut chars = option.value.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => escape = Some(c),
                    _ => return Err(Error::new(ErrorKind::InvalidEscape, option.value.clone())),
                }
            }
        }
        let language = language.unwrap_or_else(|| self.file_id.default_language.name());

        self.convert_value(stream, &value.value, escape, &language, term_count)
    }

    pub(crate) fn convert_value(
        &mut self,
        stream: &mut String,
        value: &str,
        escape: Option<char>,
        language: &str,
        term_count: &mut i32,
    ) -> Result<bool> {
        let lang = match LanguageSet::parse(language) {
            Ok(l) => l.name(),
            Err(_) => return Ok(false),
        };
        let match_mode = self.file_id.indexing_type.match_mode_char();

        *term_count += 1;

        let terms = match self.separate(value, escape)? {
            Some(t) => t,
            None => return Ok(false),
        };

        if terms.len() > 1 {
            // order is fixed, the distance is unbounded
            stream.push_str(&format!("#window[0,{}](", i32::MAX));
        }

        for (i, term) in terms.iter().enumerate() {
            if i != 0 {
                stream.push(',');
            }

            // leading or trailing '_' adjust the anchors, so the regex
            // conversion runs before the anchors are written
            let mut front_offset = 1;
            let mut end_offset = 0;
            let mut inner = String::new();
            if term.regex {
                if !self.convert_distance(
                    &mut inner,
                    &term.value,
                    escape,
                    &lang,
                    &mut front_offset,
                    &mut end_offset,
                )? {
                    return Ok(false);
                }
            }

            if !term.back {
                stream.push_str(&format!("#end[{}](", end_offset));
            }
            if !term.front {
                stream.push_str(&format!("#location[{}](", front_offset));
            }

            if term.regex {
                stream.push_str(&inner);
            } else {
                stream.push_str(&format!("#term[{},,{}](", match_mode, lang));
                let mut chars = term.value.chars().peekable();
                while let Some(mut c) = chars.next() {
                    if Some(c) == escape {
                        match chars.next() {
                            Some(n) => c = n,
                            None => break,
                        }
                    }
                    if tea::is_escape_char(c) {
                        stream.push('\\');
                    }
                    stream.push(c);
                }
                stream.push(')');
            }

            if !term.front {
                stream.push(')');
            }
            if !term.back {
                stream.push(')');
            }
        }

        if terms.len() > 1 {
            stream.push(')');
        }
        Ok(true)
    }

    /// Split a LIKE pattern at unescaped '%'. None means the pattern has
    /// no usable segment at all.
    fn separate(&self, value: &str, escape: Option<char>) -> Result<Option<Vec<LikeTerm>>> {
        let mut terms = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;
        let mut regex = false;
        let mut front = false;

        let mut chars = value.chars().peekable();
        while let Some(c) = chars.next() {
            if Some(c) == escape {
                current.push(c);
                current_len += 1;
                if let Some(n) = chars.next() {
                    current.push(n);
                    current_len += 1;
                }
                continue;
            }
            match c {
                '%' => {
                    if !current.is_empty() {
                        if current_len > self.query_max_len {
                            return Err(Error::new(
                                ErrorKind::TooLongConditionalPattern,
                                value,
                            ));
                        }
                        terms.push(LikeTerm {
                            value: std::mem::take(&mut current),
                            front,
                            back: true,
                            regex,
                        });
                        current_len = 0;
                        regex = false;
                    }
                    front = true;
                }
                '_' => {
                    regex = true;
                    current.push(c);
                    current_len += 1;
                }
                _ => {
                    current.push(c);
                    current_len += 1;
                }
            }
        }

        // the remainder, unless it is a dangling escape character
        let only_escape = current.chars().count() == 1 && current.chars().next() == escape;
        if !current.is_empty() && !only_escape {
            if current_len > self.query_max_len {
                return Err(Error::new(ErrorKind::TooLongConditionalPattern, value));
            }
            terms.push(LikeTerm { value: current, front, back: false, regex });
        }

        Ok(if terms.is_empty() { None } else { Some(terms) })
    }

    /// Convert a segment containing '_' into a chain of fixed-distance
    /// #window constraints. 'A_B_C' nests as
    /// #window[2,2](#window[2,2](A,B),C).
    fn convert_distance(
        &mut self,
        stream: &mut String,
        value: &str,
        escape: Option<char>,
        lang: &str,
        front_offset: &mut i32,
        end_offset: &mut i32,
    ) -> Result<bool> {
        if self.file_id.indexing_type == IndexingType::Word {
            // a word index cannot anchor single-character gaps
            return Ok(false);
        }
        let match_mode = if self.file_id.indexing_type == IndexingType::Dual { 'm' } else { 'n' };

        let mut chars = value.chars().peekable();
        // leading gaps move the location anchor instead
        while chars.peek() == Some(&'_') {
            *front_offset += 1;
            chars.next();
        }
        if chars.peek().is_none() {
            return Ok(false);
        }

        struct DistanceEntry {
            position: i32,
            value: String,
        }
        let mut entries: Vec<DistanceEntry> = vec![DistanceEntry { position: 0, value: String::new() }];
        let mut gap = 0;
        let mut prev_was_gap = false;
        while let Some(c) = chars.next() {
            if c == '_' {
                if !prev_was_gap {
                    entries.push(DistanceEntry { position: 0, value: String::new() });
                    gap = 1;
                    prev_was_gap = true;
                } else {
                    gap += 1;
                }
            } else {
                let mut c = c;
                if Some(c) == escape {
                    match chars.next() {
                        Some(n) => c = n,
                        None => break,
                    }
                }
                let entry = entries.last_mut().unwrap();
                if entry.position == 0 {
                    entry.position = gap;
                }
                entry.value.push(c);
                prev_was_gap = false;
                gap = 0;
            }
        }
        // trailing gaps move the end anchor
        *end_offset += gap;

        let mut built = String::new();
        built.push_str(&format!("#term[{},,{}](", match_mode, lang));
        tea::append_escaped(&mut built, &entries[0].value);
        built.push(')');

        for entry in entries.iter().skip(1) {
            if entry.value.is_empty() {
                continue;
            }
            let mut next = String::new();
            next.push_str(&format!("#window[{},{}](", entry.position + 1, entry.position + 1));
            next.push_str(&built);
            next.push(',');
            next.push_str(&format!("#term[{},,{}](", match_mode, lang));
            tea::append_escaped(&mut next, &entry.value);
            next.push_str("))");
            built = next;
        }
        stream.push_str(&built);
        Ok(true)
    }

    /// Compile the verify-time equality shape: key value(s), optional
    /// language value(s), and the row id
    pub(crate) fn set_equal(&mut self, condition: &TreeNode) -> Result<bool> {
        let row_id_field = self.file_id.row_id_field_index();
        if condition.node_type != NodeType::And
            || condition.operands.len() != (row_id_field + 1) as usize
        {
            return Ok(false);
        }

        let mut row_id: Option<i32> = None;
        let mut values: Vec<String> = Vec::new();
        let mut languages: Vec<String> = Vec::new();

        for node in &condition.operands {
            if node.node_type != NodeType::Equals || node.operands.len() != 2 {
                return Ok(false);
            }
            let mut field = &node.operands[0];
            let mut value = &node.operands[1];
            if field.node_type != NodeType::Field && value.node_type == NodeType::Field {
                std::mem::swap(&mut field, &mut value);
            }
            let f = match field.as_int() {
                Some(v) => v as i32,
                None => return Ok(false),
            };

            if f == 0 {
                if !set_string_data(value, &mut values) {
                    return Ok(false);
                }
            } else if f == row_id_field {
                row_id = value.as_int().map(|v| v as i32);
                if row_id.is_none() {
                    return Ok(false);
                }
            } else if Some(f) == self.file_id.language_field_index() {
                if !set_language_data(value, &self.file_id.default_language, &mut languages)? {
                    return Ok(false);
                }
            } else {
                return Ok(false);
            }
        }

        self.out.search_type = Some(SearchType::Equal);
        self.out.row_id = row_id;
        let default_language = self.file_id.default_language.name();
        for (i, v) in values.into_iter().enumerate() {
            self.out.section_values.push(v);
            let lang = languages.get(i).cloned().unwrap_or_else(|| default_language.clone());
            self.out.section_languages.push(lang);
        }
        Ok(true)
    }

    /// Record a projection pushdown of plain field references
    pub fn set_projection(&mut self, fields: &[TreeNode]) -> Result<bool> {
        let mut targets = Vec::new();
        for node in fields {
            if node.node_type != NodeType::Field {
                return Ok(false);
            }
            match node.as_int() {
                Some(f) => targets.push(f as i32),
                None => return Ok(false),
            }
        }
        self.out.field_select = true;
        self.out.target_fields = targets;
        Ok(true)
    }
}

/// The single column every Field in the tree refers to, or None when the
/// columns are mixed or a Contains is buried inside
fn check_field(condition: &TreeNode) -> Option<i32> {
    let mut stack: Vec<&TreeNode> = vec![condition];
    let mut field: Option<i32> = None;
    while let Some(node) = stack.pop() {
        match node.node_type {
            NodeType::Field => {
                let f = node.as_int()? as i32;
                if field.is_some() && field != Some(f) {
                    return None;
                }
                field = Some(f);
            }
            NodeType::Contains => return None,
            _ => stack.extend(node.operands.iter()),
        }
    }
    field
}

fn set_string_data(value: &TreeNode, out: &mut Vec<String>) -> bool {
    if value.node_type == NodeType::List {
        for v in &value.operands {
            out.push(v.value.clone());
        }
    } else {
        out.push(value.value.clone());
    }
    true
}

fn set_language_data(
    value: &TreeNode,
    default_language: &LanguageSet,
    out: &mut Vec<String>,
) -> Result<bool> {
    if value.node_type == NodeType::List {
        for v in &value.operands {
            if v.value.is_empty() {
                out.push(default_language.name());
            } else {
                out.push(LanguageSet::parse(&v.value)?.name());
            }
        }
    } else if !value.value.is_empty() {
        out.push(LanguageSet::parse(&value.value)?.name());
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::IndexingType;
    use crate::query::open_option::{FullTextFileId, OpenOption};

    fn dual_file_id() -> FullTextFileId {
        let mut f = FullTextFileId::new(IndexingType::Dual);
        f.default_language = LanguageSet::parse("ja+en").unwrap();
        f
    }

    fn like_node(pattern: &str) -> TreeNode {
        TreeNode::new(NodeType::Like)
            .operand(TreeNode::field(0))
            .operand(TreeNode::constant(pattern))
    }

    fn compile(file_id: &FullTextFileId, tree: &TreeNode) -> OpenOption {
        let mut parser = OptionParser::new(file_id);
        assert!(parser.parse(tree).unwrap());
        parser.into_open_option()
    }

    #[test]
    fn test_separate_segments() {
        let f = dual_file_id();
        let parser = OptionParser::new(&f);
        let terms = parser.separate("abc%def", None).unwrap().unwrap();
        assert_eq!(
            terms,
            [
                LikeTerm { value: "abc".into(), front: false, back: true, regex: false },
                LikeTerm { value: "def".into(), front: true, back: false, regex: false },
            ]
        );
        // a '%'-only pattern has no usable segment
        assert!(parser.separate("%", None).unwrap().is_none());
    }

    #[test]
    fn test_like_with_leading_wildcard() {
        let f = dual_file_id();
        let out = compile(&f, &like_node("%abc"));
        assert_eq!(
            out.condition.as_deref(),
            Some("#contains[single,0,,,,,,,,](#end[0](#term[m,,ja+en](abc)))")
        );
        assert_eq!(out.search_type, Some(SearchType::Normal));
        assert_eq!(out.search_fields, [0]);
        assert_eq!(out.term_count, 1);
    }

    #[test]
    fn test_like_split_on_percent() {
        let f = dual_file_id();
        let out = compile(&f, &like_node("abc%def"));
        assert_eq!(
            out.condition.unwrap(),
            format!(
                "#contains[single,0,,,,,,,,](#window[0,{}](#location[1](#term[m,,ja+en](abc)),\
                 #end[0](#term[m,,ja+en](def))))",
                i32::MAX
            )
        );
    }

    #[test]
    fn test_like_exact_pattern_is_anchored_both_ends() {
        let f = dual_file_id();
        let out = compile(&f, &like_node("abc"));
        assert_eq!(
            out.condition.as_deref(),
            Some("#contains[single,0,,,,,,,,](#end[0](#location[1](#term[m,,ja+en](abc))))")
        );
    }

    #[test]
    fn test_underscore_becomes_window() {
        let f = dual_file_id();
        let out = compile(&f, &like_node("a_b"));
        assert_eq!(
            out.condition.as_deref(),
            Some(
                "#contains[single,0,,,,,,,,](#end[0](#location[1](\
                 #window[2,2](#term[m,,ja+en](a),#term[m,,ja+en](b)))))"
            )
        );
    }

    #[test]
    fn test_consecutive_underscores_count_distance() {
        let f = dual_file_id();
        let out = compile(&f, &like_node("a__b"));
        assert!(out.condition.unwrap().contains("#window[3,3]"));
    }

    #[test]
    fn test_leading_and_trailing_underscores_move_anchors() {
        let f = dual_file_id();
        let out = compile(&f, &like_node("_ab__"));
        assert_eq!(
            out.condition.as_deref(),
            Some("#contains[single,0,,,,,,,,](#end[2](#location[2](#term[m,,ja+en](ab))))")
        );
    }

    #[test]
    fn test_escape_character() {
        let f = dual_file_id();
        let tree = TreeNode::new(NodeType::Like)
            .operand(TreeNode::field(0))
            .operand(TreeNode::constant("50!%%"))
            .option(TreeNode::with_value(NodeType::Escape, "!"));
        let out = compile(&f, &tree);
        // the escaped '%' is literal text, the raw '%' splits
        assert_eq!(
            out.condition.as_deref(),
            Some("#contains[single,0,,,,,,,,](#location[1](#term[m,,ja+en](50%)))")
        );
    }

    #[test]
    fn test_multichar_escape_rejected() {
        let f = dual_file_id();
        let tree = TreeNode::new(NodeType::Like)
            .operand(TreeNode::field(0))
            .operand(TreeNode::constant("a%"))
            .option(TreeNode::with_value(NodeType::Escape, "!!"));
        let mut parser = OptionParser::new(&f);
        assert_eq!(parser.parse(&tree).unwrap_err().kind, ErrorKind::InvalidEscape);
    }

    #[test]
    fn test_too_long_pattern() {
        let f = dual_file_id();
        let long = "x".repeat(40);
        let mut parser = OptionParser::new(&f).with_query_max_len(10);
        let err = parser.parse(&like_node(&long)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TooLongConditionalPattern);
    }

    #[test]
    fn test_nolocation_refuses_like() {
        let mut f = dual_file_id();
        f.nolocation = true;
        let mut parser = OptionParser::new(&f);
        assert!(!parser.parse(&like_node("abc%")).unwrap());
    }

    #[test]
    fn test_word_index_refuses_underscore() {
        let mut f = dual_file_id();
        f.indexing_type = IndexingType::Word;
        let mut parser = OptionParser::new(&f);
        assert!(!parser.parse(&like_node("a_b")).unwrap());
    }

    #[test]
    fn test_and_with_not_operands() {
        let f = dual_file_id();
        let tree = TreeNode::new(NodeType::And)
            .operand(like_node("%a%"))
            .operand(like_node("%b%"))
            .operand(TreeNode::new(NodeType::Not).operand(like_node("%c%")))
            .operand(TreeNode::new(NodeType::Not).operand(like_node("%d%")));
        let out = compile(&f, &tree);
        assert_eq!(
            out.condition.as_deref(),
            Some(
                "#contains[single,0,,,,,,,,](#and-not(#and-not(#and(#term[m,,ja+en](a),\
                 #term[m,,ja+en](b)),#term[m,,ja+en](c)),#term[m,,ja+en](d)))"
            )
        );
        assert_eq!(out.term_count, 4);
    }

    #[test]
    fn test_all_not_refused() {
        let f = dual_file_id();
        let tree = TreeNode::new(NodeType::And)
            .operand(TreeNode::new(NodeType::Not).operand(like_node("%c%")));
        let mut parser = OptionParser::new(&f);
        assert!(!parser.parse(&tree).unwrap());
    }

    #[test]
    fn test_or_of_likes() {
        let f = dual_file_id();
        let tree = TreeNode::new(NodeType::Or)
            .operand(like_node("%a%"))
            .operand(like_node("%b%"));
        let out = compile(&f, &tree);
        assert_eq!(
            out.condition.as_deref(),
            Some("#contains[single,0,,,,,,,,](#or(#term[m,,ja+en](a),#term[m,,ja+en](b)))")
        );
    }

    #[test]
    fn test_mixed_fields_rejected() {
        let f = dual_file_id();
        let tree = TreeNode::new(NodeType::And)
            .operand(like_node("%a%"))
            .operand(
                TreeNode::new(NodeType::Like)
                    .operand(TreeNode::field(1))
                    .operand(TreeNode::constant("%b%")),
            );
        let mut parser = OptionParser::new(&f);
        assert!(!parser.parse(&tree).unwrap());
    }

    #[test]
    fn test_verify_shape_equalities() {
        let mut f = dual_file_id();
        f.language_field = true;
        // key 0, language 1, rowid 2
        let tree = TreeNode::new(NodeType::And)
            .operand(
                TreeNode::new(NodeType::Equals)
                    .operand(TreeNode::field(0))
                    .operand(TreeNode::constant("section text")),
            )
            .operand(
                TreeNode::new(NodeType::Equals)
                    .operand(TreeNode::field(1))
                    .operand(TreeNode::constant("en")),
            )
            .operand(
                TreeNode::new(NodeType::Equals)
                    .operand(TreeNode::field(2))
                    .operand(TreeNode::int(9)),
            );
        let out = compile(&f, &tree);
        assert_eq!(out.search_type, Some(SearchType::Equal));
        assert_eq!(out.row_id, Some(9));
        assert_eq!(out.section_values, ["section text"]);
        assert_eq!(out.section_languages, ["en"]);
    }

    #[test]
    fn test_verify_shape_with_array_sections() {
        let f = dual_file_id();
        // key 0, rowid 1
        let tree = TreeNode::new(NodeType::And)
            .operand(
                TreeNode::new(NodeType::Equals).operand(TreeNode::field(0)).operand(
                    TreeNode::new(NodeType::List)
                        .operand(TreeNode::constant("s1"))
                        .operand(TreeNode::constant("s2")),
                ),
            )
            .operand(
                TreeNode::new(NodeType::Equals)
                    .operand(TreeNode::field(1))
                    .operand(TreeNode::int(3)),
            );
        let out = compile(&f, &tree);
        assert_eq!(out.search_type, Some(SearchType::Equal));
        assert_eq!(out.section_values, ["s1", "s2"]);
        // no language column: both sections get the default
        assert_eq!(out.section_languages, ["ja+en", "ja+en"]);
    }

    #[test]
    fn test_projection() {
        let f = dual_file_id();
        let mut parser = OptionParser::new(&f);
        assert!(parser
            .set_projection(&[TreeNode::field(0), TreeNode::field(2)])
            .unwrap());
        let out = parser.into_open_option();
        assert!(out.field_select);
        assert_eq!(out.target_fields, [0, 2]);
    }
}
