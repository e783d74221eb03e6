use crate::bitmap::data::{round_integer, BitmapFileId, KeyType, Version};
use crate::bitmap::parse_value::{
    self, get_stream, push_front, ParseValue, PADDING_CHAR, SOH_CHAR,
};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{MatchMode, SortOrder};
use crate::query::ast::{NodeType, NodeValue, TreeNode};

/// Compiled driver options of one bitmap index scan
#[derive(Debug, Default)]
pub struct BitmapOpenOption {
    pub condition: Option<String>,
    pub verify: bool,
    pub row_id: Option<String>,
    pub group_by: bool,
    pub sort_order: Option<SortOrder>,
    pub cache_all_object: bool,
    pub open_mode_read: bool,
}

struct CheckedTerm {
    match_type: MatchMode,
    value: String,
    valid: bool,
    no_pad_key: bool,
}

/// Compiles an SQL predicate tree into the bitmap driver's condition
/// stream, splitting each and-group into one driving scan condition and
/// residual re-check conditions.
pub struct BitmapOptionParser<'a> {
    file_id: &'a BitmapFileId,
}

impl<'a> BitmapOptionParser<'a> {
    pub fn new(file_id: &'a BitmapFileId) -> Self {
        BitmapOptionParser { file_id }
    }

    /// Returns false when the predicate cannot run on this index
    pub fn get_search_parameter(
        &self,
        condition: &TreeNode,
        out: &mut BitmapOpenOption,
    ) -> Result<bool> {
        let mut stream = String::new();
        if self.parse_or_node(condition, &mut stream)? {
            out.condition = Some(stream);
            out.open_mode_read = true;
            return Ok(true);
        }

        let mut stream = String::new();
        let mut row_id = String::new();
        if self.parse_verify_node(condition, &mut stream, &mut row_id)? {
            out.condition = Some(stream);
            out.verify = true;
            out.row_id = Some(row_id);
            out.open_mode_read = true;
            return Ok(true);
        }

        Ok(false)
    }

    /// GROUP BY on the key field only
    pub fn get_sort_parameter(&self, node: &TreeNode, out: &mut BitmapOpenOption) -> Result<bool> {
        if node.node_type != NodeType::OrderBy
            || node.operands.len() != 1
            || node.options.len() != 1
        {
            return Ok(false);
        }
        if node.options[0].node_type != NodeType::GroupBy {
            return Ok(false);
        }
        let sort_key = &node.operands[0];
        if sort_key.node_type != NodeType::SortKey || sort_key.operands.len() != 1 {
            return Ok(false);
        }
        let field = &sort_key.operands[0];
        if field.node_type != NodeType::Field || field.as_int() != Some(0) {
            return Ok(false);
        }

        let mut order = SortOrder::Ascending;
        if let Some(direction) = sort_key.options.first() {
            if direction.as_int() == Some(1) {
                order = SortOrder::Descending;
            }
        }

        out.group_by = true;
        out.sort_order = Some(order);
        out.cache_all_object = true;
        out.open_mode_read = true;
        Ok(true)
    }

    fn parse_or_node(&self, condition: &TreeNode, stream: &mut String) -> Result<bool> {
        if condition.node_type == NodeType::Or {
            stream.push_str("#or(");
            for operand in &condition.operands {
                if !self.parse_and_node(operand, stream)? {
                    return Ok(false);
                }
            }
            stream.push(')');
            Ok(true)
        } else {
            self.parse_and_node(condition, stream)
        }
    }

    fn parse_and_node(&self, condition: &TreeNode, stream: &mut String) -> Result<bool> {
        if self.file_id.array && condition.node_type == NodeType::And {
            stream.push_str("#and(");
            for operand in &condition.operands {
                if !self.parse_tree_node(operand, stream)? {
                    return Ok(false);
                }
            }
            stream.push(')');
            Ok(true)
        } else {
            self.parse_tree_node(condition, stream)
        }
    }

    fn parse_tree_node(&self, condition: &TreeNode, stream: &mut String) -> Result<bool> {
        let mut main: Option<Box<ParseValue>> = None;
        let mut other: Option<Box<ParseValue>> = None;

        let operands: Vec<&TreeNode> = if condition.node_type == NodeType::And {
            condition.operands.iter().collect()
        } else {
            vec![condition]
        };

        for node in operands {
            if !self.parse_one_node(node, &mut main, &mut other)? {
                return Ok(false);
            }
        }

        Ok(set_to_stream(main.as_deref(), other.as_deref(), stream))
    }

    fn parse_one_node(
        &self,
        condition: &TreeNode,
        main: &mut Option<Box<ParseValue>>,
        other: &mut Option<Box<ParseValue>>,
    ) -> Result<bool> {
        match condition.node_type {
            NodeType::Equals => self.parse_equals_node(condition, main, other),
            NodeType::LessThan | NodeType::LessThanEquals => {
                self.parse_less_than_node(condition, main, other)
            }
            NodeType::GreaterThan | NodeType::GreaterThanEquals => {
                self.parse_greater_than_node(condition, main, other)
            }
            NodeType::NotEquals => self.parse_not_equals_node(condition, main, other),
            NodeType::EqualsToNull => self.parse_equals_to_null_node(condition, main, other),
            NodeType::Like => self.parse_like_node(condition, main, other),
            _ => Ok(false),
        }
    }

    fn parse_equals_node(
        &self,
        condition: &TreeNode,
        main: &mut Option<Box<ParseValue>>,
        other: &mut Option<Box<ParseValue>>,
    ) -> Result<bool> {
        if is_unknown(main) {
            return Ok(true);
        }
        let checked = match self.check_two_term(condition, MatchMode::Equals)? {
            Some(c) => c,
            None => return Ok(false),
        };
        let no_pad_field = self.check_no_pad_sort_order(checked.no_pad_key);
        if !checked.valid {
            set_unknown_parse_value(main, other);
            return Ok(true);
        }

        let new = ParseValue::with_value(
            checked.match_type,
            checked.value,
            self.get_padding_char(no_pad_field || checked.no_pad_key),
        );
        set_equals_parse_value(new, main, other, no_pad_field, checked.no_pad_key);
        Ok(true)
    }

    fn parse_less_than_node(
        &self,
        condition: &TreeNode,
        main: &mut Option<Box<ParseValue>>,
        other: &mut Option<Box<ParseValue>>,
    ) -> Result<bool> {
        if is_unknown(main) {
            return Ok(true);
        }
        let mode = if condition.node_type == NodeType::LessThan {
            MatchMode::LessThan
        } else {
            MatchMode::LessThanEquals
        };
        let checked = match self.check_two_term(condition, mode)? {
            Some(c) => c,
            None => return Ok(false),
        };
        let no_pad_field = self.check_no_pad_sort_order(checked.no_pad_key);
        if !checked.valid {
            set_unknown_parse_value(main, other);
            return Ok(true);
        }

        let new = ParseValue::with_value(
            checked.match_type,
            checked.value,
            self.get_padding_char(no_pad_field || checked.no_pad_key),
        );
        // the operands may have been interchanged by check_two_term
        if matches!(checked.match_type, MatchMode::LessThan | MatchMode::LessThanEquals) {
            set_less_than_parse_value(new, main, other, no_pad_field, checked.no_pad_key);
        } else {
            set_greater_than_parse_value(new, main, other, no_pad_field, checked.no_pad_key);
        }
        Ok(true)
    }

    fn parse_greater_than_node(
        &self,
        condition: &TreeNode,
        main: &mut Option<Box<ParseValue>>,
        other: &mut Option<Box<ParseValue>>,
    ) -> Result<bool> {
        if is_unknown(main) {
            return Ok(true);
        }
        let mode = if condition.node_type == NodeType::GreaterThan {
            MatchMode::GreaterThan
        } else {
            MatchMode::GreaterThanEquals
        };
        let checked = match self.check_two_term(condition, mode)? {
            Some(c) => c,
            None => return Ok(false),
        };
        let no_pad_field = self.check_no_pad_sort_order(checked.no_pad_key);
        if !checked.valid {
            set_unknown_parse_value(main, other);
            return Ok(true);
        }

        let new = ParseValue::with_value(
            checked.match_type,
            checked.value,
            self.get_padding_char(no_pad_field || checked.no_pad_key),
        );
        if matches!(checked.match_type, MatchMode::GreaterThan | MatchMode::GreaterThanEquals) {
            set_greater_than_parse_value(new, main, other, no_pad_field, checked.no_pad_key);
        } else {
            set_less_than_parse_value(new, main, other, no_pad_field, checked.no_pad_key);
        }
        Ok(true)
    }

    fn parse_not_equals_node(
        &self,
        condition: &TreeNode,
        main: &mut Option<Box<ParseValue>>,
        other: &mut Option<Box<ParseValue>>,
    ) -> Result<bool> {
        if is_unknown(main) {
            return Ok(true);
        }
        let checked = match self.check_two_term(condition, MatchMode::NotEquals)? {
            Some(c) => c,
            None => return Ok(false),
        };
        let no_pad_field = self.check_no_pad_sort_order(checked.no_pad_key);
        if !checked.valid {
            set_unknown_parse_value(main, other);
            return Ok(true);
        }

        // a not-equals never drives the scan, it is always a residual
        let new = ParseValue::with_value(
            checked.match_type,
            checked.value,
            self.get_padding_char(no_pad_field || checked.no_pad_key),
        );
        push_front(other, new);
        Ok(true)
    }

    fn parse_equals_to_null_node(
        &self,
        condition: &TreeNode,
        main: &mut Option<Box<ParseValue>>,
        other: &mut Option<Box<ParseValue>>,
    ) -> Result<bool> {
        if is_unknown(main) {
            return Ok(true);
        }
        let mut mode = MatchMode::EqualsToNull;
        if !self.check_one_term(condition, &mut mode) {
            return Ok(false);
        }

        let new = ParseValue::new(mode);
        match main.take() {
            Some(head) => {
                if !head.is_equals() {
                    // an equality is the strongest driver; demote the range
                    let mut old = Some(head);
                    parse_value::move_to_front(other, &mut old);
                    *main = Some(new);
                } else {
                    *main = Some(head);
                    push_front(other, new);
                }
            }
            None => *main = Some(new),
        }
        Ok(true)
    }

    fn parse_like_node(
        &self,
        condition: &TreeNode,
        main: &mut Option<Box<ParseValue>>,
        other: &mut Option<Box<ParseValue>>,
    ) -> Result<bool> {
        if is_unknown(main) {
            return Ok(true);
        }
        let checked = match self.check_two_term(condition, MatchMode::Like)? {
            Some(c) => c,
            None => return Ok(false),
        };
        // like always compares NO PAD
        let no_pad_key = true;

        if !self.file_id.key_type.is_string() {
            return Ok(false);
        }
        let no_pad_field = self.check_no_pad_sort_order(no_pad_key);

        if !checked.valid {
            set_unknown_parse_value(main, other);
            return Ok(true);
        }

        // escape option, if present, must be a single character
        let mut escape: Option<char> = None;
        for option in &condition.options {
            if option.node_type == NodeType::Escape {
                let mut chars = option.value.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => escape = Some(c),
                    _ => return Err(Error::new(ErrorKind::InvalidEscape, option.value.clone())),
                }
            }
            // the language option only matters to full-text indexes
        }

        // translate the leading literal run into bounds
        let mut lower = String::new();
        let mut upper: Vec<char> = Vec::new();
        let mut rest_after_wildcard = false;
        let mut chars = checked.value.chars().peekable();
        while let Some(c) = chars.next() {
            if Some(c) == escape {
                match chars.next() {
                    Some(n) => {
                        lower.push(n);
                        upper.push(n);
                        continue;
                    }
                    None => break,
                }
            }
            if c == '%' || c == '_' {
                if lower.is_empty() {
                    return Ok(false);
                }
                let last = upper.pop().unwrap();
                upper.push(char::from_u32(last as u32 + 1).unwrap_or(last));
                if c == '%' {
                    rest_after_wildcard = chars.peek().is_some();
                } else {
                    rest_after_wildcard = true;
                }
                break;
            }
            lower.push(c);
            upper.push(c);
        }
        let upper: String = upper.into_iter().collect();

        if lower == upper {
            // no wildcard at all: an exact match
            let new = ParseValue::with_value(
                MatchMode::Equals,
                lower,
                self.get_padding_char(no_pad_field || no_pad_key),
            );
            set_equals_parse_value(new, main, other, no_pad_field, no_pad_key);
        } else {
            let mut new1 = ParseValue::with_value(
                MatchMode::GreaterThanEquals,
                lower,
                self.get_padding_char(no_pad_field || no_pad_key),
            );
            let new2 = ParseValue::with_value(
                MatchMode::LessThan,
                upper,
                new1.optional_char,
            );
            new1.next = Some(new2);
            set_prefix_match_parse_value(new1, main, other, no_pad_field, no_pad_key);

            if rest_after_wildcard || (!no_pad_field && no_pad_key) {
                set_like_parse_value(&checked.value, escape, other);
            }
        }
        Ok(true)
    }

    fn check_one_term(&self, condition: &TreeNode, mode: &mut MatchMode) -> bool {
        if condition.operands.len() != 1 {
            return false;
        }
        let field = &condition.operands[0];
        if field.node_type != NodeType::Field {
            return false;
        }
        let has_all = field.options.first().map(|o| o.node_type) == Some(NodeType::All);
        if !self.file_id.array && has_all {
            return false;
        }
        if self.file_id.array && !has_all {
            // an array without an any-element qualifier means every element
            *mode = MatchMode::EqualsToNullAll;
        }
        field.as_int() == Some(0)
    }

    fn check_two_term(
        &self,
        condition: &TreeNode,
        mode: MatchMode,
    ) -> Result<Option<CheckedTerm>> {
        if condition.operands.len() != 2 {
            return Ok(None);
        }
        let mut mode = mode;
        let mut field = &condition.operands[0];
        let mut value = &condition.operands[1];

        if value.node_type == NodeType::Field
            && matches!(field.node_type, NodeType::ConstantValue | NodeType::Variable)
        {
            // the planner kept SQL operand order; put the field first
            if mode == MatchMode::Like {
                return Ok(None);
            }
            mode = alternate_mode(mode);
            std::mem::swap(&mut field, &mut value);
        }

        if field.node_type != NodeType::Field
            || !matches!(value.node_type, NodeType::ConstantValue | NodeType::Variable)
        {
            return Ok(None);
        }
        if field.as_int() != Some(0) {
            return Ok(None);
        }

        let has_option = !field.options.is_empty();
        let has_all = field.options.first().map(|o| o.node_type) == Some(NodeType::All);
        if mode != MatchMode::Like {
            // arrays need the any-element qualifier, scalars reject it
            if (self.file_id.array && !has_all) || (!self.file_id.array && has_all) {
                return Ok(None);
            }
        } else if (self.file_id.array && has_option && !has_all)
            || (!self.file_id.array && has_option)
        {
            return Ok(None);
        }

        let mut checked = CheckedTerm {
            match_type: mode,
            value: String::new(),
            valid: false,
            no_pad_key: false,
        };

        match &value.data {
            // an untyped literal cannot be compared on the index
            NodeValue::None => return Ok(None),
            NodeValue::Null => {
                // comparison with null is always unknown
                return Ok(Some(checked));
            }
            NodeValue::Double(d)
                if matches!(self.file_id.key_type, KeyType::Integer | KeyType::Integer64) =>
            {
                if let Some(v) = round_integer(*d, &mut checked.match_type) {
                    checked.value = v.to_string();
                    checked.valid = true;
                }
            }
            NodeValue::Str { text, no_pad } if !self.file_id.key_type.is_no_pad() => {
                if *no_pad {
                    checked.no_pad_key = true;
                }
                checked.value = text.clone();
                checked.valid = true;
            }
            NodeValue::Str { text, no_pad } => {
                // the field itself collates NO PAD
                checked.value = text.clone();
                checked.valid = true;
                checked.no_pad_key = true;

                // Fields created by the first on-disk version sort their
                // variable-length strings NO PAD. Inequalities would then
                // differ between the indexed and unindexed plans, so the
                // index refuses them; other comparisons drop the trailing
                // spaces of a PAD SPACE literal.
                if !self.file_id.check_version(Version::Version2) && !self.file_id.fixed {
                    if matches!(
                        checked.match_type,
                        MatchMode::GreaterThan
                            | MatchMode::GreaterThanEquals
                            | MatchMode::LessThan
                            | MatchMode::LessThanEquals
                    ) {
                        tracing::warn!(
                            "an inequality operator is not processed by the bitmap index \
                             which is created by an old module"
                        );
                        return Ok(None);
                    } else if checked.match_type != MatchMode::Like && !*no_pad {
                        checked.value =
                            checked.value.trim_end_matches(PADDING_CHAR).to_string();
                    }
                }
            }
            _ => {
                checked.value = value.value.clone();
                checked.valid = true;
            }
        }

        Ok(Some(checked))
    }

    /// Whether comparisons against this field effectively sort NO PAD
    fn check_no_pad_sort_order(&self, no_pad_key: bool) -> bool {
        if self.file_id.key_type.is_no_pad() {
            return true;
        }
        // a fixed-length string field pads its values anyway, so the
        // PAD SPACE order coincides with the NO PAD order
        self.file_id.key_type.is_string() && self.file_id.fixed && no_pad_key
    }

    fn get_padding_char(&self, no_pad: bool) -> Option<char> {
        if no_pad {
            None
        } else {
            Some(PADDING_CHAR)
        }
    }

    fn parse_verify_node(
        &self,
        condition: &TreeNode,
        stream: &mut String,
        row_id: &mut String,
    ) -> Result<bool> {
        if condition.node_type != NodeType::And || condition.operands.len() != 2 {
            return Ok(false);
        }

        for node in &condition.operands {
            let is_null = node.node_type == NodeType::EqualsToNull;
            if !is_null && (node.node_type != NodeType::Equals || node.operands.len() != 2) {
                return Ok(false);
            }

            let field = &node.operands[0];
            let key = match field.as_int() {
                Some(k) => k,
                None => return Ok(false),
            };

            if key == 0 {
                let optional = if self.file_id.key_type.is_string()
                    && !self.file_id.key_type.is_no_pad()
                {
                    Some(PADDING_CHAR)
                } else {
                    None
                };

                if is_null {
                    stream.push_str(if self.file_id.array { "#eq(#na)" } else { "#eq(#nl)" });
                    continue;
                }
                let value = &node.operands[1];
                if self.file_id.array {
                    if value.node_type != NodeType::List {
                        return Ok(false);
                    }
                    stream.push_str("#and(");
                    for element in &value.operands {
                        stream.push_str("#eq(");
                        if element.data.is_null() {
                            stream.push_str("#nl");
                        } else {
                            stream.push_str("#eq");
                            parse_value::put_stream_value(stream, &element.value, optional);
                        }
                        stream.push(')');
                    }
                    stream.push(')');
                } else {
                    if value.node_type == NodeType::List {
                        return Ok(false);
                    }
                    stream.push_str("#eq(#eq");
                    parse_value::put_stream_value(stream, &value.value, optional);
                    stream.push(')');
                }
            } else if key == 1 {
                *row_id = node.operands[1].value.clone();
            } else {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn is_unknown(main: &Option<Box<ParseValue>>) -> bool {
    main.as_ref().map(|m| m.match_type) == Some(MatchMode::Unknown)
}

fn alternate_mode(mode: MatchMode) -> MatchMode {
    match mode {
        MatchMode::GreaterThan => MatchMode::LessThan,
        MatchMode::GreaterThanEquals => MatchMode::LessThanEquals,
        MatchMode::LessThan => MatchMode::GreaterThan,
        MatchMode::LessThanEquals => MatchMode::GreaterThanEquals,
        other => other,
    }
}

fn set_unknown_parse_value(
    main: &mut Option<Box<ParseValue>>,
    other: &mut Option<Box<ParseValue>>,
) {
    *main = Some(ParseValue::new(MatchMode::Unknown));
    *other = None;
}

fn set_equals_parse_value(
    new: Box<ParseValue>,
    main: &mut Option<Box<ParseValue>>,
    other: &mut Option<Box<ParseValue>>,
    no_pad_field: bool,
    no_pad_key: bool,
) {
    match main.take() {
        Some(head) => {
            if !head.is_equals() {
                // the equality takes over the scan; the range is residual
                let mut old = Some(head);
                parse_value::move_to_front(other, &mut old);
                set_equals_with_sort_order(new, main, other, no_pad_field, no_pad_key);
            } else {
                *main = Some(head);
                push_front(other, new);
            }
        }
        None => set_equals_with_sort_order(new, main, other, no_pad_field, no_pad_key),
    }
}

fn set_equals_with_sort_order(
    new1: Box<ParseValue>,
    main: &mut Option<Box<ParseValue>>,
    other: &mut Option<Box<ParseValue>>,
    no_pad_field: bool,
    no_pad_key: bool,
) {
    if !no_pad_field && no_pad_key {
        // scan with PAD SPACE, then compare NO PAD as a residual
        let new2 = ParseValue::with_value(
            new1.match_type,
            new1.value.clone(),
            Some(PADDING_CHAR),
        );
        *main = Some(new2);
        push_front(other, new1);
    } else {
        *main = Some(new1);
    }
}

fn set_less_than_parse_value(
    new: Box<ParseValue>,
    main: &mut Option<Box<ParseValue>>,
    other: &mut Option<Box<ParseValue>>,
    no_pad_field: bool,
    no_pad_key: bool,
) {
    match main.take() {
        Some(head) => {
            if matches!(head.match_type, MatchMode::GreaterThan | MatchMode::GreaterThanEquals)
                && head.next.is_none()
            {
                // the range has no upper bound yet
                *main = Some(head);
                set_less_than_with_sort_order(new, main, other, no_pad_field, no_pad_key);
            } else {
                *main = Some(head);
                push_front(other, new);
            }
        }
        None => set_less_than_with_sort_order(new, main, other, no_pad_field, no_pad_key),
    }
}

fn set_less_than_with_sort_order(
    new1: Box<ParseValue>,
    main: &mut Option<Box<ParseValue>>,
    other: &mut Option<Box<ParseValue>>,
    no_pad_field: bool,
    no_pad_key: bool,
) {
    if !no_pad_field && no_pad_key {
        // f < 'abc\nxyz' becomes f <= 'abc' PAD SPACE plus the NO PAD
        // residual; the bound is cut before the first sub-space character
        let cut = new1
            .value
            .char_indices()
            .find(|&(_, c)| c < PADDING_CHAR)
            .map(|(i, _)| i)
            .unwrap_or(new1.value.len());
        let new2 = ParseValue::with_value(
            MatchMode::LessThanEquals,
            &new1.value[..cut],
            Some(PADDING_CHAR),
        );
        append_to_main(main, new2);
        push_front(other, new1);
    } else {
        append_to_main(main, new1);
    }
}

fn append_to_main(main: &mut Option<Box<ParseValue>>, node: Box<ParseValue>) {
    match main {
        None => *main = Some(node),
        Some(head) => {
            debug_assert!(head.next.is_none());
            head.next = Some(node);
        }
    }
}

fn set_greater_than_parse_value(
    new: Box<ParseValue>,
    main: &mut Option<Box<ParseValue>>,
    other: &mut Option<Box<ParseValue>>,
    no_pad_field: bool,
    no_pad_key: bool,
) {
    match main.take() {
        Some(head) => {
            if matches!(head.match_type, MatchMode::LessThan | MatchMode::LessThanEquals) {
                *main = Some(head);
                set_greater_than_with_sort_order(new, main, other, no_pad_field, no_pad_key);
            } else {
                *main = Some(head);
                push_front(other, new);
            }
        }
        None => set_greater_than_with_sort_order(new, main, other, no_pad_field, no_pad_key),
    }
}

fn set_greater_than_with_sort_order(
    new1: Box<ParseValue>,
    main: &mut Option<Box<ParseValue>>,
    other: &mut Option<Box<ParseValue>>,
    no_pad_field: bool,
    no_pad_key: bool,
) {
    if !no_pad_field && no_pad_key {
        // f > 'abc' becomes f > 'abb' PAD SPACE plus the NO PAD residual;
        // an all-SOH bound cannot be widened and is dropped instead
        let position = trailing_soh_position(&new1.value);
        if position != 0 {
            let mut widened: Vec<char> = new1.value.chars().collect();
            let c = widened[position - 1];
            widened[position - 1] = decrement_char(c);
            let mut new2 = ParseValue::with_value(
                new1.match_type,
                widened.into_iter().collect::<String>(),
                Some(PADDING_CHAR),
            );
            new2.next = main.take();
            *main = Some(new2);
        }
        push_front(other, new1);
    } else {
        let mut new1 = new1;
        new1.next = main.take();
        *main = Some(new1);
    }
}

fn set_prefix_match_parse_value(
    new1: Box<ParseValue>,
    main: &mut Option<Box<ParseValue>>,
    other: &mut Option<Box<ParseValue>>,
    no_pad_field: bool,
    no_pad_key: bool,
) {
    match main.take() {
        Some(head) => {
            if head.is_equals() {
                // the equality keeps the scan; the bounds become residual
                let mut old = Some(head);
                parse_value::move_to_front(other, &mut old);
                set_prefix_match_with_sort_order(new1, main, no_pad_field, no_pad_key);
            } else {
                *main = Some(head);
                let mut new1 = new1;
                new1.next.as_mut().unwrap().next = other.take();
                set_prefix_match_with_sort_order(new1, other, no_pad_field, no_pad_key);
            }
        }
        None => set_prefix_match_with_sort_order(new1, main, no_pad_field, no_pad_key),
    }
}

fn set_prefix_match_with_sort_order(
    mut new1: Box<ParseValue>,
    slot: &mut Option<Box<ParseValue>>,
    no_pad_field: bool,
    no_pad_key: bool,
) {
    if !no_pad_field && no_pad_key {
        // on a PAD SPACE field 'abc%' scans abb < x < abd with PAD SPACE
        new1.optional_char = Some(PADDING_CHAR);
        if let Some(next) = new1.next.as_mut() {
            next.optional_char = new1.optional_char;
        }

        let position = trailing_soh_position(&new1.value);
        if position != 0 {
            new1.match_type = MatchMode::GreaterThan;
            let mut chars: Vec<char> = new1.value.chars().collect();
            chars[position - 1] = decrement_char(chars[position - 1]);
            new1.value = chars.into_iter().collect();
        } else {
            // no widenable lower bound: keep only the upper one
            *slot = new1.next.take();
            return;
        }
    }
    *slot = Some(new1);
}

fn set_like_parse_value(
    value: &str,
    escape: Option<char>,
    other: &mut Option<Box<ParseValue>>,
) {
    let like = ParseValue::with_value(MatchMode::Like, value, escape);
    push_front(other, like);
}

fn decrement_char(c: char) -> char {
    (c as u32).checked_sub(1).and_then(char::from_u32).unwrap_or(c)
}

/// Index just past the last non-SOH character, 0 when the whole string
/// is SOH. Decrementing there widens a NO PAD lower bound for PAD SPACE.
fn trailing_soh_position(value: &str) -> usize {
    let chars: Vec<char> = value.chars().collect();
    let mut i = chars.len();
    while i > 0 && chars[i - 1] == SOH_CHAR {
        i -= 1;
    }
    i
}

fn set_to_stream(
    main: Option<&ParseValue>,
    other: Option<&ParseValue>,
    stream: &mut String,
) -> bool {
    if let Some(main) = main {
        match main.match_type {
            MatchMode::Equals
            | MatchMode::EqualsToNull
            | MatchMode::Unknown
            | MatchMode::EqualsToNullAll => {
                stream.push_str("#eq(");
                main.put_stream(stream);
                stream.push(')');
            }
            MatchMode::GreaterThan | MatchMode::GreaterThanEquals => {
                stream.push_str("#ge(");
                main.put_stream(stream);
                stream.push(')');
                if let Some(upper) = main.next.as_deref() {
                    stream.push_str("#le(");
                    upper.put_stream(stream);
                    stream.push(')');
                }
            }
            MatchMode::LessThan | MatchMode::LessThanEquals => {
                stream.push_str("#le(");
                main.put_stream(stream);
                stream.push(')');
            }
            _ => return false,
        }
    }

    if let Some(other) = other {
        stream.push_str("#ot(");
        let mut p = Some(other);
        while let Some(v) = p {
            v.put_stream(stream);
            p = v.next.as_deref();
        }
        stream.push(')');
    }

    true
}

/// Split a rendered condition stream back into parse values; used by the
/// driver when opening the compiled plan.
pub fn parse_condition_stream(mut text: &str) -> Result<Vec<Box<ParseValue>>> {
    let mut out = Vec::new();
    while !text.is_empty() {
        let (v, rest) = get_stream(text)?;
        out.push(v);
        text = rest;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::data::KeyType;

    fn parser_output(file_id: &BitmapFileId, tree: &TreeNode) -> Option<String> {
        let parser = BitmapOptionParser::new(file_id);
        let mut out = BitmapOpenOption::default();
        match parser.get_search_parameter(tree, &mut out) {
            Ok(true) => out.condition,
            Ok(false) => None,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    fn eq_node(value: TreeNode) -> TreeNode {
        TreeNode::new(NodeType::Equals)
            .operand(TreeNode::field(0))
            .operand(value)
    }

    #[test]
    fn test_plain_integer_equals() {
        let f = BitmapFileId::new(KeyType::Integer);
        let cond = parser_output(&f, &eq_node(TreeNode::int(42))).unwrap();
        assert_eq!(cond, "#eq(#eq(42, ))");
    }

    #[test]
    fn test_double_literal_rounds_for_integer_key() {
        let f = BitmapFileId::new(KeyType::Integer);
        let tree = TreeNode::new(NodeType::GreaterThan)
            .operand(TreeNode::field(0))
            .operand(TreeNode::double(1.5));
        let cond = parser_output(&f, &tree).unwrap();
        assert_eq!(cond, "#ge(#ge(2, ))");
    }

    #[test]
    fn test_no_pad_equals_on_pad_space_field() {
        let f = BitmapFileId::new(KeyType::UnicodeString);
        let cond = parser_output(&f, &eq_node(TreeNode::constant_no_pad("abc"))).unwrap();
        // scan PAD SPACE, re-check NO PAD
        assert_eq!(cond, "#eq(#eq(abc, ))#ot(#eq(abc))");
    }

    #[test]
    fn test_no_pad_greater_than_widens_bound() {
        let f = BitmapFileId::new(KeyType::UnicodeString);
        let tree = TreeNode::new(NodeType::GreaterThan)
            .operand(TreeNode::field(0))
            .operand(TreeNode::constant_no_pad("abc"));
        let cond = parser_output(&f, &tree).unwrap();
        assert_eq!(cond, "#ge(#gt(abb, ))#ot(#gt(abc))");
    }

    #[test]
    fn test_all_soh_lower_bound_is_dropped() {
        let f = BitmapFileId::new(KeyType::UnicodeString);
        let tree = TreeNode::new(NodeType::GreaterThan)
            .operand(TreeNode::field(0))
            .operand(TreeNode::constant_no_pad("\u{1}\u{1}"));
        let cond = parser_output(&f, &tree).unwrap();
        assert_eq!(cond, "#ot(#gt(\u{1}\u{1}))");
    }

    #[test]
    fn test_like_prefix_on_pad_space_field() {
        let f = BitmapFileId::new(KeyType::UnicodeString);
        let tree = TreeNode::new(NodeType::Like)
            .operand(TreeNode::field(0))
            .operand(TreeNode::constant("abc%"));
        let cond = parser_output(&f, &tree).unwrap();
        assert_eq!(cond, "#ge(#gt(abb, ))#le(#lt(abd, ))#ot(#lk(abc%))");
    }

    #[test]
    fn test_like_on_no_pad_field_keeps_plain_bounds() {
        let f = BitmapFileId::new(KeyType::NoPadUnicodeString);
        let tree = TreeNode::new(NodeType::Like)
            .operand(TreeNode::field(0))
            .operand(TreeNode::constant("abc%"));
        let cond = parser_output(&f, &tree).unwrap();
        assert_eq!(cond, "#ge(#ge(abc))#le(#lt(abd))");
    }

    #[test]
    fn test_like_with_tail_keeps_residual() {
        let f = BitmapFileId::new(KeyType::NoPadUnicodeString);
        let tree = TreeNode::new(NodeType::Like)
            .operand(TreeNode::field(0))
            .operand(TreeNode::constant("ab%cd"));
        let cond = parser_output(&f, &tree).unwrap();
        assert_eq!(cond, "#ge(#ge(ab))#le(#lt(ac))#ot(#lk(ab%cd))");
    }

    #[test]
    fn test_bad_escape_raises() {
        let f = BitmapFileId::new(KeyType::UnicodeString);
        let tree = TreeNode::new(NodeType::Like)
            .operand(TreeNode::field(0))
            .operand(TreeNode::constant("a!%%"))
            .option(TreeNode::with_value(NodeType::Escape, "!!"));
        let parser = BitmapOptionParser::new(&f);
        let mut out = BitmapOpenOption::default();
        let err = parser.get_search_parameter(&tree, &mut out).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidEscape);
    }

    #[test]
    fn test_null_comparison_is_sticky_unknown() {
        let f = BitmapFileId::new(KeyType::Integer);
        let tree = TreeNode::new(NodeType::And)
            .operand(eq_node(TreeNode::null()))
            .operand(eq_node(TreeNode::int(1)));
        let cond = parser_output(&f, &tree).unwrap();
        assert_eq!(cond, "#eq(#uk)");
    }

    #[test]
    fn test_range_pair_shares_main() {
        let f = BitmapFileId::new(KeyType::Integer);
        let tree = TreeNode::new(NodeType::And)
            .operand(
                TreeNode::new(NodeType::GreaterThan)
                    .operand(TreeNode::field(0))
                    .operand(TreeNode::int(10)),
            )
            .operand(
                TreeNode::new(NodeType::LessThanEquals)
                    .operand(TreeNode::field(0))
                    .operand(TreeNode::int(20)),
            );
        let cond = parser_output(&f, &tree).unwrap();
        assert_eq!(cond, "#ge(#gt(10, ))#le(#le(20, ))");
    }

    #[test]
    fn test_equality_demotes_range_to_other() {
        let f = BitmapFileId::new(KeyType::Integer);
        let tree = TreeNode::new(NodeType::And)
            .operand(
                TreeNode::new(NodeType::GreaterThan)
                    .operand(TreeNode::field(0))
                    .operand(TreeNode::int(10)),
            )
            .operand(eq_node(TreeNode::int(15)));
        let cond = parser_output(&f, &tree).unwrap();
        assert_eq!(cond, "#eq(#eq(15, ))#ot(#gt(10, ))");
    }

    #[test]
    fn test_swapped_operands_flip() {
        // 10 < f  ==  f > 10
        let f = BitmapFileId::new(KeyType::Integer);
        let tree = TreeNode::new(NodeType::LessThan)
            .operand(TreeNode::int(10))
            .operand(TreeNode::field(0));
        let cond = parser_output(&f, &tree).unwrap();
        assert_eq!(cond, "#ge(#gt(10, ))");
    }

    #[test]
    fn test_or_of_two_groups() {
        let f = BitmapFileId::new(KeyType::Integer);
        let tree = TreeNode::new(NodeType::Or)
            .operand(eq_node(TreeNode::int(1)))
            .operand(eq_node(TreeNode::int(2)));
        let cond = parser_output(&f, &tree).unwrap();
        assert_eq!(cond, "#or(#eq(#eq(1, ))#eq(#eq(2, )))");
    }

    #[test]
    fn test_v1_no_pad_inequality_refuses_index() {
        let mut f = BitmapFileId::new(KeyType::NoPadUnicodeString);
        f.version = Version::Version1;
        let tree = TreeNode::new(NodeType::GreaterThan)
            .operand(TreeNode::field(0))
            .operand(TreeNode::constant("abc "));
        assert_eq!(parser_output(&f, &tree), None);
    }

    #[test]
    fn test_v1_no_pad_equals_strips_trailing_spaces() {
        let mut f = BitmapFileId::new(KeyType::NoPadUnicodeString);
        f.version = Version::Version1;
        let cond = parser_output(&f, &eq_node(TreeNode::constant("abc  "))).unwrap();
        assert_eq!(cond, "#eq(#eq(abc))");
    }

    #[test]
    fn test_not_equals_is_residual_only() {
        let f = BitmapFileId::new(KeyType::Integer);
        let tree = TreeNode::new(NodeType::NotEquals)
            .operand(TreeNode::field(0))
            .operand(TreeNode::int(5));
        let cond = parser_output(&f, &tree).unwrap();
        assert_eq!(cond, "#ot(#ne(5, ))");
    }

    #[test]
    fn test_other_field_rejected() {
        let f = BitmapFileId::new(KeyType::Integer);
        let tree = TreeNode::new(NodeType::Equals)
            .operand(TreeNode::field(1))
            .operand(TreeNode::int(5));
        assert_eq!(parser_output(&f, &tree), None);
    }

    #[test]
    fn test_verify_shape() {
        let f = BitmapFileId::new(KeyType::UnicodeString);
        let tree = TreeNode::new(NodeType::And)
            .operand(eq_node(TreeNode::constant("hello")))
            .operand(
                TreeNode::new(NodeType::Equals)
                    .operand(TreeNode::field(1))
                    .operand(TreeNode::int(7)),
            );
        let parser = BitmapOptionParser::new(&f);
        let mut out = BitmapOpenOption::default();
        assert!(parser.get_search_parameter(&tree, &mut out).unwrap());
        // field 1 is not a key, so the normal path refuses the predicate
        // and the verify path takes over
        assert!(out.verify);
        assert_eq!(out.row_id.as_deref(), Some("7"));
        assert_eq!(out.condition.as_deref(), Some("#eq(#eq(hello, ))"));
    }

    #[test]
    fn test_group_by() {
        let f = BitmapFileId::new(KeyType::Integer);
        let tree = TreeNode::new(NodeType::OrderBy)
            .operand(
                TreeNode::new(NodeType::SortKey)
                    .operand(TreeNode::field(0))
                    .option(TreeNode::with_value(NodeType::ConstantValue, "1")),
            )
            .option(TreeNode::new(NodeType::GroupBy));
        let parser = BitmapOptionParser::new(&f);
        let mut out = BitmapOpenOption::default();
        assert!(parser.get_sort_parameter(&tree, &mut out).unwrap());
        assert!(out.group_by);
        assert_eq!(out.sort_order, Some(SortOrder::Descending));
        assert!(out.cache_all_object);
        assert!(out.open_mode_read);
    }

    #[test]
    fn test_condition_stream_parses_back() {
        let values = parse_condition_stream("#gt(abb, )#lt(abd, )#lk(ab*%c,*)#nl").unwrap();
        assert_eq!(values.len(), 4);
        assert_eq!(values[0].match_type, MatchMode::GreaterThan);
        assert_eq!(values[0].value, "abb");
        assert_eq!(values[0].optional_char, Some(' '));
        assert_eq!(values[2].match_type, MatchMode::Like);
        assert_eq!(values[3].match_type, MatchMode::EqualsToNull);
    }
}
