use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::MatchMode;

/// Padding character appended conceptually by PAD SPACE comparisons
pub const PADDING_CHAR: char = ' ';
/// Smallest character a PAD SPACE lower bound can step over
pub const SOH_CHAR: char = '\u{1}';

/// One element of a compiled bitmap search condition.
///
/// `optional_char` plays two mutually exclusive roles: the padding
/// character (0x20) of a PAD SPACE comparison, or the rewritten escape
/// character ('*') of a LIKE element.
#[derive(Debug, PartialEq)]
pub struct ParseValue {
    pub match_type: MatchMode,
    pub value: String,
    pub optional_char: Option<char>,
    pub next: Option<Box<ParseValue>>,
}

impl ParseValue {
    pub fn new(match_type: MatchMode) -> Box<ParseValue> {
        Box::new(ParseValue { match_type, value: String::new(), optional_char: None, next: None })
    }

    pub fn with_value(
        match_type: MatchMode,
        value: impl Into<String>,
        optional_char: Option<char>,
    ) -> Box<ParseValue> {
        Box::new(ParseValue {
            match_type,
            value: value.into(),
            optional_char,
            next: None,
        })
    }

    pub fn is_equals(&self) -> bool {
        self.match_type.is_equals()
    }

    pub fn len(&self) -> usize {
        1 + self.next.as_ref().map_or(0, |n| n.len())
    }

    /// Render this element into the condition stream
    pub fn put_stream(&self, out: &mut String) {
        match self.match_type {
            MatchMode::Equals => {
                out.push_str("#eq");
                put_stream_value(out, &self.value, self.optional_char);
            }
            MatchMode::EqualsToNull => out.push_str("#nl"),
            MatchMode::EqualsToNullAll => out.push_str("#na"),
            MatchMode::GreaterThan => {
                out.push_str("#gt");
                put_stream_value(out, &self.value, self.optional_char);
            }
            MatchMode::GreaterThanEquals => {
                out.push_str("#ge");
                put_stream_value(out, &self.value, self.optional_char);
            }
            MatchMode::LessThan => {
                out.push_str("#lt");
                put_stream_value(out, &self.value, self.optional_char);
            }
            MatchMode::LessThanEquals => {
                out.push_str("#le");
                put_stream_value(out, &self.value, self.optional_char);
            }
            MatchMode::NotEquals => {
                out.push_str("#ne");
                put_stream_value(out, &self.value, self.optional_char);
            }
            MatchMode::Like => {
                out.push_str("#lk");
                self.put_stream_like_value(out);
            }
            MatchMode::Unknown => out.push_str("#uk"),
            MatchMode::VoidMatch => {}
        }
    }

    /// LIKE payloads replace the SQL escape character with '*' so the
    /// downstream matcher only ever sees an ascii escape. A literal '*'
    /// is doubled because it becomes an escape character from here on.
    fn put_stream_like_value(&self, out: &mut String) {
        out.push('(');
        let mut chars = self.value.chars().peekable();
        while let Some(c) = chars.next() {
            let mut c = c;
            if let Some(esc) = self.optional_char {
                if c == esc {
                    out.push('*');
                    match chars.next() {
                        Some(n) => c = n,
                        None => break,
                    }
                } else if c == '*' {
                    out.push('*');
                }
            }
            if c == ')' || c == '\\' || c == ',' {
                out.push('\\');
            }
            out.push(c);
        }
        if self.optional_char.is_some() {
            out.push(',');
            out.push('*');
        }
        out.push(')');
    }
}

/// Render "(value[,optional])" escaping ')' '\' ',' with '\'
pub fn put_stream_value(out: &mut String, value: &str, optional_char: Option<char>) {
    out.push('(');
    for c in value.chars() {
        if c == ')' || c == '\\' || c == ',' {
            out.push('\\');
        }
        out.push(c);
    }
    if let Some(o) = optional_char {
        out.push(',');
        out.push(o);
    }
    out.push(')');
}

/// Parse one "#xx(value[,optional])" element off the front of `text`,
/// returning the rest of the input
pub fn get_stream(text: &str) -> Result<(Box<ParseValue>, &str)> {
    let bad = || Error::new(ErrorKind::WrongParameter, format!("bad condition stream: {}", text));
    let rest = text.strip_prefix('#').ok_or_else(bad)?;
    if rest.len() < 2 || !rest.is_char_boundary(2) {
        return Err(bad());
    }
    let mut it = rest.chars();
    let c1 = it.next().ok_or_else(bad)?;
    let c2 = it.next().ok_or_else(bad)?;
    let match_type = match (c1, c2) {
        ('e', 'q') => MatchMode::Equals,
        ('n', 'l') => MatchMode::EqualsToNull,
        ('n', 'e') => MatchMode::NotEquals,
        ('n', 'a') => MatchMode::EqualsToNullAll,
        ('g', 't') => MatchMode::GreaterThan,
        ('g', 'e') => MatchMode::GreaterThanEquals,
        ('l', 't') => MatchMode::LessThan,
        ('l', 'e') => MatchMode::LessThanEquals,
        ('l', 'k') => MatchMode::Like,
        ('u', 'k') => MatchMode::Unknown,
        _ => return Err(bad()),
    };
    let mut rest = &rest[2..];

    let mut node = ParseValue::new(match_type);
    if !matches!(
        match_type,
        MatchMode::EqualsToNull | MatchMode::EqualsToNullAll | MatchMode::Unknown
    ) {
        rest = rest.strip_prefix('(').ok_or_else(bad)?;
        let mut value = String::new();
        let mut chars = rest.char_indices();
        let mut end = None;
        let mut optional = None;
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, esc)) => value.push(esc),
                    None => return Err(bad()),
                },
                ',' => {
                    let (_, o) = chars.next().ok_or_else(bad)?;
                    optional = Some(o);
                    match chars.next() {
                        Some((j, ')')) => {
                            end = Some(j);
                            break;
                        }
                        _ => return Err(bad()),
                    }
                }
                ')' => {
                    end = Some(i);
                    break;
                }
                _ => value.push(c),
            }
        }
        let end = end.ok_or_else(bad)?;
        node.value = value;
        node.optional_char = optional;
        rest = &rest[end + 1..];
    }
    Ok((node, rest))
}

/// Push a node at the head of a list
pub fn push_front(list: &mut Option<Box<ParseValue>>, mut node: Box<ParseValue>) {
    node.next = list.take();
    *list = Some(node);
}

/// Move the whole of `src` to the front of `dst`, preserving order
pub fn move_to_front(dst: &mut Option<Box<ParseValue>>, src: &mut Option<Box<ParseValue>>) {
    if let Some(mut head) = src.take() {
        let mut tail = &mut head;
        while tail.next.is_some() {
            tail = tail.next.as_mut().unwrap();
        }
        tail.next = dst.take();
        *dst = Some(head);
    }
}

/// Append a node at the tail of a list
pub fn push_back(list: &mut Option<Box<ParseValue>>, node: Box<ParseValue>) {
    match list {
        None => *list = Some(node),
        Some(head) => {
            let mut tail = head;
            while tail.next.is_some() {
                tail = tail.next.as_mut().unwrap();
            }
            tail.next = Some(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_stream_escapes() {
        let v = ParseValue::with_value(MatchMode::Equals, "a,b)c", Some(PADDING_CHAR));
        let mut s = String::new();
        v.put_stream(&mut s);
        assert_eq!(s, "#eq(a\\,b\\)c, )");
    }

    #[test]
    fn test_put_stream_like_rewrites_escape() {
        // '!' escapes in SQL; the stream uses '*' instead
        let v = ParseValue::with_value(MatchMode::Like, "10!%*x%", Some('!'));
        let mut s = String::new();
        v.put_stream(&mut s);
        assert_eq!(s, "#lk(10*%**x%,*)");
    }

    #[test]
    fn test_get_stream_roundtrip() {
        let v = ParseValue::with_value(MatchMode::GreaterThanEquals, "ab)c", Some(' '));
        let mut s = String::new();
        v.put_stream(&mut s);
        let (parsed, rest) = get_stream(&s).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed.match_type, MatchMode::GreaterThanEquals);
        assert_eq!(parsed.value, "ab)c");
        assert_eq!(parsed.optional_char, Some(' '));

        let (parsed, rest) = get_stream("#nl#uk").unwrap();
        assert_eq!(parsed.match_type, MatchMode::EqualsToNull);
        assert_eq!(rest, "#uk");
    }

    #[test]
    fn test_list_manipulation() {
        let mut main = None;
        let mut other = None;
        push_front(&mut main, ParseValue::with_value(MatchMode::GreaterThan, "a", None));
        push_back(&mut main, ParseValue::with_value(MatchMode::LessThan, "z", None));
        push_front(&mut other, ParseValue::with_value(MatchMode::NotEquals, "q", None));
        move_to_front(&mut other, &mut main);
        assert!(main.is_none());
        let head = other.unwrap();
        assert_eq!(head.match_type, MatchMode::GreaterThan);
        assert_eq!(head.next.as_ref().unwrap().match_type, MatchMode::LessThan);
        assert_eq!(
            head.next.as_ref().unwrap().next.as_ref().unwrap().match_type,
            MatchMode::NotEquals
        );
    }
}
