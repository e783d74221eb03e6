use crate::core::error::{Error, ErrorKind, Result};

/// Characters with syntactic meaning in a tea expression
pub fn is_escape_char(c: char) -> bool {
    matches!(c, '#' | '(' | ')' | ',' | '[' | ']' | '\\')
}

/// Append text, escaping the syntax characters with '\'
pub fn append_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        if is_escape_char(c) {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Argument of a tea operator: a nested expression or literal text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeaArg {
    Expr(TeaExpr),
    Text(String),
}

/// Parsed `#name[p,...](arg,...)` operator. Parameters are kept raw;
/// text arguments are unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeaExpr {
    pub name: String,
    pub params: Vec<String>,
    pub args: Vec<TeaArg>,
}

impl TeaExpr {
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        out.push('#');
        out.push_str(&self.name);
        if !self.params.is_empty() {
            out.push('[');
            for (i, p) in self.params.iter().enumerate() {
                if i != 0 {
                    out.push(',');
                }
                out.push_str(p);
            }
            out.push(']');
        }
        out.push('(');
        for (i, a) in self.args.iter().enumerate() {
            if i != 0 {
                out.push(',');
            }
            match a {
                TeaArg::Expr(e) => e.render_into(out),
                TeaArg::Text(t) => append_escaped(out, t),
            }
        }
        out.push(')');
    }
}

struct Cursor<'a> {
    chars: Vec<char>,
    pos: usize,
    text: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Cursor { chars: text.chars().collect(), pos: 0, text }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.bump() == Some(c) {
            Ok(())
        } else {
            Err(self.error())
        }
    }

    fn error(&self) -> Error {
        Error::new(
            ErrorKind::WrongParameter,
            format!("bad tea expression near position {}: {}", self.pos, self.text),
        )
    }
}

/// Parse a complete tea expression; trailing input is an error
pub fn parse(text: &str) -> Result<TeaExpr> {
    let mut cursor = Cursor::new(text);
    let expr = parse_expr(&mut cursor)?;
    if cursor.peek().is_some() {
        return Err(cursor.error());
    }
    Ok(expr)
}

fn parse_expr(cursor: &mut Cursor) -> Result<TeaExpr> {
    cursor.expect('#')?;

    let mut name = String::new();
    while let Some(c) = cursor.peek() {
        if c.is_ascii_alphanumeric() || c == '-' {
            name.push(c);
            cursor.pos += 1;
        } else {
            break;
        }
    }
    if name.is_empty() {
        return Err(cursor.error());
    }

    let mut params = Vec::new();
    if cursor.peek() == Some('[') {
        cursor.pos += 1;
        params = parse_params(cursor)?;
    }

    cursor.expect('(')?;
    let mut args = Vec::new();
    if cursor.peek() != Some(')') {
        loop {
            args.push(parse_arg(cursor)?);
            match cursor.peek() {
                Some(',') => {
                    cursor.pos += 1;
                }
                _ => break,
            }
        }
    }
    cursor.expect(')')?;

    Ok(TeaExpr { name, params, args })
}

/// Raw parameter list up to the matching ']'; nested brackets stay intact
fn parse_params(cursor: &mut Cursor) -> Result<Vec<String>> {
    let mut params = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    loop {
        let c = cursor.bump().ok_or_else(|| cursor.error())?;
        match c {
            '\\' => {
                current.push('\\');
                current.push(cursor.bump().ok_or_else(|| cursor.error())?);
            }
            '[' => {
                depth += 1;
                current.push(c);
            }
            ']' if depth > 0 => {
                depth -= 1;
                current.push(c);
            }
            ']' => {
                params.push(current);
                return Ok(params);
            }
            ',' if depth == 0 => {
                params.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
}

fn parse_arg(cursor: &mut Cursor) -> Result<TeaArg> {
    if cursor.peek() == Some('#') {
        return Ok(TeaArg::Expr(parse_expr(cursor)?));
    }
    let mut text = String::new();
    loop {
        match cursor.peek() {
            Some('\\') => {
                cursor.pos += 1;
                text.push(cursor.bump().ok_or_else(|| cursor.error())?);
            }
            Some(',') | Some(')') | None => break,
            Some(c) => {
                text.push(c);
                cursor.pos += 1;
            }
        }
    }
    Ok(TeaArg::Text(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escaping() {
        let mut s = String::new();
        append_escaped(&mut s, "a#b(c)d,e[f]g\\h");
        assert_eq!(s, "a\\#b\\(c\\)d\\,e\\[f\\]g\\\\h");
    }

    #[test]
    fn test_parse_term() {
        let e = parse("#term[m,,ja+en](kanji)").unwrap();
        assert_eq!(e.name, "term");
        assert_eq!(e.params, ["m", "", "ja+en"]);
        assert_eq!(e.args, [TeaArg::Text("kanji".to_string())]);
    }

    #[test]
    fn test_parse_nested() {
        let text = "#contains[single,0,,,,,,,,](#or(#term[m,,ja](a),#window[0,5](#term[m,,](b),#term[m,,](c))))";
        let e = parse(text).unwrap();
        assert_eq!(e.name, "contains");
        assert_eq!(e.params.len(), 10);
        assert_eq!(e.render(), text);
    }

    #[test]
    fn test_bracketed_params_stay_whole() {
        let text = "#contains[cat,[0,1],[1,2],,,,,,,](#term[m,,](x))";
        let e = parse(text).unwrap();
        assert_eq!(e.params[1], "[0,1]");
        assert_eq!(e.render(), text);
    }

    #[test]
    fn test_escaped_text_roundtrip() {
        let mut s = String::from("#term[n,,](");
        append_escaped(&mut s, "50% (fifty)");
        s.push(')');
        let e = parse(&s).unwrap();
        assert_eq!(e.args, [TeaArg::Text("50% (fifty)".to_string())]);
        assert_eq!(e.render(), s);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(parse("#term[m").is_err());
        assert!(parse("term(a)").is_err());
        assert!(parse("#term(a)b").is_err());
        assert!(parse("#(a)").is_err());
    }
}
