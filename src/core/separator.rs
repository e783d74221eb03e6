use crate::core::error::{Error, ErrorKind, Result};

const MAX_SEPARATOR_LENGTH: usize = 20;

/// Field and record separators of a bulk text stream.
///
/// Definitions are validated once: every separator must be ascii, at
/// most twenty characters, and no separator may be a prefix of another,
/// otherwise matching would be ambiguous.
#[derive(Debug, Clone)]
pub struct BulkSeparator {
    separators: Vec<String>,
}

impl BulkSeparator {
    pub fn new(definitions: &[&str]) -> Result<BulkSeparator> {
        let mut separators: Vec<String> = Vec::with_capacity(definitions.len());
        for def in definitions {
            if def.is_empty() {
                return Err(Error::new(ErrorKind::NotSupported, "empty separator"));
            }
            if !def.is_ascii() {
                return Err(Error::new(
                    ErrorKind::NotSupported,
                    format!("separator is not ascii: {}", def),
                ));
            }
            if def.len() > MAX_SEPARATOR_LENGTH {
                return Err(Error::new(
                    ErrorKind::NotSupported,
                    format!("separator too long: {}", def),
                ));
            }
            for other in &separators {
                if other.starts_with(def) || def.starts_with(other.as_str()) {
                    return Err(Error::new(
                        ErrorKind::NotSupported,
                        format!("separator overlaps another: {}", def),
                    ));
                }
            }
            separators.push(def.to_string());
        }
        Ok(BulkSeparator { separators })
    }

    /// Position and index of the first separator occurring in `text`
    pub fn find(&self, text: &str) -> Option<(usize, usize)> {
        let mut best: Option<(usize, usize)> = None;
        for (index, sep) in self.separators.iter().enumerate() {
            if let Some(pos) = text.find(sep.as_str()) {
                if best.map_or(true, |(b, _)| pos < b) {
                    best = Some((pos, index));
                }
            }
        }
        best
    }

    /// Split `text` on any separator occurrence
    pub fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut out = Vec::new();
        let mut rest = text;
        while let Some((pos, index)) = self.find(rest) {
            out.push(&rest[..pos]);
            rest = &rest[pos + self.separators[index].len()..];
        }
        out.push(rest);
        out
    }
}
