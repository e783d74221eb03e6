use std::fmt;
use serde::{Serialize, Deserialize};
use crate::core::error::{Error, ErrorKind, Result};

/// Ordered set of two-letter language codes, written "ja+en".
///
/// Tags are normalized to lowercase and deduplicated; first-seen order is
/// preserved, so "ja+en" renders back as "ja+en".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguageSet {
    tags: Vec<String>,
}

impl LanguageSet {
    pub fn parse(text: &str) -> Result<LanguageSet> {
        let mut tags = Vec::new();
        if text.is_empty() {
            return Ok(LanguageSet { tags });
        }
        for part in text.split('+') {
            let tag = part.trim().to_ascii_lowercase();
            let (code, _country) = match tag.split_once('-') {
                Some((c, r)) => (c, Some(r)),
                None => (tag.as_str(), None),
            };
            if code.len() != 2 || !code.bytes().all(|b| b.is_ascii_lowercase()) {
                return Err(Error::new(
                    ErrorKind::InvalidLanguage,
                    format!("bad language tag: {}", part),
                ));
            }
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        Ok(LanguageSet { tags })
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Canonical "ja+en" rendering
    pub fn name(&self) -> String {
        self.tags.join("+")
    }

    pub fn contains(&self, code: &str) -> bool {
        self.tags.iter().any(|t| t == code || t.starts_with(code))
    }
}

impl fmt::Display for LanguageSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_name() {
        let l = LanguageSet::parse("ja+en").unwrap();
        assert_eq!(l.name(), "ja+en");
        assert!(l.contains("ja"));

        let l = LanguageSet::parse("EN-US").unwrap();
        assert_eq!(l.name(), "en-us");

        assert!(LanguageSet::parse("japanese").is_err());
        assert!(LanguageSet::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_duplicates_folded() {
        let l = LanguageSet::parse("en+en+ja").unwrap();
        assert_eq!(l.len(), 2);
    }
}
