use crate::analysis::charclass::{self, CharBlock};
use crate::analysis::token::Token;
use crate::core::error::{Error, ErrorKind, Result};

/// N-gram tokenizer over one homogeneous run of characters.
///
/// At indexing time every gram length between `min` and `max` is emitted at
/// every position. At search time a covering set of `max`-length grams is
/// emitted instead; a target shorter than `min` yields a single short-word
/// token so the caller can fall back to prefix expansion.
#[derive(Debug, Clone)]
pub struct GeneralBlocker {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for GeneralBlocker {
    fn default() -> Self {
        // bigram
        GeneralBlocker { min_length: 2, max_length: 2 }
    }
}

impl GeneralBlocker {
    /// Parse the "1" or "1:3" tail of a tokenize parameter such as "NGR:1:3"
    pub fn parse(parameter: &str) -> Result<Self> {
        let mut b = GeneralBlocker::default();
        let parameter = parameter.trim();
        if parameter.is_empty() || parameter.starts_with('@') {
            return Ok(b);
        }
        let mut it = parameter.split(':');
        let first = it.next().unwrap();
        b.min_length = first
            .parse()
            .map_err(|_| Error::new(ErrorKind::WrongParameter, parameter))?;
        b.max_length = match it.next() {
            Some(second) => second
                .parse()
                .map_err(|_| Error::new(ErrorKind::WrongParameter, parameter))?,
            None => b.min_length,
        };
        if it.next().is_some() || b.min_length == 0 || b.max_length < b.min_length {
            return Err(Error::new(ErrorKind::WrongParameter, parameter));
        }
        Ok(b)
    }

    pub fn tokenize(&self, target: &str, base_offset: usize, search: bool) -> Vec<Token> {
        let chars: Vec<char> = target.chars().collect();
        let n = chars.len();
        let mut out = Vec::new();
        if n == 0 {
            return out;
        }

        if n < self.min_length {
            let mut t = Token::new(target, base_offset);
            if search {
                t.is_short = true;
                t.min_length = self.min_length;
            }
            out.push(t);
            return out;
        }

        if search {
            // covering set of max-length grams, final gram right-aligned
            let len = self.max_length.min(n);
            let mut pos = 0;
            loop {
                if pos + len >= n {
                    pos = n - len;
                    out.push(Token::new(
                        chars[pos..pos + len].iter().collect::<String>(),
                        base_offset + pos,
                    ));
                    break;
                }
                out.push(Token::new(
                    chars[pos..pos + len].iter().collect::<String>(),
                    base_offset + pos,
                ));
                pos += len;
            }
        } else {
            for pos in 0..n {
                for len in self.min_length..=self.max_length {
                    if pos + len > n {
                        break;
                    }
                    out.push(Token::new(
                        chars[pos..pos + len].iter().collect::<String>(),
                        base_offset + pos,
                    ));
                }
            }
        }
        out
    }
}

/// Blocker that honors script boundaries: the target is first split into
/// runs of one character block, then each run is tokenized with the gram
/// lengths configured for that block. Alphanumeric runs are kept whole
/// unless an `alnum` gram configuration is set (pure n-gram indexing).
#[derive(Debug, Clone)]
pub struct ScriptBlocker {
    pub kana: GeneralBlocker,
    pub kanji: GeneralBlocker,
    pub other: GeneralBlocker,
    pub alnum: Option<GeneralBlocker>,
}

impl Default for ScriptBlocker {
    fn default() -> Self {
        ScriptBlocker {
            kana: GeneralBlocker { min_length: 2, max_length: 2 },
            kanji: GeneralBlocker { min_length: 1, max_length: 2 },
            other: GeneralBlocker { min_length: 2, max_length: 2 },
            alnum: None,
        }
    }
}

impl ScriptBlocker {
    pub fn tokenize(&self, target: &str, search: bool) -> Vec<Token> {
        let mut out = Vec::new();
        for (run, offset, block) in split_blocks(target) {
            match block {
                CharBlock::Space => {}
                CharBlock::Alnum => match &self.alnum {
                    Some(blocker) => out.extend(blocker.tokenize(&run, offset, search)),
                    None => out.push(Token::new(run, offset)),
                },
                CharBlock::Hiragana | CharBlock::Katakana => {
                    out.extend(self.kana.tokenize(&run, offset, search))
                }
                CharBlock::Kanji => out.extend(self.kanji.tokenize(&run, offset, search)),
                _ => out.extend(self.other.tokenize(&run, offset, search)),
            }
        }
        out
    }
}

/// Split into (run, char_offset, block) triples of same-block characters
fn split_blocks(target: &str) -> Vec<(String, usize, CharBlock)> {
    let mut runs = Vec::new();
    let mut current = String::new();
    let mut start = 0usize;
    let mut block = CharBlock::Other;
    for (i, c) in target.chars().enumerate() {
        let b = charclass::char_block(c);
        if current.is_empty() {
            start = i;
            block = b;
            current.push(c);
        } else if b == block {
            current.push(c);
        } else {
            runs.push((std::mem::take(&mut current), start, block));
            start = i;
            block = b;
            current.push(c);
        }
    }
    if !current.is_empty() {
        runs.push((current, start, block));
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_parameter() {
        let b = GeneralBlocker::parse("1:3").unwrap();
        assert_eq!((b.min_length, b.max_length), (1, 3));
        let b = GeneralBlocker::parse("2").unwrap();
        assert_eq!((b.min_length, b.max_length), (2, 2));
        assert!(GeneralBlocker::parse("3:1").is_err());
        assert!(GeneralBlocker::parse("0").is_err());
        assert!(GeneralBlocker::parse("x").is_err());
    }

    #[test]
    fn test_indexing_grams() {
        let b = GeneralBlocker::default();
        let tokens = b.tokenize("abcd", 0, false);
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["ab", "bc", "cd"]);
    }

    #[test]
    fn test_search_grams_cover_target() {
        let b = GeneralBlocker::default();
        let tokens = b.tokenize("abcde", 0, true);
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        // final gram is right-aligned so the tail is covered
        assert_eq!(texts, ["ab", "cd", "de"]);
    }

    #[test]
    fn test_short_word() {
        let b = GeneralBlocker::default();
        let tokens = b.tokenize("a", 0, true);
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].is_short);
        assert_eq!(tokens[0].min_length, 2);
    }

    #[test]
    fn test_script_boundaries() {
        let b = ScriptBlocker::default();
        let tokens = b.tokenize("abc漢字かな", false);
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        // latin run stays whole, kanji run yields 1- and 2-grams,
        // hiragana run yields bigrams only
        assert!(texts.contains(&"abc"));
        assert!(texts.contains(&"漢"));
        assert!(texts.contains(&"漢字"));
        assert!(texts.contains(&"かな"));
        assert!(!texts.contains(&"字か"));
    }

    #[test]
    fn test_alnum_grams_when_configured() {
        let b = ScriptBlocker { alnum: Some(GeneralBlocker::default()), ..Default::default() };
        let tokens = b.tokenize("abcd", false);
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["ab", "bc", "cd"]);
    }
}
