use serde::{Serialize, Deserialize};

/// Token produced by a blocker or the analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    /// Character offset in the source text
    pub offset: usize,
    /// Set when the token is shorter than the blocker minimum
    pub is_short: bool,
    /// Minimum gram length of the block, meaningful when is_short
    pub min_length: usize,
}

impl Token {
    pub fn new(text: impl Into<String>, offset: usize) -> Self {
        Token {
            text: text.into(),
            offset,
            is_short: false,
            min_length: 0,
        }
    }
}
