use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    /// Malformed value in a driver parameter or hint string
    WrongParameter,
    /// ESCAPE clause that is not a single character
    InvalidEscape,
    /// Language tag that does not parse
    InvalidLanguage,
    /// Numeric argument outside its allowed range
    BadArgument,
    /// LIKE segment longer than the configured maximum
    TooLongConditionalPattern,
    /// Key missing on update
    EntryNotFound,
    /// Entry point missing in an external calculator library
    FunctionNotFound,
    /// Structural inconsistency found during verify
    VerifyAborted,
    NotSupported,
    Unexpected,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: impl Into<String>) -> Self {
        Error { kind, context: context.into() }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: err.to_string(),
        }
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error {
            kind: ErrorKind::Unexpected,
            context: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
