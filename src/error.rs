use std::fmt;
use std::io;

pub(crate) type SmeraldoResult<T> = Result<T, Error>;

/// Errors that can occur when loading or compiling a grammar.
///
/// Everything here is a configuration problem detected before any document
/// is scanned; tokenization itself never fails.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred when reading a grammar file.
    Io(io::Error),

    /// JSON parsing or serialization failed for a grammar document.
    Json(serde_json::Error),

    /// A rule references a repository entry that does not exist.
    /// Detected once at compile time, not per use.
    UnresolvedInclude(String),

    /// A pattern in the grammar is not a valid regular expression.
    #[allow(missing_docs)]
    InvalidPattern { pattern: String, error: onig::Error },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Json(err) => write!(f, "JSON error: {}", err),
            Error::UnresolvedInclude(name) => {
                write!(
                    f,
                    "include '{}' does not resolve to any repository entry",
                    name
                )
            }
            Error::InvalidPattern { pattern, error } => {
                write!(f, "invalid pattern '{}': {}", pattern, error)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::UnresolvedInclude(_) | Error::InvalidPattern { .. } => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
