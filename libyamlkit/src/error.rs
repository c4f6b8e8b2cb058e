//! Error types for loading and dumping.

use std::fmt;

use thiserror::Error;

use crate::mark::Mark;

/// Result type for YAML loading and dumping operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Parse context carrying the filename for error reporting.
#[derive(Clone, Debug, Default)]
pub struct ParseContext {
    pub filename: Option<String>,
}

impl ParseContext {
    /// Create a new parse context.
    pub fn new(filename: Option<&str>) -> Self {
        Self {
            filename: filename.map(String::from),
        }
    }

    /// Attach a position, the filename, and a snippet of `input` to a message.
    pub fn locate(&self, message: impl Into<String>, mark: Mark, input: &str) -> Located {
        Located {
            message: message.into(),
            mark: Some(mark),
            filename: self.filename.clone(),
            snippet: mark.snippet(input, 4, 75),
        }
    }
}

/// An error message with an optional source position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Located {
    pub message: String,
    pub mark: Option<Mark>,
    pub filename: Option<String>,
    pub snippet: Option<String>,
}

impl Located {
    /// A message that has no position, such as a schema construction failure.
    pub fn unplaced(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            mark: None,
            filename: None,
            snippet: None,
        }
    }
}

impl fmt::Display for Located {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(name) = &self.filename {
            write!(f, " in \"{}\"", name)?;
        }
        if let Some(mark) = &self.mark {
            write!(f, " at {}", mark)?;
            if let Some(snippet) = &self.snippet {
                write!(f, ":\n{}", snippet)?;
            }
        }
        Ok(())
    }
}

/// Error type for YAML loading and dumping.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed token: bad escape, missing comma, unterminated scalar,
    /// tab in indentation.
    #[error("{0}")]
    Lexical(Located),

    /// Structurally invalid document or schema: undefined alias, duplicate
    /// type binding, tag/kind mismatch, directive or version mismatch.
    #[error("{0}")]
    Composition(Located),

    /// No type binding accepts a tagged node and lenient mode is off.
    #[error("{0}")]
    Resolution(Located),

    /// A value cannot be written: no representer, or a cycle while
    /// references are disabled.
    #[error("{0}")]
    Dump(String),
}

impl Error {
    /// The error message without position information.
    pub fn message(&self) -> &str {
        match self {
            Error::Lexical(loc) | Error::Composition(loc) | Error::Resolution(loc) => &loc.message,
            Error::Dump(msg) => msg,
        }
    }

    /// The source position, for load errors that have one.
    pub fn mark(&self) -> Option<Mark> {
        match self {
            Error::Lexical(loc) | Error::Composition(loc) | Error::Resolution(loc) => loc.mark,
            Error::Dump(_) => None,
        }
    }
}
