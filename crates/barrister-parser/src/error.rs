use std::fmt;

/// A single error encountered while lexing, parsing, or validating an IDL
/// document.
///
/// Syntactic errors carry the 1-based line number they were found on.
/// Semantic errors (undefined types, cycles, extends violations) are
/// structural rather than positional and carry line `0`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line: {line} message: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    /// Create a new instance of `ParseError` at the given line.
    pub fn new<S: Into<String>>(line: usize, message: S) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }

    /// Create a structural (line-less) error.
    pub fn structural<S: Into<String>>(message: S) -> Self {
        Self::new(0, message)
    }
}

/// All errors collected over a full parse, returned as one aggregate
/// failure.
///
/// The parser does not abort on the first problem: duplicate names,
/// block minimums, and every semantic check keep accumulating so a
/// single run reports everything it can.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdlErrors {
    pub errors: Vec<ParseError>,
}

impl IdlErrors {
    pub(crate) fn new(errors: Vec<ParseError>) -> Self {
        Self { errors }
    }
}

impl fmt::Display for IdlErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for IdlErrors {}
