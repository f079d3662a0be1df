//! Error types for parsing and interpretation.
//!
//! Parsing fails with a single [`ParseError`] carrying the line the parser was
//! positioned at. Interpretation fails with an [`InterpretError`]: a
//! structured [`ErrorKind`] plus a trail of locations, one per nested
//! `execute` level the failure crossed. Its display form is a breadcrumb
//! trail (outermost first) followed by the innermost cause.

use std::error::Error as StdError;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::value::Value;

/// Result of a run-time resolver or an execution entry point.
pub type InterpretResult<T = ()> = Result<T, InterpretError>;

/// What went wrong while lexing or transforming.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("could not locate where the '{token}' body ends")]
    UnterminatedBlock { token: String },
    /// A lexical marker the parser splits on is empty.
    #[error("the lexical marker '{marker}' must not be empty")]
    EmptyMarker { marker: &'static str },
    /// A parse-time resolver's own fatal condition.
    #[error("{message}")]
    Invalid { message: String },
}

impl ParseErrorKind {
    pub fn invalid(message: impl Into<String>) -> Self {
        ParseErrorKind::Invalid {
            message: message.into(),
        }
    }
}

/// A parse failure, attributed to the line the parser was positioned at.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("error while parsing (line {line}): {kind}")]
pub struct ParseError {
    pub line: usize,
    pub kind: ParseErrorKind,
}

/// Source position of one execution level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub source: Rc<str>,
    pub line: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "File '{}', line {}", self.source, self.line)
    }
}

/// Structured interpretation failure categories.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// No run-time resolver is registered for the token.
    #[error("unknown token '{token}'")]
    UnknownToken { token: String },

    /// A dotted path reached a non-environment value before its end.
    #[error("File '{source_id}': cannot navigate through non-object '{through}' to reach '{segment}'")]
    Navigation {
        segment: String,
        through: String,
        source_id: String,
    },

    /// A resolver's own precondition failed.
    #[error("{message}")]
    Resolution { message: String },

    /// A failure from outside the engine's error types.
    #[error("execution failed\ncaused by {category}: {details}")]
    Foreign {
        category: &'static str,
        details: String,
        cause: Box<dyn StdError + 'static>,
    },

    /// A value raised on purpose by a program.
    #[error("raised {value}")]
    Raised { value: Value },

    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The environment-initialization hook failed.
    #[error("environment setup failed: {message}")]
    Setup { message: String },

    /// A file load re-entered a file that is still loading.
    #[error("file '{path}' is already being interpreted")]
    ReentrantLoad { path: String },

    /// Deleting a name that is not bound locally.
    #[error("'{name}' is not defined in this scope")]
    MissingLocal { name: String },

    /// The call stack grew past its configured limit.
    #[error("maximum execution depth exceeded (limit: {depth})")]
    RecursionLimit { depth: usize },
}

/// An interpretation failure with its location trail.
#[derive(Debug)]
pub struct InterpretError {
    kind: ErrorKind,
    /// Innermost location first.
    trail: Vec<Location>,
}

impl InterpretError {
    pub fn new(kind: ErrorKind) -> Self {
        InterpretError {
            kind,
            trail: Vec::new(),
        }
    }

    /// A resolver-reported precondition failure.
    #[cold]
    pub fn resolution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Resolution {
            message: message.into(),
        })
    }

    /// Wrap a failure that is not one of the engine's own kinds, recording
    /// its category (type name) and details.
    #[cold]
    pub fn foreign<E: StdError + 'static>(err: E) -> Self {
        Self::new(ErrorKind::Foreign {
            category: std::any::type_name::<E>(),
            details: err.to_string(),
            cause: Box::new(err),
        })
    }

    /// A value raised by the program.
    #[cold]
    pub fn raised(value: Value) -> Self {
        Self::new(ErrorKind::Raised { value })
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    /// Locations the failure crossed, innermost first.
    pub fn trail(&self) -> &[Location] {
        &self.trail
    }

    /// Record one more (outer) execution level.
    #[must_use]
    pub fn located(mut self, location: Location) -> Self {
        self.trail.push(location);
        self
    }

    /// The raised value, if this is a program-raised failure.
    pub fn raised_value(&self) -> Option<&Value> {
        match &self.kind {
            ErrorKind::Raised { value } => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for InterpretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for location in self.trail.iter().rev() {
            write!(f, "{location} -> ")?;
        }
        write!(f, "{}", self.kind)
    }
}

impl StdError for InterpretError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::Foreign { cause, .. } => Some(cause.as_ref()),
            ErrorKind::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ErrorKind> for InterpretError {
    fn from(kind: ErrorKind) -> Self {
        InterpretError::new(kind)
    }
}

impl From<ParseError> for InterpretError {
    fn from(err: ParseError) -> Self {
        InterpretError::new(ErrorKind::Parse(err))
    }
}
