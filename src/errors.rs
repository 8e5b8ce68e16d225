use std::fmt::{self, Display, Formatter};

use thiserror::Error;

/// Error emitted by the lexer with a message and column position.
#[derive(Debug, Error, Clone)]
#[error("{message} at column {column}")]
pub struct LexError {
    /// Column at which the error occurred (1-indexed).
    pub column: usize,
    /// Human-readable error message.
    pub message: String,
}

impl LexError {
    /// Creates a new [`LexError`].
    #[must_use]
    pub fn new(column: usize, message: impl Into<String>) -> Self {
        Self {
            column,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("unexpected end of formula")]
    UnexpectedEnd,
    #[error("expected predicate, saw {found}")]
    ExpectedPredicate { found: String },
    #[error("unexpected token {found}")]
    UnexpectedToken { found: String },
    #[error("expected ')'")]
    MissingRParen,
    #[error("non-associative operator chained")]
    NonAssocChained,
    #[error("empty formula")]
    EmptyFormula,
}

/// Parser error annotated with the offending column and kind.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Column at which the parser reported the error.
    pub column: usize,
    /// Detailed categorization of the error.
    pub kind: ParseErrorKind,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} at column {}", self.kind, self.column)
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    /// Creates a new [`ParseError`].
    #[must_use]
    pub fn new(column: usize, kind: ParseErrorKind) -> Self {
        Self { column, kind }
    }
}

/// Any error produced while turning a formula into an automaton.
#[derive(Debug, Error, Clone)]
pub enum TranslateError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

impl TranslateError {
    /// The input column the error points at, used for caret diagnostics.
    #[must_use]
    pub fn column(&self) -> usize {
        match self {
            TranslateError::Lex(e) => e.column,
            TranslateError::Parse(e) => e.column,
        }
    }
}
