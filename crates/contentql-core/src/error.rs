//! Error types for contentql.
//!
//! Failures fall into three classes that callers can tell apart:
//! [`ParseError`] (the text is not in the language), [`SemanticError`]
//! (the text parses but means nothing valid) and [`CompileError`] (the
//! query is valid but cannot be expressed against the declared columns).

use std::fmt;

use thiserror::Error;

/// A location in query text.
///
/// `index` is a byte offset into the original string; `line` and `column`
/// are 1-based and count characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    /// Byte offset from the start of the input
    pub index: usize,
    /// 1-based line number
    pub line: usize,
    /// 1-based column number
    pub column: usize,
}

impl Position {
    /// Creates a position.
    pub fn new(index: usize, line: usize, column: usize) -> Self {
        Self {
            index,
            line,
            column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// The text cannot be parsed in the requested language.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Unterminated quote or comment, or a character the tokenizer rejects
    #[error("{message} at {position}")]
    Lexical { message: String, position: Position },

    /// Unexpected token or premature end of input
    #[error("{message} at {position}")]
    Syntax { message: String, position: Position },
}

impl ParseError {
    /// Position at which the error was detected.
    pub fn position(&self) -> Position {
        match self {
            ParseError::Lexical { position, .. } | ParseError::Syntax { position, .. } => {
                *position
            }
        }
    }
}

/// The text parses but is not a meaningful query.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SemanticError {
    /// An unscoped reference used where more than one source exists
    #[error("'{name}' at {position} must be qualified with a selector name because the query has more than one source")]
    AmbiguousReference { name: String, position: Position },

    /// A selector name that no source declares
    #[error("unknown selector '{name}' at {position}")]
    UnknownSelector { name: String, position: Position },

    /// No parser is registered for the language
    #[error("unknown query language '{0}'")]
    UnknownLanguage(String),

    /// `CAST` to an unknown type, or a literal the type cannot represent
    #[error("cannot cast '{literal}' to {type_name} at {position}")]
    InvalidCast {
        literal: String,
        type_name: String,
        position: Position,
    },

    /// A literal that cannot be read as any value
    #[error("invalid literal '{text}' at {position}")]
    InvalidLiteral { text: String, position: Position },

    /// `LIMIT from,to` with `to < from`, or a count that does not fit
    #[error("invalid limit at {position}: {message}")]
    InvalidLimit { message: String, position: Position },
}

/// A value converter could not produce the requested type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertError {
    /// The value has no representation in the target type
    #[error("cannot convert {value} to {target}")]
    CannotConvert { value: String, target: String },

    /// The value is numeric but outside the target type's range
    #[error("{value} is out of range for {target}")]
    OutOfRange { value: String, target: String },
}

/// The query is valid but cannot be compiled for the index.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    /// The operator has no meaning for the column's declared type
    #[error("operator {operator} cannot be applied to {property_type} column '{column}'")]
    UnsupportedOperator {
        operator: String,
        property_type: String,
        column: String,
    },

    /// The operand cannot be evaluated from index contents
    #[error("{0} cannot be evaluated by the index")]
    UnsupportedOperand(String),

    /// A bind variable referenced by the query has no value
    #[error("no value bound to variable '${0}'")]
    MissingBindVariable(String),

    /// An IN list that is empty or holds something other than values
    #[error("malformed set criteria: {0}")]
    MalformedSetCriteria(String),

    /// A column the constraint needs is absent from the type map
    #[error("column '{0}' has no declared type")]
    UndeclaredColumn(String),

    /// A subquery that was never replaced by its results
    #[error("subquery operand has not been resolved")]
    UnresolvedSubquery,

    /// A LIKE pattern that produced an invalid regular expression
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A converter rejected a value
    #[error(transparent)]
    Conversion(#[from] ConvertError),

    /// A full-text expression supplied through a bind variable did not parse
    #[error("invalid full-text expression: {0}")]
    FullText(#[from] ParseError),
}

/// The main error type for contentql operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The query cannot be parsed
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The query parses but is semantically invalid
    #[error("semantic error: {0}")]
    Semantic(#[from] SemanticError),

    /// The query cannot be compiled against the declared columns
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),
}

/// A specialized `Result` type for contentql operations.
pub type Result<T> = std::result::Result<T, Error>;
