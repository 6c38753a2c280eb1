//! # contentql query
//!
//! Parsers for the SQL-like content query language and its full-text
//! sub-grammar, and the Query Object Model (QOM) they produce.
//!
//! ```
//! use contentql_query::{QueryCommand, SqlParser};
//!
//! let parser = SqlParser::new();
//! let command = parser.parse("SELECT * FROM [nt:base] WHERE [title] LIKE 'intro%'").unwrap();
//! assert!(matches!(command, QueryCommand::Query(_)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

#[allow(missing_docs)]
pub mod ast;
pub mod fulltext;
#[allow(missing_docs)]
pub mod lexer;
pub mod parser;
pub mod registry;

pub use ast::{
    ArithmeticOperator, Column, Constraint, DynamicOperand, Join, JoinCondition, JoinType, Limit,
    NamedSelector, NullOrder, Operator, Order, Ordering, Query, QueryCommand, SetOperation,
    SetQuery, Source, StaticOperand,
};
pub use fulltext::{FullTextParser, SimpleTerm, Term};
pub use lexer::{Lexer, Token, TokenKind, TokenStream};
pub use parser::SqlParser;
pub use registry::{QueryParser, QueryParsers, SearchParser};
