//! # contentql index
//!
//! Compiles the constraint of a parsed query into a predicate tree that a
//! Lucene-style inverted index can evaluate: typed ranges over numeric
//! columns, term and wildcard matches over strings, phrase queries for
//! full-text search and boolean clauses combining them.
//!
//! ```
//! use contentql_core::PropertyType;
//! use contentql_index::{BindVariables, ColumnTypes, CompileOptions, Predicate, QueryCompiler};
//! use contentql_query::SqlParser;
//!
//! let command = SqlParser::new()
//!     .parse("SELECT * FROM [nt:base] WHERE [size] > 10")
//!     .unwrap();
//! let types = ColumnTypes::new().with("size", PropertyType::Long);
//! let compiled = QueryCompiler::new(CompileOptions::default())
//!     .compile(command.constraint().unwrap(), &BindVariables::new(), &types)
//!     .unwrap();
//! assert!(matches!(compiled.predicate, Predicate::LongRange { .. }));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analyzer;
#[allow(missing_docs)]
pub mod compiler;
#[allow(missing_docs)]
pub mod fields;
#[allow(missing_docs)]
pub mod predicate;

pub use analyzer::{Analyzer, StandardAnalyzer};
pub use compiler::{
    encode_decimal, BindValue, BindVariables, CompileOptions, CompiledQuery, IndexFlavor,
    QueryCompiler,
};
pub use fields::ColumnTypes;
pub use predicate::{CaseFold, Clause, CompareOp, Occur, Predicate};
