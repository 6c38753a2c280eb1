//! # contentql
//!
//! Parses JCR-SQL2 style content repository queries and compiles their
//! constraints into predicate trees for an inverted index.
//!
//! ## Quick Start
//!
//! ```rust
//! use contentql::{BindVariables, ColumnTypes, EngineConfig, PropertyType, QueryEngine};
//!
//! fn main() -> contentql::Result<()> {
//!     let engine = QueryEngine::new(EngineConfig::default());
//!
//!     let types = ColumnTypes::new()
//!         .with("title", PropertyType::String)
//!         .with("size", PropertyType::Long);
//!
//!     let compiled = engine.prepare(
//!         "JCR-SQL2",
//!         "SELECT * FROM [nt:file] WHERE [size] > 1024 AND CONTAINS([title], 'report')",
//!         &BindVariables::new(),
//!         &types,
//!     )?;
//!
//!     assert!(compiled.include_scores);
//!     println!("{}", compiled.predicate);
//!     Ok(())
//! }
//! ```
//!
//! ## Languages
//!
//! Two languages are registered out of the box:
//!
//! - `JCR-SQL2`: the full query language with joins, set operations and
//!   ordering
//! - `search`: a bare full-text expression searched across all nodes
//!
//! Further languages can be registered through [`QueryEngine::parsers`].

use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod logging;

// Re-export core types
pub use contentql_core::{
    CompileError, ConvertError, Error, Name, ParseError, Path, Position, PropertyType, Result,
    SemanticError, StandardConverter, TypeConverter, TypeSystem, Value, ValueOrder,
};

// Parsing
pub use contentql_query::{
    Constraint, DynamicOperand, FullTextParser, Operator, Query, QueryCommand, QueryParser,
    QueryParsers, SearchParser, SqlParser, StaticOperand, Term,
};

// Compilation
pub use contentql_index::{
    Analyzer, BindValue, BindVariables, CaseFold, Clause, ColumnTypes, CompareOp, CompileOptions,
    CompiledQuery, IndexFlavor, Occur, Predicate, QueryCompiler, StandardAnalyzer,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Language used by [`QueryEngine::prepare_default`]
    pub default_language: String,
    /// Options handed to the compiler
    pub compile: CompileOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_language: SqlParser::LANGUAGE.to_string(),
            compile: CompileOptions::default(),
        }
    }
}

impl EngineConfig {
    /// Set the default language
    pub fn with_default_language<S: Into<String>>(mut self, language: S) -> Self {
        self.default_language = language.into();
        self
    }

    /// Set the compile options
    pub fn with_compile_options(mut self, options: CompileOptions) -> Self {
        self.compile = options;
        self
    }
}

/// The main entry point.
///
/// Holds the query language registry and a compiler configured from
/// [`EngineConfig`]. All methods take `&self`, so an engine can be shared
/// across threads behind an `Arc`.
///
/// # Examples
///
/// ```rust
/// use contentql::{EngineConfig, QueryCommand, QueryEngine};
///
/// let engine = QueryEngine::new(EngineConfig::default());
/// let command = engine.parse("search", "apache -jackrabbit")?;
/// assert!(matches!(command, QueryCommand::Query(_)));
/// # Ok::<(), contentql::Error>(())
/// ```
#[derive(Debug)]
pub struct QueryEngine {
    config: EngineConfig,
    parsers: QueryParsers,
    compiler: QueryCompiler,
}

impl QueryEngine {
    /// Creates an engine with the standard languages and type system.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_type_system(config, TypeSystem::standard())
    }

    /// Creates an engine whose parsers and compiler use `type_system`.
    pub fn with_type_system(config: EngineConfig, type_system: TypeSystem) -> Self {
        let parsers = QueryParsers::standard(type_system.clone());
        let compiler = QueryCompiler::new(config.compile.clone()).with_type_system(type_system);
        Self {
            config,
            parsers,
            compiler,
        }
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the language registry.
    pub fn parsers(&self) -> &QueryParsers {
        &self.parsers
    }

    /// Returns the compiler.
    pub fn compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    /// Parses `query` in `language`.
    ///
    /// Fails with [`SemanticError::UnknownLanguage`] when no parser is
    /// registered for the language.
    pub fn parse(&self, language: &str, query: &str) -> Result<QueryCommand> {
        self.parsers.parse(language, query)
    }

    /// Parses a full-text search expression.
    ///
    /// Returns `None` for an expression without terms.
    pub fn parse_full_text(&self, expression: &str) -> Result<Option<Term>> {
        Ok(FullTextParser::new().parse(expression)?)
    }

    /// Compiles a constraint into an index predicate.
    pub fn compile(
        &self,
        constraint: &Constraint,
        binds: &BindVariables,
        types: &ColumnTypes,
    ) -> Result<CompiledQuery> {
        Ok(self.compiler.compile(constraint, binds, types)?)
    }

    /// Parses `query` and compiles its WHERE constraint.
    ///
    /// A query without a constraint compiles to a predicate matching every
    /// document. Set operations have no single constraint and are rejected.
    pub fn prepare(
        &self,
        language: &str,
        query: &str,
        binds: &BindVariables,
        types: &ColumnTypes,
    ) -> Result<CompiledQuery> {
        let command = self.parse(language, query)?;
        match &command {
            QueryCommand::Query(q) => match &q.constraint {
                Some(constraint) => self.compile(constraint, binds, types),
                None => {
                    debug!(language, "query has no constraint");
                    Ok(CompiledQuery {
                        predicate: Predicate::MatchAll,
                        include_scores: false,
                    })
                }
            },
            QueryCommand::SetQuery(set) => Err(CompileError::UnsupportedOperand(format!(
                "{} query cannot be compiled into a single predicate",
                set.operation
            ))
            .into()),
        }
    }

    /// [`QueryEngine::prepare`] in the configured default language.
    pub fn prepare_default(
        &self,
        query: &str,
        binds: &BindVariables,
        types: &ColumnTypes,
    ) -> Result<CompiledQuery> {
        self.prepare(&self.config.default_language, query, binds, types)
    }
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
