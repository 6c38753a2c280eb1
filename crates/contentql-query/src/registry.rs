/// Query language registry
///
/// Maps language names to parsers so callers can pick a language at run
/// time. Lookups are case-insensitive.
use crate::ast::{Constraint, NamedSelector, Query, QueryCommand, Source, StaticOperand};
use crate::fulltext::FullTextParser;
use crate::parser::SqlParser;
use contentql_core::{Result, SemanticError, TypeSystem, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// A parser for one query language.
pub trait QueryParser: Send + Sync {
    /// Name the language registers under.
    fn language(&self) -> &str;

    /// Parse query text into a command.
    fn parse(&self, query: &str) -> Result<QueryCommand>;
}

impl QueryParser for SqlParser {
    fn language(&self) -> &str {
        SqlParser::LANGUAGE
    }

    fn parse(&self, query: &str) -> Result<QueryCommand> {
        SqlParser::parse(self, query)
    }
}

/// Plain full-text search: the whole input is a full-text expression
/// matched against every property of every node.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchParser;

impl SearchParser {
    /// Language name under which this parser registers.
    pub const LANGUAGE: &'static str = "search";

    /// Node type searched.
    pub const NODE_TYPE: &'static str = "nt:base";
}

impl QueryParser for SearchParser {
    fn language(&self) -> &str {
        Self::LANGUAGE
    }

    fn parse(&self, query: &str) -> Result<QueryCommand> {
        let term = FullTextParser::new().parse(query)?;
        let constraint = Constraint::FullTextSearch {
            selector: Self::NODE_TYPE.to_string(),
            property: None,
            expression: StaticOperand::Literal(Value::String(query.to_string())),
            term,
        };
        Ok(QueryCommand::Query(Query {
            source: Source::Selector(NamedSelector {
                node_type: Self::NODE_TYPE.to_string(),
                alias: None,
            }),
            constraint: Some(constraint),
            orderings: Vec::new(),
            columns: Vec::new(),
            limit: None,
            distinct: false,
        }))
    }
}

/// Thread-safe set of query parsers keyed by language.
pub struct QueryParsers {
    parsers: RwLock<HashMap<String, Arc<dyn QueryParser>>>,
}

impl QueryParsers {
    /// A registry with no parsers.
    pub fn new() -> Self {
        Self {
            parsers: RwLock::new(HashMap::new()),
        }
    }

    /// A registry holding the SQL parser (using `type_system`) and the
    /// search parser.
    pub fn standard(type_system: TypeSystem) -> Self {
        let parsers = Self::new();
        parsers.add(Arc::new(SqlParser::with_type_system(type_system)));
        parsers.add(Arc::new(SearchParser));
        parsers
    }

    /// Registers a parser, returning the one it replaced.
    pub fn add(&self, parser: Arc<dyn QueryParser>) -> Option<Arc<dyn QueryParser>> {
        let key = parser.language().to_ascii_lowercase();
        debug!(language = parser.language(), "registering query parser");
        // The map holds no cross-entry invariants, so a poisoned lock is
        // still usable.
        let mut parsers = self.parsers.write().unwrap_or_else(|e| e.into_inner());
        parsers.insert(key, parser)
    }

    /// Unregisters the parser for `language`.
    pub fn remove(&self, language: &str) -> Option<Arc<dyn QueryParser>> {
        let mut parsers = self.parsers.write().unwrap_or_else(|e| e.into_inner());
        parsers.remove(&language.to_ascii_lowercase())
    }

    /// The parser for `language`, if registered.
    pub fn get(&self, language: &str) -> Option<Arc<dyn QueryParser>> {
        let parsers = self.parsers.read().unwrap_or_else(|e| e.into_inner());
        parsers.get(&language.to_ascii_lowercase()).cloned()
    }

    /// Registered language names, sorted.
    pub fn languages(&self) -> Vec<String> {
        let parsers = self.parsers.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = parsers.values().map(|p| p.language().to_string()).collect();
        names.sort();
        names
    }

    /// Parse `query` with the parser registered for `language`.
    pub fn parse(&self, language: &str, query: &str) -> Result<QueryCommand> {
        let parser = self
            .get(language)
            .ok_or_else(|| SemanticError::UnknownLanguage(language.to_string()))?;
        parser.parse(query)
    }
}

impl Default for QueryParsers {
    fn default() -> Self {
        Self::standard(TypeSystem::standard())
    }
}

impl fmt::Debug for QueryParsers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryParsers")
            .field("languages", &self.languages())
            .finish()
    }
}
