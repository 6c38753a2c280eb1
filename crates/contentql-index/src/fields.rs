//! Index field naming and the declared types of indexed columns.

use contentql_core::{CompileError, PropertyType};
use std::collections::BTreeMap;

/// Node name, as a NAME.
pub const NAME: &str = ":name";
/// Local part of the node name, as a STRING.
pub const LOCAL_NAME: &str = ":localname";
/// Node path, as a PATH.
pub const PATH: &str = ":path";
/// Parent node path, as a PATH.
pub const PARENT: &str = ":parent";
/// Node depth, as a LONG.
pub const DEPTH: &str = ":depth";
/// Full text of every property.
pub const FULL_TEXT: &str = ":ft";

/// Field holding the length of `property`'s value.
pub fn length(property: &str) -> String {
    format!(":len:{}", property)
}

/// Field holding the full text of `property`, or of every property.
pub fn full_text(property: Option<&str>) -> String {
    match property {
        Some(p) => format!("{}:{}", FULL_TEXT, p),
        None => FULL_TEXT.to_string(),
    }
}

/// Declared property type of each indexed column.
///
/// Iteration is ordered by column name so that predicates built from the
/// map are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnTypes {
    columns: BTreeMap<String, PropertyType>,
}

impl ColumnTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`ColumnTypes::insert`].
    pub fn with(mut self, column: impl Into<String>, property_type: PropertyType) -> Self {
        self.insert(column, property_type);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, property_type: PropertyType) -> Option<PropertyType> {
        self.columns.insert(column.into(), property_type)
    }

    pub fn get(&self, column: &str) -> Option<PropertyType> {
        self.columns.get(column).copied()
    }

    /// The declared type of a column the constraint cannot be compiled
    /// without.
    pub fn require(&self, column: &str) -> Result<PropertyType, CompileError> {
        self.get(column)
            .ok_or_else(|| CompileError::UndeclaredColumn(column.to_string()))
    }

    /// Columns whose declared type is one of `types`.
    pub fn columns_of(&self, types: &[PropertyType]) -> Vec<(&str, PropertyType)> {
        self.columns
            .iter()
            .filter(|(_, t)| types.contains(t))
            .map(|(c, t)| (c.as_str(), *t))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, PropertyType)> for ColumnTypes {
    fn from_iter<I: IntoIterator<Item = (S, PropertyType)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().map(|(c, t)| (c.into(), t)).collect(),
        }
    }
}
