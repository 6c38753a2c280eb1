//! # contentql core
//!
//! Shared building blocks for the contentql query crates: the error
//! taxonomy, source positions, property values and the converters that
//! move values between property types.

#![warn(missing_docs)]
#![warn(clippy::all)]

#[allow(missing_docs)]
pub mod error;
#[allow(missing_docs)]
pub mod path;
#[allow(missing_docs)]
pub mod value;

pub use error::{CompileError, ConvertError, Error, ParseError, Position, Result, SemanticError};
pub use path::{Name, Path, Segment, ValueOrder};
pub use value::{
    format_date, parse_date, PropertyType, StandardConverter, TypeConverter, TypeSystem, Value,
};
