//! Property values, property types and the converters between them.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ConvertError;
use crate::path::{Name, Path};

/// Declared type of a property (column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PropertyType {
    String,
    Binary,
    Long,
    Double,
    Date,
    Boolean,
    Name,
    Path,
    Reference,
    WeakReference,
    SimpleReference,
    Uri,
    Decimal,
    Undefined,
}

impl PropertyType {
    /// Every type, in declaration order.
    pub const ALL: [PropertyType; 14] = [
        PropertyType::String,
        PropertyType::Binary,
        PropertyType::Long,
        PropertyType::Double,
        PropertyType::Date,
        PropertyType::Boolean,
        PropertyType::Name,
        PropertyType::Path,
        PropertyType::Reference,
        PropertyType::WeakReference,
        PropertyType::SimpleReference,
        PropertyType::Uri,
        PropertyType::Decimal,
        PropertyType::Undefined,
    ];

    /// Upper-case type name as written in `CAST(... AS NAME)`.
    pub fn name(&self) -> &'static str {
        match self {
            PropertyType::String => "STRING",
            PropertyType::Binary => "BINARY",
            PropertyType::Long => "LONG",
            PropertyType::Double => "DOUBLE",
            PropertyType::Date => "DATE",
            PropertyType::Boolean => "BOOLEAN",
            PropertyType::Name => "NAME",
            PropertyType::Path => "PATH",
            PropertyType::Reference => "REFERENCE",
            PropertyType::WeakReference => "WEAKREFERENCE",
            PropertyType::SimpleReference => "SIMPLEREFERENCE",
            PropertyType::Uri => "URI",
            PropertyType::Decimal => "DECIMAL",
            PropertyType::Undefined => "UNDEFINED",
        }
    }

    /// Looks a type up by name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }

    /// Whether this is one of the three reference types.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            PropertyType::Reference | PropertyType::WeakReference | PropertyType::SimpleReference
        )
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Binary(Vec<u8>),
    Long(i64),
    Double(f64),
    Date(DateTime<FixedOffset>),
    Boolean(bool),
    Name(Name),
    Path(Path),
    Reference(String),
    WeakReference(String),
    SimpleReference(String),
    Uri(String),
    Decimal(Decimal),
}

impl Value {
    /// The property type this value carries.
    pub fn property_type(&self) -> PropertyType {
        match self {
            Value::String(_) => PropertyType::String,
            Value::Binary(_) => PropertyType::Binary,
            Value::Long(_) => PropertyType::Long,
            Value::Double(_) => PropertyType::Double,
            Value::Date(_) => PropertyType::Date,
            Value::Boolean(_) => PropertyType::Boolean,
            Value::Name(_) => PropertyType::Name,
            Value::Path(_) => PropertyType::Path,
            Value::Reference(_) => PropertyType::Reference,
            Value::WeakReference(_) => PropertyType::WeakReference,
            Value::SimpleReference(_) => PropertyType::SimpleReference,
            Value::Uri(_) => PropertyType::Uri,
            Value::Decimal(_) => PropertyType::Decimal,
        }
    }
}

impl fmt::Display for Value {
    /// Writes the canonical string form of the value (unquoted).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s)
            | Value::Reference(s)
            | Value::WeakReference(s)
            | Value::SimpleReference(s)
            | Value::Uri(s) => write!(f, "{}", s),
            Value::Binary(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
            Value::Long(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{:?}", v),
            Value::Date(d) => write!(f, "{}", format_date(d)),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Name(n) => write!(f, "{}", n),
            Value::Path(p) => write!(f, "{}", p),
            Value::Decimal(d) => write!(f, "{}", d),
        }
    }
}

/// Formats a date as `YYYY-MM-DDTHH:MM:SS.fff±HH:MM`.
pub fn format_date(date: &DateTime<FixedOffset>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string()
}

/// Parses the fixed date-time layout
/// `YYYY-MM-DD[THH:MM[:SS[.fff]]][Z|UTC|±HH:MM]`.
///
/// A missing zone means UTC; a date without a time means midnight.
pub fn parse_date(text: &str) -> Result<DateTime<FixedOffset>, ConvertError> {
    let invalid = || ConvertError::CannotConvert {
        value: text.to_string(),
        target: "DATE".to_string(),
    };
    let trimmed = text.trim();

    let (local, offset) = split_zone(trimmed).ok_or_else(invalid)?;
    let naive = match local.split_once(['T', 't']) {
        Some((date, time)) => {
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| invalid())?;
            let time = ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"]
                .iter()
                .find_map(|layout| NaiveTime::parse_from_str(time, layout).ok())
                .ok_or_else(invalid)?;
            NaiveDateTime::new(date, time)
        }
        None => NaiveDate::parse_from_str(local, "%Y-%m-%d")
            .map_err(|_| invalid())?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(invalid)?,
    };

    offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(invalid)
}

/// Splits a trailing zone designator off a date-time string.
fn split_zone(text: &str) -> Option<(&str, FixedOffset)> {
    let utc = FixedOffset::east_opt(0)?;
    let tail = text.len().saturating_sub(3);
    if text.get(tail..).is_some_and(|zone| zone.eq_ignore_ascii_case("UTC")) {
        return Some((text[..tail].trim_end(), utc));
    }
    if let Some(rest) = text.strip_suffix(['Z', 'z']) {
        return Some((rest, utc));
    }
    // A numeric offset can only follow the time part.
    let Some(t) = text.find(['T', 't']) else {
        return Some((text, utc));
    };
    match text[t..].rfind(['+', '-']) {
        Some(rel) => {
            let at = t + rel;
            let zone = &text[at + 1..];
            let (hours, minutes) = zone.split_once(':').unwrap_or((zone, "0"));
            let hours: i32 = hours.parse().ok()?;
            let minutes: i32 = minutes.parse().ok()?;
            let seconds = hours * 3600 + minutes * 60;
            let offset = if text[at..].starts_with('-') {
                FixedOffset::west_opt(seconds)?
            } else {
                FixedOffset::east_opt(seconds)?
            };
            Some((&text[..at], offset))
        }
        None => Some((text, utc)),
    }
}

/// Converts values into one property type.
pub trait TypeConverter: Send + Sync {
    /// The type this converter produces.
    fn property_type(&self) -> PropertyType;

    /// Converts `value`, failing when it has no representation in the type.
    fn convert(&self, value: &Value) -> Result<Value, ConvertError>;
}

/// The built-in converter for a property type.
#[derive(Debug, Clone, Copy)]
pub struct StandardConverter {
    target: PropertyType,
}

impl StandardConverter {
    /// Creates the converter for `target`.
    pub fn new(target: PropertyType) -> Self {
        Self { target }
    }

    fn cannot(&self, value: &Value) -> ConvertError {
        ConvertError::CannotConvert {
            value: value.to_string(),
            target: self.target.name().to_string(),
        }
    }

    fn out_of_range(&self, value: &Value) -> ConvertError {
        ConvertError::OutOfRange {
            value: value.to_string(),
            target: self.target.name().to_string(),
        }
    }

    fn to_long(&self, value: &Value) -> Result<i64, ConvertError> {
        match value {
            Value::Long(v) => Ok(*v),
            Value::Double(v) => double_to_long(*v).ok_or_else(|| self.out_of_range(value)),
            Value::Decimal(d) => d.trunc().to_i64().ok_or_else(|| self.out_of_range(value)),
            Value::Date(d) => Ok(d.timestamp_millis()),
            Value::String(s) => {
                let s = s.trim();
                if let Ok(v) = s.parse::<i64>() {
                    return Ok(v);
                }
                match s.parse::<f64>() {
                    Ok(v) if v.is_finite() => {
                        double_to_long(v).ok_or_else(|| self.out_of_range(value))
                    }
                    _ => Err(self.cannot(value)),
                }
            }
            _ => Err(self.cannot(value)),
        }
    }

    fn to_double(&self, value: &Value) -> Result<f64, ConvertError> {
        match value {
            Value::Long(v) => Ok(*v as f64),
            Value::Double(v) => Ok(*v),
            Value::Decimal(d) => d.to_f64().ok_or_else(|| self.out_of_range(value)),
            Value::Date(d) => Ok(d.timestamp_millis() as f64),
            Value::String(s) => s.trim().parse().map_err(|_| self.cannot(value)),
            _ => Err(self.cannot(value)),
        }
    }

    fn to_decimal(&self, value: &Value) -> Result<Decimal, ConvertError> {
        match value {
            Value::Long(v) => Ok(Decimal::from(*v)),
            Value::Double(v) => {
                if !v.is_finite() {
                    return Err(self.cannot(value));
                }
                Decimal::from_f64(*v).ok_or_else(|| self.out_of_range(value))
            }
            Value::Decimal(d) => Ok(*d),
            Value::Date(d) => Ok(Decimal::from(d.timestamp_millis())),
            Value::String(s) => {
                let s = s.trim();
                Decimal::from_str(s)
                    .or_else(|_| Decimal::from_scientific(s))
                    .map_err(|_| self.cannot(value))
            }
            _ => Err(self.cannot(value)),
        }
    }

    fn to_date(&self, value: &Value) -> Result<DateTime<FixedOffset>, ConvertError> {
        let from_millis = |millis: i64| {
            Utc.timestamp_millis_opt(millis)
                .single()
                .map(|d| d.fixed_offset())
                .ok_or_else(|| self.out_of_range(value))
        };
        match value {
            Value::Date(d) => Ok(*d),
            Value::Long(v) => from_millis(*v),
            Value::Double(v) => from_millis(double_to_long(*v).ok_or_else(|| self.out_of_range(value))?),
            Value::Decimal(d) => from_millis(d.trunc().to_i64().ok_or_else(|| self.out_of_range(value))?),
            Value::String(s) => parse_date(s),
            _ => Err(self.cannot(value)),
        }
    }

    fn to_boolean(&self, value: &Value) -> Result<bool, ConvertError> {
        match value {
            Value::Boolean(b) => Ok(*b),
            Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Ok(true),
            Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Ok(false),
            _ => Err(self.cannot(value)),
        }
    }

    fn to_name(&self, value: &Value) -> Result<Name, ConvertError> {
        match value {
            Value::Name(n) => Ok(n.clone()),
            Value::String(s) | Value::Uri(s) => Name::parse(s),
            Value::Path(p) if !p.absolute && p.segments.len() == 1 && p.segments[0].index == 1 => {
                Ok(p.segments[0].name.clone())
            }
            _ => Err(self.cannot(value)),
        }
    }

    fn to_path(&self, value: &Value) -> Result<Path, ConvertError> {
        match value {
            Value::Path(p) => Ok(p.clone()),
            Value::String(s) | Value::Uri(s) => Path::parse(s),
            Value::Name(n) => Ok(Path {
                absolute: false,
                segments: vec![crate::path::Segment::new(n.clone(), 1)],
            }),
            _ => Err(self.cannot(value)),
        }
    }

    fn to_identifier(&self, value: &Value) -> Result<String, ConvertError> {
        match value {
            Value::String(s)
            | Value::Reference(s)
            | Value::WeakReference(s)
            | Value::SimpleReference(s) => Ok(s.clone()),
            _ => Err(self.cannot(value)),
        }
    }
}

/// Truncates a double to a long, or `None` when it does not fit.
fn double_to_long(v: f64) -> Option<i64> {
    if !v.is_finite() {
        return None;
    }
    let t = v.trunc();
    // i64::MAX is not representable as f64; 2^63 is the first value past it.
    if t < -9_223_372_036_854_775_808.0 || t >= 9_223_372_036_854_775_808.0 {
        return None;
    }
    Some(t as i64)
}

impl TypeConverter for StandardConverter {
    fn property_type(&self) -> PropertyType {
        self.target
    }

    fn convert(&self, value: &Value) -> Result<Value, ConvertError> {
        Ok(match self.target {
            PropertyType::String => Value::String(value.to_string()),
            PropertyType::Binary => match value {
                Value::Binary(b) => Value::Binary(b.clone()),
                other => Value::Binary(other.to_string().into_bytes()),
            },
            PropertyType::Long => Value::Long(self.to_long(value)?),
            PropertyType::Double => Value::Double(self.to_double(value)?),
            PropertyType::Decimal => Value::Decimal(self.to_decimal(value)?),
            PropertyType::Date => Value::Date(self.to_date(value)?),
            PropertyType::Boolean => Value::Boolean(self.to_boolean(value)?),
            PropertyType::Name => Value::Name(self.to_name(value)?),
            PropertyType::Path => Value::Path(self.to_path(value)?),
            PropertyType::Reference => Value::Reference(self.to_identifier(value)?),
            PropertyType::WeakReference => Value::WeakReference(self.to_identifier(value)?),
            PropertyType::SimpleReference => Value::SimpleReference(self.to_identifier(value)?),
            PropertyType::Uri => match value {
                Value::Uri(s) | Value::String(s) => Value::Uri(s.clone()),
                Value::Name(n) => Value::Uri(n.to_string()),
                Value::Path(p) => Value::Uri(p.to_string()),
                other => return Err(self.cannot(other)),
            },
            PropertyType::Undefined => value.clone(),
        })
    }
}

/// The set of converters available to the parser and compiler.
///
/// Parsers consult it for `CAST` targets and to decide whether the
/// `TRUE`/`FALSE` keywords are literals at all.
#[derive(Clone)]
pub struct TypeSystem {
    converters: HashMap<String, Arc<dyn TypeConverter>>,
}

impl TypeSystem {
    /// A type system with no converters.
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// A type system with a [`StandardConverter`] for every property type.
    pub fn standard() -> Self {
        PropertyType::ALL
            .iter()
            .fold(Self::empty(), |ts, t| ts.with_converter(Arc::new(StandardConverter::new(*t))))
    }

    /// Registers (or replaces) the converter for its type.
    pub fn with_converter(mut self, converter: Arc<dyn TypeConverter>) -> Self {
        self.converters
            .insert(converter.property_type().name().to_string(), converter);
        self
    }

    /// Removes the converter for `property_type`.
    pub fn without(mut self, property_type: PropertyType) -> Self {
        self.converters.remove(property_type.name());
        self
    }

    /// Looks up a converter by type name, ignoring case.
    pub fn converter(&self, type_name: &str) -> Option<&dyn TypeConverter> {
        self.converters
            .get(&type_name.to_ascii_uppercase())
            .map(|c| c.as_ref())
    }

    /// Looks up the converter for a property type.
    pub fn converter_for(&self, property_type: PropertyType) -> Option<&dyn TypeConverter> {
        self.converter(property_type.name())
    }

    /// Whether boolean literals are available.
    pub fn has_boolean(&self) -> bool {
        self.converters.contains_key(PropertyType::Boolean.name())
    }
}

impl Default for TypeSystem {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for TypeSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.converters.keys().collect();
        names.sort();
        f.debug_struct("TypeSystem").field("types", &names).finish()
    }
}
