/// Index predicate tree
///
/// The primitives an inverted-index backend executes: term, range,
/// wildcard, regex and phrase matches, field existence, and boolean
/// composition with MUST/SHOULD/MUST_NOT clauses. `Display` renders a
/// Lucene-like form for explain output.
use contentql_core::ValueOrder;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Case transform applied to indexed values before they are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseFold {
    #[default]
    Identity,
    Lower,
    Upper,
}

impl CaseFold {
    /// The fold in effect when `self` wraps an operand that applies
    /// `inner`. The outermost transform decides the final case.
    pub fn wrap(self, inner: CaseFold) -> CaseFold {
        match self {
            CaseFold::Identity => inner,
            outer => outer,
        }
    }

    /// Applies the fold to a string.
    pub fn apply(&self, text: &str) -> String {
        match self {
            CaseFold::Identity => text.to_string(),
            CaseFold::Lower => text.to_lowercase(),
            CaseFold::Upper => text.to_uppercase(),
        }
    }
}

/// Ordering operators evaluated by the backend with a custom order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
}

/// How a clause participates in a boolean predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occur {
    Must,
    Should,
    MustNot,
}

/// One clause of a boolean predicate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Clause {
    pub occur: Occur,
    pub predicate: Predicate,
}

/// A predicate the index backend can execute
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    MatchAll,
    MatchNone,
    /// Exact match of one indexed term
    Term {
        field: String,
        value: String,
        fold: CaseFold,
    },
    /// Numeric range over long-encoded values (longs, dates, booleans)
    LongRange {
        field: String,
        lower: i64,
        upper: i64,
        include_lower: bool,
        include_upper: bool,
    },
    DoubleRange {
        field: String,
        lower: f64,
        upper: f64,
        include_lower: bool,
        include_upper: bool,
    },
    /// Lexicographic range; a missing bound is open
    TextRange {
        field: String,
        lower: Option<String>,
        upper: Option<String>,
        include_lower: bool,
        include_upper: bool,
        fold: CaseFold,
    },
    /// `*` matches any run, `?` any single character, `\` escapes
    Wildcard {
        field: String,
        pattern: String,
        fold: CaseFold,
    },
    /// Regular expression that must match the whole indexed value
    Regex {
        field: String,
        pattern: String,
        fold: CaseFold,
    },
    /// Analyzed tokens in order; no tokens is the empty-phrase sentinel
    Phrase {
        field: String,
        terms: Vec<String>,
        slop: u32,
    },
    FieldExists {
        field: String,
    },
    /// Ordering comparison under a structured value order
    Compare {
        field: String,
        op: CompareOp,
        value: String,
        order: ValueOrder,
        fold: CaseFold,
    },
    Boolean {
        clauses: Vec<Clause>,
    },
}

impl Clause {
    pub fn must(predicate: Predicate) -> Self {
        Self {
            occur: Occur::Must,
            predicate,
        }
    }

    pub fn should(predicate: Predicate) -> Self {
        Self {
            occur: Occur::Should,
            predicate,
        }
    }

    pub fn must_not(predicate: Predicate) -> Self {
        Self {
            occur: Occur::MustNot,
            predicate,
        }
    }
}

impl Predicate {
    /// Exact term match without case folding.
    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::Term {
            field: field.into(),
            value: value.into(),
            fold: CaseFold::Identity,
        }
    }

    /// The phrase with no tokens, which matches nothing.
    pub fn empty_phrase(field: impl Into<String>) -> Self {
        Predicate::Phrase {
            field: field.into(),
            terms: Vec::new(),
            slop: 0,
        }
    }

    /// Whether this is the empty-phrase sentinel.
    pub fn is_empty_phrase(&self) -> bool {
        matches!(self, Predicate::Phrase { terms, .. } if terms.is_empty())
    }

    /// Conjunction. Match-all operands drop out and any match-none
    /// operand makes the whole conjunction match nothing.
    pub fn and(predicates: Vec<Predicate>) -> Self {
        if predicates.iter().any(|p| *p == Predicate::MatchNone) {
            return Predicate::MatchNone;
        }
        let mut rest: Vec<Predicate> = predicates
            .into_iter()
            .filter(|p| *p != Predicate::MatchAll)
            .collect();
        match rest.len() {
            0 => Predicate::MatchAll,
            1 => rest.remove(0),
            _ => Predicate::Boolean {
                clauses: rest.into_iter().map(Clause::must).collect(),
            },
        }
    }

    /// Disjunction. Match-none operands drop out and any match-all
    /// operand makes the whole disjunction match everything.
    pub fn or(predicates: Vec<Predicate>) -> Self {
        if predicates.iter().any(|p| *p == Predicate::MatchAll) {
            return Predicate::MatchAll;
        }
        let mut rest: Vec<Predicate> = predicates
            .into_iter()
            .filter(|p| *p != Predicate::MatchNone)
            .collect();
        match rest.len() {
            0 => Predicate::MatchNone,
            1 => rest.remove(0),
            _ => Predicate::Boolean {
                clauses: rest.into_iter().map(Clause::should).collect(),
            },
        }
    }

    /// Negation. The backend returns nothing for a boolean predicate that
    /// has only MUST_NOT clauses, so a match-all clause carries it.
    pub fn not(inner: Predicate) -> Self {
        match inner {
            Predicate::MatchAll => Predicate::MatchNone,
            Predicate::MatchNone => Predicate::MatchAll,
            inner => Predicate::Boolean {
                clauses: vec![Clause::should(Predicate::MatchAll), Clause::must_not(inner)],
            },
        }
    }

    /// Whether every boolean node in the tree has a MUST or SHOULD clause.
    pub fn has_positive_clauses(&self) -> bool {
        match self {
            Predicate::Boolean { clauses } => {
                clauses.iter().any(|c| c.occur != Occur::MustNot)
                    && clauses.iter().all(|c| c.predicate.has_positive_clauses())
            }
            _ => true,
        }
    }
}

/// Writes a string as a quoted term, escaping quotes and backslashes.
fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    write!(f, "\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

fn write_field(f: &mut fmt::Formatter<'_>, field: &str, fold: CaseFold) -> fmt::Result {
    match fold {
        CaseFold::Identity => write!(f, "{}:", field),
        CaseFold::Lower => write!(f, "lower({}):", field),
        CaseFold::Upper => write!(f, "upper({}):", field),
    }
}

fn write_range<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    lower: Option<T>,
    upper: Option<T>,
    include_lower: bool,
    include_upper: bool,
) -> fmt::Result {
    write!(f, "{}", if include_lower { '[' } else { '{' })?;
    match lower {
        Some(v) => write!(f, "{}", v)?,
        None => write!(f, "*")?,
    }
    write!(f, " TO ")?;
    match upper {
        Some(v) => write!(f, "{}", v)?,
        None => write!(f, "*")?,
    }
    write!(f, "{}", if include_upper { ']' } else { '}' })
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::LessThan => write!(f, "<"),
            CompareOp::LessThanOrEqualTo => write!(f, "<="),
            CompareOp::GreaterThan => write!(f, ">"),
            CompareOp::GreaterThanOrEqualTo => write!(f, ">="),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::MatchAll => write!(f, "*:*"),
            Predicate::MatchNone => write!(f, "-*:*"),
            Predicate::Term { field, value, fold } => {
                write_field(f, field, *fold)?;
                write_quoted(f, value)
            }
            Predicate::LongRange {
                field,
                lower,
                upper,
                include_lower,
                include_upper,
            } => {
                write!(f, "{}:", field)?;
                write_range(f, Some(lower), Some(upper), *include_lower, *include_upper)
            }
            Predicate::DoubleRange {
                field,
                lower,
                upper,
                include_lower,
                include_upper,
            } => {
                write!(f, "{}:", field)?;
                write_range(f, Some(lower), Some(upper), *include_lower, *include_upper)
            }
            Predicate::TextRange {
                field,
                lower,
                upper,
                include_lower,
                include_upper,
                fold,
            } => {
                write_field(f, field, *fold)?;
                let quote = |v: &String| format!("\"{}\"", v.replace('"', "\\\""));
                write_range(
                    f,
                    lower.as_ref().map(quote),
                    upper.as_ref().map(quote),
                    *include_lower,
                    *include_upper,
                )
            }
            Predicate::Wildcard {
                field,
                pattern,
                fold,
            } => {
                write_field(f, field, *fold)?;
                write!(f, "{}", pattern)
            }
            Predicate::Regex {
                field,
                pattern,
                fold,
            } => {
                write_field(f, field, *fold)?;
                write!(f, "/{}/", pattern.replace('/', "\\/"))
            }
            Predicate::Phrase { field, terms, slop } => {
                write!(f, "{}:", field)?;
                write_quoted(f, &terms.join(" "))?;
                if *slop > 0 {
                    write!(f, "~{}", slop)?;
                }
                Ok(())
            }
            Predicate::FieldExists { field } => write!(f, "_exists_:{}", field),
            Predicate::Compare {
                field,
                op,
                value,
                order,
                fold,
            } => {
                write_field(f, field, *fold)?;
                write!(f, "{}", op)?;
                write_quoted(f, value)?;
                match order {
                    ValueOrder::Lexical => Ok(()),
                    ValueOrder::Name => write!(f, "@name"),
                    ValueOrder::Path => write!(f, "@path"),
                }
            }
            Predicate::Boolean { clauses } => {
                write!(f, "(")?;
                for (i, clause) in clauses.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    match clause.occur {
                        Occur::Must => write!(f, "+")?,
                        Occur::Should => {}
                        Occur::MustNot => write!(f, "-")?,
                    }
                    write!(f, "{}", clause.predicate)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_keeps_positive_clause() {
        let negated = Predicate::not(Predicate::term("title", "x"));
        assert!(negated.has_positive_clauses());
        assert_eq!(negated.to_string(), "(*:* -title:\"x\")");
    }

    #[test]
    fn test_not_of_constants() {
        assert_eq!(Predicate::not(Predicate::MatchAll), Predicate::MatchNone);
        assert_eq!(Predicate::not(Predicate::MatchNone), Predicate::MatchAll);
    }

    #[test]
    fn test_and_or_simplification() {
        let t = Predicate::term("a", "1");
        assert_eq!(Predicate::and(vec![Predicate::MatchAll, t.clone()]), t);
        assert_eq!(Predicate::and(vec![Predicate::MatchNone, t.clone()]), Predicate::MatchNone);
        assert_eq!(Predicate::or(vec![Predicate::MatchNone, t.clone()]), t);
        assert_eq!(Predicate::or(vec![Predicate::MatchAll, t]), Predicate::MatchAll);
        assert_eq!(Predicate::or(Vec::new()), Predicate::MatchNone);
    }

    #[test]
    fn test_display_ranges() {
        let range = Predicate::LongRange {
            field: "size".to_string(),
            lower: 5,
            upper: i64::MAX,
            include_lower: false,
            include_upper: true,
        };
        assert_eq!(range.to_string(), format!("size:{{5 TO {}]", i64::MAX));

        let range = Predicate::TextRange {
            field: "title".to_string(),
            lower: None,
            upper: Some("m".to_string()),
            include_lower: true,
            include_upper: false,
            fold: CaseFold::Lower,
        };
        assert_eq!(range.to_string(), "lower(title):[* TO \"m\"}");
    }

    #[test]
    fn test_case_fold_wrap() {
        assert_eq!(CaseFold::Identity.wrap(CaseFold::Upper), CaseFold::Upper);
        assert_eq!(CaseFold::Lower.wrap(CaseFold::Upper), CaseFold::Lower);
    }

    #[test]
    fn test_serialize_tagged() {
        let json = serde_json::to_string(&Predicate::term("a", "b")).unwrap();
        assert_eq!(json, r#"{"kind":"term","field":"a","value":"b","fold":"identity"}"#);
    }
}
