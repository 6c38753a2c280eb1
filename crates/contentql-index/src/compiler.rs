/// Query compiler
///
/// Translates a QOM constraint into an index predicate, given the declared
/// type of every column it touches and the values of its bind variables.
/// Compilation is a pure function of its inputs: nothing is cached between
/// calls and identical inputs yield identical predicates.
use crate::analyzer::{Analyzer, StandardAnalyzer};
use crate::fields::{self, ColumnTypes};
use crate::predicate::{CaseFold, Clause, CompareOp, Predicate};
use contentql_core::{
    CompileError, ConvertError, Path, PropertyType, StandardConverter, TypeConverter, TypeSystem,
    Value, ValueOrder,
};
use contentql_query::{
    Constraint, DynamicOperand, FullTextParser, Operator, SimpleTerm, StaticOperand, Term,
};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

type Result<T> = std::result::Result<T, CompileError>;

/// Shape of the index the predicate will run against
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexFlavor {
    /// Holds one column; a node is indexed only when it has that column
    SingleColumn { column: String },
    /// Holds several columns per node
    #[default]
    MultiColumn,
    /// Holds analyzed text
    FullText,
}

/// Compiler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub flavor: IndexFlavor,
    /// Whether `REFERENCE()` without a property searches REFERENCE columns
    pub include_references: bool,
    /// ... WEAKREFERENCE columns
    pub include_weak_references: bool,
    /// ... SIMPLEREFERENCE columns
    pub include_simple_references: bool,
    /// Compile every wildcard LIKE to a case-insensitive regex
    pub case_insensitive_like: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            flavor: IndexFlavor::default(),
            include_references: true,
            include_weak_references: true,
            include_simple_references: true,
            case_insensitive_like: false,
        }
    }
}

impl CompileOptions {
    pub fn with_flavor(mut self, flavor: IndexFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    pub fn with_references(mut self, strong: bool, weak: bool, simple: bool) -> Self {
        self.include_references = strong;
        self.include_weak_references = weak;
        self.include_simple_references = simple;
        self
    }

    pub fn with_case_insensitive_like(mut self, enabled: bool) -> Self {
        self.case_insensitive_like = enabled;
        self
    }

    fn reference_types(&self) -> Vec<PropertyType> {
        [
            (self.include_references, PropertyType::Reference),
            (self.include_weak_references, PropertyType::WeakReference),
            (self.include_simple_references, PropertyType::SimpleReference),
        ]
        .into_iter()
        .filter_map(|(include, t)| include.then_some(t))
        .collect()
    }
}

/// Value supplied for a bind variable
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Single(Value),
    /// Values for an IN list
    List(Vec<Value>),
    /// Placeholder for a subquery whose results are not yet known
    Pending,
}

/// Bind variable values by name (without the `$`).
pub type BindVariables = HashMap<String, BindValue>;

/// Result of compiling a constraint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub predicate: Predicate,
    /// Whether the backend should report relevance scores
    pub include_scores: bool,
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.predicate)?;
        if self.include_scores {
            write!(f, " [scored]")?;
        }
        Ok(())
    }
}

/// Compiles constraints into index predicates
#[derive(Debug, Clone)]
pub struct QueryCompiler {
    options: CompileOptions,
    type_system: TypeSystem,
    analyzer: Arc<dyn Analyzer>,
}

impl QueryCompiler {
    /// Create a compiler with the standard converters and analyzer
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            type_system: TypeSystem::standard(),
            analyzer: Arc::new(StandardAnalyzer),
        }
    }

    /// Use `type_system` to convert operands to column types
    pub fn with_type_system(mut self, type_system: TypeSystem) -> Self {
        self.type_system = type_system;
        self
    }

    /// Use `analyzer` for phrases and wildcard terms
    pub fn with_analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile a constraint
    pub fn compile(
        &self,
        constraint: &Constraint,
        binds: &BindVariables,
        types: &ColumnTypes,
    ) -> Result<CompiledQuery> {
        debug!(flavor = ?self.options.flavor, columns = types.len(), "compiling constraint");
        let compilation = Compilation {
            compiler: self,
            binds,
            types,
        };
        let predicate = compilation.constraint(constraint)?;
        let include_scores = constraint.has_full_text_search();
        debug!(include_scores, "compiled constraint");
        Ok(CompiledQuery {
            predicate,
            include_scores,
        })
    }

    fn convert(&self, value: &Value, target: PropertyType) -> std::result::Result<Value, ConvertError> {
        match self.type_system.converter_for(target) {
            Some(converter) => converter.convert(value),
            None => StandardConverter::new(target).convert(value),
        }
    }
}

impl Default for QueryCompiler {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}

/// Comparison operators other than LIKE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cmp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Cmp {
    fn from_operator(operator: Operator) -> Option<Cmp> {
        match operator {
            Operator::EqualTo => Some(Cmp::Eq),
            Operator::NotEqualTo => Some(Cmp::Ne),
            Operator::LessThan => Some(Cmp::Lt),
            Operator::LessThanOrEqualTo => Some(Cmp::Le),
            Operator::GreaterThan => Some(Cmp::Gt),
            Operator::GreaterThanOrEqualTo => Some(Cmp::Ge),
            Operator::Like => None,
        }
    }

    fn compare_op(self) -> Option<CompareOp> {
        match self {
            Cmp::Lt => Some(CompareOp::LessThan),
            Cmp::Le => Some(CompareOp::LessThanOrEqualTo),
            Cmp::Gt => Some(CompareOp::GreaterThan),
            Cmp::Ge => Some(CompareOp::GreaterThanOrEqualTo),
            Cmp::Eq | Cmp::Ne => None,
        }
    }
}

/// An indexed field an operand reads, and the case transform applied to
/// its values.
#[derive(Debug, Clone)]
struct Target {
    field: String,
    property_type: PropertyType,
    fold: CaseFold,
}

/// One LIKE pattern element.
enum LikePiece {
    AnyRun,
    AnyChar,
    Literal(char),
}

/// State of a single `compile` call.
struct Compilation<'a> {
    compiler: &'a QueryCompiler,
    binds: &'a BindVariables,
    types: &'a ColumnTypes,
}

impl Compilation<'_> {
    fn options(&self) -> &CompileOptions {
        &self.compiler.options
    }

    fn constraint(&self, constraint: &Constraint) -> Result<Predicate> {
        match constraint {
            Constraint::And(left, right) => Ok(Predicate::and(vec![
                self.constraint(left)?,
                self.constraint(right)?,
            ])),
            Constraint::Or(left, right) => Ok(Predicate::or(vec![
                self.constraint(left)?,
                self.constraint(right)?,
            ])),
            Constraint::Not(inner) => Ok(Predicate::not(self.constraint(inner)?)),
            Constraint::Comparison {
                operand,
                operator,
                value,
            } => {
                let value = self.single_value(value)?;
                self.comparison(operand, *operator, &value)
            }
            Constraint::Between {
                operand,
                lower,
                upper,
                lower_inclusive,
                upper_inclusive,
            } => self.between(operand, lower, upper, *lower_inclusive, *upper_inclusive),
            Constraint::PropertyExistence { property, .. } => Ok(match self.options().flavor {
                IndexFlavor::SingleColumn { .. } => Predicate::MatchAll,
                IndexFlavor::MultiColumn | IndexFlavor::FullText => Predicate::FieldExists {
                    field: property.clone(),
                },
            }),
            Constraint::SetCriteria { operand, values } => self.set_criteria(operand, values),
            Constraint::FullTextSearch {
                property,
                expression,
                term,
                ..
            } => self.full_text_search(property.as_deref(), expression, term.as_ref()),
            Constraint::SameNode { path, .. } => Ok(Predicate::term(fields::PATH, canonical_path(path)?)),
            Constraint::ChildNode { path, .. } => Ok(Predicate::term(fields::PARENT, canonical_path(path)?)),
            Constraint::DescendantNode { path, .. } => {
                let path = canonical_path(path)?;
                let prefix = if path == "/" { "" } else { path.as_str() };
                Ok(Predicate::Wildcard {
                    field: fields::PATH.to_string(),
                    pattern: format!("{}/*", escape_wildcard(prefix)),
                    fold: CaseFold::Identity,
                })
            }
        }
    }

    /// The one value a static operand stands for.
    fn single_value(&self, operand: &StaticOperand) -> Result<Value> {
        match operand {
            StaticOperand::Literal(value) => Ok(value.clone()),
            StaticOperand::BindVariable(name) => match self.binds.get(name) {
                Some(BindValue::Single(value)) => Ok(value.clone()),
                Some(BindValue::List(values)) if values.len() == 1 => Ok(values[0].clone()),
                Some(BindValue::List(_)) => Err(CompileError::UnsupportedOperand(format!(
                    "list bound to ${} outside an IN clause",
                    name
                ))),
                Some(BindValue::Pending) => Err(CompileError::UnresolvedSubquery),
                None => Err(CompileError::MissingBindVariable(name.clone())),
            },
            StaticOperand::Subquery(_) => Err(CompileError::UnresolvedSubquery),
        }
    }

    /// Fields read by `operand`, with the fold that wraps it.
    fn targets(&self, operand: &DynamicOperand, fold: CaseFold) -> Result<Vec<Target>> {
        let target = |field: &str, property_type: PropertyType, fold: CaseFold| Target {
            field: field.to_string(),
            property_type,
            fold,
        };
        Ok(match operand {
            DynamicOperand::PropertyValue { property, .. }
            | DynamicOperand::ReferenceValue {
                property: Some(property),
                ..
            } => vec![target(property, self.types.require(property)?, fold)],
            DynamicOperand::ReferenceValue { property: None, .. } => self
                .types
                .columns_of(&self.options().reference_types())
                .into_iter()
                .map(|(column, t)| target(column, t, fold))
                .collect(),
            DynamicOperand::Length { property, .. } => {
                vec![target(&fields::length(property), PropertyType::Long, CaseFold::Identity)]
            }
            DynamicOperand::NodeName { .. } => vec![target(fields::NAME, PropertyType::Name, fold)],
            DynamicOperand::NodeLocalName { .. } => {
                vec![target(fields::LOCAL_NAME, PropertyType::String, fold)]
            }
            DynamicOperand::NodePath { .. } => vec![target(fields::PATH, PropertyType::Path, fold)],
            DynamicOperand::NodeDepth { .. } => {
                vec![target(fields::DEPTH, PropertyType::Long, CaseFold::Identity)]
            }
            DynamicOperand::LowerCase(inner) => self.targets(inner, fold.wrap(CaseFold::Lower))?,
            DynamicOperand::UpperCase(inner) => self.targets(inner, fold.wrap(CaseFold::Upper))?,
            DynamicOperand::FullTextSearchScore { .. } | DynamicOperand::Arithmetic { .. } => {
                return Err(CompileError::UnsupportedOperand(operand.to_string()))
            }
        })
    }

    fn comparison(&self, operand: &DynamicOperand, operator: Operator, value: &Value) -> Result<Predicate> {
        let predicates = self
            .targets(operand, CaseFold::Identity)?
            .iter()
            .map(|target| self.typed(target, operator, value))
            .collect::<Result<Vec<_>>>()?;
        Ok(Predicate::or(predicates))
    }

    /// Compiles `field op value` for the field's declared type.
    fn typed(&self, target: &Target, operator: Operator, value: &Value) -> Result<Predicate> {
        let cmp = Cmp::from_operator(operator);
        match target.property_type {
            PropertyType::Long | PropertyType::Double | PropertyType::Date | PropertyType::Boolean => {
                let cmp = cmp.ok_or_else(|| unsupported(operator, target))?;
                self.numeric(target, cmp, value)
            }
            PropertyType::Decimal => {
                let cmp = cmp.ok_or_else(|| unsupported(operator, target))?;
                match self.convert(target, value)? {
                    Some(Value::Decimal(d)) => {
                        Ok(text_comparison(&target.field, cmp, encode_decimal(d), CaseFold::Identity))
                    }
                    Some(other) => Err(cannot_convert(&other, target)),
                    None => Ok(out_of_range(cmp, target)),
                }
            }
            PropertyType::Name => match cmp {
                None => self.like(&target.field, &string_of(value), target.fold),
                Some(cmp) => match self.convert(target, value)? {
                    Some(Value::Name(name)) => Ok(structured(target, cmp, name.to_string(), ValueOrder::Name)),
                    Some(other) => Err(cannot_convert(&other, target)),
                    None => Ok(out_of_range(cmp, target)),
                },
            },
            PropertyType::Path => match cmp {
                None => self.path_like(&target.field, &string_of(value), target.fold),
                Some(cmp) => match self.convert(target, value)? {
                    Some(Value::Path(path)) => Ok(structured(target, cmp, path.to_string(), ValueOrder::Path)),
                    Some(other) => Err(cannot_convert(&other, target)),
                    None => Ok(out_of_range(cmp, target)),
                },
            },
            PropertyType::String
            | PropertyType::Binary
            | PropertyType::Uri
            | PropertyType::Reference
            | PropertyType::WeakReference
            | PropertyType::SimpleReference
            | PropertyType::Undefined => {
                let text = string_of(value);
                match cmp {
                    Some(cmp) => Ok(text_comparison(&target.field, cmp, text, target.fold)),
                    None => self.like(&target.field, &text, target.fold),
                }
            }
        }
    }

    /// Converts to the target's type; `None` when the value is out of the
    /// type's range.
    fn convert(&self, target: &Target, value: &Value) -> Result<Option<Value>> {
        match self.compiler.convert(value, target.property_type) {
            Ok(converted) => Ok(Some(converted)),
            Err(ConvertError::OutOfRange { .. }) => {
                trace!(field = %target.field, %value, "operand out of range");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn numeric(&self, target: &Target, cmp: Cmp, value: &Value) -> Result<Predicate> {
        let field = target.field.as_str();
        let Some(converted) = self.convert(target, value)? else {
            return Ok(out_of_range(cmp, target));
        };
        Ok(match converted {
            Value::Long(v) => long_range(field, cmp, v, i64::MIN, i64::MAX),
            Value::Date(d) => long_range(field, cmp, d.timestamp_millis(), i64::MIN, i64::MAX),
            Value::Double(v) => double_range(field, cmp, v),
            Value::Boolean(b) => match (cmp, b) {
                (Cmp::Gt, true) | (Cmp::Lt, false) => Predicate::MatchNone,
                _ => long_range(field, cmp, i64::from(b), 0, 1),
            },
            other => return Err(cannot_convert(&other, target)),
        })
    }

    fn between(
        &self,
        operand: &DynamicOperand,
        lower: &StaticOperand,
        upper: &StaticOperand,
        lower_inclusive: bool,
        upper_inclusive: bool,
    ) -> Result<Predicate> {
        let lower = self.single_value(lower)?;
        let upper = self.single_value(upper)?;
        let predicates = self
            .targets(operand, CaseFold::Identity)?
            .iter()
            .map(|target| self.between_target(target, &lower, &upper, lower_inclusive, upper_inclusive))
            .collect::<Result<Vec<_>>>()?;
        Ok(Predicate::or(predicates))
    }

    fn between_target(
        &self,
        target: &Target,
        lower: &Value,
        upper: &Value,
        include_lower: bool,
        include_upper: bool,
    ) -> Result<Predicate> {
        if matches!(
            target.property_type,
            PropertyType::Long | PropertyType::Double | PropertyType::Date
        ) {
            let bounds = (
                self.compiler.convert(lower, target.property_type),
                self.compiler.convert(upper, target.property_type),
            );
            let field = target.field.clone();
            match bounds {
                (Ok(Value::Long(lower)), Ok(Value::Long(upper))) => {
                    return Ok(Predicate::LongRange {
                        field,
                        lower,
                        upper,
                        include_lower,
                        include_upper,
                    })
                }
                (Ok(Value::Date(lower)), Ok(Value::Date(upper))) => {
                    return Ok(Predicate::LongRange {
                        field,
                        lower: lower.timestamp_millis(),
                        upper: upper.timestamp_millis(),
                        include_lower,
                        include_upper,
                    })
                }
                (Ok(Value::Double(lower)), Ok(Value::Double(upper))) => {
                    return Ok(Predicate::DoubleRange {
                        field,
                        lower,
                        upper,
                        include_lower,
                        include_upper,
                    })
                }
                _ => {}
            }
        }

        let lower_op = if include_lower {
            Operator::GreaterThanOrEqualTo
        } else {
            Operator::GreaterThan
        };
        let upper_op = if include_upper {
            Operator::LessThanOrEqualTo
        } else {
            Operator::LessThan
        };
        Ok(Predicate::and(vec![
            self.typed(target, lower_op, lower)?,
            self.typed(target, upper_op, upper)?,
        ]))
    }

    fn set_criteria(&self, operand: &DynamicOperand, values: &[StaticOperand]) -> Result<Predicate> {
        if let [StaticOperand::Literal(value)] = values {
            return self.comparison(operand, Operator::EqualTo, value);
        }

        let mut resolved = Vec::new();
        for value in values {
            match value {
                StaticOperand::Literal(v) => resolved.push(v.clone()),
                StaticOperand::BindVariable(name) => match self.binds.get(name) {
                    Some(BindValue::Single(v)) => resolved.push(v.clone()),
                    Some(BindValue::List(vs)) => resolved.extend(vs.iter().cloned()),
                    Some(BindValue::Pending) => {
                        warn!(variable = %name, "IN criteria bound to an unresolved subquery, matching all");
                        return Ok(Predicate::MatchAll);
                    }
                    None => return Err(CompileError::MissingBindVariable(name.clone())),
                },
                StaticOperand::Subquery(_) => {
                    warn!("IN criteria over an unresolved subquery, matching all");
                    return Ok(Predicate::MatchAll);
                }
            }
        }
        if resolved.is_empty() {
            return Err(CompileError::MalformedSetCriteria(format!(
                "{} IN () has no values",
                operand
            )));
        }

        let predicates = resolved
            .iter()
            .map(|value| self.comparison(operand, Operator::EqualTo, value))
            .collect::<Result<Vec<_>>>()?;
        Ok(Predicate::or(predicates))
    }

    /// `LIKE` over string-like values.
    fn like(&self, field: &str, pattern: &str, fold: CaseFold) -> Result<Predicate> {
        if !pattern.contains(['%', '_', '\\']) {
            trace!(field, pattern, "LIKE without wildcards compiled as equality");
            return Ok(text_comparison(field, Cmp::Eq, pattern.to_string(), fold));
        }

        let pieces = like_pieces(pattern);
        let leading_wildcard = matches!(pieces.first(), Some(LikePiece::AnyRun | LikePiece::AnyChar));
        let case_insensitive = self.options().case_insensitive_like;
        if !leading_wildcard && !case_insensitive {
            let mut wildcard = String::with_capacity(pattern.len());
            for piece in &pieces {
                match piece {
                    LikePiece::AnyRun => wildcard.push('*'),
                    LikePiece::AnyChar => wildcard.push('?'),
                    LikePiece::Literal(c) => wildcard.push_str(&escape_wildcard(&c.to_string())),
                }
            }
            return Ok(Predicate::Wildcard {
                field: field.to_string(),
                pattern: wildcard,
                fold,
            });
        }

        let body = regex_body(&pieces);
        let pattern = if case_insensitive {
            format!("(?i){}", body)
        } else {
            body
        };
        regex_predicate(field, pattern, fold)
    }

    /// `LIKE` over paths. The index omits `[1]`, so it is stripped from the
    /// pattern, and `[%]` matches any or no same-name-sibling index.
    fn path_like(&self, field: &str, pattern: &str, fold: CaseFold) -> Result<Predicate> {
        let stripped = pattern.replace("[1]", "");
        if !stripped.contains(['%', '_', '\\']) {
            let canonical = Path::parse(&stripped)
                .map(|p| p.to_string())
                .unwrap_or(stripped);
            return Ok(Predicate::Term {
                field: field.to_string(),
                value: canonical,
                fold,
            });
        }

        let body = stripped
            .split("[%]")
            .map(|part| regex_body(&like_pieces(part)))
            .collect::<Vec<_>>()
            .join(r"(\[\d+\])?");
        regex_predicate(field, body, fold)
    }

    fn full_text_search(
        &self,
        property: Option<&str>,
        expression: &StaticOperand,
        term: Option<&Term>,
    ) -> Result<Predicate> {
        let field = fields::full_text(property);
        let parsed = match (term, expression) {
            (Some(term), _) => Some(term.clone()),
            (None, StaticOperand::Subquery(_)) => return Err(CompileError::UnresolvedSubquery),
            (None, expression) => {
                let text = string_of(&self.single_value(expression)?);
                FullTextParser::new().parse(&text)?
            }
        };
        match parsed {
            Some(term) => self.term(&field, &term),
            None => Ok(Predicate::empty_phrase(field)),
        }
    }

    fn term(&self, field: &str, term: &Term) -> Result<Predicate> {
        match term {
            Term::Simple(simple) => self.simple_term(field, simple),
            Term::Conjunction(terms) => {
                let mut clauses = Vec::with_capacity(terms.len());
                let mut positive = false;
                for term in terms {
                    match term {
                        Term::Negation(inner) => {
                            let predicate = self.term(field, inner)?;
                            if !predicate.is_empty_phrase() {
                                clauses.push(Clause::must_not(predicate));
                            }
                        }
                        other => {
                            let predicate = self.term(field, other)?;
                            if !predicate.is_empty_phrase() {
                                positive = true;
                                clauses.push(Clause::must(predicate));
                            }
                        }
                    }
                }
                if !positive {
                    trace!(field, "conjunction has no positive terms, adding match-all");
                    clauses.insert(0, Clause::must(Predicate::MatchAll));
                }
                Ok(Predicate::Boolean { clauses })
            }
            Term::Disjunction(terms) => {
                let mut clauses = Vec::with_capacity(terms.len());
                for term in terms {
                    // The backend has no should-not clause.
                    if matches!(term, Term::Negation(_)) {
                        continue;
                    }
                    clauses.push(Clause::should(self.term(field, term)?));
                }
                if clauses.is_empty() {
                    trace!(field, "disjunction has only negated terms, matching all");
                    return Ok(Predicate::MatchAll);
                }
                Ok(Predicate::Boolean { clauses })
            }
            Term::Negation(inner) => {
                let predicate = self.term(field, inner)?;
                if predicate.is_empty_phrase() {
                    return Ok(Predicate::MatchAll);
                }
                Ok(Predicate::Boolean {
                    clauses: vec![Clause::must(Predicate::MatchAll), Clause::must_not(predicate)],
                })
            }
        }
    }

    fn simple_term(&self, field: &str, simple: &SimpleTerm) -> Result<Predicate> {
        let analyzer = &self.compiler.analyzer;
        if !simple.contains_wildcards() || simple.is_quoted_phrase() {
            return Ok(Predicate::Phrase {
                field: field.to_string(),
                terms: analyzer.tokens(&simple.value),
                slop: 0,
            });
        }

        // Pieces follow the analyzer's token boundaries; all must match.
        let pieces = analyzer
            .pattern_pieces(&simple.value, &['*', '?', '%', '_'])
            .iter()
            .map(|piece| self.pattern_piece(field, piece))
            .collect::<Result<Vec<_>>>()?;
        Ok(match pieces.len() {
            0 => Predicate::empty_phrase(field),
            _ => Predicate::and(pieces),
        })
    }

    fn pattern_piece(&self, field: &str, piece: &str) -> Result<Predicate> {
        let pattern: String = piece
            .chars()
            .map(|c| match c {
                '%' => '*',
                '_' => '?',
                c => c,
            })
            .collect();
        if !pattern.contains(['*', '?']) {
            return Ok(Predicate::Phrase {
                field: field.to_string(),
                terms: vec![pattern],
                slop: 0,
            });
        }
        if !pattern.starts_with(['*', '?']) {
            return Ok(Predicate::Wildcard {
                field: field.to_string(),
                pattern,
                fold: CaseFold::Identity,
            });
        }

        let mut body = String::with_capacity(pattern.len() * 2);
        for c in pattern.chars() {
            match c {
                '*' => body.push_str(".*"),
                '?' => body.push('.'),
                c => body.push_str(&regex::escape(&c.to_string())),
            }
        }
        regex_predicate(field, body, CaseFold::Identity)
    }
}

fn unsupported(operator: Operator, target: &Target) -> CompileError {
    CompileError::UnsupportedOperator {
        operator: operator.to_string(),
        property_type: target.property_type.to_string(),
        column: target.field.clone(),
    }
}

fn cannot_convert(value: &Value, target: &Target) -> CompileError {
    ConvertError::CannotConvert {
        value: value.to_string(),
        target: target.property_type.to_string(),
    }
    .into()
}

/// An operand outside the column type's range equals no indexed value.
fn out_of_range(cmp: Cmp, target: &Target) -> Predicate {
    trace!(field = %target.field, ?cmp, "short-circuiting out-of-range operand");
    match cmp {
        Cmp::Ne => Predicate::MatchAll,
        _ => Predicate::MatchNone,
    }
}

fn string_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn canonical_path(text: &str) -> Result<String> {
    Ok(Path::parse(text)?.to_string())
}

fn escape_wildcard(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '?' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn like_pieces(pattern: &str) -> Vec<LikePiece> {
    let mut pieces = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        pieces.push(match c {
            '%' => LikePiece::AnyRun,
            '_' => LikePiece::AnyChar,
            '\\' => LikePiece::Literal(chars.next().unwrap_or('\\')),
            c => LikePiece::Literal(c),
        });
    }
    pieces
}

fn regex_body(pieces: &[LikePiece]) -> String {
    let mut body = String::new();
    for piece in pieces {
        match piece {
            LikePiece::AnyRun => body.push_str(".*"),
            LikePiece::AnyChar => body.push('.'),
            LikePiece::Literal(c) => body.push_str(&regex::escape(&c.to_string())),
        }
    }
    body
}

/// A regex predicate, rejecting patterns the backend could not compile.
fn regex_predicate(field: &str, pattern: String, fold: CaseFold) -> Result<Predicate> {
    Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| CompileError::InvalidPattern {
        pattern: pattern.clone(),
        message: e.to_string(),
    })?;
    Ok(Predicate::Regex {
        field: field.to_string(),
        pattern,
        fold,
    })
}

fn text_comparison(field: &str, cmp: Cmp, text: String, fold: CaseFold) -> Predicate {
    let range = |lower: Option<String>, upper: Option<String>, include_lower, include_upper| Predicate::TextRange {
        field: field.to_string(),
        lower,
        upper,
        include_lower,
        include_upper,
        fold,
    };
    match cmp {
        Cmp::Eq => Predicate::Term {
            field: field.to_string(),
            value: text,
            fold,
        },
        Cmp::Ne => Predicate::not(text_comparison(field, Cmp::Eq, text, fold)),
        Cmp::Lt => range(None, Some(text), true, false),
        Cmp::Le => range(None, Some(text), true, true),
        Cmp::Gt => range(Some(text), None, false, true),
        Cmp::Ge => range(Some(text), None, true, true),
    }
}

/// Equality on the canonical form, ordering under `order`.
fn structured(target: &Target, cmp: Cmp, canonical: String, order: ValueOrder) -> Predicate {
    match cmp.compare_op() {
        Some(op) => Predicate::Compare {
            field: target.field.clone(),
            op,
            value: canonical,
            order,
            fold: target.fold,
        },
        None => text_comparison(&target.field, cmp, canonical, target.fold),
    }
}

fn long_range(field: &str, cmp: Cmp, value: i64, min: i64, max: i64) -> Predicate {
    let range = |lower, upper, include_lower, include_upper| Predicate::LongRange {
        field: field.to_string(),
        lower,
        upper,
        include_lower,
        include_upper,
    };
    match cmp {
        Cmp::Eq => range(value, value, true, true),
        Cmp::Ne => Predicate::not(range(value, value, true, true)),
        Cmp::Lt => range(min, value, true, false),
        Cmp::Le => range(min, value, true, true),
        Cmp::Gt => range(value, max, false, true),
        Cmp::Ge => range(value, max, true, true),
    }
}

fn double_range(field: &str, cmp: Cmp, value: f64) -> Predicate {
    let range = |lower, upper, include_lower, include_upper| Predicate::DoubleRange {
        field: field.to_string(),
        lower,
        upper,
        include_lower,
        include_upper,
    };
    match cmp {
        Cmp::Eq => range(value, value, true, true),
        Cmp::Ne => Predicate::not(range(value, value, true, true)),
        Cmp::Lt => range(f64::MIN, value, true, false),
        Cmp::Le => range(f64::MIN, value, true, true),
        Cmp::Gt => range(value, f64::MAX, false, true),
        Cmp::Ge => range(value, f64::MAX, true, true),
    }
}

/// Encodes a decimal as a string whose byte order matches numeric order.
///
/// Layout: a sign class (`1` negative, `2` zero, `3` positive), a three
/// digit biased exponent, then the significant digits. Negative values
/// complement the exponent and the digits and end with `~` so that a
/// shorter magnitude sorts after a longer one sharing its prefix.
pub fn encode_decimal(value: Decimal) -> String {
    if value.is_zero() {
        return "2".to_string();
    }
    let text = value.abs().normalize().to_string();
    let (integral, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let (exponent, digits) = if integral != "0" {
        let digits = format!("{}{}", integral, fraction);
        (integral.len() as i32, digits.trim_end_matches('0').to_string())
    } else {
        let zeros = fraction.len() - fraction.trim_start_matches('0').len();
        (-(zeros as i32), fraction.trim_start_matches('0').to_string())
    };

    let biased = exponent + 500;
    if value.is_sign_positive() {
        format!("3{:03}{}", biased, digits)
    } else {
        let complement: String = digits
            .chars()
            .map(|d| char::from(b'9' - (d as u8 - b'0')))
            .collect();
        format!("1{:03}{}~", 999 - biased, complement)
    }
}
