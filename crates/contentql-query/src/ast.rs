/// Query Object Model (QOM)
///
/// The typed, immutable tree produced by parsing. Nodes carry no source
/// positions, so two queries that differ only in layout compare equal.
/// `Display` renders canonical query text that parses back to an equal
/// tree.
use crate::fulltext::Term;
use contentql_core::{format_date, PropertyType, Value};
use std::fmt;

/// A parsed query, possibly combining others with set operations
#[derive(Debug, Clone, PartialEq)]
pub enum QueryCommand {
    Query(Query),
    SetQuery(SetQuery),
}

/// A single SELECT
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub source: Source,
    pub constraint: Option<Constraint>,
    pub orderings: Vec<Ordering>,
    /// Empty means all columns (`SELECT *`)
    pub columns: Vec<Column>,
    pub limit: Option<Limit>,
    pub distinct: bool,
}

/// Two queries combined by UNION, INTERSECT or EXCEPT
#[derive(Debug, Clone, PartialEq)]
pub struct SetQuery {
    pub left: Box<QueryCommand>,
    pub operation: SetOperation,
    pub right: Box<QueryCommand>,
    pub all: bool,
}

/// Set operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOperation {
    Union,
    Intersect,
    Except,
}

/// Where candidate rows come from
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Selector(NamedSelector),
    Join(Join),
}

/// A node type, optionally aliased
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedSelector {
    pub node_type: String,
    pub alias: Option<String>,
}

/// A join of two sources
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub left: Box<Source>,
    pub join_type: JoinType,
    pub right: Box<Source>,
    pub condition: JoinCondition,
}

/// Types of joins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    Cross,
}

/// How the rows of two joined sources relate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JoinCondition {
    /// `s1.p1 = s2.p2`
    EquiJoin {
        selector1: String,
        property1: String,
        selector2: String,
        property2: String,
    },
    /// `ISSAMENODE(s1, s2 [, path])`
    SameNode {
        selector1: String,
        selector2: String,
        path: Option<String>,
    },
    /// `ISCHILDNODE(child, parent)`
    ChildNode { parent: String, child: String },
    /// `ISDESCENDANTNODE(descendant, ancestor)`
    DescendantNode { ancestor: String, descendant: String },
}

/// A predicate over candidate rows
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    And(Box<Constraint>, Box<Constraint>),
    Or(Box<Constraint>, Box<Constraint>),
    Not(Box<Constraint>),
    Comparison {
        operand: DynamicOperand,
        operator: Operator,
        value: StaticOperand,
    },
    Between {
        operand: DynamicOperand,
        lower: StaticOperand,
        upper: StaticOperand,
        lower_inclusive: bool,
        upper_inclusive: bool,
    },
    PropertyExistence {
        selector: String,
        property: String,
    },
    /// `operand IN (values...)`
    SetCriteria {
        operand: DynamicOperand,
        values: Vec<StaticOperand>,
    },
    FullTextSearch {
        selector: String,
        /// `None` searches every property of the node
        property: Option<String>,
        expression: StaticOperand,
        /// Parsed form of a literal expression; `None` for bind variables
        /// and for expressions without terms
        term: Option<Term>,
    },
    SameNode {
        selector: String,
        path: String,
    },
    ChildNode {
        selector: String,
        path: String,
    },
    DescendantNode {
        selector: String,
        path: String,
    },
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    EqualTo,
    NotEqualTo,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    Like,
}

/// A value computed per candidate row
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DynamicOperand {
    PropertyValue {
        selector: String,
        property: String,
    },
    /// `None` means any reference-typed property
    ReferenceValue {
        selector: String,
        property: Option<String>,
    },
    Length {
        selector: String,
        property: String,
    },
    NodeName {
        selector: String,
    },
    NodeLocalName {
        selector: String,
    },
    NodePath {
        selector: String,
    },
    NodeDepth {
        selector: String,
    },
    FullTextSearchScore {
        selector: String,
    },
    LowerCase(Box<DynamicOperand>),
    UpperCase(Box<DynamicOperand>),
    Arithmetic {
        left: Box<DynamicOperand>,
        operator: ArithmeticOperator,
        right: Box<DynamicOperand>,
    },
}

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithmeticOperator {
    /// Binding strength; higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            ArithmeticOperator::Add | ArithmeticOperator::Subtract => 1,
            ArithmeticOperator::Multiply | ArithmeticOperator::Divide => 2,
        }
    }

    /// The operator's symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOperator::Add => "+",
            ArithmeticOperator::Subtract => "-",
            ArithmeticOperator::Multiply => "*",
            ArithmeticOperator::Divide => "/",
        }
    }
}

/// A value fixed before evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum StaticOperand {
    Literal(Value),
    BindVariable(String),
    Subquery(Box<QueryCommand>),
}

/// One ORDER BY entry
#[derive(Debug, Clone, PartialEq)]
pub struct Ordering {
    pub operand: DynamicOperand,
    pub order: Order,
    pub null_order: Option<NullOrder>,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Order {
    Ascending,
    Descending,
}

/// Placement of rows without a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullOrder {
    First,
    Last,
}

/// LIMIT clause for result limiting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Limit {
    pub row_count: usize,
    pub offset: usize,
}

/// A column in the SELECT clause
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    pub selector: String,
    /// `None` selects every property of the selector (`s.*`)
    pub property: Option<String>,
    pub alias: Option<String>,
}

impl NamedSelector {
    /// The name other clauses use to refer to this selector.
    pub fn name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.node_type)
    }
}

impl Source {
    /// Names of every selector in this source, left to right.
    pub fn selector_names(&self) -> Vec<&str> {
        match self {
            Source::Selector(selector) => vec![selector.name()],
            Source::Join(join) => {
                let mut names = join.left.selector_names();
                names.extend(join.right.selector_names());
                names
            }
        }
    }
}

impl QueryCommand {
    /// The query's WHERE constraint, for plain queries.
    pub fn constraint(&self) -> Option<&Constraint> {
        match self {
            QueryCommand::Query(query) => query.constraint.as_ref(),
            QueryCommand::SetQuery(_) => None,
        }
    }
}

impl Constraint {
    /// Conjunction of two constraints.
    pub fn and(left: Constraint, right: Constraint) -> Self {
        Constraint::And(Box::new(left), Box::new(right))
    }

    /// Disjunction of two constraints.
    pub fn or(left: Constraint, right: Constraint) -> Self {
        Constraint::Or(Box::new(left), Box::new(right))
    }

    /// Negation of a constraint.
    pub fn not(inner: Constraint) -> Self {
        Constraint::Not(Box::new(inner))
    }

    /// Whether a full-text search appears anywhere in the tree.
    pub fn has_full_text_search(&self) -> bool {
        match self {
            Constraint::FullTextSearch { .. } => true,
            Constraint::And(l, r) | Constraint::Or(l, r) => {
                l.has_full_text_search() || r.has_full_text_search()
            }
            Constraint::Not(inner) => inner.has_full_text_search(),
            _ => false,
        }
    }
}

impl DynamicOperand {
    /// Shorthand for a property value operand.
    pub fn property(selector: impl Into<String>, property: impl Into<String>) -> Self {
        DynamicOperand::PropertyValue {
            selector: selector.into(),
            property: property.into(),
        }
    }

    /// Shorthand for an arithmetic operand.
    pub fn arithmetic(left: DynamicOperand, operator: ArithmeticOperator, right: DynamicOperand) -> Self {
        DynamicOperand::Arithmetic {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }
}

// Display implementations render canonical query text

/// Writes a name in brackets, escaping the closing bracket.
fn write_name(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    write!(f, "[{}]", name.replace(']', "\\]"))
}

fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    write!(f, "'{}'", text.replace('\'', "\\'"))
}

impl fmt::Display for QueryCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryCommand::Query(query) => write!(f, "{}", query),
            QueryCommand::SetQuery(set) => write!(f, "{}", set),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        if self.columns.is_empty() {
            write!(f, "*")?;
        }
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", col)?;
        }
        write!(f, " FROM {}", self.source)?;
        if let Some(ref constraint) = self.constraint {
            write!(f, " WHERE {}", constraint)?;
        }
        if !self.orderings.is_empty() {
            write!(f, " ORDER BY ")?;
            for (i, ordering) in self.orderings.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", ordering)?;
            }
        }
        if let Some(ref limit) = self.limit {
            write!(f, " {}", limit)?;
        }
        Ok(())
    }
}

impl fmt::Display for SetQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.left, self.operation)?;
        if self.all {
            write!(f, " ALL")?;
        }
        write!(f, " {}", self.right)
    }
}

impl fmt::Display for SetOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetOperation::Union => write!(f, "UNION"),
            SetOperation::Intersect => write!(f, "INTERSECT"),
            SetOperation::Except => write!(f, "EXCEPT"),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_name(f, &self.selector)?;
        match self.property {
            Some(ref property) => {
                write!(f, ".")?;
                write_name(f, property)?;
            }
            None => write!(f, ".*")?,
        }
        if let Some(ref alias) = self.alias {
            write!(f, " AS ")?;
            write_name(f, alias)?;
        }
        Ok(())
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Selector(selector) => write!(f, "{}", selector),
            Source::Join(join) => write!(f, "{}", join),
        }
    }
}

impl fmt::Display for NamedSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_name(f, &self.node_type)?;
        if let Some(ref alias) = self.alias {
            write!(f, " AS ")?;
            write_name(f, alias)?;
        }
        Ok(())
    }
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} JOIN {} ON {}",
            self.left, self.join_type, self.right, self.condition
        )
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER"),
            JoinType::LeftOuter => write!(f, "LEFT OUTER"),
            JoinType::RightOuter => write!(f, "RIGHT OUTER"),
            JoinType::FullOuter => write!(f, "FULL OUTER"),
            JoinType::Cross => write!(f, "CROSS"),
        }
    }
}

impl fmt::Display for JoinCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinCondition::EquiJoin {
                selector1,
                property1,
                selector2,
                property2,
            } => {
                write_name(f, selector1)?;
                write!(f, ".")?;
                write_name(f, property1)?;
                write!(f, " = ")?;
                write_name(f, selector2)?;
                write!(f, ".")?;
                write_name(f, property2)
            }
            JoinCondition::SameNode {
                selector1,
                selector2,
                path,
            } => {
                write!(f, "ISSAMENODE(")?;
                write_name(f, selector1)?;
                write!(f, ", ")?;
                write_name(f, selector2)?;
                if let Some(path) = path {
                    write!(f, ", ")?;
                    write_name(f, path)?;
                }
                write!(f, ")")
            }
            JoinCondition::ChildNode { parent, child } => {
                write!(f, "ISCHILDNODE(")?;
                write_name(f, child)?;
                write!(f, ", ")?;
                write_name(f, parent)?;
                write!(f, ")")
            }
            JoinCondition::DescendantNode {
                ancestor,
                descendant,
            } => {
                write!(f, "ISDESCENDANTNODE(")?;
                write_name(f, descendant)?;
                write!(f, ", ")?;
                write_name(f, ancestor)?;
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::And(left, right) => write!(f, "({} AND {})", left, right),
            Constraint::Or(left, right) => write!(f, "({} OR {})", left, right),
            Constraint::Not(inner) => write!(f, "NOT {}", inner),
            Constraint::Comparison {
                operand,
                operator,
                value,
            } => write!(f, "{} {} {}", operand, operator, value),
            Constraint::Between {
                operand,
                lower,
                upper,
                lower_inclusive,
                upper_inclusive,
            } => {
                write!(f, "{} BETWEEN {}", operand, lower)?;
                if !lower_inclusive {
                    write!(f, " EXCLUSIVE")?;
                }
                write!(f, " AND {}", upper)?;
                if !upper_inclusive {
                    write!(f, " EXCLUSIVE")?;
                }
                Ok(())
            }
            Constraint::PropertyExistence { selector, property } => {
                write_name(f, selector)?;
                write!(f, ".")?;
                write_name(f, property)?;
                write!(f, " IS NOT NULL")
            }
            Constraint::SetCriteria { operand, values } => {
                write!(f, "{} IN (", operand)?;
                for (i, val) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", val)?;
                }
                write!(f, ")")
            }
            Constraint::FullTextSearch {
                selector,
                property,
                expression,
                ..
            } => {
                write!(f, "CONTAINS(")?;
                write_name(f, selector)?;
                write!(f, ".")?;
                match property {
                    Some(property) => write_name(f, property)?,
                    None => write!(f, "*")?,
                }
                write!(f, ", {})", expression)
            }
            Constraint::SameNode { selector, path } => {
                write!(f, "ISSAMENODE(")?;
                write_name(f, selector)?;
                write!(f, ", ")?;
                write_name(f, path)?;
                write!(f, ")")
            }
            Constraint::ChildNode { selector, path } => {
                write!(f, "ISCHILDNODE(")?;
                write_name(f, selector)?;
                write!(f, ", ")?;
                write_name(f, path)?;
                write!(f, ")")
            }
            Constraint::DescendantNode { selector, path } => {
                write!(f, "ISDESCENDANTNODE(")?;
                write_name(f, selector)?;
                write!(f, ", ")?;
                write_name(f, path)?;
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::EqualTo => write!(f, "="),
            Operator::NotEqualTo => write!(f, "<>"),
            Operator::LessThan => write!(f, "<"),
            Operator::LessThanOrEqualTo => write!(f, "<="),
            Operator::GreaterThan => write!(f, ">"),
            Operator::GreaterThanOrEqualTo => write!(f, ">="),
            Operator::Like => write!(f, "LIKE"),
        }
    }
}

impl fmt::Display for DynamicOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let function = |f: &mut fmt::Formatter<'_>, name: &str, selector: &str| {
            write!(f, "{}(", name)?;
            write_name(f, selector)?;
            write!(f, ")")
        };
        match self {
            DynamicOperand::PropertyValue { selector, property } => {
                write_name(f, selector)?;
                write!(f, ".")?;
                write_name(f, property)
            }
            DynamicOperand::ReferenceValue { selector, property } => {
                write!(f, "REFERENCE(")?;
                write_name(f, selector)?;
                if let Some(property) = property {
                    write!(f, ".")?;
                    write_name(f, property)?;
                }
                write!(f, ")")
            }
            DynamicOperand::Length { selector, property } => {
                write!(f, "LENGTH(")?;
                write_name(f, selector)?;
                write!(f, ".")?;
                write_name(f, property)?;
                write!(f, ")")
            }
            DynamicOperand::NodeName { selector } => function(f, "NAME", selector),
            DynamicOperand::NodeLocalName { selector } => function(f, "LOCALNAME", selector),
            DynamicOperand::NodePath { selector } => function(f, "PATH", selector),
            DynamicOperand::NodeDepth { selector } => function(f, "DEPTH", selector),
            DynamicOperand::FullTextSearchScore { selector } => function(f, "SCORE", selector),
            DynamicOperand::LowerCase(inner) => write!(f, "LOWER({})", inner),
            DynamicOperand::UpperCase(inner) => write!(f, "UPPER({})", inner),
            DynamicOperand::Arithmetic {
                left,
                operator,
                right,
            } => {
                // Parenthesize only where the tree differs from what
                // precedence and left associativity would build.
                let left_needs = matches!(left.as_ref(),
                    DynamicOperand::Arithmetic { operator: inner, .. }
                        if inner.precedence() < operator.precedence());
                let right_needs = matches!(right.as_ref(),
                    DynamicOperand::Arithmetic { operator: inner, .. }
                        if inner.precedence() <= operator.precedence());
                if left_needs {
                    write!(f, "({})", left)?;
                } else {
                    write!(f, "{}", left)?;
                }
                write!(f, " {} ", operator.symbol())?;
                if right_needs {
                    write!(f, "({})", right)
                } else {
                    write!(f, "{}", right)
                }
            }
        }
    }
}

impl fmt::Display for StaticOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticOperand::Literal(value) => write_literal(f, value),
            StaticOperand::BindVariable(name) => write!(f, "${}", name),
            StaticOperand::Subquery(command) => write!(f, "({})", command),
        }
    }
}

/// Writes a literal so that it parses back to the same value.
fn write_literal(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    let cast = |f: &mut fmt::Formatter<'_>, text: &str, target: PropertyType| {
        write!(f, "CAST(")?;
        write_quoted(f, text)?;
        write!(f, " AS {})", target)
    };
    match value {
        Value::String(s) => write_quoted(f, s),
        Value::Long(v) => write!(f, "{}", v),
        Value::Double(v) if v.is_finite() => {
            let text = format!("{:?}", v);
            // Exponent forms need a fraction part to read back as a double.
            match text.find('e') {
                Some(e) if !text.contains('.') => {
                    write!(f, "{}.0E{}", &text[..e], &text[e + 1..])
                }
                _ => write!(f, "{}", text.replace('e', "E")),
            }
        }
        Value::Double(v) => cast(f, &v.to_string(), PropertyType::Double),
        Value::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
        Value::Date(d) => cast(f, &format_date(d), PropertyType::Date),
        other => cast(f, &other.to_string(), other.property_type()),
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operand, self.order)?;
        match self.null_order {
            Some(NullOrder::First) => write!(f, " NULLS FIRST"),
            Some(NullOrder::Last) => write!(f, " NULLS LAST"),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::Ascending => write!(f, "ASC"),
            Order::Descending => write!(f, "DESC"),
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LIMIT {}", self.row_count)?;
        if self.offset > 0 {
            write!(f, " OFFSET {}", self.offset)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_display_parenthesizes_only_when_needed() {
        let a = DynamicOperand::property("s", "a");
        let b = DynamicOperand::property("s", "b");
        let c = DynamicOperand::property("s", "c");
        let product = DynamicOperand::arithmetic(b.clone(), ArithmeticOperator::Multiply, c.clone());
        let expr = DynamicOperand::arithmetic(a.clone(), ArithmeticOperator::Add, product);
        assert_eq!(expr.to_string(), "[s].[a] + [s].[b] * [s].[c]");

        let sum = DynamicOperand::arithmetic(a, ArithmeticOperator::Add, b);
        let expr = DynamicOperand::arithmetic(sum, ArithmeticOperator::Multiply, c);
        assert_eq!(expr.to_string(), "([s].[a] + [s].[b]) * [s].[c]");
    }

    #[test]
    fn test_literal_display() {
        let show = |v: Value| StaticOperand::Literal(v).to_string();
        assert_eq!(show(Value::String("it's".into())), "'it\\'s'");
        assert_eq!(show(Value::Long(-5)), "-5");
        assert_eq!(show(Value::Double(1.5)), "1.5");
        assert_eq!(show(Value::Double(1e30)), "1.0E30");
        assert_eq!(show(Value::Boolean(true)), "TRUE");
        assert_eq!(
            show(Value::Decimal(rust_decimal::Decimal::new(125, 2))),
            "CAST('1.25' AS DECIMAL)"
        );
    }

    #[test]
    fn test_selector_names() {
        let source = Source::Join(Join {
            left: Box::new(Source::Selector(NamedSelector {
                node_type: "nt:base".to_string(),
                alias: Some("a".to_string()),
            })),
            join_type: JoinType::Inner,
            right: Box::new(Source::Selector(NamedSelector {
                node_type: "nt:file".to_string(),
                alias: None,
            })),
            condition: JoinCondition::ChildNode {
                parent: "a".to_string(),
                child: "nt:file".to_string(),
            },
        });
        assert_eq!(source.selector_names(), vec!["a", "nt:file"]);
    }
}
