/// Parser for the SQL-like query language
///
/// Recursive descent over a [`TokenStream`]. Each parse call builds its
/// own stream, so a single `SqlParser` can be shared across threads.
///
/// Constraint precedence, loosest first: `OR`, `AND`, `NOT`, a
/// parenthesized constraint, then a primary constraint. A constraint that
/// starts with `(` is always read as a grouped constraint.
use crate::ast::*;
use crate::fulltext::FullTextParser;
use crate::lexer::{unquote, Token, TokenKind, TokenStream};
use contentql_core::{parse_date, ParseError, Position, Result, SemanticError, TypeSystem, Value};
use tracing::{debug, trace};

/// Parser for the SQL-like query language
#[derive(Debug, Clone, Default)]
pub struct SqlParser {
    type_system: TypeSystem,
}

/// Selectors visible to the clauses of one query.
struct Scope {
    selectors: Vec<String>,
}

impl Scope {
    fn new(source: &Source) -> Self {
        Self {
            selectors: source
                .selector_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    /// Validates an explicit selector name.
    fn selector(&self, name: String, position: Position) -> Result<String> {
        if self.selectors.contains(&name) {
            Ok(name)
        } else {
            Err(SemanticError::UnknownSelector { name, position }.into())
        }
    }

    /// The selector an unscoped reference implicitly names.
    fn implicit(&self, reference: &str, position: Position) -> Result<String> {
        match self.selectors.as_slice() {
            [only] => Ok(only.clone()),
            _ => Err(SemanticError::AmbiguousReference {
                name: reference.to_string(),
                position,
            }
            .into()),
        }
    }
}

/// A column as written, resolved once the sources are known.
struct ColumnRef {
    selector: Option<(String, Position)>,
    property: Option<String>,
    alias: Option<String>,
    position: Position,
}

/// Dynamic operand expression before arithmetic re-association.
enum OperandExpr {
    Leaf(DynamicOperand),
    Group(Box<OperandExpr>),
    Arithmetic(Box<OperandExpr>, ArithmeticOperator, Box<OperandExpr>),
}

impl OperandExpr {
    /// Builds `left op right` where `right` was parsed greedily, rotating
    /// so that tighter operators nest deeper and equal ones associate left.
    /// Parenthesized groups are never rotated.
    fn combine(left: OperandExpr, op: ArithmeticOperator, right: OperandExpr) -> OperandExpr {
        match right {
            OperandExpr::Arithmetic(inner_left, inner_op, inner_right)
                if op.precedence() >= inner_op.precedence() =>
            {
                OperandExpr::Arithmetic(
                    Box::new(Self::combine(left, op, *inner_left)),
                    inner_op,
                    inner_right,
                )
            }
            right => OperandExpr::Arithmetic(Box::new(left), op, Box::new(right)),
        }
    }

    fn into_operand(self) -> DynamicOperand {
        match self {
            OperandExpr::Leaf(operand) => operand,
            OperandExpr::Group(inner) => inner.into_operand(),
            OperandExpr::Arithmetic(left, operator, right) => DynamicOperand::Arithmetic {
                left: Box::new(left.into_operand()),
                operator,
                right: Box::new(right.into_operand()),
            },
        }
    }
}

impl SqlParser {
    /// Language name under which this parser registers.
    pub const LANGUAGE: &'static str = "JCR-SQL2";

    /// Create a parser with the standard type system
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser that resolves literals and casts with `type_system`
    pub fn with_type_system(type_system: TypeSystem) -> Self {
        Self { type_system }
    }

    /// The type system used for literals and casts.
    pub fn type_system(&self) -> &TypeSystem {
        &self.type_system
    }

    /// Parse query text into a command
    pub fn parse(&self, query: &str) -> Result<QueryCommand> {
        debug!(query, "parsing query");
        let mut tokens = TokenStream::new(query)?;
        let command = self.parse_command(&mut tokens)?;
        if tokens.has_next() {
            return Err(tokens.unexpected("end of query").into());
        }
        Ok(command)
    }

    fn parse_command(&self, tokens: &mut TokenStream) -> Result<QueryCommand> {
        let mut command = QueryCommand::Query(self.parse_query(tokens)?);
        loop {
            let operation = if tokens.can_consume("UNION") {
                SetOperation::Union
            } else if tokens.can_consume("INTERSECT") {
                SetOperation::Intersect
            } else if tokens.can_consume("EXCEPT") {
                SetOperation::Except
            } else {
                break;
            };
            let all = tokens.can_consume("ALL");
            let right = QueryCommand::Query(self.parse_query(tokens)?);
            command = QueryCommand::SetQuery(SetQuery {
                left: Box::new(command),
                operation,
                right: Box::new(right),
                all,
            });
        }
        Ok(command)
    }

    fn parse_query(&self, tokens: &mut TokenStream) -> Result<Query> {
        tokens.expect("SELECT")?;
        let distinct = tokens.can_consume("DISTINCT");
        let columns = self.parse_columns(tokens)?;

        tokens.expect("FROM")?;
        let source = self.parse_source(tokens)?;
        let scope = Scope::new(&source);

        let columns = columns
            .into_iter()
            .map(|column| {
                let selector = match column.selector {
                    Some((name, position)) => scope.selector(name, position)?,
                    None => {
                        let reference = column.property.as_deref().unwrap_or("*");
                        scope.implicit(reference, column.position)?
                    }
                };
                Ok(Column {
                    selector,
                    property: column.property,
                    alias: column.alias,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let constraint = if tokens.can_consume("WHERE") {
            Some(self.parse_constraint(tokens, &scope)?)
        } else {
            None
        };

        let orderings = if tokens.can_consume_all(&["ORDER", "BY"]) {
            self.parse_orderings(tokens, &scope)?
        } else {
            Vec::new()
        };

        let limit = if tokens.can_consume("LIMIT") {
            Some(self.parse_limit(tokens)?)
        } else {
            None
        };

        trace!(selectors = ?scope.selectors, "parsed query");
        Ok(Query {
            source,
            constraint,
            orderings,
            columns,
            limit,
            distinct,
        })
    }

    fn parse_columns(&self, tokens: &mut TokenStream) -> Result<Vec<ColumnRef>> {
        let mut columns = Vec::new();
        if tokens.can_consume("*") {
            return Ok(columns);
        }

        loop {
            let position = tokens.position();
            let first = parse_name(tokens)?;
            let column = if tokens.can_consume(".") {
                if tokens.can_consume("*") {
                    ColumnRef {
                        selector: Some((first, position)),
                        property: None,
                        alias: None,
                        position,
                    }
                } else {
                    let property = parse_name(tokens)?;
                    ColumnRef {
                        selector: Some((first, position)),
                        property: Some(property),
                        alias: parse_alias(tokens)?,
                        position,
                    }
                }
            } else {
                ColumnRef {
                    selector: None,
                    property: Some(first),
                    alias: parse_alias(tokens)?,
                    position,
                }
            };
            columns.push(column);

            if !tokens.can_consume(",") {
                break;
            }
        }
        Ok(columns)
    }

    fn parse_source(&self, tokens: &mut TokenStream) -> Result<Source> {
        let mut source = Source::Selector(parse_named_selector(tokens)?);

        loop {
            let join_type = if tokens.can_consume("JOIN") {
                JoinType::Inner
            } else if tokens.can_consume("INNER") {
                tokens.expect("JOIN")?;
                JoinType::Inner
            } else if tokens.can_consume("LEFT") {
                tokens.can_consume("OUTER");
                tokens.expect("JOIN")?;
                JoinType::LeftOuter
            } else if tokens.can_consume("RIGHT") {
                tokens.can_consume("OUTER");
                tokens.expect("JOIN")?;
                JoinType::RightOuter
            } else if tokens.can_consume("FULL") {
                tokens.can_consume("OUTER");
                tokens.expect("JOIN")?;
                JoinType::FullOuter
            } else if tokens.can_consume("CROSS") {
                tokens.expect("JOIN")?;
                JoinType::Cross
            } else {
                break;
            };

            let right = Source::Selector(parse_named_selector(tokens)?);
            tokens.expect("ON")?;

            let mut names = source.selector_names();
            names.extend(right.selector_names());
            let scope = Scope {
                selectors: names.into_iter().map(str::to_string).collect(),
            };
            let condition = self.parse_join_condition(tokens, &scope)?;

            source = Source::Join(Join {
                left: Box::new(source),
                join_type,
                right: Box::new(right),
                condition,
            });
        }
        Ok(source)
    }

    fn parse_join_condition(&self, tokens: &mut TokenStream, scope: &Scope) -> Result<JoinCondition> {
        if tokens.can_consume_all(&["ISSAMENODE", "("]) {
            let selector1 = parse_selector(tokens, scope)?;
            tokens.expect(",")?;
            let selector2 = parse_selector(tokens, scope)?;
            let path = if tokens.can_consume(",") {
                Some(parse_path(tokens)?)
            } else {
                None
            };
            tokens.expect(")")?;
            return Ok(JoinCondition::SameNode {
                selector1,
                selector2,
                path,
            });
        }
        if tokens.can_consume_all(&["ISCHILDNODE", "("]) {
            let child = parse_selector(tokens, scope)?;
            tokens.expect(",")?;
            let parent = parse_selector(tokens, scope)?;
            tokens.expect(")")?;
            return Ok(JoinCondition::ChildNode { parent, child });
        }
        if tokens.can_consume_all(&["ISDESCENDANTNODE", "("]) {
            let descendant = parse_selector(tokens, scope)?;
            tokens.expect(",")?;
            let ancestor = parse_selector(tokens, scope)?;
            tokens.expect(")")?;
            return Ok(JoinCondition::DescendantNode {
                ancestor,
                descendant,
            });
        }

        let selector1 = parse_selector(tokens, scope)?;
        tokens.expect(".")?;
        let property1 = parse_name(tokens)?;
        tokens.expect("=")?;
        let selector2 = parse_selector(tokens, scope)?;
        tokens.expect(".")?;
        let property2 = parse_name(tokens)?;
        Ok(JoinCondition::EquiJoin {
            selector1,
            property1,
            selector2,
            property2,
        })
    }

    fn parse_constraint(&self, tokens: &mut TokenStream, scope: &Scope) -> Result<Constraint> {
        let mut left = self.parse_and(tokens, scope)?;
        while tokens.can_consume("OR") {
            let right = self.parse_and(tokens, scope)?;
            left = Constraint::or(left, right);
        }
        Ok(left)
    }

    fn parse_and(&self, tokens: &mut TokenStream, scope: &Scope) -> Result<Constraint> {
        let mut left = self.parse_unary(tokens, scope)?;
        while tokens.can_consume("AND") {
            let right = self.parse_unary(tokens, scope)?;
            left = Constraint::and(left, right);
        }
        Ok(left)
    }

    fn parse_unary(&self, tokens: &mut TokenStream, scope: &Scope) -> Result<Constraint> {
        if tokens.can_consume("NOT") {
            return Ok(Constraint::not(self.parse_unary(tokens, scope)?));
        }
        if tokens.can_consume("(") {
            let constraint = self.parse_constraint(tokens, scope)?;
            tokens.expect(")")?;
            return Ok(constraint);
        }
        self.parse_primary(tokens, scope)
    }

    fn parse_primary(&self, tokens: &mut TokenStream, scope: &Scope) -> Result<Constraint> {
        let position = tokens.position();

        if tokens.can_consume_all(&["CONTAINS", "("]) {
            return self.parse_full_text_search(tokens, scope, position);
        }
        for keyword in ["ISSAMENODE", "ISCHILDNODE", "ISDESCENDANTNODE"] {
            if tokens.can_consume_all(&[keyword, "("]) {
                return self.parse_node_constraint(tokens, scope, keyword, position);
            }
        }

        let operand = self.parse_dynamic_operand(tokens, scope)?;

        if tokens.can_consume_all(&["IS", "NOT", "NULL"]) {
            return existence(operand, position);
        }
        if tokens.can_consume_all(&["IS", "NULL"]) {
            return Ok(Constraint::not(existence(operand, position)?));
        }

        let negated = tokens.can_consume("NOT");
        let constraint = if tokens.can_consume("IN") {
            tokens.expect("(")?;
            let values = if tokens.matches("SELECT") {
                let subquery = self.parse_command(tokens)?;
                vec![StaticOperand::Subquery(Box::new(subquery))]
            } else {
                let mut values = vec![self.parse_static_operand(tokens)?];
                while tokens.can_consume(",") {
                    values.push(self.parse_static_operand(tokens)?);
                }
                values
            };
            tokens.expect(")")?;
            Constraint::SetCriteria { operand, values }
        } else if tokens.can_consume("BETWEEN") {
            let lower = self.parse_static_operand(tokens)?;
            let lower_inclusive = !tokens.can_consume("EXCLUSIVE");
            tokens.expect("AND")?;
            let upper = self.parse_static_operand(tokens)?;
            let upper_inclusive = !tokens.can_consume("EXCLUSIVE");
            Constraint::Between {
                operand,
                lower,
                upper,
                lower_inclusive,
                upper_inclusive,
            }
        } else if negated {
            tokens.expect("LIKE")?;
            let value = self.parse_static_operand(tokens)?;
            Constraint::Comparison {
                operand,
                operator: Operator::Like,
                value,
            }
        } else {
            let operator = parse_operator(tokens)?;
            let value = self.parse_static_operand(tokens)?;
            Constraint::Comparison {
                operand,
                operator,
                value,
            }
        };

        Ok(if negated {
            Constraint::not(constraint)
        } else {
            constraint
        })
    }

    /// `CONTAINS(` already consumed.
    fn parse_full_text_search(
        &self,
        tokens: &mut TokenStream,
        scope: &Scope,
        position: Position,
    ) -> Result<Constraint> {
        let (selector, property) = if tokens.can_consume("*") {
            (scope.implicit("CONTAINS", position)?, None)
        } else {
            let name_position = tokens.position();
            let first = parse_name(tokens)?;
            if tokens.can_consume(".") {
                let selector = scope.selector(first, name_position)?;
                if tokens.can_consume("*") {
                    (selector, None)
                } else {
                    (selector, Some(parse_name(tokens)?))
                }
            } else {
                (scope.implicit(&first, name_position)?, Some(first))
            }
        };
        tokens.expect(",")?;

        let (expression, term) = if tokens.can_consume("$") {
            (StaticOperand::BindVariable(parse_name(tokens)?), None)
        } else if tokens.matches_kind(TokenKind::QuotedString) {
            let token = tokens.consume()?;
            let text = unquote(&token.text);
            let term = FullTextParser::new().parse(&text).map_err(|e| ParseError::Syntax {
                message: format!("invalid full-text expression: {}", e),
                position: token.position,
            })?;
            (StaticOperand::Literal(Value::String(text)), term)
        } else {
            return Err(tokens.unexpected("a quoted full-text expression").into());
        };
        tokens.expect(")")?;

        Ok(Constraint::FullTextSearch {
            selector,
            property,
            expression,
            term,
        })
    }

    /// `ISSAMENODE(`, `ISCHILDNODE(` or `ISDESCENDANTNODE(` already
    /// consumed. The selector may be omitted when the query has one source.
    fn parse_node_constraint(
        &self,
        tokens: &mut TokenStream,
        scope: &Scope,
        keyword: &str,
        position: Position,
    ) -> Result<Constraint> {
        let first_position = tokens.position();
        let first = parse_path(tokens)?;
        let (selector, path) = if tokens.can_consume(",") {
            (scope.selector(first, first_position)?, parse_path(tokens)?)
        } else {
            (scope.implicit(keyword, position)?, first)
        };
        tokens.expect(")")?;

        Ok(match keyword {
            "ISSAMENODE" => Constraint::SameNode { selector, path },
            "ISCHILDNODE" => Constraint::ChildNode { selector, path },
            _ => Constraint::DescendantNode { selector, path },
        })
    }

    fn parse_dynamic_operand(&self, tokens: &mut TokenStream, scope: &Scope) -> Result<DynamicOperand> {
        Ok(self.parse_operand_expr(tokens, scope)?.into_operand())
    }

    fn parse_operand_expr(&self, tokens: &mut TokenStream, scope: &Scope) -> Result<OperandExpr> {
        let left = if tokens.can_consume("(") {
            let inner = self.parse_operand_expr(tokens, scope)?;
            tokens.expect(")")?;
            OperandExpr::Group(Box::new(inner))
        } else {
            OperandExpr::Leaf(self.parse_operand_term(tokens, scope)?)
        };

        let operator = match tokens.peek() {
            Some(t) if t.is_symbol('+') => ArithmeticOperator::Add,
            Some(t) if t.is_symbol('-') => ArithmeticOperator::Subtract,
            Some(t) if t.is_symbol('*') => ArithmeticOperator::Multiply,
            Some(t) if t.is_symbol('/') => ArithmeticOperator::Divide,
            _ => return Ok(left),
        };
        tokens.consume()?;
        let right = self.parse_operand_expr(tokens, scope)?;
        Ok(OperandExpr::combine(left, operator, right))
    }

    fn parse_operand_term(&self, tokens: &mut TokenStream, scope: &Scope) -> Result<DynamicOperand> {
        let position = tokens.position();

        if tokens.can_consume_all(&["LENGTH", "("]) {
            let (selector, property) = self.parse_property_reference(tokens, scope)?;
            tokens.expect(")")?;
            return Ok(DynamicOperand::Length { selector, property });
        }
        if tokens.can_consume_all(&["LOWER", "("]) {
            let inner = self.parse_dynamic_operand(tokens, scope)?;
            tokens.expect(")")?;
            return Ok(DynamicOperand::LowerCase(Box::new(inner)));
        }
        if tokens.can_consume_all(&["UPPER", "("]) {
            let inner = self.parse_dynamic_operand(tokens, scope)?;
            tokens.expect(")")?;
            return Ok(DynamicOperand::UpperCase(Box::new(inner)));
        }
        if tokens.can_consume_all(&["REFERENCE", "("]) {
            return self.parse_reference_value(tokens, scope, position);
        }

        type SelectorFunction = fn(String) -> DynamicOperand;
        let functions: [(&str, SelectorFunction); 5] = [
            ("NAME", |selector| DynamicOperand::NodeName { selector }),
            ("LOCALNAME", |selector| DynamicOperand::NodeLocalName { selector }),
            ("PATH", |selector| DynamicOperand::NodePath { selector }),
            ("DEPTH", |selector| DynamicOperand::NodeDepth { selector }),
            ("SCORE", |selector| DynamicOperand::FullTextSearchScore { selector }),
        ];
        for (keyword, build) in functions {
            if tokens.can_consume_all(&[keyword, "("]) {
                let selector = if tokens.matches(")") {
                    scope.implicit(&format!("{}()", keyword), position)?
                } else {
                    parse_selector(tokens, scope)?
                };
                tokens.expect(")")?;
                return Ok(build(selector));
            }
        }

        let (selector, property) = self.parse_property_reference(tokens, scope)?;
        Ok(DynamicOperand::PropertyValue { selector, property })
    }

    /// `selector.property`, or an unscoped `property`.
    fn parse_property_reference(&self, tokens: &mut TokenStream, scope: &Scope) -> Result<(String, String)> {
        let position = tokens.position();
        let first = parse_name(tokens)?;
        if tokens.can_consume(".") {
            let selector = scope.selector(first, position)?;
            let property = parse_name(tokens)?;
            Ok((selector, property))
        } else {
            let selector = scope.implicit(&first, position)?;
            Ok((selector, first))
        }
    }

    /// `REFERENCE(` already consumed. A lone name that matches a selector
    /// means any reference property of that selector.
    fn parse_reference_value(
        &self,
        tokens: &mut TokenStream,
        scope: &Scope,
        position: Position,
    ) -> Result<DynamicOperand> {
        let operand = if tokens.matches(")") {
            DynamicOperand::ReferenceValue {
                selector: scope.implicit("REFERENCE()", position)?,
                property: None,
            }
        } else {
            let name_position = tokens.position();
            let first = parse_name(tokens)?;
            if tokens.can_consume(".") {
                DynamicOperand::ReferenceValue {
                    selector: scope.selector(first, name_position)?,
                    property: Some(parse_name(tokens)?),
                }
            } else if scope.selectors.contains(&first) {
                DynamicOperand::ReferenceValue {
                    selector: first,
                    property: None,
                }
            } else {
                DynamicOperand::ReferenceValue {
                    selector: scope.implicit(&first, name_position)?,
                    property: Some(first),
                }
            }
        };
        tokens.expect(")")?;
        Ok(operand)
    }

    fn parse_orderings(&self, tokens: &mut TokenStream, scope: &Scope) -> Result<Vec<Ordering>> {
        let mut orderings = Vec::new();
        loop {
            let operand = self.parse_dynamic_operand(tokens, scope)?;
            let order = if tokens.can_consume("DESC") {
                Order::Descending
            } else {
                tokens.can_consume("ASC");
                Order::Ascending
            };
            let null_order = if tokens.can_consume_all(&["NULLS", "FIRST"]) {
                Some(NullOrder::First)
            } else if tokens.can_consume_all(&["NULLS", "LAST"]) {
                Some(NullOrder::Last)
            } else {
                None
            };
            orderings.push(Ordering {
                operand,
                order,
                null_order,
            });

            if !tokens.can_consume(",") {
                break;
            }
        }
        Ok(orderings)
    }

    /// `LIMIT n [OFFSET m]` or `LIMIT from, to`.
    fn parse_limit(&self, tokens: &mut TokenStream) -> Result<Limit> {
        let position = tokens.position();
        let first = parse_count(tokens)?;

        if tokens.can_consume(",") {
            let to = parse_count(tokens)?;
            if to < first {
                return Err(SemanticError::InvalidLimit {
                    message: format!("upper bound {} is below lower bound {}", to, first),
                    position,
                }
                .into());
            }
            return Ok(Limit {
                row_count: to - first,
                offset: first,
            });
        }

        let offset = if tokens.can_consume("OFFSET") {
            parse_count(tokens)?
        } else {
            0
        };
        Ok(Limit {
            row_count: first,
            offset,
        })
    }

    fn parse_static_operand(&self, tokens: &mut TokenStream) -> Result<StaticOperand> {
        if tokens.can_consume("$") {
            return Ok(StaticOperand::BindVariable(parse_name(tokens)?));
        }
        if tokens.matches_all(&["(", "SELECT"]) {
            tokens.consume()?;
            let subquery = self.parse_command(tokens)?;
            tokens.expect(")")?;
            return Ok(StaticOperand::Subquery(Box::new(subquery)));
        }
        if tokens.can_consume_all(&["CAST", "("]) {
            let position = tokens.position();
            let (value, literal) = self.parse_literal(tokens)?;
            tokens.expect("AS")?;
            let type_name = parse_name(tokens)?;
            tokens.expect(")")?;

            let invalid = || SemanticError::InvalidCast {
                literal: literal.clone(),
                type_name: type_name.clone(),
                position,
            };
            let converter = self.type_system.converter(&type_name).ok_or_else(invalid)?;
            let value = converter.convert(&value).map_err(|_| invalid())?;
            return Ok(StaticOperand::Literal(value));
        }
        let (value, _) = self.parse_literal(tokens)?;
        Ok(StaticOperand::Literal(value))
    }

    /// Reads a literal, returning the value and the text it was read from.
    fn parse_literal(&self, tokens: &mut TokenStream) -> Result<(Value, String)> {
        let position = tokens.position();

        if tokens.matches_kind(TokenKind::QuotedString) {
            let token = tokens.consume()?;
            return Ok((Value::String(unquote(&token.text)), token.text));
        }
        if self.type_system.has_boolean() {
            for (keyword, value) in [("TRUE", true), ("FALSE", false)] {
                if tokens.matches(keyword) {
                    let token = tokens.consume()?;
                    return Ok((Value::Boolean(value), token.text));
                }
            }
        }

        let mut text = String::new();
        if tokens.can_consume("-") {
            text.push('-');
        } else {
            tokens.can_consume("+");
        }
        let integral = match tokens.peek() {
            Some(token) if token.kind == TokenKind::Word => tokens.consume()?,
            _ => return Err(tokens.unexpected("a literal value").into()),
        };
        text.push_str(&integral.text);
        let invalid = |text: &str| SemanticError::InvalidLiteral {
            text: text.to_string(),
            position,
        };

        if !integral.text.bytes().all(|b| b.is_ascii_digit()) {
            // Exponent form without a fraction, e.g. 1E10
            if integral.text.contains(['e', 'E']) {
                return text
                    .parse::<f64>()
                    .map(|v| (Value::Double(v), text.clone()))
                    .map_err(|_| invalid(&text).into());
            }
            return Err(invalid(&text).into());
        }

        if followed_by_word(tokens, ".") {
            tokens.consume()?;
            let fraction = tokens.consume()?;
            text.push('.');
            text.push_str(&fraction.text);
            if fraction.text.ends_with(['e', 'E']) && tokens.matches_any(&["-", "+"]) {
                let sign = tokens.consume()?;
                let exponent = tokens.consume()?;
                text.push_str(&sign.text);
                text.push_str(&exponent.text);
            }
            return text
                .parse::<f64>()
                .map(|v| (Value::Double(v), text.clone()))
                .map_err(|_| invalid(&text).into());
        }

        if !text.starts_with('-') && followed_by_word(tokens, "-") {
            let date = read_date(tokens, text)?;
            return parse_date(&date)
                .map(|d| (Value::Date(d), date.clone()))
                .map_err(|_| invalid(&date).into());
        }

        text.parse::<i64>()
            .map(|v| (Value::Long(v), text.clone()))
            .map_err(|_| invalid(&text).into())
    }
}

/// Whether the next token is `symbol` and a word follows it.
fn followed_by_word(tokens: &TokenStream, symbol: &str) -> bool {
    tokens.matches(symbol) && tokens.peek_at(1).is_some_and(|t| t.kind == TokenKind::Word)
}

/// Reassembles an unquoted date literal split by the tokenizer. The year
/// has already been consumed into `text`.
fn read_date(tokens: &mut TokenStream, mut text: String) -> Result<String> {
    fn append(tokens: &mut TokenStream, text: &mut String) -> Result<Token> {
        let token = tokens.consume()?;
        text.push_str(&token.text);
        Ok(token)
    }

    // -MM-DD[Thh]
    append(tokens, &mut text)?;
    append(tokens, &mut text)?;
    tokens.expect("-")?;
    text.push('-');
    let day = append(tokens, &mut text)?;

    if day.text.contains(['T', 't']) {
        // :mm[:ss[.fff]]
        for symbol in [":", ":", "."] {
            if !followed_by_word(tokens, symbol) {
                break;
            }
            append(tokens, &mut text)?;
            append(tokens, &mut text)?;
        }
    }

    let has_zone = text.ends_with(['Z', 'z']) || text.to_ascii_uppercase().ends_with("UTC");
    if !has_zone {
        if tokens.matches_any(&["+", "-"]) && tokens.peek_at(1).is_some_and(|t| t.kind == TokenKind::Word) {
            append(tokens, &mut text)?;
            append(tokens, &mut text)?;
            if followed_by_word(tokens, ":") {
                append(tokens, &mut text)?;
                append(tokens, &mut text)?;
            }
        } else if tokens.matches("UTC") || tokens.matches("Z") {
            append(tokens, &mut text)?;
        }
    }
    Ok(text)
}

/// Reads a name: a word (with an optional `prefix:` part) or a quoted or
/// bracketed string.
fn parse_name(tokens: &mut TokenStream) -> std::result::Result<String, ParseError> {
    match tokens.peek().map(|t| t.kind) {
        Some(TokenKind::QuotedString) => Ok(unquote(&tokens.consume()?.text)),
        Some(TokenKind::Word) => {
            let mut name = tokens.consume()?.text;
            if followed_by_word(tokens, ":") {
                tokens.consume()?;
                name.push(':');
                name.push_str(&tokens.consume()?.text);
            }
            Ok(name)
        }
        _ => Err(tokens.unexpected("a name")),
    }
}

fn parse_alias(tokens: &mut TokenStream) -> std::result::Result<Option<String>, ParseError> {
    if tokens.can_consume("AS") {
        Ok(Some(parse_name(tokens)?))
    } else {
        Ok(None)
    }
}

fn parse_named_selector(tokens: &mut TokenStream) -> Result<NamedSelector> {
    let node_type = parse_name(tokens)?;
    let alias = parse_alias(tokens)?;
    Ok(NamedSelector { node_type, alias })
}

/// A selector name that must be declared in `scope`.
fn parse_selector(tokens: &mut TokenStream, scope: &Scope) -> Result<String> {
    let position = tokens.position();
    let name = parse_name(tokens)?;
    scope.selector(name, position)
}

fn parse_path(tokens: &mut TokenStream) -> std::result::Result<String, ParseError> {
    parse_name(tokens)
}

fn parse_count(tokens: &mut TokenStream) -> Result<usize> {
    let position = tokens.position();
    match tokens.peek() {
        Some(token) if token.kind == TokenKind::Word && token.text.bytes().all(|b| b.is_ascii_digit()) => {
            let token = tokens.consume()?;
            token.text.parse::<usize>().map_err(|_| {
                SemanticError::InvalidLimit {
                    message: format!("{} does not fit a row count", token.text),
                    position,
                }
                .into()
            })
        }
        _ => Err(tokens.unexpected("a row count").into()),
    }
}

fn parse_operator(tokens: &mut TokenStream) -> Result<Operator> {
    let operator = if tokens.can_consume("=") {
        Operator::EqualTo
    } else if tokens.can_consume_all(&["!", "="]) || tokens.can_consume_all(&["<", ">"]) {
        Operator::NotEqualTo
    } else if tokens.can_consume_all(&["<", "="]) {
        Operator::LessThanOrEqualTo
    } else if tokens.can_consume("<") {
        Operator::LessThan
    } else if tokens.can_consume_all(&[">", "="]) {
        Operator::GreaterThanOrEqualTo
    } else if tokens.can_consume(">") {
        Operator::GreaterThan
    } else if tokens.can_consume("LIKE") {
        Operator::Like
    } else {
        return Err(tokens.unexpected("a comparison operator").into());
    };
    Ok(operator)
}

/// `IS [NOT] NULL` applies only to property values.
fn existence(operand: DynamicOperand, position: Position) -> Result<Constraint> {
    match operand {
        DynamicOperand::PropertyValue { selector, property } => {
            Ok(Constraint::PropertyExistence { selector, property })
        }
        other => Err(ParseError::Syntax {
            message: format!("IS NULL requires a property value, found {}", other),
            position,
        }
        .into()),
    }
}
