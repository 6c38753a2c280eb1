use contentql::{
    Constraint, DynamicOperand, Error, Operator, ParseError, Query, QueryCommand, QueryEngine,
    SemanticError, SqlParser, StaticOperand, Value,
};
use contentql_query::{JoinCondition, JoinType, Limit, NullOrder, Order, SetOperation, Source};

fn parse(sql: &str) -> QueryCommand {
    SqlParser::new().parse(sql).unwrap()
}

fn query(sql: &str) -> Query {
    match parse(sql) {
        QueryCommand::Query(query) => query,
        other => panic!("expected a plain query, got {:?}", other),
    }
}

#[test]
fn test_join_with_equi_condition() {
    let q = query(
        "SELECT a.[jcr:title], b.* FROM [nt:file] AS a \
         LEFT OUTER JOIN [nt:resource] AS b ON a.[jcr:uuid] = b.[ref]",
    );
    assert_eq!(q.source.selector_names(), vec!["a", "b"]);
    match &q.source {
        Source::Join(join) => {
            assert_eq!(join.join_type, JoinType::LeftOuter);
            assert_eq!(
                join.condition,
                JoinCondition::EquiJoin {
                    selector1: "a".to_string(),
                    property1: "jcr:uuid".to_string(),
                    selector2: "b".to_string(),
                    property2: "ref".to_string(),
                }
            );
        }
        other => panic!("expected a join, got {:?}", other),
    }
    assert_eq!(q.columns.len(), 2);
    assert_eq!(q.columns[1].property, None);
}

#[test]
fn test_join_types() {
    for (text, expected) in [
        ("JOIN", JoinType::Inner),
        ("INNER JOIN", JoinType::Inner),
        ("RIGHT JOIN", JoinType::RightOuter),
        ("FULL OUTER JOIN", JoinType::FullOuter),
        ("CROSS JOIN", JoinType::Cross),
    ] {
        let sql = format!("SELECT * FROM [a] AS x {} [b] AS y ON ISCHILDNODE(y, x)", text);
        match query(&sql).source {
            Source::Join(join) => assert_eq!(join.join_type, expected, "{}", text),
            other => panic!("expected a join, got {:?}", other),
        }
    }
}

#[test]
fn test_join_node_conditions() {
    let q = query("SELECT * FROM [a] AS x JOIN [b] AS y ON ISSAMENODE(x, y, '/content')");
    match q.source {
        Source::Join(join) => assert_eq!(
            join.condition,
            JoinCondition::SameNode {
                selector1: "x".to_string(),
                selector2: "y".to_string(),
                path: Some("/content".to_string()),
            }
        ),
        other => panic!("expected a join, got {:?}", other),
    }
}

#[test]
fn test_unqualified_reference_in_join_is_ambiguous() {
    let err = SqlParser::new()
        .parse("SELECT * FROM [a] AS x JOIN [b] AS y ON x.id = y.id WHERE [title] = 'a'")
        .unwrap_err();
    match err {
        Error::Semantic(SemanticError::AmbiguousReference { name, position }) => {
            assert_eq!(name, "title");
            assert_eq!(position.line, 1);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_unknown_selector() {
    let err = SqlParser::new()
        .parse("SELECT * FROM [nt:base] AS n WHERE m.[title] = 'a'")
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Semantic(SemanticError::UnknownSelector { ref name, .. }) if name == "m"
    ));
}

#[test]
fn test_columns_resolve_after_from() {
    let q = query("SELECT [title] AS t, n.[size] FROM [nt:base] AS n");
    assert_eq!(q.columns[0].selector, "n");
    assert_eq!(q.columns[0].alias.as_deref(), Some("t"));
    assert_eq!(q.columns[1].property.as_deref(), Some("size"));
}

#[test]
fn test_set_operations_associate_left() {
    match parse("SELECT * FROM [a] UNION ALL SELECT * FROM [b] EXCEPT SELECT * FROM [c]") {
        QueryCommand::SetQuery(outer) => {
            assert_eq!(outer.operation, SetOperation::Except);
            assert!(!outer.all);
            match *outer.left {
                QueryCommand::SetQuery(inner) => {
                    assert_eq!(inner.operation, SetOperation::Union);
                    assert!(inner.all);
                }
                other => panic!("expected a nested set query, got {:?}", other),
            }
        }
        other => panic!("expected a set query, got {:?}", other),
    }
}

#[test]
fn test_order_by_and_limit() {
    let q = query(
        "SELECT DISTINCT * FROM [nt:base] ORDER BY [size] DESC NULLS LAST, NAME() LIMIT 10 OFFSET 5",
    );
    assert!(q.distinct);
    assert_eq!(q.orderings.len(), 2);
    assert_eq!(q.orderings[0].order, Order::Descending);
    assert_eq!(q.orderings[0].null_order, Some(NullOrder::Last));
    assert_eq!(q.orderings[1].order, Order::Ascending);
    assert_eq!(
        q.orderings[1].operand,
        DynamicOperand::NodeName {
            selector: "nt:base".to_string()
        }
    );
    assert_eq!(
        q.limit,
        Some(Limit {
            row_count: 10,
            offset: 5
        })
    );
}

#[test]
fn test_limit_range_form() {
    let q = query("SELECT * FROM [nt:base] LIMIT 20, 30");
    assert_eq!(
        q.limit,
        Some(Limit {
            row_count: 10,
            offset: 20
        })
    );

    let err = SqlParser::new()
        .parse("SELECT * FROM [nt:base] LIMIT 30, 20")
        .unwrap_err();
    assert!(matches!(err, Error::Semantic(SemanticError::InvalidLimit { .. })));
}

#[test]
fn test_bind_variables_and_subqueries() {
    let q = query(
        "SELECT * FROM [nt:base] WHERE [id] IN (SELECT [ref] FROM [nt:link]) AND [size] > $min",
    );
    match q.constraint.unwrap() {
        Constraint::And(left, right) => {
            assert!(matches!(
                *left,
                Constraint::SetCriteria { ref values, .. }
                    if matches!(values.as_slice(), [StaticOperand::Subquery(_)])
            ));
            assert!(matches!(
                *right,
                Constraint::Comparison {
                    operator: Operator::GreaterThan,
                    value: StaticOperand::BindVariable(ref name),
                    ..
                } if name == "min"
            ));
        }
        other => panic!("expected a conjunction, got {:?}", other),
    }
}

#[test]
fn test_display_round_trip() {
    for sql in [
        "SELECT * FROM [nt:base] WHERE [title] LIKE 'intro%' AND NOT [size] > 3",
        "SELECT n.[a] AS x FROM [nt:base] AS n WHERE n.[a] + n.[b] * n.[c] = 10 ORDER BY n.[a] DESC",
        "SELECT * FROM [a] AS x INNER JOIN [b] AS y ON ISDESCENDANTNODE(y, x) WHERE CONTAINS(y.*, 'cat -dog')",
        "SELECT * FROM [nt:base] WHERE [d] > CAST('2024-01-02T03:04:05.000Z' AS DATE) OR [p] = CAST('/a/b' AS PATH)",
        "SELECT * FROM [nt:base] WHERE LOWER([t]) = 'it\\'s' AND [n] BETWEEN 1 EXCLUSIVE AND 2.5",
        "SELECT * FROM [nt:base] WHERE REFERENCE() IN ('x', $y) LIMIT 5 OFFSET 1",
        "SELECT * FROM [a] UNION SELECT * FROM [b]",
    ] {
        let command = parse(sql);
        let rendered = command.to_string();
        assert_eq!(parse(&rendered), command, "round trip of {}\nrendered {}", sql, rendered);
    }
}

#[test]
fn test_literal_types() {
    let q = query("SELECT * FROM [nt:base] WHERE [a] = -1.5E3");
    assert!(matches!(
        q.constraint,
        Some(Constraint::Comparison {
            value: StaticOperand::Literal(Value::Double(v)),
            ..
        }) if v == -1500.0
    ));
}

#[test]
fn test_syntax_errors_report_positions() {
    let err = SqlParser::new().parse("SELECT * FROM [nt:base] WHERE").unwrap_err();
    assert!(matches!(err, Error::Parse(ParseError::Syntax { .. })));

    let err = SqlParser::new()
        .parse("SELECT *\nFROM [nt:base]\nWHERE [a] = 'unterminated")
        .unwrap_err();
    match err {
        Error::Parse(e) => assert_eq!(e.position().line, 3),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_invalid_cast() {
    let err = SqlParser::new()
        .parse("SELECT * FROM [nt:base] WHERE [a] = CAST('abc' AS LONG)")
        .unwrap_err();
    assert!(matches!(err, Error::Semantic(SemanticError::InvalidCast { .. })));
}

#[test]
fn test_search_language_through_engine() {
    let engine = QueryEngine::default();
    match engine.parse("search", "apache -jackrabbit").unwrap() {
        QueryCommand::Query(q) => {
            assert!(matches!(
                q.constraint,
                Some(Constraint::FullTextSearch { property: None, term: Some(_), .. })
            ));
        }
        other => panic!("expected a plain query, got {:?}", other),
    }
}

fn ambiguous_in_join(constraint: &str) -> String {
    let sql = format!(
        "SELECT * FROM [nt:file] AS x JOIN [nt:resource] AS y ON x.[id] = y.[id] WHERE {}",
        constraint
    );
    match SqlParser::new().parse(&sql) {
        Err(Error::Semantic(SemanticError::AmbiguousReference { name, .. })) => name,
        other => panic!("{}: expected an ambiguous reference, got {:?}", constraint, other),
    }
}

#[test]
fn test_unscoped_contains_in_join_is_ambiguous() {
    assert_eq!(ambiguous_in_join("CONTAINS(*, 'text')"), "CONTAINS");
    assert_eq!(ambiguous_in_join("CONTAINS([body], 'text')"), "body");
}

#[test]
fn test_unscoped_node_constraints_in_join_are_ambiguous() {
    assert_eq!(ambiguous_in_join("ISSAMENODE('/x')"), "ISSAMENODE");
    assert_eq!(ambiguous_in_join("ISCHILDNODE('/x')"), "ISCHILDNODE");
    assert_eq!(ambiguous_in_join("ISDESCENDANTNODE([/x])"), "ISDESCENDANTNODE");
}

#[test]
fn test_zero_argument_functions_in_join_are_ambiguous() {
    for function in ["NAME", "LOCALNAME", "PATH", "DEPTH", "SCORE"] {
        assert_eq!(
            ambiguous_in_join(&format!("{}() = 'a'", function)),
            format!("{}()", function)
        );
    }
    assert_eq!(ambiguous_in_join("REFERENCE() = 'a'"), "REFERENCE()");
    assert_eq!(ambiguous_in_join("REFERENCE([ref]) = 'a'"), "ref");
}

#[test]
fn test_ambiguous_score_in_order_by() {
    let err = SqlParser::new()
        .parse("SELECT * FROM [a] AS x JOIN [b] AS y ON ISSAMENODE(x, y) ORDER BY SCORE()")
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Semantic(SemanticError::AmbiguousReference { ref name, .. }) if name == "SCORE()"
    ));
}

#[test]
fn test_scoped_functions_in_join() {
    let q = query(
        "SELECT * FROM [nt:file] AS x JOIN [nt:resource] AS y ON x.[id] = y.[id] \
         WHERE CONTAINS(y.*, 'text') AND ISCHILDNODE(x, '/a') AND NAME(y) = 'b'",
    );
    assert!(q.constraint.is_some());
}

#[test]
fn test_unscoped_functions_resolve_single_selector() {
    let q = query("SELECT * FROM [nt:file] AS f WHERE CONTAINS(*, 'text')");
    assert!(matches!(
        q.constraint,
        Some(Constraint::FullTextSearch { ref selector, property: None, .. }) if selector == "f"
    ));

    let q = query("SELECT * FROM [nt:file] AS f WHERE ISSAMENODE('/x')");
    assert_eq!(
        q.constraint,
        Some(Constraint::SameNode {
            selector: "f".to_string(),
            path: "/x".to_string(),
        })
    );

    let q = query("SELECT * FROM [nt:file] WHERE DEPTH() = 2");
    assert!(matches!(
        q.constraint,
        Some(Constraint::Comparison {
            operand: DynamicOperand::NodeDepth { ref selector },
            ..
        }) if selector == "nt:file"
    ));

    let q = query("SELECT * FROM [nt:file] AS f WHERE REFERENCE() = 'id'");
    assert!(matches!(
        q.constraint,
        Some(Constraint::Comparison {
            operand: DynamicOperand::ReferenceValue { ref selector, property: None },
            ..
        }) if selector == "f"
    ));
}
