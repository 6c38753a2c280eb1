use contentql::{
    BindValue, BindVariables, CaseFold, ColumnTypes, CompareOp, CompileError, CompileOptions,
    EngineConfig, Error, IndexFlavor, Predicate, PropertyType, QueryEngine, ValueOrder,
};

fn types() -> ColumnTypes {
    [
        ("jcr:title", PropertyType::String),
        ("size", PropertyType::Long),
        ("rating", PropertyType::Double),
        ("modified", PropertyType::Date),
        ("kind", PropertyType::Name),
        ("owner", PropertyType::Reference),
        ("link", PropertyType::SimpleReference),
    ]
    .into_iter()
    .map(|(c, t)| (c.to_string(), t))
    .collect()
}

fn prepare_with(config: EngineConfig, where_clause: &str, binds: &BindVariables) -> contentql::Result<Predicate> {
    let engine = QueryEngine::new(config);
    let sql = format!("SELECT * FROM [nt:unstructured] WHERE {}", where_clause);
    Ok(engine.prepare_default(&sql, binds, &types())?.predicate)
}

fn prepare(where_clause: &str) -> Predicate {
    prepare_with(EngineConfig::default(), where_clause, &BindVariables::new()).unwrap()
}

fn compile_error(where_clause: &str) -> CompileError {
    match prepare_with(EngineConfig::default(), where_clause, &BindVariables::new()) {
        Err(Error::Compile(e)) => e,
        other => panic!("expected a compile error for {}, got {:?}", where_clause, other),
    }
}

#[test]
fn test_conjunction_of_typed_columns() {
    let predicate = prepare("[jcr:title] = 'Intro' AND [rating] >= 4.5");
    assert_eq!(
        predicate,
        Predicate::and(vec![
            Predicate::term("jcr:title", "Intro"),
            Predicate::DoubleRange {
                field: "rating".to_string(),
                lower: 4.5,
                upper: f64::MAX,
                include_lower: true,
                include_upper: true,
            },
        ])
    );
    assert_eq!(
        predicate.to_string(),
        format!("(+jcr:title:\"Intro\" +rating:[4.5 TO {}])", f64::MAX)
    );
}

#[test]
fn test_long_column_accepts_string_literal() {
    assert_eq!(
        prepare("[size] < '100'"),
        Predicate::LongRange {
            field: "size".to_string(),
            lower: i64::MIN,
            upper: 100,
            include_lower: true,
            include_upper: false,
        }
    );
}

#[test]
fn test_unconvertible_literal_is_an_error() {
    assert!(matches!(
        compile_error("[size] = 'large'"),
        CompileError::Conversion(_)
    ));
}

#[test]
fn test_upper_like_is_folded_wildcard() {
    assert_eq!(
        prepare("UPPER([jcr:title]) LIKE 'INTRO%'"),
        Predicate::Wildcard {
            field: "jcr:title".to_string(),
            pattern: "INTRO*".to_string(),
            fold: CaseFold::Upper,
        }
    );
}

#[test]
fn test_not_like() {
    let predicate = prepare("[jcr:title] NOT LIKE '%draft%'");
    assert!(predicate.has_positive_clauses());
    assert_eq!(predicate.to_string(), "(*:* -jcr:title:/.*draft.*/)");
}

#[test]
fn test_case_insensitive_like_option() {
    let config = EngineConfig::default()
        .with_compile_options(CompileOptions::default().with_case_insensitive_like(true));
    let predicate = prepare_with(config, "[jcr:title] LIKE 'a_c'", &BindVariables::new()).unwrap();
    assert_eq!(
        predicate,
        Predicate::Regex {
            field: "jcr:title".to_string(),
            pattern: "(?i)a.c".to_string(),
            fold: CaseFold::Identity,
        }
    );
}

#[test]
fn test_pseudo_columns() {
    assert_eq!(
        prepare("LENGTH([jcr:title]) > 3"),
        Predicate::LongRange {
            field: ":len:jcr:title".to_string(),
            lower: 3,
            upper: i64::MAX,
            include_lower: false,
            include_upper: true,
        }
    );
    assert_eq!(
        prepare("DEPTH() = 2"),
        Predicate::LongRange {
            field: ":depth".to_string(),
            lower: 2,
            upper: 2,
            include_lower: true,
            include_upper: true,
        }
    );
    assert_eq!(prepare("LOCALNAME() = 'index'"), Predicate::term(":localname", "index"));
    assert_eq!(
        prepare("NAME() >= 'jcr:content'"),
        Predicate::Compare {
            field: ":name".to_string(),
            op: CompareOp::GreaterThanOrEqualTo,
            value: "jcr:content".to_string(),
            order: ValueOrder::Name,
            fold: CaseFold::Identity,
        }
    );
    assert_eq!(
        prepare("PATH() = '/content/a[1]'"),
        Predicate::term(":path", "/content/a")
    );
}

#[test]
fn test_name_like() {
    assert_eq!(
        prepare("NAME() LIKE 'jcr:%'"),
        Predicate::Wildcard {
            field: ":name".to_string(),
            pattern: "jcr:*".to_string(),
            fold: CaseFold::Identity,
        }
    );
}

#[test]
fn test_reference_option_filters_columns() {
    assert_eq!(
        prepare("REFERENCE() = 'id-1'"),
        Predicate::or(vec![
            Predicate::term("link", "id-1"),
            Predicate::term("owner", "id-1"),
        ])
    );

    let config = EngineConfig::default()
        .with_compile_options(CompileOptions::default().with_references(true, true, false));
    let predicate = prepare_with(config, "REFERENCE() = 'id-1'", &BindVariables::new()).unwrap();
    assert_eq!(predicate, Predicate::term("owner", "id-1"));
}

#[test]
fn test_single_column_flavor_existence() {
    let config = EngineConfig::default().with_compile_options(
        CompileOptions::default().with_flavor(IndexFlavor::SingleColumn {
            column: "size".to_string(),
        }),
    );
    let predicate = prepare_with(config, "[size] IS NOT NULL AND [size] > 1", &BindVariables::new()).unwrap();
    assert!(matches!(predicate, Predicate::LongRange { .. }));
}

#[test]
fn test_is_null() {
    assert_eq!(
        prepare("[size] IS NULL"),
        Predicate::not(Predicate::FieldExists {
            field: "size".to_string()
        })
    );
}

#[test]
fn test_between_dates() {
    match prepare(
        "[modified] BETWEEN CAST('2024-01-01' AS DATE) AND CAST('2024-02-01' AS DATE) EXCLUSIVE",
    ) {
        Predicate::LongRange {
            lower,
            upper,
            include_lower,
            include_upper,
            ..
        } => {
            assert_eq!(upper - lower, 31 * 24 * 60 * 60 * 1000);
            assert!(include_lower);
            assert!(!include_upper);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_bind_variables() {
    let mut binds = BindVariables::new();
    binds.insert("min".to_string(), BindValue::Single(contentql::Value::Long(10)));
    binds.insert(
        "kinds".to_string(),
        BindValue::List(vec![
            contentql::Value::String("a".to_string()),
            contentql::Value::String("b".to_string()),
        ]),
    );
    let predicate = prepare_with(
        EngineConfig::default(),
        "[size] > $min AND [jcr:title] IN ($kinds, 'c')",
        &binds,
    )
    .unwrap();
    match predicate {
        Predicate::Boolean { clauses } => {
            assert_eq!(clauses.len(), 2);
            match &clauses[1].predicate {
                Predicate::Boolean { clauses } => assert_eq!(clauses.len(), 3),
                other => panic!("unexpected {:?}", other),
            }
        }
        other => panic!("unexpected {:?}", other),
    }

    let err = prepare_with(EngineConfig::default(), "[size] > $max", &binds).unwrap_err();
    assert_eq!(
        err,
        Error::Compile(CompileError::MissingBindVariable("max".to_string()))
    );
}

#[test]
fn test_subqueries() {
    assert_eq!(
        prepare("[owner] IN (SELECT [jcr:uuid] FROM [nt:file])"),
        Predicate::MatchAll
    );
    assert_eq!(
        compile_error("[owner] = (SELECT [jcr:uuid] FROM [nt:file])"),
        CompileError::UnresolvedSubquery
    );

    let mut binds = BindVariables::new();
    binds.insert("ids".to_string(), BindValue::Pending);
    let predicate = prepare_with(
        EngineConfig::default(),
        "[size] > 1 AND [owner] IN ($ids, 'x')",
        &binds,
    )
    .unwrap();
    assert!(matches!(predicate, Predicate::LongRange { .. }));
}

#[test]
fn test_unsupported_operands_and_operators() {
    assert!(matches!(
        compile_error("[size] + [rating] > 3"),
        CompileError::UnsupportedOperand(_)
    ));
    assert!(matches!(
        compile_error("SCORE() > 0.5"),
        CompileError::UnsupportedOperand(_)
    ));
    assert!(matches!(
        compile_error("[modified] LIKE '2024%'"),
        CompileError::UnsupportedOperator { ref column, .. } if column == "modified"
    ));
    assert_eq!(
        compile_error("[missing] = 1"),
        CompileError::UndeclaredColumn("missing".to_string())
    );
}

#[test]
fn test_options_from_json() {
    let options: CompileOptions = serde_json::from_str(
        r#"{"flavor": {"single_column": {"column": "size"}}, "case_insensitive_like": true}"#,
    )
    .unwrap();
    assert_eq!(
        options.flavor,
        IndexFlavor::SingleColumn {
            column: "size".to_string()
        }
    );
    assert!(options.case_insensitive_like);
    assert!(options.include_references);
}

#[test]
fn test_compiled_query_serializes() {
    let engine = QueryEngine::default();
    let compiled = engine
        .prepare_default(
            "SELECT * FROM [nt:base] WHERE CONTAINS([jcr:title], 'rust')",
            &BindVariables::new(),
            &types(),
        )
        .unwrap();
    let json = serde_json::to_value(&compiled).unwrap();
    assert_eq!(json["include_scores"], true);
    assert_eq!(json["predicate"]["kind"], "phrase");
    assert_eq!(json["predicate"]["field"], ":ft:jcr:title");
}
