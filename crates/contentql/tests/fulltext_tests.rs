use contentql::{
    BindValue, BindVariables, Clause, ColumnTypes, CompileError, Error, Predicate, QueryEngine,
    Term, Value,
};

fn full_text(expression: &str) -> Predicate {
    let engine = QueryEngine::default();
    let sql = format!(
        "SELECT * FROM [nt:base] WHERE CONTAINS(*, '{}')",
        expression.replace('\'', "\\'")
    );
    engine
        .prepare_default(&sql, &BindVariables::new(), &ColumnTypes::new())
        .unwrap()
        .predicate
}

fn phrase(terms: &[&str]) -> Predicate {
    Predicate::Phrase {
        field: ":ft".to_string(),
        terms: terms.iter().map(|t| t.to_string()).collect(),
        slop: 0,
    }
}

#[test]
fn test_parse_full_text() {
    let engine = QueryEngine::default();
    assert_eq!(
        engine.parse_full_text("apache OR \"content repository\"").unwrap(),
        Some(Term::Disjunction(vec![
            Term::simple("apache"),
            Term::simple("content repository"),
        ]))
    );
    assert_eq!(engine.parse_full_text("  ").unwrap(), None);
    assert!(matches!(
        engine.parse_full_text("\"unterminated"),
        Err(Error::Parse(_))
    ));
}

#[test]
fn test_single_word() {
    assert_eq!(full_text("Rust"), phrase(&["rust"]));
}

#[test]
fn test_quoted_phrase_keeps_token_order() {
    assert_eq!(
        full_text("\"Query Object Model\""),
        phrase(&["query", "object", "model"])
    );
}

#[test]
fn test_conjunction_with_negated_phrase() {
    assert_eq!(
        full_text("jcr -\"old text\""),
        Predicate::Boolean {
            clauses: vec![
                Clause::must(phrase(&["jcr"])),
                Clause::must_not(phrase(&["old", "text"])),
            ]
        }
    );
}

#[test]
fn test_disjunction_drops_negated_terms() {
    assert_eq!(
        full_text("a OR -b"),
        Predicate::Boolean {
            clauses: vec![Clause::should(phrase(&["a"]))]
        }
    );
}

#[test]
fn test_only_negations() {
    let predicate = full_text("-draft");
    assert_eq!(
        predicate,
        Predicate::Boolean {
            clauses: vec![
                Clause::must(Predicate::MatchAll),
                Clause::must_not(phrase(&["draft"])),
            ]
        }
    );
    assert!(predicate.has_positive_clauses());
}

#[test]
fn test_empty_expression_matches_nothing() {
    let predicate = full_text("");
    assert!(predicate.is_empty_phrase());
}

#[test]
fn test_wildcards() {
    assert_eq!(
        full_text("Repo*"),
        Predicate::Wildcard {
            field: ":ft".to_string(),
            pattern: "repo*".to_string(),
            fold: contentql::CaseFold::Identity,
        }
    );
    assert_eq!(
        full_text("?ndex"),
        Predicate::Regex {
            field: ":ft".to_string(),
            pattern: ".ndex".to_string(),
            fold: contentql::CaseFold::Identity,
        }
    );
}

#[test]
fn test_bound_expression() {
    let engine = QueryEngine::default();
    let mut binds = BindVariables::new();
    binds.insert("q".to_string(), BindValue::Single(Value::String("cats -dogs".to_string())));
    let compiled = engine
        .prepare_default(
            "SELECT * FROM [nt:base] WHERE CONTAINS([body], $q)",
            &binds,
            &ColumnTypes::new(),
        )
        .unwrap();
    assert!(compiled.include_scores);
    assert_eq!(compiled.to_string(), "(+:ft:body:\"cats\" -:ft:body:\"dogs\") [scored]");

    binds.insert("q".to_string(), BindValue::Single(Value::Long(42)));
    let compiled = engine
        .prepare_default(
            "SELECT * FROM [nt:base] WHERE CONTAINS(*, $q)",
            &binds,
            &ColumnTypes::new(),
        )
        .unwrap();
    assert_eq!(compiled.predicate, phrase(&["42"]));
}

#[test]
fn test_bound_expression_must_parse() {
    let engine = QueryEngine::default();
    let mut binds = BindVariables::new();
    binds.insert("q".to_string(), BindValue::Single(Value::String("\"open".to_string())));
    let err = engine
        .prepare_default(
            "SELECT * FROM [nt:base] WHERE CONTAINS(*, $q)",
            &binds,
            &ColumnTypes::new(),
        )
        .unwrap_err();
    assert!(matches!(err, Error::Compile(CompileError::FullText(_))));
}

#[test]
fn test_scores_only_with_full_text() {
    let engine = QueryEngine::default();
    let types = ColumnTypes::new().with("size", contentql::PropertyType::Long);
    let compiled = engine
        .prepare_default(
            "SELECT * FROM [nt:base] WHERE [size] = 1 OR NOT CONTAINS(*, 'x')",
            &BindVariables::new(),
            &types,
        )
        .unwrap();
    assert!(compiled.include_scores);

    let compiled = engine
        .prepare_default("SELECT * FROM [nt:base] WHERE [size] = 1", &BindVariables::new(), &types)
        .unwrap();
    assert!(!compiled.include_scores);
}

#[test]
fn test_backslash_and_mixed_quotes_round_trip() {
    let engine = QueryEngine::default();
    for expression in [
        "'\"\\' z'",
        "\"C:\\\\temp dir\"",
        "'ends with \\\\' next",
        "\"both \\\" and ' here\"",
        "a\\b -'q\"uote'",
    ] {
        let term = engine.parse_full_text(expression).unwrap();
        let rendered = term.as_ref().unwrap().to_string();
        assert_eq!(
            engine.parse_full_text(&rendered).unwrap(),
            term,
            "{} rendered as {}",
            expression,
            rendered
        );
    }

    assert_eq!(
        engine.parse_full_text("'\"\\' z'").unwrap(),
        Some(Term::simple("\"' z"))
    );
    assert_eq!(
        engine.parse_full_text("\"C:\\\\temp dir\"").unwrap(),
        Some(Term::simple("C:\\temp dir"))
    );
}

#[test]
fn test_wildcard_follows_token_boundaries() {
    assert_eq!(
        full_text("Foo-Bar*"),
        Predicate::Boolean {
            clauses: vec![
                Clause::must(phrase(&["foo"])),
                Clause::must(Predicate::Wildcard {
                    field: ":ft".to_string(),
                    pattern: "bar*".to_string(),
                    fold: contentql::CaseFold::Identity,
                }),
            ]
        }
    );
    assert_eq!(
        full_text("(Draft*"),
        Predicate::Wildcard {
            field: ":ft".to_string(),
            pattern: "draft*".to_string(),
            fold: contentql::CaseFold::Identity,
        }
    );
}

#[test]
fn test_conjunction_drops_negated_empty_phrase() {
    assert_eq!(
        full_text("jcr -\"!!\""),
        Predicate::Boolean {
            clauses: vec![Clause::must(phrase(&["jcr"]))]
        }
    );
    assert_eq!(
        full_text("-\"!!\" -\"#,\" -old"),
        Predicate::Boolean {
            clauses: vec![
                Clause::must(Predicate::MatchAll),
                Clause::must_not(phrase(&["old"])),
            ]
        }
    );
}
