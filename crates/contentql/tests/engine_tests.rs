use contentql::logging::{LogConfig, LogFormat};
use contentql::{
    BindVariables, ColumnTypes, CompileOptions, EngineConfig, Error, Predicate, PropertyType,
    QueryCommand, QueryEngine, QueryParser, SemanticError, SqlParser, TypeSystem,
};
use std::sync::Arc;
use std::thread;

/// Answers every query with a fixed folder listing.
struct FolderListing;

impl QueryParser for FolderListing {
    fn language(&self) -> &str {
        "folders"
    }

    fn parse(&self, _query: &str) -> contentql::Result<QueryCommand> {
        SqlParser::new().parse("SELECT * FROM [nt:folder]")
    }
}

#[test]
fn test_standard_languages_registered() {
    let engine = QueryEngine::default();
    assert_eq!(
        engine.parsers().languages(),
        vec!["JCR-SQL2".to_string(), "search".to_string()]
    );
    assert!(engine.parse("jcr-sql2", "SELECT * FROM [nt:base]").is_ok());
}

#[test]
fn test_register_and_remove_language() {
    let engine = QueryEngine::default();
    assert!(engine.parsers().add(Arc::new(FolderListing)).is_none());

    let command = engine.parse("Folders", "anything").unwrap();
    assert_eq!(command.to_string(), "SELECT * FROM [nt:folder]");

    assert!(engine.parsers().remove("folders").is_some());
    assert_eq!(
        engine.parse("folders", "anything").unwrap_err(),
        Error::Semantic(SemanticError::UnknownLanguage("folders".to_string()))
    );
}

#[test]
fn test_default_language() {
    let engine = QueryEngine::new(EngineConfig::default().with_default_language("search"));
    let compiled = engine
        .prepare_default("content", &BindVariables::new(), &ColumnTypes::new())
        .unwrap();
    assert!(compiled.include_scores);
    assert_eq!(compiled.predicate.to_string(), ":ft:\"content\"");
}

#[test]
fn test_custom_type_system() {
    let engine = QueryEngine::with_type_system(
        EngineConfig::default(),
        TypeSystem::standard().without(PropertyType::Boolean),
    );
    let err = engine
        .parse("JCR-SQL2", "SELECT * FROM [nt:base] WHERE [flag] = TRUE")
        .unwrap_err();
    assert!(matches!(err, Error::Semantic(SemanticError::InvalidLiteral { .. })));
}

#[test]
fn test_config_from_json() {
    let config: EngineConfig = serde_json::from_str(
        r#"{"default_language": "search", "compile": {"flavor": "full_text"}}"#,
    )
    .unwrap();
    assert_eq!(config.default_language, "search");
    assert_eq!(config.compile.flavor, contentql::IndexFlavor::FullText);
    assert_eq!(config.compile.include_weak_references, CompileOptions::default().include_weak_references);

    let json = serde_json::to_string(&config).unwrap();
    let back: EngineConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

#[test]
fn test_shared_across_threads() {
    let engine = Arc::new(QueryEngine::default());
    let types = Arc::new(ColumnTypes::new().with("n", PropertyType::Long));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let engine = Arc::clone(&engine);
            let types = Arc::clone(&types);
            thread::spawn(move || {
                let sql = format!("SELECT * FROM [nt:base] WHERE [n] = {}", i);
                engine
                    .prepare_default(&sql, &BindVariables::new(), &types)
                    .unwrap()
                    .predicate
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let expected = Predicate::LongRange {
            field: "n".to_string(),
            lower: i as i64,
            upper: i as i64,
            include_lower: true,
            include_upper: true,
        };
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn test_compile_parsed_constraint() {
    let engine = QueryEngine::default();
    let command = engine
        .parse("JCR-SQL2", "SELECT * FROM [nt:base] WHERE ISCHILDNODE('/content')")
        .unwrap();
    let compiled = engine
        .compile(command.constraint().unwrap(), &BindVariables::new(), &ColumnTypes::new())
        .unwrap();
    assert_eq!(compiled.predicate, Predicate::term(":parent", "/content"));
}

#[test]
fn test_file_logging() {
    let dir = tempfile::tempdir().unwrap();
    let guard = LogConfig::debug()
        .with_file(dir.path().join("contentql.log"))
        .with_format(LogFormat::Compact)
        .init();
    assert!(guard.is_some());

    QueryEngine::default()
        .prepare_default("SELECT * FROM [nt:base]", &BindVariables::new(), &ColumnTypes::new())
        .unwrap();
    drop(guard);

    let written = std::fs::read_dir(dir.path()).unwrap().count();
    assert!(written >= 1);
}
