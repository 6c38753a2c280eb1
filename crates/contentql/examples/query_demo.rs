/// Query Compilation Demo
///
/// Parses a few content queries and prints the index predicates they
/// compile to.
use contentql::{
    BindValue, BindVariables, ColumnTypes, EngineConfig, PropertyType, QueryEngine, Value,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== contentql Query Compilation Demo ===\n");

    let engine = QueryEngine::new(EngineConfig::default());

    // Declared types of the indexed columns
    let types = ColumnTypes::new()
        .with("jcr:title", PropertyType::String)
        .with("jcr:lastModified", PropertyType::Date)
        .with("size", PropertyType::Long)
        .with("author", PropertyType::Reference);

    let mut binds = BindVariables::new();
    binds.insert("min".to_string(), BindValue::Single(Value::Long(1024)));

    let queries = [
        "SELECT * FROM [nt:file] WHERE [size] >= $min",
        "SELECT * FROM [nt:file] WHERE LOWER([jcr:title]) LIKE 'report%' AND NOT [size] > 1000000",
        "SELECT * FROM [nt:file] WHERE [jcr:lastModified] > CAST('2024-06-01T00:00:00.000Z' AS DATE)",
        "SELECT * FROM [nt:file] WHERE ISDESCENDANTNODE('/content/docs') AND CONTAINS(*, 'rust -draft')",
        "SELECT * FROM [nt:file] WHERE REFERENCE() = 'f81d4fae-7dec-11d0-a765-00a0c91e6bf6'",
    ];

    for sql in queries {
        let compiled = engine.prepare("JCR-SQL2", sql, &binds, &types)?;
        println!("{}\n  => {}\n", sql, compiled);
    }

    println!("Bare full-text search:");
    let compiled = engine.prepare("search", "\"content repository\" OR jcr", &binds, &types)?;
    println!("  => {}", compiled);

    Ok(())
}
