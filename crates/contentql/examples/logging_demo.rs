use contentql::logging::LogConfig;
use contentql::{BindVariables, ColumnTypes, PropertyType, QueryEngine};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Trace level for the parser and compiler shows every predicate decision
    let _guard = LogConfig::trace_compiler().init();

    println!("=== contentql Logging Demo ===\n");

    let engine = QueryEngine::default();
    let types = ColumnTypes::new().with("size", PropertyType::Long);

    // Logs the LIKE degradation, the out-of-range short-circuit and the
    // subquery over-approximation.
    let compiled = engine.prepare_default(
        "SELECT * FROM [nt:base] WHERE [title] LIKE 'plain' OR [size] = 1.0E40 \
         OR [size] IN (SELECT [size] FROM [nt:file])",
        &BindVariables::new(),
        &types.with("title", PropertyType::String),
    )?;
    println!("\n{}", compiled);

    Ok(())
}
