#![no_main]

use contentql::{BindVariables, ColumnTypes, PropertyType, QueryEngine};
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

fn engine() -> &'static QueryEngine {
    static ENGINE: OnceLock<QueryEngine> = OnceLock::new();
    ENGINE.get_or_init(QueryEngine::default)
}

fuzz_target!(|data: &[u8]| {
    // Convert bytes to string (ignore invalid UTF-8)
    if let Ok(sql) = std::str::from_utf8(data) {
        // Limit query length to prevent timeout
        if sql.len() > 10_000 {
            return;
        }

        // Parsing must never panic, and whatever parses must render to
        // text that parses back to the same command.
        let Ok(command) = engine().parse("JCR-SQL2", sql) else {
            return;
        };
        let rendered = command.to_string();
        let reparsed = engine()
            .parse("JCR-SQL2", &rendered)
            .expect("rendered query must parse");
        assert_eq!(reparsed, command, "{}", rendered);

        // Compiling must never panic either.
        if let Some(constraint) = command.constraint() {
            let types: ColumnTypes = [
                ("a", PropertyType::String),
                ("b", PropertyType::Long),
                ("c", PropertyType::Path),
                ("d", PropertyType::Decimal),
            ]
            .into_iter()
            .collect();
            let _ = engine().compile(constraint, &BindVariables::new(), &types);
        }
    }
});
