#![no_main]

use contentql::FullTextParser;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(expression) = std::str::from_utf8(data) {
        if expression.len() > 10_000 {
            return;
        }

        let parser = FullTextParser::new();
        if let Ok(Some(term)) = parser.parse(expression) {
            let rendered = term.to_string();
            assert_eq!(parser.parse(&rendered).ok().flatten(), Some(term), "{}", rendered);
        }
    }
});
