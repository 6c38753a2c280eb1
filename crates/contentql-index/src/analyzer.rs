//! Text analysis shared by indexing and full-text compilation.
//!
//! Phrase predicates carry the analyzer's tokens, so the analyzer used
//! here must match the one the backend applied when indexing.

use std::fmt;

/// Splits text into index tokens.
pub trait Analyzer: Send + Sync + fmt::Debug {
    /// Name of this analysis chain.
    fn name(&self) -> &str;

    /// Tokens of `text`, in order.
    fn tokens(&self, text: &str) -> Vec<String>;

    /// Normalizes a single term without splitting it.
    fn normalize(&self, term: &str) -> String;

    /// Splits a wildcard pattern wherever `tokens` would split text, keeping
    /// `wildcards` inside the pieces. Each piece is normalized.
    fn pattern_pieces(&self, pattern: &str, _wildcards: &[char]) -> Vec<String> {
        vec![self.normalize(pattern)]
    }
}

/// Lowercases and splits on anything that is not a letter or digit.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardAnalyzer;

impl Analyzer for StandardAnalyzer {
    fn name(&self) -> &str {
        "standard"
    }

    fn tokens(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect()
    }

    fn normalize(&self, term: &str) -> String {
        term.to_lowercase()
    }

    fn pattern_pieces(&self, pattern: &str, wildcards: &[char]) -> Vec<String> {
        pattern
            .split(|c: char| !c.is_alphanumeric() && !wildcards.contains(&c))
            .filter(|p| !p.is_empty())
            .map(str::to_lowercase)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_tokens() {
        let analyzer = StandardAnalyzer;
        assert_eq!(analyzer.tokens("Hello, World-wide web!"), vec!["hello", "world", "wide", "web"]);
        assert!(analyzer.tokens(" ,;").is_empty());
    }

    #[test]
    fn test_pattern_pieces() {
        let wildcards = ['*', '?'];
        assert_eq!(StandardAnalyzer.pattern_pieces("Foo-Bar*", &wildcards), vec!["foo", "bar*"]);
        assert_eq!(StandardAnalyzer.pattern_pieces("*.log", &wildcards), vec!["*", "log"]);
        assert_eq!(StandardAnalyzer.pattern_pieces("te?t", &wildcards), vec!["te?t"]);
    }

    #[test]
    fn test_unicode_tokens() {
        assert_eq!(StandardAnalyzer.tokens("Çafé über"), vec!["çafé", "über"]);
    }
}
