/// Full-text search expressions
///
/// Grammar, with implicit AND between adjacent terms:
///
/// ```text
/// Search   := Disjunct { "OR" Disjunct }
/// Disjunct := Term { Term }
/// Term     := [ "-" | "+" ] SimpleTerm
/// ```
///
/// A simple term is a bare word or a quoted phrase. `OR` is recognised only
/// in upper case; `or` is an ordinary word.
use contentql_core::{ParseError, Position};
use std::fmt;
use tracing::trace;

/// Characters that make a simple term a wildcard pattern.
pub const WILDCARDS: [char; 3] = ['*', '?', '%'];

/// A parsed full-text expression
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// A word or a quoted phrase (quotes removed)
    Simple(SimpleTerm),
    /// All terms must match
    Conjunction(Vec<Term>),
    /// Any term may match
    Disjunction(Vec<Term>),
    /// The term must not match
    Negation(Box<Term>),
}

/// A single word or phrase
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimpleTerm {
    pub value: String,
}

impl SimpleTerm {
    /// Creates a simple term.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Whether the value holds more than one word.
    pub fn is_quoted_phrase(&self) -> bool {
        self.value.split_whitespace().nth(1).is_some()
    }

    /// Whether the value contains wildcard characters.
    pub fn contains_wildcards(&self) -> bool {
        self.value.contains(WILDCARDS)
    }
}

impl Term {
    /// A simple term.
    pub fn simple(value: impl Into<String>) -> Self {
        Term::Simple(SimpleTerm::new(value))
    }

    /// A conjunction, collapsed to its only child when there is one.
    pub fn and(mut terms: Vec<Term>) -> Self {
        if terms.len() == 1 {
            terms.remove(0)
        } else {
            Term::Conjunction(terms)
        }
    }

    /// A disjunction, collapsed to its only child when there is one.
    pub fn or(mut terms: Vec<Term>) -> Self {
        if terms.len() == 1 {
            terms.remove(0)
        } else {
            Term::Disjunction(terms)
        }
    }

    /// A negation.
    pub fn not(term: Term) -> Self {
        Term::Negation(Box::new(term))
    }
}

impl fmt::Display for Term {
    /// Writes the expression back in the full-text syntax.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Simple(simple) => write!(f, "{}", simple),
            Term::Conjunction(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", term)?;
                }
                Ok(())
            }
            Term::Disjunction(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " OR ")?;
                    }
                    write!(f, "{}", term)?;
                }
                Ok(())
            }
            Term::Negation(inner) => write!(f, "-{}", inner),
        }
    }
}

impl fmt::Display for SimpleTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = &self.value;
        let needs_quotes = value.is_empty()
            || value.chars().any(|c| c.is_whitespace() || c == '"' || c == '\'')
            || value.starts_with(['-', '+'])
            || value == "OR";
        if !needs_quotes {
            return write!(f, "{}", value);
        }
        let quote = if value.contains('"') && !value.contains('\'') {
            '\''
        } else {
            '"'
        };
        write!(f, "{}", quote)?;
        for c in value.chars() {
            if c == quote || c == '\\' {
                write!(f, "\\")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, "{}", quote)
    }
}

/// Strips exactly one matching pair of leading and trailing quotes.
pub fn remove_quotes(text: &str) -> &str {
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

#[derive(Debug, Clone, PartialEq)]
enum TermToken {
    Word(String),
    Quoted(String),
    Minus,
    Plus,
}

/// Splits a full-text expression into words, quoted phrases and the
/// leading `-`/`+` markers.
fn tokenize(input: &str) -> Result<Vec<(TermToken, Position)>, ParseError> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut column = 1;
    let mut line = 1;

    // Tracks line/column while stepping through `chars`.
    let step = |i: &mut usize, column: &mut usize, line: &mut usize| {
        if chars[*i].1 == '\n' {
            *line += 1;
            *column = 1;
        } else {
            *column += 1;
        }
        *i += 1;
    };

    while i < chars.len() {
        let (offset, c) = chars[i];
        if c.is_whitespace() {
            step(&mut i, &mut column, &mut line);
            continue;
        }
        let position = Position::new(offset, line, column);

        let next_is_term = chars.get(i + 1).is_some_and(|(_, n)| !n.is_whitespace());
        if (c == '-' || c == '+') && next_is_term {
            step(&mut i, &mut column, &mut line);
            tokens.push((
                if c == '-' { TermToken::Minus } else { TermToken::Plus },
                position,
            ));
            continue;
        }

        if c == '"' || c == '\'' {
            let start = offset;
            step(&mut i, &mut column, &mut line);
            loop {
                match chars.get(i).map(|(_, c)| *c) {
                    Some('\\') => {
                        step(&mut i, &mut column, &mut line);
                        if i < chars.len() {
                            step(&mut i, &mut column, &mut line);
                        }
                    }
                    Some(q) if q == c => {
                        step(&mut i, &mut column, &mut line);
                        break;
                    }
                    Some(_) => step(&mut i, &mut column, &mut line),
                    None => {
                        return Err(ParseError::Lexical {
                            message: "unterminated quoted phrase".to_string(),
                            position,
                        })
                    }
                }
            }
            let end = chars.get(i).map(|(o, _)| *o).unwrap_or(input.len());
            tokens.push((TermToken::Quoted(input[start..end].to_string()), position));
            continue;
        }

        let start = offset;
        while i < chars.len() && !chars[i].1.is_whitespace() {
            step(&mut i, &mut column, &mut line);
        }
        let end = chars.get(i).map(|(o, _)| *o).unwrap_or(input.len());
        tokens.push((TermToken::Word(input[start..end].to_string()), position));
    }

    Ok(tokens)
}

/// Parser for full-text search expressions
#[derive(Debug, Clone, Copy, Default)]
pub struct FullTextParser;

impl FullTextParser {
    /// Create a new parser
    pub fn new() -> Self {
        Self
    }

    /// Parse an expression; `None` when it holds no terms.
    pub fn parse(&self, input: &str) -> Result<Option<Term>, ParseError> {
        let tokens = tokenize(input)?;
        let mut cursor = tokens.into_iter().peekable();

        let mut disjuncts = Vec::new();
        loop {
            let mut terms = Vec::new();
            while let Some((token, _)) = cursor.peek() {
                if matches!(token, TermToken::Word(w) if w == "OR") {
                    break;
                }
                if let Some(term) = Self::parse_term(&mut cursor)? {
                    terms.push(term);
                }
            }
            if !terms.is_empty() {
                disjuncts.push(Term::and(terms));
            }
            // Consume the OR that ended the disjunct, if any.
            if cursor.next().is_none() {
                break;
            }
        }

        trace!(input, disjuncts = disjuncts.len(), "parsed full-text expression");
        if disjuncts.is_empty() {
            return Ok(None);
        }
        Ok(Some(Term::or(disjuncts)))
    }

    fn parse_term<I>(cursor: &mut std::iter::Peekable<I>) -> Result<Option<Term>, ParseError>
    where
        I: Iterator<Item = (TermToken, Position)>,
    {
        let Some((token, position)) = cursor.next() else {
            return Ok(None);
        };
        let (negated, token) = match token {
            TermToken::Minus | TermToken::Plus => match cursor.next() {
                Some((next, _)) => (token == TermToken::Minus, next),
                None => {
                    return Err(ParseError::Syntax {
                        message: "expected a term after the sign".to_string(),
                        position,
                    })
                }
            },
            other => (false, other),
        };

        let simple = match token {
            TermToken::Word(word) => Term::simple(word),
            TermToken::Quoted(quoted) => Term::simple(unescape(&quoted)),
            TermToken::Minus | TermToken::Plus => {
                return Err(ParseError::Syntax {
                    message: "expected a term after the sign".to_string(),
                    position,
                })
            }
        };
        Ok(Some(if negated { Term::not(simple) } else { simple }))
    }
}

/// Removes the quotes around a phrase. A backslash escapes the character
/// after it, matching the pairing `tokenize` applies.
fn unescape(quoted: &str) -> String {
    let mut value = String::with_capacity(quoted.len());
    let mut chars = remove_quotes(quoted).chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => value.extend(chars.next()),
            c => value.push(c),
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Option<Term> {
        FullTextParser::new().parse(input).unwrap()
    }

    #[test]
    fn test_implicit_and() {
        assert_eq!(
            parse("a b"),
            Some(Term::Conjunction(vec![Term::simple("a"), Term::simple("b")]))
        );
    }

    #[test]
    fn test_or() {
        assert_eq!(
            parse("a OR b"),
            Some(Term::Disjunction(vec![Term::simple("a"), Term::simple("b")]))
        );
        // Lower-case "or" is just a word.
        assert_eq!(
            parse("a or b"),
            Some(Term::Conjunction(vec![
                Term::simple("a"),
                Term::simple("or"),
                Term::simple("b")
            ]))
        );
    }

    #[test]
    fn test_signs() {
        assert_eq!(parse("-a"), Some(Term::not(Term::simple("a"))));
        assert_eq!(parse("+a"), Some(Term::simple("a")));
        // A hyphen inside a word is part of the word.
        assert_eq!(parse("foo-bar"), Some(Term::simple("foo-bar")));
    }

    #[test]
    fn test_quoted_phrase() {
        assert_eq!(parse("\"a b\""), Some(Term::simple("a b")));
        assert_eq!(parse("'a b'"), Some(Term::simple("a b")));
        assert_eq!(parse("-\"a b\" c"), Some(Term::and(vec![
            Term::not(Term::simple("a b")),
            Term::simple("c"),
        ])));
    }

    #[test]
    fn test_empty() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("   "), None);
        assert_eq!(parse("OR"), None);
    }

    #[test]
    fn test_precedence_of_or() {
        assert_eq!(
            parse("a b OR c"),
            Some(Term::Disjunction(vec![
                Term::Conjunction(vec![Term::simple("a"), Term::simple("b")]),
                Term::simple("c"),
            ]))
        );
    }

    #[test]
    fn test_remove_quotes() {
        assert_eq!(remove_quotes("\"a\""), "a");
        assert_eq!(remove_quotes("'a'"), "a");
        assert_eq!(remove_quotes("\"\"a\"\""), "\"a\"");
        assert_eq!(remove_quotes("\"a'"), "\"a'");
        assert_eq!(remove_quotes("\""), "\"");
    }

    #[test]
    fn test_unterminated_phrase() {
        assert!(matches!(
            FullTextParser::new().parse("\"open"),
            Err(ParseError::Lexical { .. })
        ));
    }

    #[test]
    fn test_display_round_trip() {
        for input in [
            "a b",
            "a OR b c",
            "-a +b",
            "\"a b\" OR -c",
            "'say \"hi\"'",
            "\"it's \\\"x\\\"\"",
            "jcr* te?t",
            "\"OR\" \"-x\"",
            "'\"\\' z'",
            "\"a\\\\b c\"",
            "'back\\\\' \"x\"",
        ] {
            let term = parse(input).unwrap();
            let rendered = term.to_string();
            assert_eq!(parse(&rendered), Some(term), "round trip of {}", input);
        }
    }

    #[test]
    fn test_wildcards() {
        assert!(SimpleTerm::new("jcr*").contains_wildcards());
        assert!(SimpleTerm::new("te?t").contains_wildcards());
        assert!(!SimpleTerm::new("plain").contains_wildcards());
        assert!(SimpleTerm::new("a b").is_quoted_phrase());
    }
}
