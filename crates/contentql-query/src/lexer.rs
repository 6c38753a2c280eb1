/// Tokenizer for the SQL-like query language
///
/// Splits query text into words, single-character symbols, quoted strings
/// and comments. Whitespace is discarded; keywords are not recognised here
/// because the parser matches words case-insensitively in context.
use contentql_core::{ParseError, Position};
use std::fmt;

/// Characters that form a token on their own.
pub const SYMBOLS: &str = "(){}*.,;+%?$!<>|=:-/]";

/// Classification of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Run of letters, digits and underscores
    Word,
    /// One character from [`SYMBOLS`]
    Symbol,
    /// Text delimited by `'`, `"` or `[` `]`, delimiters included
    QuotedString,
    /// `-- ...` to end of line, or `/* ... */`
    Comment,
}

/// A token with its source location
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
    pub position: Position,
}

impl Token {
    /// Case-insensitive comparison against a word or a symbol.
    pub fn matches(&self, expected: &str) -> bool {
        match self.kind {
            TokenKind::Word => self.text.eq_ignore_ascii_case(expected),
            TokenKind::Symbol => self.text == expected,
            _ => false,
        }
    }

    /// Whether the token is the given symbol character.
    pub fn is_symbol(&self, symbol: char) -> bool {
        self.kind == TokenKind::Symbol && self.text.starts_with(symbol)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.text)
    }
}

/// Tokenizer state
pub struct Lexer<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    position: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer from input string
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire input, comments included
    pub fn tokenize(&mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Get the next token, or `None` at end of input
    pub fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        self.skip_whitespace();

        let Some(ch) = self.current_char() else {
            return Ok(None);
        };
        let start = self.offset();
        let position = self.location();

        let kind = match ch {
            '-' if self.peek_char() == Some('-') => {
                while self.current_char().is_some_and(|c| c != '\n') {
                    self.advance();
                }
                TokenKind::Comment
            }
            '/' if self.peek_char() == Some('*') => {
                self.advance();
                self.advance();
                loop {
                    match self.current_char() {
                        Some('*') if self.peek_char() == Some('/') => {
                            self.advance();
                            self.advance();
                            break;
                        }
                        Some(_) => self.advance(),
                        None => {
                            return Err(ParseError::Lexical {
                                message: "unterminated comment".to_string(),
                                position,
                            })
                        }
                    }
                }
                TokenKind::Comment
            }
            '\'' | '"' | '[' => {
                self.read_quoted(ch, position)?;
                TokenKind::QuotedString
            }
            c if SYMBOLS.contains(c) => {
                self.advance();
                TokenKind::Symbol
            }
            c if is_word_char(c) => {
                while self.current_char().is_some_and(is_word_char) {
                    self.advance();
                }
                TokenKind::Word
            }
            c => {
                return Err(ParseError::Lexical {
                    message: format!("unexpected character '{}'", c),
                    position,
                })
            }
        };

        let end = self.offset();
        Ok(Some(Token {
            kind,
            text: self.input[start..end].to_string(),
            start,
            end,
            position,
        }))
    }

    fn read_quoted(&mut self, open: char, position: Position) -> Result<(), ParseError> {
        let close = closing_delimiter(open);
        self.advance(); // skip opening delimiter

        loop {
            match self.current_char() {
                Some('\\') => {
                    // Backslash pairs with whatever follows, so an escaped
                    // delimiter never closes the string.
                    self.advance();
                    if self.current_char().is_some() {
                        self.advance();
                    }
                }
                Some(c) if c == close => {
                    self.advance();
                    return Ok(());
                }
                Some(_) => self.advance(),
                None => {
                    return Err(ParseError::Lexical {
                        message: format!("unterminated quoted string starting with {}", open),
                        position,
                    })
                }
            }
        }
    }

    fn current_char(&self) -> Option<char> {
        self.chars.get(self.position).map(|(_, c)| *c)
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.position + 1).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.position)
            .map(|(i, _)| *i)
            .unwrap_or(self.input.len())
    }

    fn location(&self) -> Position {
        Position::new(self.offset(), self.line, self.column)
    }

    fn advance(&mut self) {
        if let Some(c) = self.current_char() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.position += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while self.current_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    /// Location just past the last character
    pub fn end_position(&self) -> Position {
        let mut line = 1;
        let mut column = 1;
        for (_, c) in &self.chars {
            if *c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        Position::new(self.input.len(), line, column)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn closing_delimiter(open: char) -> char {
    match open {
        '[' => ']',
        c => c,
    }
}

/// Strips the delimiters from a quoted token and unescapes the delimiter.
///
/// Text that is not quoted is returned unchanged.
pub fn unquote(text: &str) -> String {
    let mut chars = text.chars();
    let (Some(open), Some(last)) = (chars.next(), text.chars().last()) else {
        return text.to_string();
    };
    let close = closing_delimiter(open);
    if !matches!(open, '\'' | '"' | '[') || last != close || text.chars().count() < 2 {
        return text.to_string();
    }
    let body = &text[open.len_utf8()..text.len() - close.len_utf8()];

    let mut result = String::with_capacity(body.len());
    let mut iter = body.chars().peekable();
    while let Some(c) = iter.next() {
        if c == '\\' && iter.peek() == Some(&close) {
            result.push(close);
            iter.next();
        } else {
            result.push(c);
        }
    }
    result
}

/// Cursor over the significant tokens of one query.
///
/// Every parse call owns its own stream; tokens are consumed strictly left
/// to right and never pushed back.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    position: usize,
    end: Position,
}

impl TokenStream {
    /// Tokenizes `input`, dropping comments.
    pub fn new(input: &str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(input);
        let tokens = lexer
            .tokenize()?
            .into_iter()
            .filter(|t| t.kind != TokenKind::Comment)
            .collect();
        Ok(Self {
            tokens,
            position: 0,
            end: lexer.end_position(),
        })
    }

    /// Whether any token remains.
    pub fn has_next(&self) -> bool {
        self.position < self.tokens.len()
    }

    /// The next token, without consuming it.
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    /// The token `offset` places ahead of the next one.
    pub fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.position + offset)
    }

    /// Position of the next token, or of the end of input.
    pub fn position(&self) -> Position {
        self.peek().map(|t| t.position).unwrap_or(self.end)
    }

    /// Whether the next token matches `expected` (word or symbol).
    pub fn matches(&self, expected: &str) -> bool {
        self.peek().is_some_and(|t| t.matches(expected))
    }

    /// Whether the next tokens match `expected`, in order.
    pub fn matches_all(&self, expected: &[&str]) -> bool {
        expected
            .iter()
            .enumerate()
            .all(|(i, e)| self.peek_at(i).is_some_and(|t| t.matches(e)))
    }

    /// Whether the next token matches any of `expected`.
    pub fn matches_any(&self, expected: &[&str]) -> bool {
        expected.iter().any(|e| self.matches(e))
    }

    /// Whether the next token has the given kind.
    pub fn matches_kind(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    /// Consumes the next token if it matches `expected`.
    pub fn can_consume(&mut self, expected: &str) -> bool {
        if self.matches(expected) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    /// Consumes the next tokens if they all match, in order.
    pub fn can_consume_all(&mut self, expected: &[&str]) -> bool {
        if self.matches_all(expected) {
            self.position += expected.len();
            true
        } else {
            false
        }
    }

    /// Consumes and returns the next token.
    pub fn consume(&mut self) -> Result<Token, ParseError> {
        match self.tokens.get(self.position) {
            Some(token) => {
                self.position += 1;
                Ok(token.clone())
            }
            None => Err(ParseError::Syntax {
                message: "unexpected end of query".to_string(),
                position: self.end,
            }),
        }
    }

    /// Consumes the next token, which must match `expected`.
    pub fn expect(&mut self, expected: &str) -> Result<Token, ParseError> {
        match self.peek() {
            Some(token) if token.matches(expected) => self.consume(),
            Some(token) => Err(ParseError::Syntax {
                message: format!("expected '{}' but found {}", expected, token),
                position: token.position,
            }),
            None => Err(ParseError::Syntax {
                message: format!("expected '{}' but reached the end of the query", expected),
                position: self.end,
            }),
        }
    }

    /// A syntax error located at the next token.
    pub fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::Syntax {
                message: format!("expected {} but found {}", expected, token),
                position: token.position,
            },
            None => ParseError::Syntax {
                message: format!("expected {} but reached the end of the query", expected),
                position: self.end,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<(TokenKind, String)> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn test_simple_select() {
        let tokens = kinds("SELECT * FROM [nt:base]");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Word, "SELECT".to_string()),
                (TokenKind::Symbol, "*".to_string()),
                (TokenKind::Word, "FROM".to_string()),
                (TokenKind::QuotedString, "[nt:base]".to_string()),
            ]
        );
    }

    #[test]
    fn test_prefixed_name_splits_on_colon() {
        let tokens = kinds("nt:base");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1], (TokenKind::Symbol, ":".to_string()));
    }

    #[test]
    fn test_comments() {
        let tokens = kinds("a -- trailing\n/* block */ b");
        assert_eq!(tokens[1].0, TokenKind::Comment);
        assert_eq!(tokens[2], (TokenKind::Comment, "/* block */".to_string()));
        assert_eq!(tokens[3], (TokenKind::Word, "b".to_string()));
    }

    #[test]
    fn test_escaped_delimiter() {
        let tokens = kinds(r"'it\'s'");
        assert_eq!(tokens.len(), 1);
        assert_eq!(unquote(&tokens[0].1), "it's");
        assert_eq!(unquote(r"'50\%'"), r"50\%");
        assert_eq!(unquote("[jcr:title]"), "jcr:title");
        assert_eq!(unquote("plain"), "plain");
    }

    #[test]
    fn test_unterminated_string_reports_start() {
        let err = Lexer::new("a = 'oops").tokenize().unwrap_err();
        match err {
            ParseError::Lexical { position, .. } => {
                assert_eq!(position.column, 5);
                assert_eq!(position.index, 4);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_comment() {
        assert!(matches!(
            Lexer::new("a /* never closed").tokenize(),
            Err(ParseError::Lexical { .. })
        ));
    }

    #[test]
    fn test_line_and_column() {
        let tokens = Lexer::new("SELECT *\n  FROM x").tokenize().unwrap();
        assert_eq!(tokens[2].position.line, 2);
        assert_eq!(tokens[2].position.column, 3);
    }

    #[test]
    fn test_token_stream_skips_comments() {
        let mut stream = TokenStream::new("SELECT /* c */ *").unwrap();
        assert!(stream.can_consume("select"));
        assert!(stream.matches("*"));
        stream.consume().unwrap();
        assert!(!stream.has_next());
        assert!(stream.consume().is_err());
    }
}
