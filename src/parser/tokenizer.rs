//! Tokenizer for invariant expressions
//!
//! Works on the raw bytes of the expression and hands out zero-copy slices of the
//! input. Literal text (numbers, strings, dates) is kept verbatim; the parser and
//! compiler decide how to interpret it.

use super::error::{ParseError, ParseResult};
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

/// Token produced by the tokenizer
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'input> {
    // Literals - kept as source slices, interpreted by the parser
    /// Integer literal (e.g., 42)
    Integer(&'input str),
    /// Decimal literal (e.g., 3.14)
    Decimal(&'input str),
    /// String literal content between single quotes, escapes unprocessed
    String(&'input str),
    /// Date literal without the leading `@` (e.g., 2023-01-01)
    Date(&'input str),
    /// DateTime literal without the leading `@` (e.g., 2023-01-01T12:00:00Z)
    DateTime(&'input str),
    /// Boolean literal true
    True,
    /// Boolean literal false
    False,

    /// Plain identifier
    Identifier(&'input str),
    /// Backtick-delimited identifier content
    DelimitedIdentifier(&'input str),
    /// `$name` variable (name without the dollar sign)
    Dollar(&'input str),
    /// Percent sign (%) introducing an environment constant
    Percent,

    /// Addition operator (+)
    Plus,
    /// Subtraction operator (-)
    Minus,
    /// Multiplication operator (*)
    Multiply,
    /// Division operator (/)
    Divide,
    /// Modulo operator (mod keyword)
    Mod,
    /// Integer division operator (div keyword)
    Div,
    /// Equality operator (=)
    Equal,
    /// Inequality operator (!=)
    NotEqual,
    /// Less than operator (<)
    LessThan,
    /// Less than or equal operator (<=)
    LessThanOrEqual,
    /// Greater than operator (>)
    GreaterThan,
    /// Greater than or equal operator (>=)
    GreaterThanOrEqual,
    /// Equivalence operator (~)
    Equivalent,
    /// Non-equivalence operator (!~)
    NotEquivalent,
    /// Logical AND operator (and keyword)
    And,
    /// Logical OR operator (or keyword)
    Or,
    /// Logical XOR operator (xor keyword)
    Xor,
    /// Logical implication operator (implies keyword)
    Implies,
    /// Union operator (|)
    Union,
    /// Membership operator (in keyword)
    In,
    /// Contains operator (contains keyword)
    Contains,
    /// Ampersand operator (&) for string concatenation
    Ampersand,
    /// Type checking operator (is keyword)
    Is,
    /// Type casting operator (as keyword)
    As,

    /// Left parenthesis (
    LeftParen,
    /// Right parenthesis )
    RightParen,
    /// Left square bracket [
    LeftBracket,
    /// Right square bracket ]
    RightBracket,
    /// Left curly brace {
    LeftBrace,
    /// Right curly brace }
    RightBrace,
    /// Dot operator (.) for property access
    Dot,
    /// Comma separator (,)
    Comma,
}

impl<'input> Token<'input> {
    /// Keyword spelling of this token when it is a reserved word
    ///
    /// Keywords may still be used as member and function names after a dot
    /// (`code.contains('x')`, `value.is(Decimal)`).
    pub fn keyword_text(&self) -> Option<&'static str> {
        Some(match self {
            Token::True => "true",
            Token::False => "false",
            Token::And => "and",
            Token::Or => "or",
            Token::Xor => "xor",
            Token::Implies => "implies",
            Token::Is => "is",
            Token::As => "as",
            Token::In => "in",
            Token::Contains => "contains",
            Token::Div => "div",
            Token::Mod => "mod",
            _ => return None,
        })
    }
}

static KEYWORD_TABLE: Lazy<FxHashMap<&'static str, Token<'static>>> = Lazy::new(|| {
    let mut map = FxHashMap::default();
    map.insert("true", Token::True);
    map.insert("false", Token::False);
    map.insert("and", Token::And);
    map.insert("or", Token::Or);
    map.insert("xor", Token::Xor);
    map.insert("implies", Token::Implies);
    map.insert("is", Token::Is);
    map.insert("as", Token::As);
    map.insert("in", Token::In);
    map.insert("contains", Token::Contains);
    map.insert("div", Token::Div);
    map.insert("mod", Token::Mod);
    map
});

/// Byte-oriented tokenizer over one expression
#[derive(Clone)]
pub struct Tokenizer<'input> {
    input: &'input str,
    bytes: &'input [u8],
    pos: usize,
    token_start: usize,
}

impl<'input> Tokenizer<'input> {
    /// Create a new tokenizer
    pub fn new(input: &'input str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            token_start: 0,
        }
    }

    /// Byte offset where the most recently returned token starts
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    /// Current byte offset
    pub fn position(&self) -> usize {
        self.pos
    }

    fn slice(&self, start: usize, end: usize) -> &'input str {
        // Boundaries are always ASCII bytes, so they fall on char boundaries
        &self.input[start..end]
    }

    #[inline(always)]
    fn is_id_start(ch: u8) -> bool {
        matches!(ch, b'A'..=b'Z' | b'a'..=b'z' | b'_')
    }

    #[inline(always)]
    fn is_id_continue(ch: u8) -> bool {
        matches!(ch, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_')
    }

    fn parse_number(&mut self) -> Token<'input> {
        let start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }

        // A dot only belongs to the number when digits follow (`1.5` vs `1.toString()`)
        let is_decimal = self.bytes.get(self.pos) == Some(&b'.')
            && self
                .bytes
                .get(self.pos + 1)
                .is_some_and(|b| b.is_ascii_digit());

        if is_decimal {
            self.pos += 1;
            while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
            Token::Decimal(self.slice(start, self.pos))
        } else {
            Token::Integer(self.slice(start, self.pos))
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> ParseResult<()> {
        loop {
            while self.pos < self.bytes.len()
                && matches!(self.bytes[self.pos], b' ' | b'\t' | b'\r' | b'\n')
            {
                self.pos += 1;
            }

            match (self.bytes.get(self.pos), self.bytes.get(self.pos + 1)) {
                (Some(b'/'), Some(b'/')) => {
                    while self.pos < self.bytes.len() && !matches!(self.bytes[self.pos], b'\n') {
                        self.pos += 1;
                    }
                }
                (Some(b'/'), Some(b'*')) => {
                    let start = self.pos;
                    self.pos += 2;
                    loop {
                        if self.pos + 1 >= self.bytes.len() {
                            return Err(ParseError::UnexpectedToken {
                                token: "unclosed comment".to_string(),
                                position: start,
                            });
                        }
                        if self.bytes[self.pos] == b'*' && self.bytes[self.pos + 1] == b'/' {
                            self.pos += 2;
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn parse_identifier(&mut self) -> &'input str {
        let start = self.pos;
        while self.pos < self.bytes.len() && Self::is_id_continue(self.bytes[self.pos]) {
            self.pos += 1;
        }
        self.slice(start, self.pos)
    }

    /// Scan a quoted run (string or delimited identifier), honouring backslash escapes
    fn parse_quoted(&mut self, quote: u8) -> ParseResult<&'input str> {
        let opening = self.pos;
        self.pos += 1;
        let start = self.pos;

        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b if b == quote => {
                    let content = self.slice(start, self.pos);
                    self.pos += 1;
                    return Ok(content);
                }
                b'\\' => {
                    self.pos += if self.pos + 1 < self.bytes.len() { 2 } else { 1 };
                }
                _ => self.pos += 1,
            }
        }

        Err(ParseError::UnclosedString { position: opening })
    }

    fn parse_datetime_literal(&mut self) -> ParseResult<Token<'input>> {
        self.pos += 1; // '@'
        let start = self.pos;
        while self.pos < self.bytes.len()
            && matches!(self.bytes[self.pos], b'0'..=b'9' | b'-' | b':' | b'T' | b'.' | b'+' | b'Z')
        {
            self.pos += 1;
        }

        let text = self.slice(start, self.pos);
        if text.is_empty() || text.starts_with('T') {
            return Err(ParseError::InvalidLiteral {
                literal_type: "date".to_string(),
                value: format!("@{text}"),
                position: start - 1,
            });
        }

        Ok(if text.contains('T') {
            Token::DateTime(text)
        } else {
            Token::Date(text)
        })
    }

    /// Produce the next token, or `None` at end of input
    pub fn next_token(&mut self) -> ParseResult<Option<Token<'input>>> {
        self.skip_whitespace_and_comments()?;
        self.token_start = self.pos;

        let Some(&current) = self.bytes.get(self.pos) else {
            return Ok(None);
        };

        let next = self.bytes.get(self.pos + 1).copied();
        let (token, width) = match current {
            b'.' => (Token::Dot, 1),
            b'(' => (Token::LeftParen, 1),
            b')' => (Token::RightParen, 1),
            b',' => (Token::Comma, 1),
            b'[' => (Token::LeftBracket, 1),
            b']' => (Token::RightBracket, 1),
            b'{' => (Token::LeftBrace, 1),
            b'}' => (Token::RightBrace, 1),
            b'+' => (Token::Plus, 1),
            b'-' => (Token::Minus, 1),
            b'*' => (Token::Multiply, 1),
            b'/' => (Token::Divide, 1),
            b'&' => (Token::Ampersand, 1),
            b'|' => (Token::Union, 1),
            b'~' => (Token::Equivalent, 1),
            b'%' => (Token::Percent, 1),
            b'=' => (Token::Equal, 1),
            b'<' if next == Some(b'=') => (Token::LessThanOrEqual, 2),
            b'<' => (Token::LessThan, 1),
            b'>' if next == Some(b'=') => (Token::GreaterThanOrEqual, 2),
            b'>' => (Token::GreaterThan, 1),
            b'!' if next == Some(b'=') => (Token::NotEqual, 2),
            b'!' if next == Some(b'~') => (Token::NotEquivalent, 2),

            b'0'..=b'9' => return Ok(Some(self.parse_number())),
            b'\'' => return self.parse_quoted(b'\'').map(|s| Some(Token::String(s))),
            b'`' => {
                return self
                    .parse_quoted(b'`')
                    .map(|s| Some(Token::DelimitedIdentifier(s)));
            }
            b'@' => return self.parse_datetime_literal().map(Some),
            b'$' => {
                self.pos += 1;
                if !self.bytes.get(self.pos).is_some_and(|b| Self::is_id_start(*b)) {
                    return Err(ParseError::ExpectedToken {
                        expected: "variable name after '$'".to_string(),
                        position: self.pos,
                    });
                }
                return Ok(Some(Token::Dollar(self.parse_identifier())));
            }

            ch if Self::is_id_start(ch) => {
                let ident = self.parse_identifier();
                let token = KEYWORD_TABLE
                    .get(ident)
                    .cloned()
                    .unwrap_or(Token::Identifier(ident));
                return Ok(Some(token));
            }

            _ => {
                let ch = self.input[self.pos..].chars().next().unwrap_or('?');
                return Err(ParseError::UnexpectedToken {
                    token: ch.to_string(),
                    position: self.pos,
                });
            }
        };

        self.pos += width;
        Ok(Some(token))
    }

    /// Tokenize the whole input
    pub fn tokenize_all(&mut self) -> ParseResult<Vec<Token<'input>>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token<'_>> {
        Tokenizer::new(input).tokenize_all().unwrap()
    }

    #[test]
    fn test_operators_and_keywords() {
        assert_eq!(
            tokens("a <= 1 and b != 'x' implies c !~ d"),
            vec![
                Token::Identifier("a"),
                Token::LessThanOrEqual,
                Token::Integer("1"),
                Token::And,
                Token::Identifier("b"),
                Token::NotEqual,
                Token::String("x"),
                Token::Implies,
                Token::Identifier("c"),
                Token::NotEquivalent,
                Token::Identifier("d"),
            ]
        );
    }

    #[test]
    fn test_number_followed_by_member_access() {
        assert_eq!(
            tokens("1.5 2.exists()"),
            vec![
                Token::Decimal("1.5"),
                Token::Integer("2"),
                Token::Dot,
                Token::Identifier("exists"),
                Token::LeftParen,
                Token::RightParen,
            ]
        );
    }

    #[test]
    fn test_special_literals() {
        assert_eq!(
            tokens("@2020-01-02 @2020-01-02T10:00:00Z $this %`vs-x` // trailing"),
            vec![
                Token::Date("2020-01-02"),
                Token::DateTime("2020-01-02T10:00:00Z"),
                Token::Dollar("this"),
                Token::Percent,
                Token::DelimitedIdentifier("vs-x"),
            ]
        );
    }

    #[test]
    fn test_unclosed_string() {
        let err = Tokenizer::new("name = 'abc").tokenize_all().unwrap_err();
        assert_eq!(err, ParseError::UnclosedString { position: 7 });
    }

    #[test]
    fn test_unknown_character() {
        let err = Tokenizer::new("a # b").tokenize_all().unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { position: 2, .. }));
    }
}
