//! Pratt parser for invariant expressions
//!
//! Operator precedence is data-driven: `get_precedence` holds the whole table and
//! the main loop climbs it. Invocation (`.`/`[]`) is handled as postfix on every
//! primary, which makes `-a.b` parse as `-(a.b)`.
//!
//! Nesting is bounded by [`MAX_NESTING_DEPTH`]. The limit applies both to the
//! parser's own recursion and to the depth of the tree it builds, so long
//! left-nested chains (`a.not().not()...`, `1 + 1 + ...`) are rejected too.

use super::error::{ParseError, ParseResult};
use super::tokenizer::{Token, Tokenizer};
use crate::ast::{BinaryOperator, ExpressionNode, LiteralValue, UnaryOperator};
use smallvec::SmallVec;

/// Deepest expression tree the parser accepts
///
/// Lowering, evaluation and drop all walk the tree recursively.
pub const MAX_NESTING_DEPTH: usize = 128;

/// A parsed subtree together with its depth
type Nested = (ExpressionNode, usize);

/// Operator precedence levels (higher = tighter binding)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    /// Lowest precedence - implies (right associative)
    Implies = 1,
    /// Logical OR and XOR
    Or = 2,
    /// Logical AND
    And = 3,
    /// Membership operators (in, contains)
    Membership = 4,
    /// Equality operators (=, !=, ~, !~)
    Equality = 5,
    /// Inequality operators (<, >, <=, >=)
    Inequality = 6,
    /// Union operator (|)
    Union = 7,
    /// Type operators (is, as)
    Type = 8,
    /// Additive operators (+, -, &)
    Additive = 9,
    /// Multiplicative operators (*, /, div, mod)
    Multiplicative = 10,
}

impl Precedence {
    /// Get the next higher precedence level for left-associative operators
    #[inline(always)]
    pub const fn next_level(self) -> Self {
        match self {
            Precedence::Implies => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Membership,
            Precedence::Membership => Precedence::Equality,
            Precedence::Equality => Precedence::Inequality,
            Precedence::Inequality => Precedence::Union,
            Precedence::Union => Precedence::Type,
            Precedence::Type => Precedence::Additive,
            Precedence::Additive => Precedence::Multiplicative,
            Precedence::Multiplicative => Precedence::Multiplicative,
        }
    }

    /// Check if this precedence is right associative
    #[inline(always)]
    pub const fn is_right_associative(self) -> bool {
        matches!(self, Precedence::Implies)
    }
}

#[inline(always)]
fn get_precedence(token: &Token<'_>) -> Option<Precedence> {
    match token {
        Token::Equal | Token::NotEqual | Token::Equivalent | Token::NotEquivalent => {
            Some(Precedence::Equality)
        }
        Token::Plus | Token::Minus | Token::Ampersand => Some(Precedence::Additive),
        Token::And => Some(Precedence::And),
        Token::Or | Token::Xor => Some(Precedence::Or),
        Token::Multiply | Token::Divide | Token::Div | Token::Mod => {
            Some(Precedence::Multiplicative)
        }
        Token::LessThan
        | Token::LessThanOrEqual
        | Token::GreaterThan
        | Token::GreaterThanOrEqual => Some(Precedence::Inequality),
        Token::In | Token::Contains => Some(Precedence::Membership),
        Token::Is | Token::As => Some(Precedence::Type),
        Token::Union => Some(Precedence::Union),
        Token::Implies => Some(Precedence::Implies),
        _ => None,
    }
}

#[inline(always)]
fn token_to_binary_op(token: &Token<'_>) -> Option<BinaryOperator> {
    match token {
        Token::Equal => Some(BinaryOperator::Equal),
        Token::NotEqual => Some(BinaryOperator::NotEqual),
        Token::And => Some(BinaryOperator::And),
        Token::Or => Some(BinaryOperator::Or),
        Token::Equivalent => Some(BinaryOperator::Equivalent),
        Token::NotEquivalent => Some(BinaryOperator::NotEquivalent),
        Token::LessThan => Some(BinaryOperator::LessThan),
        Token::LessThanOrEqual => Some(BinaryOperator::LessThanOrEqual),
        Token::GreaterThan => Some(BinaryOperator::GreaterThan),
        Token::GreaterThanOrEqual => Some(BinaryOperator::GreaterThanOrEqual),
        Token::In => Some(BinaryOperator::In),
        Token::Contains => Some(BinaryOperator::Contains),
        Token::Plus => Some(BinaryOperator::Add),
        Token::Minus => Some(BinaryOperator::Subtract),
        Token::Multiply => Some(BinaryOperator::Multiply),
        Token::Divide => Some(BinaryOperator::Divide),
        Token::Div => Some(BinaryOperator::IntegerDivide),
        Token::Mod => Some(BinaryOperator::Modulo),
        Token::Union => Some(BinaryOperator::Union),
        Token::Ampersand => Some(BinaryOperator::Concatenate),
        Token::Xor => Some(BinaryOperator::Xor),
        Token::Implies => Some(BinaryOperator::Implies),
        _ => None,
    }
}

/// Pratt parser over a single expression
pub struct PrattParser<'input> {
    tokenizer: Tokenizer<'input>,
    current_token: Option<Token<'input>>,
    current_position: usize,
    nesting: usize,
}

impl<'input> PrattParser<'input> {
    /// Create a parser positioned on the first token
    pub fn new(input: &'input str) -> ParseResult<Self> {
        let mut parser = Self {
            tokenizer: Tokenizer::new(input),
            current_token: None,
            current_position: 0,
            nesting: 0,
        };
        parser.advance()?;
        Ok(parser)
    }

    #[inline(always)]
    fn advance(&mut self) -> ParseResult<()> {
        self.current_token = self.tokenizer.next_token()?;
        self.current_position = self.tokenizer.token_start();
        Ok(())
    }

    #[inline(always)]
    fn current(&self) -> Option<&Token<'input>> {
        self.current_token.as_ref()
    }

    fn unexpected(&self, context: &str) -> ParseError {
        match &self.current_token {
            Some(token) => ParseError::UnexpectedToken {
                token: format!("{token:?} ({context})"),
                position: self.current_position,
            },
            None => ParseError::UnexpectedEndOfInput {
                position: self.tokenizer.position(),
            },
        }
    }

    /// Depth of a node built over a child of the given depth
    fn deeper(&self, depth: usize) -> ParseResult<usize> {
        if depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::TooDeep {
                limit: MAX_NESTING_DEPTH,
                position: self.current_position,
            });
        }
        Ok(depth + 1)
    }

    /// Run a recursive step one nesting level down
    fn nested<T>(&mut self, step: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        self.nesting = self.deeper(self.nesting)?;
        let result = step(self);
        self.nesting -= 1;
        result
    }

    fn expect(&mut self, expected: Token<'input>, description: &str) -> ParseResult<()> {
        match &self.current_token {
            Some(token) if std::mem::discriminant(token) == std::mem::discriminant(&expected) => {
                self.advance()
            }
            Some(_) => Err(ParseError::ExpectedToken {
                expected: description.to_string(),
                position: self.current_position,
            }),
            None => Err(ParseError::UnexpectedEndOfInput {
                position: self.tokenizer.position(),
            }),
        }
    }

    /// Parse the complete input, rejecting trailing tokens
    pub fn parse(&mut self) -> ParseResult<ExpressionNode> {
        if self.current_token.is_none() {
            return Err(ParseError::EmptyExpression);
        }

        let (expr, _) = self.parse_expression_with_precedence(Precedence::Implies)?;
        if self.current_token.is_some() {
            return Err(self.unexpected("trailing input"));
        }
        Ok(expr)
    }

    fn parse_expression_with_precedence(&mut self, min_precedence: Precedence) -> ParseResult<Nested> {
        self.nested(|parser| parser.parse_binary(min_precedence))
    }

    fn parse_binary(&mut self, min_precedence: Precedence) -> ParseResult<Nested> {
        let (mut left, mut depth) = self.parse_unary()?;

        while let Some(current_token) = self.current() {
            let Some(precedence) = get_precedence(current_token) else {
                break;
            };
            if precedence < min_precedence {
                break;
            }

            match current_token {
                Token::Is | Token::As => {
                    let is_check = matches!(current_token, Token::Is);
                    self.advance()?;
                    let type_name = self.parse_type_specifier()?;
                    depth = self.deeper(depth)?;
                    left = if is_check {
                        ExpressionNode::type_check(left, type_name)
                    } else {
                        ExpressionNode::type_cast(left, type_name)
                    };
                    continue;
                }
                _ => {}
            }

            let op = token_to_binary_op(current_token)
                .ok_or_else(|| self.unexpected("expected binary operator"))?;
            self.advance()?;

            let next_min_precedence = if precedence.is_right_associative() {
                precedence
            } else {
                precedence.next_level()
            };
            // `next_level` saturates at the top level, so the tightest operators
            // still need a strict climb to stay left-associative
            let (right, right_depth) = if precedence == Precedence::Multiplicative {
                self.parse_unary()?
            } else {
                self.parse_expression_with_precedence(next_min_precedence)?
            };

            depth = self.deeper(depth.max(right_depth))?;
            left = ExpressionNode::binary_op(op, left, right);
        }

        Ok((left, depth))
    }

    fn parse_unary(&mut self) -> ParseResult<Nested> {
        self.nested(|parser| {
            let op = match parser.current() {
                Some(Token::Minus) => UnaryOperator::Negate,
                Some(Token::Plus) => UnaryOperator::Positive,
                _ => {
                    let primary = parser.parse_primary()?;
                    return parser.parse_postfix(primary);
                }
            };
            parser.advance()?;
            let (operand, depth) = parser.parse_unary()?;
            Ok((ExpressionNode::unary_op(op, operand), parser.deeper(depth)?))
        })
    }

    /// Qualified type name after `is`/`as` (`Quantity`, `System.String`, `FHIR.code`)
    fn parse_type_specifier(&mut self) -> ParseResult<String> {
        let mut type_name = self.parse_member_name("type name")?;
        while let Some(Token::Dot) = self.current() {
            self.advance()?;
            type_name.push('.');
            type_name.push_str(&self.parse_member_name("type name after '.'")?);
        }
        Ok(type_name)
    }

    /// Identifier, delimited identifier, or keyword used as a name
    fn parse_member_name(&mut self, context: &str) -> ParseResult<String> {
        let name = match self.current() {
            Some(Token::Identifier(name)) | Some(Token::DelimitedIdentifier(name)) => {
                name.to_string()
            }
            Some(token) => match token.keyword_text() {
                Some(keyword) => keyword.to_string(),
                None => {
                    return Err(ParseError::ExpectedToken {
                        expected: context.to_string(),
                        position: self.current_position,
                    });
                }
            },
            None => {
                return Err(ParseError::UnexpectedEndOfInput {
                    position: self.tokenizer.position(),
                });
            }
        };
        self.advance()?;
        Ok(name)
    }

    fn parse_primary(&mut self) -> ParseResult<Nested> {
        let position = self.current_position;
        let Some(token) = self.current_token.clone() else {
            return Err(ParseError::UnexpectedEndOfInput {
                position: self.tokenizer.position(),
            });
        };

        match token {
            Token::Identifier(name) | Token::DelimitedIdentifier(name) => {
                self.advance()?;
                if let Some(Token::LeftParen) = self.current() {
                    let (args, depth) = self.parse_arguments()?;
                    Ok((ExpressionNode::function_call(name, args), self.deeper(depth)?))
                } else {
                    Ok((ExpressionNode::identifier(name), 1))
                }
            }

            Token::Integer(text) => {
                self.advance()?;
                let value = text.parse::<i64>().map_err(|_| ParseError::InvalidLiteral {
                    literal_type: "integer".to_string(),
                    value: text.to_string(),
                    position,
                })?;
                Ok((ExpressionNode::literal(LiteralValue::Integer(value)), 1))
            }

            Token::Decimal(text) => {
                self.advance()?;
                Ok((ExpressionNode::literal(LiteralValue::Decimal(text.to_string())), 1))
            }

            Token::String(raw) => {
                self.advance()?;
                let value = Self::process_string_escapes(raw, position)?;
                Ok((ExpressionNode::literal(LiteralValue::String(value)), 1))
            }

            Token::True => {
                self.advance()?;
                Ok((ExpressionNode::literal(LiteralValue::Boolean(true)), 1))
            }
            Token::False => {
                self.advance()?;
                Ok((ExpressionNode::literal(LiteralValue::Boolean(false)), 1))
            }

            Token::Date(text) => {
                self.advance()?;
                Ok((ExpressionNode::literal(LiteralValue::Date(text.to_string())), 1))
            }
            Token::DateTime(text) => {
                self.advance()?;
                Ok((ExpressionNode::literal(LiteralValue::DateTime(text.to_string())), 1))
            }

            Token::LeftBrace => {
                self.advance()?;
                self.expect(Token::RightBrace, "'}' closing an empty collection")?;
                Ok((ExpressionNode::literal(LiteralValue::Null), 1))
            }

            Token::LeftParen => {
                self.advance()?;
                let nested = self.parse_expression_with_precedence(Precedence::Implies)?;
                self.expect(Token::RightParen, "')'")?;
                Ok(nested)
            }

            Token::Dollar(name) => {
                self.advance()?;
                Ok((ExpressionNode::variable(name), 1))
            }

            Token::Percent => {
                self.advance()?;
                let name = match self.current() {
                    Some(Token::Identifier(name)) | Some(Token::DelimitedIdentifier(name)) => {
                        name.to_string()
                    }
                    Some(Token::String(raw)) => {
                        Self::process_string_escapes(raw, self.current_position)?
                    }
                    _ => return Err(self.unexpected("constant name after '%'")),
                };
                self.advance()?;
                Ok((ExpressionNode::variable(name), 1))
            }

            _ => Err(self.unexpected("expected expression")),
        }
    }

    /// Parse invocation chains: `.member`, `.function(args)`, `[index]`
    fn parse_postfix(&mut self, (mut left, mut depth): Nested) -> ParseResult<Nested> {
        loop {
            match self.current() {
                Some(Token::Dot) => {
                    self.advance()?;
                    let name = self.parse_member_name("member or function name after '.'")?;
                    if let Some(Token::LeftParen) = self.current() {
                        let (args, args_depth) = self.parse_arguments()?;
                        depth = self.deeper(depth.max(args_depth))?;
                        left = ExpressionNode::method_call(left, name, args);
                    } else {
                        depth = self.deeper(depth)?;
                        left = ExpressionNode::path(left, name);
                    }
                }
                Some(Token::LeftBracket) => {
                    self.advance()?;
                    let (index, index_depth) =
                        self.parse_expression_with_precedence(Precedence::Implies)?;
                    self.expect(Token::RightBracket, "']'")?;
                    depth = self.deeper(depth.max(index_depth))?;
                    left = ExpressionNode::index(left, index);
                }
                _ => return Ok((left, depth)),
            }
        }
    }

    /// Argument list and the depth of its deepest argument
    fn parse_arguments(&mut self) -> ParseResult<(SmallVec<[ExpressionNode; 4]>, usize)> {
        self.expect(Token::LeftParen, "'('")?;
        let mut args = SmallVec::new();
        let mut depth = 0;

        if let Some(Token::RightParen) = self.current() {
            self.advance()?;
            return Ok((args, depth));
        }

        loop {
            let (arg, arg_depth) = self.parse_expression_with_precedence(Precedence::Implies)?;
            args.push(arg);
            depth = depth.max(arg_depth);
            match self.current() {
                Some(Token::Comma) => self.advance()?,
                Some(Token::RightParen) => {
                    self.advance()?;
                    return Ok((args, depth));
                }
                _ => return Err(self.unexpected("expected ',' or ')' in argument list")),
            }
        }
    }

    /// Process escape sequences in string literals, including Unicode escapes
    fn process_string_escapes(input: &str, position: usize) -> ParseResult<String> {
        let mut result = String::with_capacity(input.len());
        let mut chars = input.chars();

        while let Some(ch) = chars.next() {
            if ch != '\\' {
                result.push(ch);
                continue;
            }

            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('f') => result.push('\u{000C}'),
                Some('\\') => result.push('\\'),
                Some('\'') => result.push('\''),
                Some('"') => result.push('"'),
                Some('`') => result.push('`'),
                Some('/') => result.push('/'),
                Some('u') => {
                    let hex: String = chars.by_ref().take(4).collect();
                    let decoded = (hex.len() == 4)
                        .then(|| u32::from_str_radix(&hex, 16).ok())
                        .flatten()
                        .and_then(char::from_u32);
                    match decoded {
                        Some(unicode_char) => result.push(unicode_char),
                        None => {
                            return Err(ParseError::InvalidEscape {
                                sequence: format!("\\u{hex}"),
                                position,
                            });
                        }
                    }
                }
                Some(escaped_ch) => {
                    // Unknown escapes are kept literally; regex patterns rely on this (`\d`)
                    result.push('\\');
                    result.push(escaped_ch);
                }
                None => {
                    return Err(ParseError::InvalidEscape {
                        sequence: "\\".to_string(),
                        position,
                    });
                }
            }
        }

        Ok(result)
    }
}

/// Parse an expression string into an AST
#[inline]
pub fn parse(input: &str) -> ParseResult<ExpressionNode> {
    PrattParser::new(input)?.parse()
}
