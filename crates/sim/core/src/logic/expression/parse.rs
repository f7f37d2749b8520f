//! Textual front-end for expressions.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! or       := xor ( "||" xor )*
//! xor      := and ( "^^" and )*
//! and      := equality ( "&&" equality )*
//! equality := compare ( ( "==" | "!=" ) compare )*
//! compare  := sum ( ( "<" | ">" | "<=" | ">=" ) sum )*
//! sum      := product ( ( "+" | "-" ) product )*
//! product  := unary ( ( "*" | "/" | "%" ) unary )*
//! unary    := ( "+" | "-" | "!" | "++" | "--" ) unary | power
//! power    := primary ( "^" unary )?
//! primary  := number | string | "true" | "false" | "null" | "previous"
//!           | ( "round" | "ceil" | "floor" ) "(" or ")"
//!           | identifier | "(" or ")"
//! ```
//!
//! A bare identifier reads a variable on the source; `activator.name` and
//! `source.name` pick the entity explicitly.

use crate::error::{ErrorSeverity, SimError};
use crate::schema::{BinaryOp, ExpressionConfig, TargetConfig, UnaryOp};
use crate::state::Value;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unexpected character '{found}' at offset {offset}")]
    UnexpectedCharacter { offset: usize, found: char },

    #[error("unexpected token '{found}' at offset {offset}")]
    UnexpectedToken { offset: usize, found: String },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("invalid number '{text}' at offset {offset}")]
    InvalidNumber { offset: usize, text: String },
}

impl SimError for ParseError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            ParseError::UnexpectedCharacter { .. } => "PARSE_UNEXPECTED_CHARACTER",
            ParseError::UnexpectedToken { .. } => "PARSE_UNEXPECTED_TOKEN",
            ParseError::UnexpectedEnd => "PARSE_UNEXPECTED_END",
            ParseError::UnterminatedString { .. } => "PARSE_UNTERMINATED_STRING",
            ParseError::InvalidNumber { .. } => "PARSE_INVALID_NUMBER",
        }
    }
}

/// Parses `source` into an expression tree.
pub fn parse_expression(source: &str) -> Result<ExpressionConfig, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, cursor: 0 };
    let expression = parser.or()?;
    match parser.tokens.get(parser.cursor) {
        None => Ok(expression),
        Some(token) => Err(token.unexpected()),
    }
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),
    Op(&'static str),
    Open,
    Close,
}

#[derive(Clone, Debug)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

impl Token {
    /// True when a binary operator may follow this token.
    fn ends_operand(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Number(_) | TokenKind::Str(_) | TokenKind::Ident(_) | TokenKind::Close
        )
    }

    fn unexpected(&self) -> ParseError {
        let found = match &self.kind {
            TokenKind::Number(value) => value.to_string(),
            TokenKind::Str(text) => format!("\"{text}\""),
            TokenKind::Ident(name) => name.clone(),
            TokenKind::Op(op) => (*op).to_owned(),
            TokenKind::Open => "(".to_owned(),
            TokenKind::Close => ")".to_owned(),
        };
        ParseError::UnexpectedToken {
            offset: self.offset,
            found,
        }
    }
}

const OPERATORS: [&str; 19] = [
    "||", "^^", "&&", "==", "!=", "<=", ">=", "++", "--", "<", ">", "+", "-", "*", "/", "%",
    "^", "!", ".",
];

fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if ch.is_ascii_digit() || (ch == '.' && source[offset + 1..].starts_with(|c: char| c.is_ascii_digit())) {
            let end = source[offset..]
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .map_or(source.len(), |len| offset + len);
            let text = &source[offset..end];
            let value = text.parse::<f64>().map_err(|_| ParseError::InvalidNumber {
                offset,
                text: text.to_owned(),
            })?;
            tokens.push(Token {
                kind: TokenKind::Number(value),
                offset,
            });
            while chars.peek().is_some_and(|&(index, _)| index < end) {
                chars.next();
            }
            continue;
        }

        if ch == '"' || ch == '\'' {
            chars.next();
            let mut text = String::new();
            let mut closed = false;
            for (_, next) in chars.by_ref() {
                if next == ch {
                    closed = true;
                    break;
                }
                text.push(next);
            }
            if !closed {
                return Err(ParseError::UnterminatedString { offset });
            }
            tokens.push(Token {
                kind: TokenKind::Str(text),
                offset,
            });
            continue;
        }

        if ch.is_alphabetic() || ch == '_' {
            let end = source[offset..]
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .map_or(source.len(), |len| offset + len);
            tokens.push(Token {
                kind: TokenKind::Ident(source[offset..end].to_owned()),
                offset,
            });
            while chars.peek().is_some_and(|&(index, _)| index < end) {
                chars.next();
            }
            continue;
        }

        if ch == '(' || ch == ')' {
            chars.next();
            tokens.push(Token {
                kind: if ch == '(' { TokenKind::Open } else { TokenKind::Close },
                offset,
            });
            continue;
        }

        let Some(&op) = OPERATORS.iter().find(|op| source[offset..].starts_with(**op)) else {
            return Err(ParseError::UnexpectedCharacter { offset, found: ch });
        };
        // After an operand a doubled sign is a binary sign followed by a unary one.
        let op = if matches!(op, "++" | "--") && tokens.last().is_some_and(Token::ends_operand) {
            &op[..1]
        } else {
            op
        };
        for _ in 0..op.len() {
            chars.next();
        }
        tokens.push(Token {
            kind: TokenKind::Op(op),
            offset,
        });
    }

    Ok(tokens)
}

// ============================================================================
// Recursive descent
// ============================================================================

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
}

type Level = fn(&mut Parser) -> Result<ExpressionConfig, ParseError>;

impl Parser {
    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.cursor).map(|token| &token.kind)
    }

    fn next(&mut self) -> Result<Token, ParseError> {
        let token = self.tokens.get(self.cursor).cloned().ok_or(ParseError::UnexpectedEnd)?;
        self.cursor += 1;
        Ok(token)
    }

    fn eat_op(&mut self, candidates: &[(&'static str, BinaryOp)]) -> Option<BinaryOp> {
        let Some(TokenKind::Op(op)) = self.peek() else {
            return None;
        };
        let found = candidates.iter().find(|(text, _)| text == op).map(|(_, op)| *op);
        if found.is_some() {
            self.cursor += 1;
        }
        found
    }

    fn binary_level(&mut self, operators: &[(&'static str, BinaryOp)], next: Level) -> Result<ExpressionConfig, ParseError> {
        let mut left = next(self)?;
        while let Some(op) = self.eat_op(operators) {
            let right = next(self)?;
            left = ExpressionConfig::binary(op, left, right);
        }
        Ok(left)
    }

    fn or(&mut self) -> Result<ExpressionConfig, ParseError> {
        self.binary_level(&[("||", BinaryOp::Or)], Self::xor)
    }

    fn xor(&mut self) -> Result<ExpressionConfig, ParseError> {
        self.binary_level(&[("^^", BinaryOp::Xor)], Self::and)
    }

    fn and(&mut self) -> Result<ExpressionConfig, ParseError> {
        self.binary_level(&[("&&", BinaryOp::And)], Self::equality)
    }

    fn equality(&mut self) -> Result<ExpressionConfig, ParseError> {
        self.binary_level(
            &[("==", BinaryOp::Equals), ("!=", BinaryOp::NotEquals)],
            Self::compare,
        )
    }

    fn compare(&mut self) -> Result<ExpressionConfig, ParseError> {
        self.binary_level(
            &[
                ("<", BinaryOp::Less),
                (">", BinaryOp::Greater),
                ("<=", BinaryOp::LessEqual),
                (">=", BinaryOp::GreaterEqual),
            ],
            Self::sum,
        )
    }

    fn sum(&mut self) -> Result<ExpressionConfig, ParseError> {
        self.binary_level(
            &[("+", BinaryOp::Add), ("-", BinaryOp::Subtract)],
            Self::product,
        )
    }

    fn product(&mut self) -> Result<ExpressionConfig, ParseError> {
        self.binary_level(
            &[
                ("*", BinaryOp::Multiply),
                ("/", BinaryOp::Divide),
                ("%", BinaryOp::Remainder),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<ExpressionConfig, ParseError> {
        if let Some(TokenKind::Op("+")) = self.peek() {
            self.cursor += 1;
            return self.unary();
        }
        let op = match self.peek() {
            Some(TokenKind::Op("-")) => Some(UnaryOp::Negate),
            Some(TokenKind::Op("!")) => Some(UnaryOp::Not),
            Some(TokenKind::Op("++")) => Some(UnaryOp::Increment),
            Some(TokenKind::Op("--")) => Some(UnaryOp::Decrement),
            _ => None,
        };
        match op {
            Some(op) => {
                self.cursor += 1;
                Ok(ExpressionConfig::unary(op, self.unary()?))
            }
            None => self.power(),
        }
    }

    fn power(&mut self) -> Result<ExpressionConfig, ParseError> {
        let base = self.primary()?;
        if self.eat_op(&[("^", BinaryOp::Power)]).is_some() {
            let exponent = self.unary()?;
            return Ok(ExpressionConfig::binary(BinaryOp::Power, base, exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<ExpressionConfig, ParseError> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Number(value) => Ok(ExpressionConfig::Constant(Value::Number(value))),
            TokenKind::Str(text) => Ok(ExpressionConfig::Constant(Value::String(text))),
            TokenKind::Open => {
                let inner = self.or()?;
                self.expect_close()?;
                Ok(inner)
            }
            TokenKind::Ident(name) => self.identifier(name),
            TokenKind::Op(_) | TokenKind::Close => Err(token.unexpected()),
        }
    }

    fn identifier(&mut self, name: String) -> Result<ExpressionConfig, ParseError> {
        match name.as_str() {
            "true" => return Ok(ExpressionConfig::constant(true)),
            "false" => return Ok(ExpressionConfig::constant(false)),
            "null" => return Ok(ExpressionConfig::Constant(Value::Null)),
            "previous" => return Ok(ExpressionConfig::Previous),
            _ => {}
        }

        if let Ok(op) = name.parse::<UnaryOp>()
            && matches!(op, UnaryOp::Round | UnaryOp::Ceil | UnaryOp::Floor)
            && self.peek() == Some(&TokenKind::Open)
        {
            self.cursor += 1;
            let operand = self.or()?;
            self.expect_close()?;
            return Ok(ExpressionConfig::unary(op, operand));
        }

        let target = match name.as_str() {
            "activator" => Some(TargetConfig::Activator),
            "source" => Some(TargetConfig::Source),
            _ => None,
        };
        if let Some(target) = target
            && self.peek() == Some(&TokenKind::Op("."))
        {
            self.cursor += 1;
            let field = self.next()?;
            let TokenKind::Ident(field_name) = field.kind else {
                return Err(field.unexpected());
            };
            return Ok(ExpressionConfig::Reference {
                target,
                name: field_name,
            });
        }

        Ok(ExpressionConfig::reference(name))
    }

    fn expect_close(&mut self) -> Result<(), ParseError> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Close => Ok(()),
            _ => Err(token.unexpected()),
        }
    }
}
