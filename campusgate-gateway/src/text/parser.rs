//! Recursive-descent parser producing [`Value`] trees.

use super::lexer::{Lexer, Spanned, Token};
use crate::error::TranscodeError;
use campusgate_protocol::{Map, Value};

/// Deepest nesting of mappings and sequences accepted.
pub const MAX_DEPTH: usize = 64;

/// Parses a document whose top level must be a mapping.
pub fn parse_document(input: &str) -> Result<Map, TranscodeError> {
    let mut parser = Parser::new(Lexer::tokenize(input)?);
    let map = parser.parse_mapping()?;
    parser.finish()?;
    Ok(map)
}

/// Parses any single value.
pub fn parse_value(input: &str) -> Result<Value, TranscodeError> {
    let mut parser = Parser::new(Lexer::tokenize(input)?);
    let value = parser.parse_value()?;
    parser.finish()?;
    Ok(value)
}

/// Classifies unquoted text: literals and numbers become typed values,
/// anything else stays text.
pub fn classify_bare(text: &str) -> Result<Value, TranscodeError> {
    match text {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "null" => return Ok(Value::Null),
        _ => {}
    }

    if is_integer(text) {
        return text
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| TranscodeError::IntegerOutOfRange(text.to_string()));
    }

    if is_decimal(text) {
        if let Ok(d) = text.parse::<f64>() {
            return Ok(Value::Decimal(d));
        }
    }

    Ok(Value::String(text.to_string()))
}

/// `-?\d+`
fn is_integer(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// `-?\d*\.\d+`
fn is_decimal(text: &str) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    match unsigned.split_once('.') {
        Some((whole, frac)) => {
            whole.bytes().all(|b| b.is_ascii_digit())
                && !frac.is_empty()
                && frac.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    index: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Spanned>) -> Self {
        Self {
            tokens,
            index: 0,
            depth: 0,
        }
    }

    fn parse_mapping(&mut self) -> Result<Map, TranscodeError> {
        self.expect(Token::LBrace, "'{'")?;
        self.enter()?;

        let mut map = Map::new();
        if self.peek() == Some(&Token::RBrace) {
            self.index += 1;
            self.depth -= 1;
            return Ok(map);
        }

        loop {
            let key = self.parse_key()?;
            self.expect(Token::Colon, "':'")?;
            let value = self.parse_value()?;
            // Later duplicates replace earlier ones.
            map.insert(key, value);

            match self.next()? {
                Spanned {
                    token: Token::Comma,
                    ..
                } => {
                    if self.peek() == Some(&Token::RBrace) {
                        self.index += 1;
                        break;
                    }
                }
                Spanned {
                    token: Token::RBrace,
                    ..
                } => break,
                other => return Err(unexpected(other, "',' or '}'")),
            }
        }

        self.depth -= 1;
        Ok(map)
    }

    fn parse_sequence(&mut self) -> Result<Vec<Value>, TranscodeError> {
        self.expect(Token::LBracket, "'['")?;
        self.enter()?;

        let mut items = Vec::new();
        if self.peek() == Some(&Token::RBracket) {
            self.index += 1;
            self.depth -= 1;
            return Ok(items);
        }

        loop {
            items.push(self.parse_value()?);

            match self.next()? {
                Spanned {
                    token: Token::Comma,
                    ..
                } => {
                    if self.peek() == Some(&Token::RBracket) {
                        self.index += 1;
                        break;
                    }
                }
                Spanned {
                    token: Token::RBracket,
                    ..
                } => break,
                other => return Err(unexpected(other, "',' or ']'")),
            }
        }

        self.depth -= 1;
        Ok(items)
    }

    fn parse_key(&mut self) -> Result<String, TranscodeError> {
        match self.next()? {
            Spanned {
                token: Token::Str(s),
                ..
            }
            | Spanned {
                token: Token::Bare(s),
                ..
            } => Ok(s),
            other => Err(unexpected(other, "key")),
        }
    }

    fn parse_value(&mut self) -> Result<Value, TranscodeError> {
        match self.peek() {
            Some(Token::LBrace) => return self.parse_mapping().map(Value::Mapping),
            Some(Token::LBracket) => return self.parse_sequence().map(Value::Sequence),
            _ => {}
        }

        match self.next()? {
            Spanned {
                token: Token::Str(s),
                ..
            } => Ok(Value::String(s)),
            Spanned {
                token: Token::Bare(s),
                ..
            } => classify_bare(&s),
            other => Err(unexpected(other, "value")),
        }
    }

    fn enter(&mut self) -> Result<(), TranscodeError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(TranscodeError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn expect(&mut self, token: Token, expected: &'static str) -> Result<(), TranscodeError> {
        let next = self.next()?;
        if next.token != token {
            return Err(unexpected(next, expected));
        }
        Ok(())
    }

    fn next(&mut self) -> Result<Spanned, TranscodeError> {
        let spanned = self
            .tokens
            .get(self.index)
            .cloned()
            .ok_or(TranscodeError::UnexpectedEnd)?;
        self.index += 1;
        Ok(spanned)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index).map(|s| &s.token)
    }

    fn finish(&self) -> Result<(), TranscodeError> {
        match self.tokens.get(self.index) {
            Some(spanned) => Err(TranscodeError::TrailingInput(spanned.pos)),
            None => Ok(()),
        }
    }
}

fn unexpected(spanned: Spanned, expected: &'static str) -> TranscodeError {
    TranscodeError::UnexpectedToken {
        found: spanned.token.describe(),
        expected,
        pos: spanned.pos,
    }
}
