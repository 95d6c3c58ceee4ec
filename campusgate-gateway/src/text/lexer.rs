//! Tokenizer for message text.

use crate::error::TranscodeError;

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Comma,
    /// Quoted text with the quotes removed. Escape sequences are kept as
    /// written: a backslash and the character after it pass through verbatim.
    Str(String),
    /// Unquoted text up to the next delimiter, trailing whitespace trimmed.
    Bare(String),
}

impl Token {
    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::Colon => "':'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Str(s) => format!("string \"{}\"", s),
            Token::Bare(s) => format!("'{}'", s),
        }
    }
}

/// A token and the byte offset it starts at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

fn is_delimiter(c: char) -> bool {
    matches!(c, '{' | '}' | '[' | ']' | ':' | ',' | '"')
}

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Splits the whole input into tokens.
    pub fn tokenize(input: &'a str) -> Result<Vec<Spanned>, TranscodeError> {
        let mut lexer = Self::new(input);
        let mut tokens = Vec::new();
        while let Some(token) = lexer.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<Spanned>, TranscodeError> {
        self.skip_whitespace();
        let pos = self.pos;

        let token = match self.peek_char() {
            None => return Ok(None),
            Some('{') => self.single(Token::LBrace),
            Some('}') => self.single(Token::RBrace),
            Some('[') => self.single(Token::LBracket),
            Some(']') => self.single(Token::RBracket),
            Some(':') => self.single(Token::Colon),
            Some(',') => self.single(Token::Comma),
            Some('"') => self.lex_string()?,
            Some(_) => self.lex_bare(),
        };

        Ok(Some(Spanned { token, pos }))
    }

    fn single(&mut self, token: Token) -> Token {
        self.pos += 1;
        token
    }

    fn lex_string(&mut self) -> Result<Token, TranscodeError> {
        let start = self.pos;
        self.pos += 1;
        let content_start = self.pos;

        while let Some(c) = self.peek_char() {
            match c {
                '"' => {
                    let content = &self.input[content_start..self.pos];
                    self.pos += 1;
                    return Ok(Token::Str(content.to_string()));
                }
                '\\' => {
                    self.pos += 1;
                    match self.peek_char() {
                        Some(escaped) => self.pos += escaped.len_utf8(),
                        None => break,
                    }
                }
                _ => self.pos += c.len_utf8(),
            }
        }

        Err(TranscodeError::UnterminatedString(start))
    }

    fn lex_bare(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if is_delimiter(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        Token::Bare(self.input[start..self.pos].trim_end().to_string())
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }
}
