//! Tokenizer for the formula surface syntax.
//!
//! References carry a `:` sigil. An offset reference `:name[k]` is lexed as a
//! single token so the bracket can never be confused with anything else.

use super::SyntaxError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Ref { name: String, offset: Option<i64> },
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token's first character.
    pub pos: usize,
}

pub fn tokenize(src: &str) -> Result<Vec<Token>, SyntaxError> {
    Lexer { src, pos: 0 }.run()
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<char> { self.src[self.pos..].chars().next() }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn run(mut self) -> Result<Vec<Token>, SyntaxError> {
        let mut tokens = Vec::new();
        loop {
            self.eat_while(char::is_whitespace);
            let pos = self.pos;
            let Some(c) = self.peek() else { break };
            let kind = match c {
                '+' => { self.bump(); TokenKind::Plus }
                '-' => { self.bump(); TokenKind::Minus }
                '*' => { self.bump(); TokenKind::Star }
                '/' => { self.bump(); TokenKind::Slash }
                '(' => { self.bump(); TokenKind::LParen }
                ')' => { self.bump(); TokenKind::RParen }
                ':' => self.reference()?,
                c if c.is_ascii_digit() || c == '.' => self.number()?,
                other => {
                    return Err(SyntaxError::new(pos, format!("unexpected character '{}'", other)));
                }
            };
            tokens.push(Token { kind, pos });
        }
        Ok(tokens)
    }

    fn number(&mut self) -> Result<TokenKind, SyntaxError> {
        let start = self.pos;
        self.eat_while(|c| c.is_ascii_digit());
        if self.peek() == Some('.') {
            self.bump();
            self.eat_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            if self.eat_while(|c| c.is_ascii_digit()).is_empty() {
                return Err(SyntaxError::new(start, "exponent has no digits"));
            }
        }
        let text = &self.src[start..self.pos];
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| SyntaxError::new(start, format!("invalid number '{}'", text)))
    }

    fn reference(&mut self) -> Result<TokenKind, SyntaxError> {
        let sigil = self.pos;
        self.bump();
        if !self.peek().is_some_and(|c| c.is_alphabetic() || c == '_') {
            return Err(SyntaxError::new(sigil, "expected a name after ':'"));
        }
        let name = self.eat_while(|c| c.is_alphanumeric() || c == '_').to_string();

        if self.peek() != Some('[') {
            return Ok(TokenKind::Ref { name, offset: None });
        }
        let open = self.pos;
        self.bump();
        self.eat_while(char::is_whitespace);
        let sign_start = self.pos;
        if matches!(self.peek(), Some('+' | '-')) {
            self.bump();
        }
        if self.eat_while(|c| c.is_ascii_digit()).is_empty() {
            return Err(SyntaxError::new(open, format!("offset of '{}' must be a signed integer", name)));
        }
        let literal = &self.src[sign_start..self.pos];
        self.eat_while(char::is_whitespace);
        if self.bump() != Some(']') {
            return Err(SyntaxError::new(open, format!("unclosed offset bracket after '{}'", name)));
        }
        let offset = literal
            .parse::<i64>()
            .map_err(|_| SyntaxError::new(sign_start, format!("offset '{}' is too large", literal)))?;
        Ok(TokenKind::Ref { name, offset: Some(offset) })
    }
}
