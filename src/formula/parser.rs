//! Recursive-descent parser.
//!
//! Grammar:
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := '-' unary | primary
//! primary := NUMBER | REF | '(' expr ')'
//! ```

use super::ast::{BinaryOp, Expr, Reference};
use super::lexer::{tokenize, Token, TokenKind};
use super::SyntaxError;

pub fn parse(src: &str) -> Result<Expr, SyntaxError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser { tokens: &tokens, cursor: 0, end: src.len() };
    let expr = parser.expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(tok) => Err(SyntaxError::new(tok.pos, "unexpected token after end of expression")),
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    cursor: usize,
    end: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> { self.tokens.get(self.cursor) }

    fn next(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.cursor)?;
        self.cursor += 1;
        Some(tok)
    }

    fn expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.cursor += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
    }

    fn term(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.cursor += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
    }

    fn unary(&mut self) -> Result<Expr, SyntaxError> {
        if let Some(TokenKind::Minus) = self.peek().map(|t| &t.kind) {
            self.cursor += 1;
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        let Some(tok) = self.next() else {
            return Err(SyntaxError::new(self.end, "unexpected end of formula"));
        };
        match &tok.kind {
            TokenKind::Number(n) => Ok(Expr::Number(*n)),
            TokenKind::Ref { name, offset } => Ok(Expr::Ref(Reference {
                name: name.clone(),
                offset: *offset,
                pos: tok.pos,
            })),
            TokenKind::LParen => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token { kind: TokenKind::RParen, .. }) => Ok(inner),
                    Some(other) => Err(SyntaxError::new(other.pos, "expected ')'")),
                    None => Err(SyntaxError::new(tok.pos, "unclosed '('")),
                }
            }
            _ => Err(SyntaxError::new(tok.pos, "expected a number, reference or '('")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn r(name: &str, offset: Option<i64>, pos: usize) -> Expr {
        Expr::Ref(Reference { name: name.into(), offset, pos })
    }

    #[test]
    fn test_precedence_and_associativity() {
        // 1 - 2 - 3 * 4 parses as (1 - 2) - (3 * 4)
        let e = parse("1 - 2 - 3 * 4").unwrap();
        let expected = Expr::Binary {
            op: BinaryOp::Sub,
            lhs: Box::new(Expr::Binary {
                op: BinaryOp::Sub,
                lhs: Box::new(Expr::Number(1.0)),
                rhs: Box::new(Expr::Number(2.0)),
            }),
            rhs: Box::new(Expr::Binary {
                op: BinaryOp::Mul,
                lhs: Box::new(Expr::Number(3.0)),
                rhs: Box::new(Expr::Number(4.0)),
            }),
        };
        assert_eq!(e, expected);
    }

    #[test]
    fn test_references_keep_their_own_offsets() {
        let e = parse(":a[-1] + :b[+0] * :rate").unwrap();
        let refs: Vec<_> = e.references().into_iter().map(|r| (r.name.as_str(), r.offset)).collect();
        assert_eq!(refs, vec![("a", Some(-1)), ("b", Some(0)), ("rate", None)]);
    }

    #[test]
    fn test_unary_minus_binds_tighter_than_multiplication() {
        let e = parse("-:x[+0] * 2").unwrap();
        assert_eq!(
            e,
            Expr::Binary {
                op: BinaryOp::Mul,
                lhs: Box::new(Expr::Neg(Box::new(r("x", Some(0), 1)))),
                rhs: Box::new(Expr::Number(2.0)),
            }
        );
    }

    #[rstest]
    #[case(":a[-1] + 1")]
    #[case("(:a[+0] - :b[+0]) * (1 - :tax)")]
    #[case(":a[+0] - (:b[+0] - :c[+0])")]
    #[case(":a[+0] / (:b[+0] * :c[+0])")]
    #[case("-(:a[+0] + 2)")]
    fn test_display_reparses_to_same_tree(#[case] src: &str) {
        let e = parse(src).unwrap();
        let printed = e.to_string();
        assert_eq!(parse(&printed).unwrap().to_string(), printed);
        assert_eq!(printed.replace(' ', ""), src.replace(' ', ""));
    }

    #[rstest]
    #[case("", 0)]
    #[case("1 +", 3)]
    #[case("(1 + 2", 0)]
    #[case("1 2", 2)]
    #[case("* 3", 0)]
    #[case("(1))", 3)]
    fn test_rejects(#[case] src: &str, #[case] position: usize) {
        assert_eq!(parse(src).unwrap_err().position, position);
    }
}
