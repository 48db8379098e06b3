//! Recursive-descent parser producing [`Expr`] trees.

use assay_core::Value;

use super::token::{tokenize, Token};
use super::{BinaryOp, Expr, ParseError, UnaryOp};

pub(super) fn parse(src: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: src.len(),
    };
    let expr = parser.or_expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some((token, offset)) => Err(ParseError::new(
            format!("unexpected {} after expression", token.describe()),
            *offset,
        )),
    }
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    /// Source length, used as the offset for end-of-input errors.
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&(Token, usize)> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<(Token, usize)> {
        let item = self.tokens.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek().map(|(t, _)| t) == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        match self.advance() {
            Some((token, _)) if token == expected => Ok(()),
            Some((token, offset)) => Err(ParseError::new(
                format!("expected {}, found {}", expected.describe(), token.describe()),
                offset,
            )),
            None => Err(ParseError::new(
                format!("expected {}, found end of expression", expected.describe()),
                self.end,
            )),
        }
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.and_expr()?;
        while self.eat(&Token::Or) {
            let rhs = self.and_expr()?;
            lhs = Expr::Binary {
                op: BinaryOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.not_expr()?;
        while self.eat(&Token::And) {
            let rhs = self.not_expr()?;
            lhs = Expr::Binary {
                op: BinaryOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::Not) {
            let operand = self.not_expr()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.comparison()
    }

    /// Comparison operators do not chain: `a == b == c` is a parse error.
    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.additive()?;
        let op = match self.peek().map(|(t, _)| t) {
            Some(Token::Eq) => BinaryOp::Eq,
            Some(Token::Ne) => BinaryOp::Ne,
            Some(Token::Lt) => BinaryOp::Lt,
            Some(Token::Le) => BinaryOp::Le,
            Some(Token::Gt) => BinaryOp::Gt,
            Some(Token::Ge) => BinaryOp::Ge,
            Some(Token::In) => BinaryOp::In,
            Some(Token::RegexMatch) => BinaryOp::RegexMatch,
            Some(Token::RegexSearch) => BinaryOp::RegexSearch,
            Some(Token::Not) => {
                // `not` mid-comparison can only be `not in`.
                self.pos += 1;
                self.expect(Token::In)?;
                let rhs = self.additive()?;
                return Ok(Expr::Binary {
                    op: BinaryOp::NotIn,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                });
            }
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.additive()?;
        Ok(Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        while self.eat(&Token::Plus) {
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op: BinaryOp::Add,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::Minus) {
            let operand = self.unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::LBracket) {
                let index = self.or_expr()?;
                self.expect(Token::RBracket)?;
                expr = Expr::Index {
                    base: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat(&Token::Dot) {
                let name = match self.advance() {
                    Some((Token::Ident(name), _)) => name,
                    Some((token, offset)) => {
                        return Err(ParseError::new(
                            format!("expected accessor name, found {}", token.describe()),
                            offset,
                        ));
                    }
                    None => {
                        return Err(ParseError::new(
                            "expected accessor name, found end of expression",
                            self.end,
                        ));
                    }
                };
                expr = Expr::Accessor {
                    base: Box::new(expr),
                    name,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        match self.advance() {
            Some((Token::Null, _)) => Ok(Expr::Literal(Value::Null)),
            Some((Token::True, _)) => Ok(Expr::Literal(Value::Bool(true))),
            Some((Token::False, _)) => Ok(Expr::Literal(Value::Bool(false))),
            Some((Token::Int(i), _)) => Ok(Expr::Literal(Value::Int(i))),
            Some((Token::Float(x), _)) => Ok(Expr::Literal(Value::Float(x))),
            Some((Token::Str(s), _)) => Ok(Expr::Literal(Value::Str(s))),
            Some((Token::Ident(name), _)) => Ok(Expr::Ident(name)),
            Some((Token::LParen, _)) => {
                let expr = self.or_expr()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Some((Token::LBracket, _)) => self.list_literal(),
            Some((Token::LBrace, _)) => self.map_literal(),
            Some((token, offset)) => Err(ParseError::new(
                format!("unexpected {}", token.describe()),
                offset,
            )),
            None => Err(ParseError::new("unexpected end of expression", self.end)),
        }
    }

    fn list_literal(&mut self) -> Result<Expr, ParseError> {
        let mut items = Vec::new();
        if self.eat(&Token::RBracket) {
            return Ok(Expr::List(items));
        }
        loop {
            items.push(self.or_expr()?);
            if self.eat(&Token::Comma) {
                // Trailing comma closes the list.
                if self.eat(&Token::RBracket) {
                    return Ok(Expr::List(items));
                }
                continue;
            }
            self.expect(Token::RBracket)?;
            return Ok(Expr::List(items));
        }
    }

    fn map_literal(&mut self) -> Result<Expr, ParseError> {
        let mut pairs = Vec::new();
        if self.eat(&Token::RBrace) {
            return Ok(Expr::Map(pairs));
        }
        loop {
            let key = self.or_expr()?;
            self.expect(Token::Colon)?;
            let value = self.or_expr()?;
            pairs.push((key, value));
            if self.eat(&Token::Comma) {
                if self.eat(&Token::RBrace) {
                    return Ok(Expr::Map(pairs));
                }
                continue;
            }
            self.expect(Token::RBrace)?;
            return Ok(Expr::Map(pairs));
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────
