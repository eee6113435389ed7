// SPDX-License-Identifier: MIT OR Apache-2.0
//! Recursive-descent parser producing [`Expr`] trees.
//!
//! ```text
//! expr        ::= or
//! or          ::= and ("||" and)*
//! and         ::= compare ("&&" compare)*
//! compare     ::= additive (("=="|"!="|"<"|"<="|">"|">="|"=~"|"in") additive)*
//! additive    ::= multiplicative (("+"|"-") multiplicative)*
//! multiplicative ::= unary (("*"|"/"|"%") unary)*
//! unary       ::= ("!"|"-") unary | primary
//! primary     ::= literal | ident ["(" args ")"] | "(" expr ("," expr)* ")" | "[" args "]"
//! ```

use crate::lexer::{Spanned, Token, tokenize};
use crate::value::Value;
use crate::{MAX_EXPR_DEPTH, MAX_EXPR_LENGTH};
use std::collections::BTreeSet;
use warden_error::ExpressionError;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// `=~` regex search
    RegexMatch,
    /// `in` membership
    In,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
}

impl BinaryOp {
    /// Source spelling.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::RegexMatch => "=~",
            BinaryOp::In => "in",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Neg,
}

/// Compiled expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Constant.
    Literal(Value),
    /// Variable with optional attribute path (`r_sub.Owner`).
    Var {
        /// Bound name, e.g. `r_sub`.
        name: String,
        /// Attribute path below the variable.
        path: Vec<String>,
    },
    /// Short-circuit conjunction of two or more operands.
    And(Vec<Expr>),
    /// Short-circuit disjunction of two or more operands.
    Or(Vec<Expr>),
    /// Unary operator application.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        expr: Box<Expr>,
    },
    /// Binary operator application.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// Function call.
    Call {
        /// Function name.
        name: String,
        /// Arguments.
        args: Vec<Expr>,
    },
    /// Tuple or list literal.
    List(Vec<Expr>),
}

impl Expr {
    /// Parse expression text.
    ///
    /// # Errors
    ///
    /// * [`ExpressionError::Parse`] on syntax errors
    /// * [`ExpressionError::TooLong`] when the text exceeds [`MAX_EXPR_LENGTH`]
    /// * [`ExpressionError::TooDeep`] when nesting exceeds [`MAX_EXPR_DEPTH`]
    pub fn parse(input: &str) -> Result<Self, ExpressionError> {
        if input.len() > MAX_EXPR_LENGTH {
            return Err(ExpressionError::TooLong {
                len: input.len(),
                max: MAX_EXPR_LENGTH,
            });
        }
        let tokens = tokenize(input)?;
        let mut parser = Parser::new(&tokens, input.len());
        let expr = parser.parse_expr()?;
        match parser.current() {
            None => Ok(expr),
            Some(t) => Err(ExpressionError::Parse {
                position: t.pos,
                message: format!("unexpected trailing token {:?}", t.token),
            }),
        }
    }

    /// Root names of every variable referenced, e.g. `{"p_sub", "r_sub"}`.
    pub fn variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect(&mut out, &mut BTreeSet::new());
        out
    }

    /// Names of every function called.
    pub fn functions(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect(&mut BTreeSet::new(), &mut out);
        out
    }

    fn collect(&self, vars: &mut BTreeSet<String>, fns: &mut BTreeSet<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Var { name, .. } => {
                vars.insert(name.clone());
            }
            Expr::And(items) | Expr::Or(items) | Expr::List(items) => {
                items.iter().for_each(|e| e.collect(vars, fns));
            }
            Expr::Unary { expr, .. } => expr.collect(vars, fns),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect(vars, fns);
                rhs.collect(vars, fns);
            }
            Expr::Call { name, args } => {
                fns.insert(name.clone());
                args.iter().for_each(|e| e.collect(vars, fns));
            }
        }
    }
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    depth: usize,
    end: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned], end: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            end,
        }
    }

    fn current(&self) -> Option<&'a Spanned> {
        self.tokens.get(self.pos)
    }

    fn peek(&self) -> Option<&'a Token> {
        self.current().map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<&'a Spanned> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn position(&self) -> usize {
        self.current().map_or(self.end, |s| s.pos)
    }

    fn error(&self, message: impl Into<String>) -> ExpressionError {
        ExpressionError::Parse {
            position: self.position(),
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ExpressionError> {
        match self.current() {
            Some(s) if s.token == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(s) => Err(self.error(format!("expected {expected:?}, got {:?}", s.token))),
            None => Err(self.error(format!("expected {expected:?}, got end of input"))),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_EXPR_DEPTH {
            return Err(ExpressionError::TooDeep {
                max: MAX_EXPR_DEPTH,
            });
        }
        let expr = self.parse_or();
        self.depth -= 1;
        expr
    }

    fn parse_or(&mut self) -> Result<Expr, ExpressionError> {
        let mut items = vec![self.parse_and()?];
        while self.peek() == Some(&Token::Or) {
            self.advance();
            items.push(self.parse_and()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Expr::Or(items)
        })
    }

    fn parse_and(&mut self) -> Result<Expr, ExpressionError> {
        let mut items = vec![self.parse_compare()?];
        while self.peek() == Some(&Token::And) {
            self.advance();
            items.push(self.parse_compare()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Expr::And(items)
        })
    }

    fn parse_compare(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Equal) => BinaryOp::Equal,
                Some(Token::NotEqual) => BinaryOp::NotEqual,
                Some(Token::LessThan) => BinaryOp::LessThan,
                Some(Token::LessThanOrEqual) => BinaryOp::LessThanOrEqual,
                Some(Token::GreaterThan) => BinaryOp::GreaterThan,
                Some(Token::GreaterThanOrEqual) => BinaryOp::GreaterThanOrEqual,
                Some(Token::RegexMatch) => BinaryOp::RegexMatch,
                Some(Token::In) => BinaryOp::In,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
        let op = match self.peek() {
            Some(Token::Not) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Neg,
            _ => return self.parse_primary(),
        };
        self.advance();
        self.depth += 1;
        if self.depth > MAX_EXPR_DEPTH {
            return Err(ExpressionError::TooDeep {
                max: MAX_EXPR_DEPTH,
            });
        }
        let operand = self.parse_unary();
        self.depth -= 1;
        Ok(Expr::Unary {
            op,
            expr: Box::new(operand?),
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        let Some(spanned) = self.advance() else {
            return Err(self.error("unexpected end of input"));
        };
        match &spanned.token {
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::Int(i) => Ok(Expr::Literal(Value::Int(*i))),
            Token::Float(f) => Ok(Expr::Literal(Value::Float(*f))),
            Token::Str(s) => Ok(Expr::Literal(Value::Str(s.clone()))),
            Token::Ident(name, path) => {
                if path.is_empty() && self.peek() == Some(&Token::LeftParen) {
                    self.advance();
                    let args = self.parse_list(Token::RightParen)?;
                    return Ok(Expr::Call {
                        name: name.clone(),
                        args,
                    });
                }
                Ok(Expr::Var {
                    name: name.clone(),
                    path: path.clone(),
                })
            }
            Token::LeftParen => {
                let mut items = self.parse_list(Token::RightParen)?;
                match items.len() {
                    0 => Err(ExpressionError::Parse {
                        position: spanned.pos,
                        message: "empty parentheses".into(),
                    }),
                    1 => Ok(items.remove(0)),
                    _ => Ok(Expr::List(items)),
                }
            }
            Token::LeftBracket => Ok(Expr::List(self.parse_list(Token::RightBracket)?)),
            other => Err(ExpressionError::Parse {
                position: spanned.pos,
                message: format!("unexpected token {other:?}"),
            }),
        }
    }

    /// Comma-separated expressions up to `close`, which is consumed.
    fn parse_list(&mut self, close: Token) -> Result<Vec<Expr>, ExpressionError> {
        let mut items = Vec::new();
        if self.peek() == Some(&close) {
            self.advance();
            return Ok(items);
        }
        loop {
            items.push(self.parse_expr()?);
            if self.peek() == Some(&Token::Comma) {
                self.advance();
                continue;
            }
            self.expect(close)?;
            return Ok(items);
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Expr {
        Expr::Var {
            name: name.into(),
            path: vec![],
        }
    }

    #[test]
    fn and_chains_are_flattened() {
        let e = Expr::parse("a && b && c").unwrap();
        assert_eq!(e, Expr::And(vec![var("a"), var("b"), var("c")]));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let e = Expr::parse("a || b && c").unwrap();
        assert_eq!(
            e,
            Expr::Or(vec![var("a"), Expr::And(vec![var("b"), var("c")])])
        );
    }

    #[test]
    fn comparison_binds_tighter_than_and() {
        let e = Expr::parse("r_sub == p_sub && r_obj == p_obj").unwrap();
        match e {
            Expr::And(items) => {
                assert_eq!(items.len(), 2);
                assert!(matches!(items[0], Expr::Binary { op: BinaryOp::Equal, .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn calls_and_tuples() {
        let e = Expr::parse("g(r_sub, p_sub) && r_act in ('read', 'write')").unwrap();
        assert_eq!(
            e.functions().into_iter().collect::<Vec<_>>(),
            vec!["g".to_string()]
        );
        assert_eq!(
            e.variables().into_iter().collect::<Vec<_>>(),
            vec!["p_sub", "r_act", "r_sub"]
        );
    }

    #[test]
    fn parenthesized_single_item_is_not_a_list() {
        assert_eq!(Expr::parse("(a)").unwrap(), var("a"));
        assert!(matches!(Expr::parse("(a, b)").unwrap(), Expr::List(_)));
        assert!(matches!(Expr::parse("[]").unwrap(), Expr::List(v) if v.is_empty()));
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        assert!(matches!(
            Expr::parse("a b"),
            Err(ExpressionError::Parse { position: 2, .. })
        ));
    }

    #[test]
    fn unbalanced_parentheses() {
        assert!(Expr::parse("g(a, b").is_err());
        assert!(Expr::parse("(a").is_err());
        assert!(Expr::parse(")").is_err());
        assert!(Expr::parse("").is_err());
    }

    #[test]
    fn nesting_limit() {
        let deep = format!("{}a{}", "(".repeat(MAX_EXPR_DEPTH + 1), ")".repeat(MAX_EXPR_DEPTH + 1));
        assert!(matches!(
            Expr::parse(&deep),
            Err(ExpressionError::TooDeep { .. })
        ));
        let nots = format!("{}a", "!".repeat(MAX_EXPR_DEPTH + 1));
        assert!(matches!(
            Expr::parse(&nots),
            Err(ExpressionError::TooDeep { .. })
        ));
    }

    #[test]
    fn length_limit() {
        let long = "a".repeat(MAX_EXPR_LENGTH + 1);
        assert!(matches!(
            Expr::parse(&long),
            Err(ExpressionError::TooLong { .. })
        ));
    }
}
