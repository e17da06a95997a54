//! Expression language used inside field directives.
//!
//! Directives such as `size=%Count`, `if=%Kind == 2 && $limit > 0` or
//! `$size=%Foo` embed small expressions. This module provides the tokenizer,
//! the recursive-descent parser producing an immutable [`Expr`] tree, and the
//! evaluator in [`eval`]. The language is deliberately tiny:
//!
//! - atoms: integer/float literals, `true`/`false`/`nil`, bare identifiers
//!   (builtin type-size constants), `%name` field references, `$name`
//!   variable references;
//! - unary `-` and `!`;
//! - comparisons `== != < > <= >=`;
//! - logical `&&` and `||` (lowest precedence);
//! - call syntax `name(a, b)` — parsed for forward compatibility but
//!   currently rejected at evaluation time.

pub mod eval;
pub mod token;

use crate::error::{Error, Result};
use crate::value::Value;
use std::fmt;
use token::{Scanner, Token};

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation, integers and floats only
    Neg,
    /// Boolean negation via the truthiness coercion
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "-"),
            UnaryOp::Not => write!(f, "!"),
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `==`
    Eql,
    /// `!=`
    Neq,
    /// `<`
    Lss,
    /// `>`
    Gtr,
    /// `<=`
    Leq,
    /// `>=`
    Geq,
    /// `&&`
    And,
    /// `||`
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BinaryOp::Eql => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::Lss => "<",
            BinaryOp::Gtr => ">",
            BinaryOp::Leq => "<=",
            BinaryOp::Geq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        };
        write!(f, "{text}")
    }
}

/// An immutable expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal constant (`12`, `1.5`, `true`, `nil`)
    Const(Value),
    /// Bare identifier, resolved to a builtin type-size constant
    Ident(String),
    /// `%name` — reference to a sibling field of the enclosing record
    Field(String),
    /// `$name` — reference to a variable bound in an enclosing scope
    Var(String),
    /// Unary operation
    Unary {
        /// The operator
        op: UnaryOp,
        /// The operand
        operand: Box<Expr>,
    },
    /// Binary operation
    Binary {
        /// The operator
        op: BinaryOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
    /// Call syntax; parsed but not evaluable
    Call {
        /// Callee name
        name: String,
        /// Argument expressions
        args: Vec<Expr>,
    },
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(v) => match v {
                Value::Text(s) => write!(f, "{s}"),
                other => write!(f, "{other}"),
            },
            Expr::Ident(name) => write!(f, "{name}"),
            Expr::Field(name) => write!(f, "%{name}"),
            Expr::Var(name) => write!(f, "${name}"),
            Expr::Unary { op, operand } => write!(f, "({op}{operand})"),
            Expr::Binary { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
            Expr::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Parses an expression from source text
pub fn parse(input: &str) -> Result<Expr> {
    let mut parser = Parser::new(input)?;
    let expr = parser.expr()?;
    parser.expect_eof()?;
    Ok(expr)
}

struct Parser<'a> {
    scanner: Scanner<'a>,
    tok: Token,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Result<Self> {
        let mut scanner = Scanner::new(input);
        let tok = scanner.scan()?;
        Ok(Self { scanner, tok })
    }

    fn next(&mut self) -> Result<()> {
        self.tok = self.scanner.scan()?;
        Ok(())
    }

    fn accept(&mut self, tok: &Token) -> Result<bool> {
        if &self.tok == tok {
            self.next()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn expect_eof(&self) -> Result<()> {
        if self.tok != Token::Eof {
            return Err(Error::syntax(format!(
                "unexpected symbol '{}' after expression",
                self.tok
            )));
        }
        Ok(())
    }

    /// expr := comp { ("&&" | "||") comp }
    fn expr(&mut self) -> Result<Expr> {
        let mut expr = self.comp()?;
        loop {
            let op = match self.tok {
                Token::LAnd => BinaryOp::And,
                Token::LOr => BinaryOp::Or,
                _ => break,
            };
            self.next()?;
            let rhs = self.comp()?;
            expr = Expr::Binary {
                op,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    /// comp := suffixed { cmp-op suffixed }
    fn comp(&mut self) -> Result<Expr> {
        let mut expr = self.suffixed()?;
        loop {
            let op = match self.tok {
                Token::Eql => BinaryOp::Eql,
                Token::Neq => BinaryOp::Neq,
                Token::Gtr => BinaryOp::Gtr,
                Token::Lss => BinaryOp::Lss,
                Token::Geq => BinaryOp::Geq,
                Token::Leq => BinaryOp::Leq,
                _ => break,
            };
            self.next()?;
            let rhs = self.suffixed()?;
            expr = Expr::Binary {
                op,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    /// suffixed := unary [ "(" [ expr { "," expr } ] ")" ]
    fn suffixed(&mut self) -> Result<Expr> {
        let expr = self.unary()?;
        if !self.accept(&Token::LParen)? {
            return Ok(expr);
        }
        let Expr::Ident(name) = expr else {
            return Err(Error::syntax("call target must be an identifier"));
        };
        let mut args = Vec::new();
        if !self.accept(&Token::RParen)? {
            args.push(self.expr()?);
            while self.accept(&Token::Comma)? {
                args.push(self.expr()?);
            }
            if !self.accept(&Token::RParen)? {
                return Err(Error::syntax(format!(
                    "expected ')' in call arguments, got '{}'",
                    self.tok
                )));
            }
        }
        Ok(Expr::Call { name, args })
    }

    /// unary := ("-" | "!") unary | atom
    fn unary(&mut self) -> Result<Expr> {
        let op = match self.tok {
            Token::Minus => UnaryOp::Neg,
            Token::Not => UnaryOp::Not,
            _ => return self.atom(),
        };
        self.next()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(self.unary()?),
        })
    }

    fn atom(&mut self) -> Result<Expr> {
        let expr = match std::mem::replace(&mut self.tok, Token::Eof) {
            Token::Ident(name) => match name.as_str() {
                "true" => Expr::Const(Value::Bool(true)),
                "false" => Expr::Const(Value::Bool(false)),
                "nil" => Expr::Const(Value::Null),
                _ => Expr::Ident(name),
            },
            Token::Int(v) => Expr::Const(Value::Int(v)),
            Token::Float(v) => Expr::Const(Value::Float(v)),
            Token::Percent => {
                self.next()?;
                let Token::Ident(name) = std::mem::replace(&mut self.tok, Token::Eof) else {
                    return Err(Error::syntax("expected field name after '%'"));
                };
                Expr::Field(name)
            }
            Token::Dollar => {
                self.next()?;
                let Token::Ident(name) = std::mem::replace(&mut self.tok, Token::Eof) else {
                    return Err(Error::syntax("expected variable name after '$'"));
                };
                Expr::Var(name)
            }
            other => {
                return Err(Error::syntax(format!(
                    "unexpected token '{other}' in expression"
                )));
            }
        };
        self.next()?;
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_ok() {
        for input in [
            "1",
            "-1",
            "1!=2",
            "!false",
            "!!false",
            "1 > 0.0",
            "sizeof(int16)",
            "dynarray(int16,Foo)",
            "1 > 0 && $foo != 12",
            "1 > 0 && %foo != 12",
        ] {
            assert!(parse(input).is_ok(), "input: {input}");
        }
    }

    #[test]
    fn test_parse_errors() {
        for input in ["1 >>> 0", "1 = 2", "%", "$", "1 +", "()", "5(1)", "1 & 2"] {
            assert!(parse(input).is_err(), "input: {input}");
        }
    }

    #[test]
    fn test_parse_atoms() {
        assert_eq!(parse("true").unwrap(), Expr::Const(Value::Bool(true)));
        assert_eq!(parse("nil").unwrap(), Expr::Const(Value::Null));
        assert_eq!(parse("12").unwrap(), Expr::Const(Value::Int(12)));
        assert_eq!(parse("%Foo").unwrap(), Expr::Field("Foo".into()));
        assert_eq!(parse("$size").unwrap(), Expr::Var("size".into()));
        assert_eq!(parse("uint32").unwrap(), Expr::Ident("uint32".into()));
    }

    #[test]
    fn test_display_round_trip() {
        for (input, want) in [
            ("1", "1"),
            ("1!=2", "(1 != 2)"),
            ("1 > 0.0", "(1 > 0)"),
            ("sizeof(int16      )", "sizeof(int16)"),
            ("dynarray(int16      ,Foo)", "dynarray(int16,Foo)"),
            ("!true", "(!true)"),
            ("!!true", "(!(!true))"),
            ("!!!true", "(!(!(!true)))"),
            ("1 > 0   && $foo != 12", "((1 > 0) && ($foo != 12))"),
            ("1   > 0 &&    %foo != 12", "((1 > 0) && (%foo != 12))"),
        ] {
            let expr = parse(input).unwrap();
            assert_eq!(expr.to_string(), want, "input: {input}");
        }
    }

    #[test]
    fn test_precedence_logical_is_lowest() {
        // (1 < 2) && (3 < 4), not 1 < (2 && 3) < 4
        let expr = parse("1 < 2 && 3 < 4").unwrap();
        match expr {
            Expr::Binary { op, .. } => assert_eq!(op, BinaryOp::And),
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn test_call_without_args() {
        let expr = parse("now()").unwrap();
        assert_eq!(
            expr,
            Expr::Call {
                name: "now".into(),
                args: vec![]
            }
        );
    }
}
