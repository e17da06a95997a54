//! Hand-written tokenizer for the directive expression language.
//!
//! Directive expressions are short (`%Count > 0 && $limit != 12`), so the
//! scanner works over a byte cursor with single-character lookahead and no
//! spans. The single `&` and `|` characters lex to their own tokens; the
//! parser rejects them, which keeps "did you mean `&&`?" diagnostics cheap.

use crate::error::{Error, Result};
use std::fmt;

/// A lexical token of the expression language
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Bare identifier (builtin names, reserved literals)
    Ident(String),
    /// Integer literal (decimal or `0x` hex)
    Int(i64),
    /// Float literal
    Float(f64),
    /// `%` field-reference sigil
    Percent,
    /// `$` variable-reference sigil
    Dollar,
    /// `-`
    Minus,
    /// `!`
    Not,
    /// `<`
    Lss,
    /// `>`
    Gtr,
    /// `<=`
    Leq,
    /// `>=`
    Geq,
    /// `==`
    Eql,
    /// `!=`
    Neq,
    /// `&&`
    LAnd,
    /// `||`
    LOr,
    /// `&` (lexed, rejected by the parser)
    And,
    /// `|` (lexed, rejected by the parser)
    Or,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// End of input
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "{name}"),
            Token::Int(v) => write!(f, "{v}"),
            Token::Float(v) => write!(f, "{v}"),
            Token::Percent => write!(f, "%"),
            Token::Dollar => write!(f, "$"),
            Token::Minus => write!(f, "-"),
            Token::Not => write!(f, "!"),
            Token::Lss => write!(f, "<"),
            Token::Gtr => write!(f, ">"),
            Token::Leq => write!(f, "<="),
            Token::Geq => write!(f, ">="),
            Token::Eql => write!(f, "=="),
            Token::Neq => write!(f, "!="),
            Token::LAnd => write!(f, "&&"),
            Token::LOr => write!(f, "||"),
            Token::And => write!(f, "&"),
            Token::Or => write!(f, "|"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Eof => write!(f, "<eof>"),
        }
    }
}

/// Scanner over expression source text
pub struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner over the given source
    pub fn new(source: &'a str) -> Self {
        Self {
            bytes: source.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.bytes.get(self.pos).copied();
        if b.is_some() {
            self.pos += 1;
        }
        b
    }

    fn accept(&mut self, want: u8) -> bool {
        if self.peek() == Some(want) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    /// Scans the next token
    pub fn scan(&mut self) -> Result<Token> {
        self.skip_whitespace();
        let Some(c) = self.advance() else {
            return Ok(Token::Eof);
        };

        let tok = match c {
            b',' => Token::Comma,
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b'$' => Token::Dollar,
            b'%' => Token::Percent,
            b'-' => Token::Minus,
            b'=' => {
                if !self.accept(b'=') {
                    return Err(Error::syntax("expected '=' after '='"));
                }
                Token::Eql
            }
            b'>' => {
                if self.accept(b'=') {
                    Token::Geq
                } else {
                    Token::Gtr
                }
            }
            b'<' => {
                if self.accept(b'=') {
                    Token::Leq
                } else {
                    Token::Lss
                }
            }
            b'&' => {
                if self.accept(b'&') {
                    Token::LAnd
                } else {
                    Token::And
                }
            }
            b'|' => {
                if self.accept(b'|') {
                    Token::LOr
                } else {
                    Token::Or
                }
            }
            b'!' => {
                if self.accept(b'=') {
                    Token::Neq
                } else {
                    Token::Not
                }
            }
            c if c.is_ascii_digit() => {
                self.pos -= 1;
                self.number()?
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                self.pos -= 1;
                self.ident()
            }
            other => {
                return Err(Error::syntax(format!(
                    "invalid character '{}'",
                    other as char
                )));
            }
        };
        Ok(tok)
    }

    fn ident(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        // identifiers are scanned from ASCII ranges only
        let text = std::str::from_utf8(&self.bytes[start..self.pos])
            .unwrap_or_default()
            .to_string();
        Token::Ident(text)
    }

    fn number(&mut self) -> Result<Token> {
        let start = self.pos;

        if self.accept(b'0') && (self.accept(b'x') || self.accept(b'X')) {
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            let digits = std::str::from_utf8(&self.bytes[digits_start..self.pos])
                .unwrap_or_default();
            let value = i64::from_str_radix(digits, 16)
                .map_err(|e| Error::syntax(format!("invalid hex literal: {e}")))?;
            return Ok(Token::Int(value));
        }

        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                b'0'..=b'9' => self.pos += 1,
                b'.' if !is_float => {
                    is_float = true;
                    self.pos += 1;
                }
                b'e' | b'E' => {
                    is_float = true;
                    self.pos += 1;
                    let _ = self.accept(b'+') || self.accept(b'-');
                }
                _ => break,
            }
        }

        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or_default();
        if is_float {
            let value: f64 = text
                .parse()
                .map_err(|e| Error::syntax(format!("invalid float literal '{text}': {e}")))?;
            Ok(Token::Float(value))
        } else {
            let value: i64 = text
                .parse()
                .map_err(|e| Error::syntax(format!("invalid integer literal '{text}': {e}")))?;
            Ok(Token::Int(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(input: &str) -> Result<Vec<Token>> {
        let mut s = Scanner::new(input);
        let mut out = Vec::new();
        loop {
            let tok = s.scan()?;
            let done = tok == Token::Eof;
            out.push(tok);
            if done {
                return Ok(out);
            }
        }
    }

    #[test]
    fn test_scan_empty() {
        assert_eq!(scan_all("").unwrap(), vec![Token::Eof]);
    }

    #[test]
    fn test_scan_atoms() {
        assert_eq!(
            scan_all("foo").unwrap(),
            vec![Token::Ident("foo".into()), Token::Eof]
        );
        assert_eq!(scan_all("123").unwrap(), vec![Token::Int(123), Token::Eof]);
        assert_eq!(
            scan_all("123.5").unwrap(),
            vec![Token::Float(123.5), Token::Eof]
        );
        assert_eq!(
            scan_all("0x10").unwrap(),
            vec![Token::Int(16), Token::Eof]
        );
    }

    #[test]
    fn test_scan_operators() {
        for (input, op) in [
            ("1<2.340", Token::Lss),
            ("1>2.340", Token::Gtr),
            ("1==2.340", Token::Eql),
            ("1!=2.340", Token::Neq),
            ("1<=2.340", Token::Leq),
            ("1>=2.340", Token::Geq),
        ] {
            assert_eq!(
                scan_all(input).unwrap(),
                vec![Token::Int(1), op, Token::Float(2.34), Token::Eof],
                "input: {input}"
            );
        }
    }

    #[test]
    fn test_scan_logical() {
        assert_eq!(
            scan_all("true &&false").unwrap(),
            vec![
                Token::Ident("true".into()),
                Token::LAnd,
                Token::Ident("false".into()),
                Token::Eof
            ]
        );
        assert_eq!(
            scan_all("false  || true").unwrap(),
            vec![
                Token::Ident("false".into()),
                Token::LOr,
                Token::Ident("true".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_scan_sigils() {
        assert_eq!(
            scan_all("%Foo != $bar").unwrap(),
            vec![
                Token::Percent,
                Token::Ident("Foo".into()),
                Token::Neq,
                Token::Dollar,
                Token::Ident("bar".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_scan_single_amp_and_pipe() {
        assert_eq!(
            scan_all("1 & 2").unwrap(),
            vec![Token::Int(1), Token::And, Token::Int(2), Token::Eof]
        );
        assert_eq!(
            scan_all("1 | 2").unwrap(),
            vec![Token::Int(1), Token::Or, Token::Int(2), Token::Eof]
        );
    }

    #[test]
    fn test_scan_bare_equals_is_error() {
        assert!(scan_all("1 = 2").is_err());
    }

    #[test]
    fn test_scan_invalid_character() {
        assert!(scan_all("1 @ 2").is_err());
    }
}
