//! Field directives: the compiled form of a per-field annotation string.
//!
//! A directive is a comma-separated list of `key=value` pairs attached to a
//! record field, e.g. `type=dynarray,size=uint32` or `$size=%Foo`. Values
//! for `size`, `if`, `ptrs` and `$name` keys are expressions; `type` selects
//! one of the three special decoding kinds. Directive strings are parsed
//! once, at schema build time; decode never re-parses them.

use crate::error::{Error, Result};
use crate::expr::{self, Expr};
use std::fmt;

/// Special decoding kinds selected by the `type=` key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Length-prefixed array: `size` names the prefix width
    DynArray,
    /// Presence-bitmap array: `ptrs` supplies the presence list
    HoleyArray,
    /// Length-prefixed string: `size` names the prefix width
    DynString,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Kind::DynArray => "dynarray",
            Kind::HoleyArray => "holeyarray",
            Kind::DynString => "dynstring",
        };
        write!(f, "{text}")
    }
}

impl Kind {
    fn parse(value: &str) -> Result<Kind> {
        match value.to_ascii_lowercase().as_str() {
            "dynarray" => Ok(Kind::DynArray),
            "holeyarray" => Ok(Kind::HoleyArray),
            "dynstring" => Ok(Kind::DynString),
            other => Err(Error::invalid_kind(other)),
        }
    }
}

/// A compiled field directive
#[derive(Debug, Clone, Default)]
pub struct Directive {
    /// Special decoding kind, if any
    pub kind: Option<Kind>,
    /// Size expression: element count, byte count or length-prefix width
    pub size: Option<Expr>,
    /// Condition expression; false leaves the field at its zero value
    pub cond: Option<Expr>,
    /// Presence-list expression for holey arrays
    pub ptrs: Option<Expr>,
    /// Named variable bindings in declaration order
    pub vars: Vec<(String, Expr)>,
}

impl Directive {
    /// Parses a directive string.
    ///
    /// Recognized keys: `type`, `size`, `if`, `ptrs` and `$name` (repeatable,
    /// order-preserving). Anything else is an unknown-option error; a pair
    /// without `=` is a syntax error.
    pub fn parse(input: &str) -> Result<Directive> {
        let mut dir = Directive::default();
        for pair in input.split(',') {
            let Some((key, value)) = pair.split_once('=') else {
                return Err(Error::syntax(format!(
                    "directive option '{}' is missing '='",
                    pair.trim()
                )));
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "type" => dir.kind = Some(Kind::parse(value)?),
                "size" => {
                    dir.size = Some(expr::parse(value).map_err(|e| {
                        Error::syntax(format!("failed to parse size '{value}': {e}"))
                    })?);
                }
                "if" => {
                    dir.cond = Some(expr::parse(value).map_err(|e| {
                        Error::syntax(format!("failed to parse condition '{value}': {e}"))
                    })?);
                }
                "ptrs" => {
                    dir.ptrs = Some(expr::parse(value).map_err(|e| {
                        Error::syntax(format!("failed to parse ptrs '{value}': {e}"))
                    })?);
                }
                _ => {
                    let Some(name) = key.strip_prefix('$') else {
                        return Err(Error::unknown_option(key));
                    };
                    let value = expr::parse(value).map_err(|e| {
                        Error::syntax(format!("failed to parse variable '{key}': {e}"))
                    })?;
                    dir.add_var(name, value);
                }
            }
        }
        Ok(dir)
    }

    /// Registers a named variable binding.
    ///
    /// Re-binding an existing name replaces its expression in place, keeping
    /// the original declaration position.
    pub fn add_var(&mut self, name: impl Into<String>, value: Expr) {
        let name = name.into();
        if let Some(slot) = self.vars.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.vars.push((name, value));
        }
    }

    /// Returns true if a variable of the given name is bound
    pub fn has_var(&self, name: &str) -> bool {
        self.vars.iter().any(|(n, _)| n == name)
    }

    /// Declared variable names, in declaration order
    pub fn var_names(&self) -> impl Iterator<Item = &str> {
        self.vars.iter().map(|(n, _)| n.as_str())
    }

    /// Returns true for `type=dynarray`
    pub fn is_dyn_array(&self) -> bool {
        self.kind == Some(Kind::DynArray)
    }

    /// Returns true for `type=holeyarray`
    pub fn is_holey_array(&self) -> bool {
        self.kind == Some(Kind::HoleyArray)
    }

    /// Returns true for `type=dynstring`
    pub fn is_dyn_string(&self) -> bool {
        self.kind == Some(Kind::DynString)
    }

    /// Returns true if an `if` condition is present
    pub fn has_condition(&self) -> bool {
        self.cond.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use crate::value::Value;

    #[test]
    fn test_parse_size() {
        let dir = Directive::parse("size=12").unwrap();
        assert_eq!(dir.size, Some(Expr::Const(Value::Int(12))));
        assert!(dir.kind.is_none());
        assert!(dir.cond.is_none());
    }

    #[test]
    fn test_parse_kinds() {
        for (input, want) in [
            ("type=dynarray", Kind::DynArray),
            ("type=DYNARRAY", Kind::DynArray),
            ("type=holeyarray", Kind::HoleyArray),
            ("type=DynString", Kind::DynString),
        ] {
            let dir = Directive::parse(input).unwrap();
            assert_eq!(dir.kind, Some(want), "input: {input}");
        }
    }

    #[test]
    fn test_parse_invalid_kind() {
        assert!(matches!(
            Directive::parse("type=blob"),
            Err(Error::InvalidKind { .. })
        ));
    }

    #[test]
    fn test_parse_condition_with_equality() {
        // the value itself contains '='; only the first one splits
        let dir = Directive::parse("if=%FieldB == 0").unwrap();
        assert_eq!(dir.cond.unwrap().to_string(), "(%FieldB == 0)");
    }

    #[test]
    fn test_parse_vars_keep_order() {
        let dir = Directive::parse("$b=1,size=12,$a=2").unwrap();
        assert!(dir.size.is_some());
        let names: Vec<_> = dir.var_names().collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(dir.has_var("a"));
        assert!(!dir.has_var("c"));
    }

    #[test]
    fn test_parse_unknown_option() {
        assert!(matches!(
            Directive::parse("length=12"),
            Err(Error::UnknownOption { .. })
        ));
    }

    #[test]
    fn test_parse_missing_equals() {
        assert!(matches!(
            Directive::parse("dynarray"),
            Err(Error::Syntax(_))
        ));
    }

    #[test]
    fn test_parse_full_directive() {
        let dir = Directive::parse("type=dynarray,size=uint32,if=%Count > 0").unwrap();
        assert!(dir.is_dyn_array());
        assert!(!dir.is_holey_array());
        assert!(dir.has_condition());
        assert_eq!(dir.size.unwrap().to_string(), "uint32");
    }
}
