//! Expression evaluation against pluggable resolvers.
//!
//! The evaluator is pure: it walks an [`Expr`] tree and consults a
//! [`Resolver`] for the three lookup namespaces (fields, variables, builtin
//! identifiers). The decode engine passes a resolver backed by the record
//! under construction and the scope stack; tests pass map-backed resolvers.

use super::{BinaryOp, Expr, UnaryOp};
use crate::error::{Error, Result};
use crate::value::Value;

/// Lookup capabilities the evaluator depends on.
///
/// Each method returns `None` when the name does not resolve; the evaluator
/// turns that into the matching not-found error.
pub trait Resolver {
    /// Resolves a `%name` field reference against the enclosing record
    fn field(&self, name: &str) -> Option<Value>;

    /// Resolves a `$name` variable reference against the scope stack
    fn variable(&self, name: &str) -> Option<Value>;

    /// Resolves a bare identifier (builtin type-size constants)
    fn ident(&self, name: &str) -> Option<Value>;
}

/// Resolver with no names defined; constants-only evaluation
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyResolver;

impl Resolver for EmptyResolver {
    fn field(&self, _name: &str) -> Option<Value> {
        None
    }

    fn variable(&self, _name: &str) -> Option<Value> {
        None
    }

    fn ident(&self, _name: &str) -> Option<Value> {
        None
    }
}

/// Coerces a value to a boolean.
///
/// The rules are asymmetric on purpose: signed integers and floats are true
/// only when strictly positive, unsigned integers whenever nonzero. NaN and
/// negative infinity coerce to false. Text and sequences are true when
/// non-empty, pointers when present, and everything else when it is not its
/// kind's zero value.
pub fn truthy(val: &Value) -> bool {
    match val {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i > 0,
        Value::Uint(u) => *u != 0,
        Value::Float(f) => *f > 0.0,
        Value::Text(s) => !s.is_empty(),
        Value::Seq(items) => !items.is_empty(),
        Value::Ptr(_) => true,
        other => !other.is_zero(),
    }
}

fn cmp_ordered<T: PartialOrd>(op: BinaryOp, x: T, y: T) -> Result<bool> {
    let res = match op {
        BinaryOp::Lss => x < y,
        BinaryOp::Gtr => x > y,
        BinaryOp::Eql => x == y,
        BinaryOp::Neq => x != y,
        BinaryOp::Leq => x <= y,
        BinaryOp::Geq => x >= y,
        BinaryOp::And | BinaryOp::Or => {
            return Err(Error::type_mismatch(format!(
                "operator '{op}' requires boolean operands"
            )));
        }
    };
    Ok(res)
}

fn as_f64(val: &Value) -> Result<f64> {
    match val {
        Value::Int(i) => Ok(*i as f64),
        Value::Uint(u) => Ok(*u as f64),
        Value::Float(f) => Ok(*f),
        other => Err(Error::type_mismatch(format!(
            "cannot convert {} to float",
            other.kind()
        ))),
    }
}

fn as_i64(val: &Value) -> Result<i64> {
    match val {
        Value::Int(i) => Ok(*i),
        Value::Uint(u) => Ok(*u as i64),
        other => Err(Error::type_mismatch(format!(
            "cannot convert {} to integer",
            other.kind()
        ))),
    }
}

fn is_numeric(val: &Value) -> bool {
    matches!(val, Value::Int(_) | Value::Uint(_))
}

/// Applies a binary operator to two values.
///
/// If either operand is boolean, both are coerced and only `&&`, `||`, `==`
/// and `!=` are legal. Otherwise a float operand promotes the comparison to
/// f64, integer operands compare as i64, and anything else is incomparable.
pub fn compare(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<bool> {
    if matches!(lhs, Value::Bool(_)) || matches!(rhs, Value::Bool(_)) {
        let a = truthy(lhs);
        let b = truthy(rhs);
        return match op {
            BinaryOp::And => Ok(a && b),
            BinaryOp::Or => Ok(a || b),
            BinaryOp::Eql => Ok(a == b),
            BinaryOp::Neq => Ok(a != b),
            _ => Err(Error::type_mismatch(format!(
                "invalid operator '{op}' for booleans"
            ))),
        };
    }
    if matches!(lhs, Value::Float(_)) || matches!(rhs, Value::Float(_)) {
        return cmp_ordered(op, as_f64(lhs)?, as_f64(rhs)?);
    }
    if is_numeric(lhs) || is_numeric(rhs) {
        return cmp_ordered(op, as_i64(lhs)?, as_i64(rhs)?);
    }
    Err(Error::Incomparable {
        lhs: lhs.kind(),
        rhs: rhs.kind(),
    })
}

/// Evaluates an expression against the given resolver.
///
/// Evaluation is side-effect free beyond the resolver lookups. Call
/// expressions are rejected with [`Error::UnsupportedCall`]: they parse for
/// forward compatibility but have no evaluation rule.
pub fn eval(ctx: &dyn Resolver, expr: &Expr) -> Result<Value> {
    match expr {
        Expr::Const(v) => Ok(v.clone()),
        Expr::Field(name) => ctx
            .field(name)
            .ok_or_else(|| Error::FieldNotFound(name.clone())),
        Expr::Var(name) => ctx
            .variable(name)
            .ok_or_else(|| Error::VarNotDefined(name.clone())),
        Expr::Ident(name) => ctx
            .ident(name)
            .ok_or_else(|| Error::UnknownIdent(name.clone())),
        Expr::Unary { op, operand } => {
            let v = eval(ctx, operand)?;
            match op {
                UnaryOp::Neg => match v {
                    Value::Int(i) => Ok(Value::Int(-i)),
                    Value::Float(f) => Ok(Value::Float(-f)),
                    other => Err(Error::type_mismatch(format!(
                        "invalid operand for unary '-': {}",
                        other.kind()
                    ))),
                },
                UnaryOp::Not => Ok(Value::Bool(!truthy(&v))),
            }
        }
        Expr::Binary { op, lhs, rhs } => {
            let a = eval(ctx, lhs)?;
            let b = eval(ctx, rhs)?;
            compare(*op, &a, &b).map(Value::Bool)
        }
        Expr::Call { name, .. } => Err(Error::UnsupportedCall(name.clone())),
    }
}
