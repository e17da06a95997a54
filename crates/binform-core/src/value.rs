//! Dynamic values produced by the decoder and consumed by the evaluator.
//!
//! The schema is an explicit description rather than a reflected native type,
//! so decoding yields a [`Value`] tree: primitives, text, sequences, nested
//! records and pointers. Directive expressions evaluate over the same type,
//! which is what lets a `size` or `if` expression reference a sibling field
//! that was decoded a moment earlier.

use crate::schema::FieldType;
use std::fmt;

/// A single decoded (or evaluated) value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value (`nil` literal, zero value of a pointer)
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer (all signed widths normalize to 64 bits)
    Int(i64),
    /// Unsigned integer (all unsigned widths normalize to 64 bits)
    Uint(u64),
    /// Floating point (both widths normalize to 64 bits)
    Float(f64),
    /// Text with trailing NUL bytes already trimmed
    Text(String),
    /// Sequence of values (dynamic, holey and fixed arrays)
    Seq(Vec<Value>),
    /// Nested record
    Record(RecordValue),
    /// Pointer target, always present after a successful decode
    Ptr(Box<Value>),
}

impl Value {
    /// Short kind name used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Uint(_) => "uint",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Seq(_) => "sequence",
            Value::Record(_) => "record",
            Value::Ptr(_) => "pointer",
        }
    }

    /// Returns the zero value for a field type.
    ///
    /// Used for fields whose `if` condition evaluated false and for absent
    /// holey-array slots. The zero of a pointer is [`Value::Null`]; the zero
    /// of a fixed array is a sequence of zero elements.
    pub fn zero_of(ty: &FieldType) -> Value {
        match ty {
            FieldType::Bool => Value::Bool(false),
            FieldType::I8 | FieldType::I16 | FieldType::I32 | FieldType::I64 => Value::Int(0),
            FieldType::U8 | FieldType::U16 | FieldType::U32 | FieldType::U64 => Value::Uint(0),
            FieldType::F32 | FieldType::F64 => Value::Float(0.0),
            FieldType::Text => Value::Text(String::new()),
            FieldType::Seq(_) => Value::Seq(Vec::new()),
            FieldType::Array(elem, len) => {
                Value::Seq((0..*len).map(|_| Value::zero_of(elem)).collect())
            }
            FieldType::Record(schema) => {
                let mut rec = RecordValue::new(schema.name());
                for field in schema.fields() {
                    if !field.is_skip() {
                        rec.push(field.name.clone(), Value::zero_of(&field.ty));
                    }
                }
                Value::Record(rec)
            }
            FieldType::Ptr(_) => Value::Null,
            FieldType::Custom(_) => Value::Null,
        }
    }

    /// Returns true if this value equals its kind's zero value
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Int(i) => *i == 0,
            Value::Uint(u) => *u == 0,
            Value::Float(f) => *f == 0.0,
            Value::Text(s) => s.is_empty(),
            Value::Seq(items) => items.is_empty(),
            Value::Record(rec) => rec.fields().all(|(_, v)| v.is_zero()),
            Value::Ptr(_) => false,
        }
    }

    /// Interprets this value as a signed element/byte count.
    ///
    /// Unsigned counts that overflow i64 wrap negative and are rejected by
    /// the decoder's size guard.
    pub(crate) fn as_count(&self) -> crate::Result<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            Value::Uint(u) => Ok(*u as i64),
            other => Err(crate::Error::type_mismatch(format!(
                "expected a numeric count, got {}",
                other.kind()
            ))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Uint(u) => write!(f, "{u}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Seq(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Record(rec) => write!(f, "{rec}"),
            Value::Ptr(inner) => write!(f, "&{inner}"),
        }
    }
}

/// An ordered collection of decoded field values.
///
/// Fields appear in declaration order; skip (`_`) fields are never stored.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordValue {
    name: String,
    fields: Vec<(String, Value)>,
}

impl RecordValue {
    /// Creates an empty record value for the named record type
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Name of the record type this value was decoded from
    pub fn type_name(&self) -> &str {
        &self.name
    }

    /// Appends a decoded field value
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.fields.push((name.into(), value));
    }

    /// Looks up a field value by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Iterates fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of stored fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no fields are stored
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for RecordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.name)?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;

    #[test]
    fn test_zero_of_primitives() {
        assert_eq!(Value::zero_of(&FieldType::Bool), Value::Bool(false));
        assert_eq!(Value::zero_of(&FieldType::I32), Value::Int(0));
        assert_eq!(Value::zero_of(&FieldType::U64), Value::Uint(0));
        assert_eq!(Value::zero_of(&FieldType::F32), Value::Float(0.0));
        assert_eq!(Value::zero_of(&FieldType::Text), Value::Text(String::new()));
    }

    #[test]
    fn test_zero_of_compounds() {
        let seq = FieldType::Seq(Box::new(FieldType::U8));
        assert_eq!(Value::zero_of(&seq), Value::Seq(vec![]));

        let arr = FieldType::Array(Box::new(FieldType::U16), 3);
        assert_eq!(
            Value::zero_of(&arr),
            Value::Seq(vec![Value::Uint(0), Value::Uint(0), Value::Uint(0)])
        );

        let ptr = FieldType::Ptr(Box::new(FieldType::U8));
        assert_eq!(Value::zero_of(&ptr), Value::Null);
    }

    #[test]
    fn test_is_zero() {
        assert!(Value::Null.is_zero());
        assert!(Value::Int(0).is_zero());
        assert!(!Value::Int(-1).is_zero());
        assert!(Value::Seq(vec![]).is_zero());
        assert!(!Value::Seq(vec![Value::Uint(0)]).is_zero());
        assert!(!Value::Ptr(Box::new(Value::Int(0))).is_zero());
    }

    #[test]
    fn test_record_lookup_order() {
        let mut rec = RecordValue::new("Test");
        rec.push("A", Value::Int(1));
        rec.push("B", Value::Int(2));
        assert_eq!(rec.get("B"), Some(&Value::Int(2)));
        assert_eq!(rec.get("C"), None);
        let names: Vec<_> = rec.fields().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["A", "B"]);
    }
}
