//! The decode engine: schema-driven traversal of a byte stream.
//!
//! [`Decoder`] walks a record's field descriptors in declaration order and,
//! per field, pushes a scope frame, evaluates the directive expressions
//! (variable bindings first, then `size`, `ptrs` and `if`), and dispatches
//! on the field's runtime type and directive kind. Bytes are consumed
//! exactly once, in order, with no backtracking; the source only needs to
//! be forward-readable.
//!
//! ## Dispatch priority
//!
//! 1. Custom decode hook (full override)
//! 2. Skip (`_`) field: discard `size_of(type)` bytes
//! 3. Sequence + `dynarray`: length prefix, then that many elements
//! 4. Sequence + `holeyarray`: presence list decides which slots exist
//! 5. Sequence: fixed element count from `size`
//! 6. Text + `dynstring`: length prefix, then raw bytes
//! 7. Text: exactly `size` bytes, trailing NULs trimmed
//! 8. Fixed array, nested record, pointer, primitive
//!
//! Failures abort the whole decode and carry the dotted field path plus the
//! byte offset at the original point of failure.

mod scope;

use crate::directive::Kind;
use crate::error::{Error, Result};
use crate::expr::eval::{eval, truthy, Resolver};
use crate::expr::Expr;
use crate::schema::{builtin_width, size_of, FieldSchema, FieldType, RecordSchema};
use crate::value::{RecordValue, Value};
use crate::MAX_SEQ_LEN;
use scope::ScopeStack;
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, trace};

/// Capability for types that own their decoding.
///
/// When a field's type carries a hook, the engine invokes it exclusively;
/// its output fully overrides the generic dispatch. The hook receives the
/// decoder and may use the primitive readers ([`Decoder::read_u8`] and
/// friends) to consume as many bytes as its format requires.
pub trait DecodeHook: Send + Sync {
    /// Decodes one value from the stream
    fn decode(&self, dec: &mut Decoder<'_>) -> Result<Value>;
}

/// Decodes one record from a byte source using its compiled schema.
///
/// Convenience entry point over [`Decoder::decode_record`].
pub fn decode(rd: &mut dyn Read, schema: &RecordSchema) -> Result<RecordValue> {
    Decoder::new(rd).decode_record(schema)
}

/// Schema-driven binary decoder over a forward-only byte source
pub struct Decoder<'a> {
    rd: &'a mut dyn Read,
    pos: u64,
    stack: ScopeStack,
}

/// Resolver over the record under construction and the scope stack
struct DirectiveScope<'a> {
    record: &'a RecordValue,
    stack: &'a ScopeStack,
}

impl Resolver for DirectiveScope<'_> {
    fn field(&self, name: &str) -> Option<Value> {
        self.record.get(name).cloned()
    }

    fn variable(&self, name: &str) -> Option<Value> {
        self.stack.lookup(name)
    }

    fn ident(&self, name: &str) -> Option<Value> {
        builtin_width(name).map(Value::Int)
    }
}

impl<'a> Decoder<'a> {
    /// Creates a decoder over the given byte source
    pub fn new(rd: &'a mut dyn Read) -> Self {
        Self {
            rd,
            pos: 0,
            stack: ScopeStack::new(),
        }
    }

    /// Current byte offset from the start of the stream
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Decodes one record according to its schema.
    ///
    /// Fields are visited in declaration order; nested records recurse with
    /// the enclosing frames (and their variable bindings) still in scope.
    pub fn decode_record(&mut self, schema: &RecordSchema) -> Result<RecordValue> {
        debug!(record = %schema.name(), pos = self.pos, "decoding record");
        let mut record = RecordValue::new(schema.name());
        for field in schema.fields() {
            self.stack.push();
            let res = self.decode_field(field, &mut record);
            self.stack.pop()?;
            if let Err(err) = res {
                return Err(err.at_field(&field.name, self.pos));
            }
        }
        Ok(record)
    }

    fn decode_field(&mut self, field: &Arc<FieldSchema>, record: &mut RecordValue) -> Result<()> {
        trace!(field = %field.name, pos = self.pos, depth = self.stack.depth(), "field");
        self.eval_directives(field, record)?;

        let skipped_by_condition = match &self.stack.current_ref()?.condition {
            Some(cond) => !truthy(cond),
            None => false,
        };
        if skipped_by_condition {
            trace!(field = %field.name, "condition false, keeping zero value");
            if !field.is_skip() {
                record.push(field.name.clone(), Value::zero_of(&field.ty));
            }
            return Ok(());
        }

        if let FieldType::Custom(hook) = &field.ty {
            let value = hook.decode(self)?;
            if !field.is_skip() {
                record.push(field.name.clone(), value);
            }
            return Ok(());
        }

        if field.is_skip() {
            let n = size_of(&field.ty)?;
            return self.skip(n as u64);
        }

        let value = self.decode_directed(field)?;
        record.push(field.name.clone(), value);
        Ok(())
    }

    /// Evaluates the field's directive into the current frame: variable
    /// bindings first (in declared order), then `size`, `ptrs` and `if`.
    fn eval_directives(&mut self, field: &FieldSchema, record: &RecordValue) -> Result<()> {
        let Some(dir) = &field.directive else {
            return Ok(());
        };

        for (name, expr) in &dir.vars {
            let value = self.eval_expr(record, expr)?;
            self.stack.bind(name.clone(), value)?;
        }

        if let Some(size) = &dir.size {
            let count = self.eval_expr(record, size)?.as_count()?;
            self.stack.current()?.size = Some(count);
        }

        if let Some(ptrs) = &dir.ptrs {
            match self.eval_expr(record, ptrs)? {
                Value::Seq(items) => self.stack.current()?.presence = Some(items),
                other => {
                    return Err(Error::type_mismatch(format!(
                        "ptrs must evaluate to a sequence, got {}",
                        other.kind()
                    )));
                }
            }
        }

        if let Some(cond) = &dir.cond {
            let value = self.eval_expr(record, cond)?;
            self.stack.current()?.condition = Some(value);
        }

        Ok(())
    }

    fn eval_expr(&self, record: &RecordValue, expr: &Expr) -> Result<Value> {
        let scope = DirectiveScope {
            record,
            stack: &self.stack,
        };
        eval(&scope, expr)
    }

    /// Dispatches on the field's runtime type and directive kind
    fn decode_directed(&mut self, field: &FieldSchema) -> Result<Value> {
        match &field.ty {
            FieldType::Seq(elem) => match field.kind() {
                Some(Kind::DynArray) => {
                    let len = self.read_len_prefix()?;
                    self.decode_seq(elem, len as i64)
                }
                Some(Kind::HoleyArray) => self.decode_holey(elem),
                _ => {
                    let count = self.stack.current_ref()?.size.unwrap_or(0);
                    self.decode_seq(elem, count)
                }
            },
            FieldType::Text => {
                if field.kind() == Some(Kind::DynString) {
                    let len = self.read_len_prefix()?;
                    self.read_text(len as i64)
                } else {
                    let size = self.stack.current_ref()?.size.unwrap_or(0);
                    if size == 0 {
                        return Err(Error::type_mismatch("text field with size 0"));
                    }
                    self.read_text(size)
                }
            }
            other => self.decode_value(other),
        }
    }

    /// Decodes a single value of the given type.
    ///
    /// This is the recursion point used for sequence elements, array
    /// elements, nested records and pointer targets. Sequence and text
    /// types cannot appear here: their sizes live in field directives, so
    /// they are only decodable as directly annotated record fields.
    pub fn decode_value(&mut self, ty: &FieldType) -> Result<Value> {
        match ty {
            FieldType::Bool => Ok(Value::Bool(self.read_u8()? != 0)),
            FieldType::I8 => Ok(Value::Int(self.read_i8()? as i64)),
            FieldType::I16 => Ok(Value::Int(self.read_i16()? as i64)),
            FieldType::I32 => Ok(Value::Int(self.read_i32()? as i64)),
            FieldType::I64 => Ok(Value::Int(self.read_i64()?)),
            FieldType::U8 => Ok(Value::Uint(self.read_u8()? as u64)),
            FieldType::U16 => Ok(Value::Uint(self.read_u16()? as u64)),
            FieldType::U32 => Ok(Value::Uint(self.read_u32()? as u64)),
            FieldType::U64 => Ok(Value::Uint(self.read_u64()?)),
            FieldType::F32 => Ok(Value::Float(self.read_f32()? as f64)),
            FieldType::F64 => Ok(Value::Float(self.read_f64()?)),
            FieldType::Record(schema) => self.decode_record(schema).map(Value::Record),
            FieldType::Array(elem, len) => {
                let mut items = Vec::with_capacity(*len);
                for _ in 0..*len {
                    items.push(self.decode_value(elem)?);
                }
                Ok(Value::Seq(items))
            }
            FieldType::Ptr(inner) => {
                // no absent wire form: always decode a fresh target
                Ok(Value::Ptr(Box::new(self.decode_value(inner)?)))
            }
            FieldType::Custom(hook) => hook.decode(self),
            FieldType::Seq(_) => Err(Error::unsupported_type(
                "sequence outside a directive-annotated field",
            )),
            FieldType::Text => Err(Error::unsupported_type(
                "text outside a directive-annotated field",
            )),
        }
    }

    fn decode_seq(&mut self, elem: &FieldType, count: i64) -> Result<Value> {
        if count < 0 || count >= MAX_SEQ_LEN as i64 {
            return Err(Error::size_limit(count, MAX_SEQ_LEN));
        }
        let mut items = Vec::with_capacity(count as usize);
        for _ in 0..count {
            items.push(self.decode_value(elem)?);
        }
        Ok(Value::Seq(items))
    }

    fn decode_holey(&mut self, elem: &FieldType) -> Result<Value> {
        let presence = self
            .stack
            .current()?
            .presence
            .take()
            .ok_or_else(|| Error::type_mismatch("holey array requires a ptrs directive"))?;
        if presence.len() >= MAX_SEQ_LEN {
            return Err(Error::size_limit(presence.len() as i64, MAX_SEQ_LEN));
        }
        let mut items = Vec::with_capacity(presence.len());
        for flag in &presence {
            if truthy(flag) {
                items.push(self.decode_value(elem)?);
            } else {
                items.push(Value::zero_of(elem));
            }
        }
        Ok(Value::Seq(items))
    }

    /// Reads a little-endian length prefix of the given byte width.
    ///
    /// Only 1, 2 and 4 byte prefixes exist on the wire; any other width is
    /// rejected.
    pub fn read_len(&mut self, width: i64) -> Result<usize> {
        match width {
            1 => Ok(self.read_u8()? as usize),
            2 => Ok(self.read_u16()? as usize),
            4 => Ok(self.read_u32()? as usize),
            w => Err(Error::InvalidLengthWidth { width: w }),
        }
    }

    /// Reads the length prefix whose width was resolved from the `size`
    /// expression of the current field.
    fn read_len_prefix(&mut self) -> Result<usize> {
        let width = self.stack.current_ref()?.size.unwrap_or(0);
        self.read_len(width)
    }

    /// Reads `len` raw bytes and exposes them as text with trailing NUL
    /// bytes trimmed.
    fn read_text(&mut self, len: i64) -> Result<Value> {
        if len < 0 || len >= MAX_SEQ_LEN as i64 {
            return Err(Error::size_limit(len, MAX_SEQ_LEN));
        }
        let buf = self.read_bytes(len as usize)?;
        let end = buf
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |idx| idx + 1);
        Ok(Value::Text(
            String::from_utf8_lossy(&buf[..end]).into_owned(),
        ))
    }

    /// Discards exactly `n` bytes from the stream
    pub fn skip(&mut self, n: u64) -> Result<()> {
        let mut remaining = n;
        let mut scratch = [0u8; 512];
        while remaining > 0 {
            let chunk = remaining.min(scratch.len() as u64) as usize;
            self.fill(&mut scratch[..chunk])?;
            remaining -= chunk as u64;
        }
        Ok(())
    }

    /// Reads exactly `n` raw bytes
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        self.rd.read_exact(buf)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    /// Reads one unsigned byte
    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.fill(&mut buf)?;
        Ok(buf[0])
    }

    /// Reads a little-endian u16
    pub fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.fill(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Reads a little-endian u32
    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.fill(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Reads a little-endian u64
    pub fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.fill(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Reads one signed byte
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Reads a little-endian i16
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    /// Reads a little-endian i32
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    /// Reads a little-endian i64
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(self.read_u64()? as i64)
    }

    /// Reads a little-endian IEEE-754 single
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Reads a little-endian IEEE-754 double
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }
}
