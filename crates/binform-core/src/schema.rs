//! Record schemas: the one-time-compiled description of a decodable type.
//!
//! Instead of inspecting runtime type metadata, callers describe a record
//! explicitly with [`RecordBuilder`]: an ordered list of named, typed fields,
//! each optionally carrying a directive string. Building parses and validates
//! every directive once and yields an immutable, shareable
//! [`RecordSchema`]; decoding never re-parses annotations.
//!
//! [`SchemaRegistry`] adds the process-lifetime cache: a record schema is
//! compiled at most once per name, and concurrent decoders on separate
//! threads may share it freely.

use crate::decoder::DecodeHook;
use crate::directive::{Directive, Kind};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};
use tracing::debug;

/// The runtime type of a record field
#[derive(Clone)]
pub enum FieldType {
    /// One byte; any nonzero byte decodes as true
    Bool,
    /// Signed 8-bit integer
    I8,
    /// Signed 16-bit integer, little-endian
    I16,
    /// Signed 32-bit integer, little-endian
    I32,
    /// Signed 64-bit integer, little-endian
    I64,
    /// Unsigned 8-bit integer
    U8,
    /// Unsigned 16-bit integer, little-endian
    U16,
    /// Unsigned 32-bit integer, little-endian
    U32,
    /// Unsigned 64-bit integer, little-endian
    U64,
    /// IEEE-754 single precision, little-endian
    F32,
    /// IEEE-754 double precision, little-endian
    F64,
    /// Text; requires a directive with a size expression
    Text,
    /// Variable-length sequence; element count comes from the directive
    Seq(Box<FieldType>),
    /// Fixed-length array with a static element count
    Array(Box<FieldType>, usize),
    /// Nested record
    Record(Arc<RecordSchema>),
    /// Pointer-like field; always decoded, never absent on the wire
    Ptr(Box<FieldType>),
    /// Type that owns its decoding via a custom hook
    Custom(Arc<dyn DecodeHook>),
}

impl fmt::Debug for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Bool => write!(f, "Bool"),
            FieldType::I8 => write!(f, "I8"),
            FieldType::I16 => write!(f, "I16"),
            FieldType::I32 => write!(f, "I32"),
            FieldType::I64 => write!(f, "I64"),
            FieldType::U8 => write!(f, "U8"),
            FieldType::U16 => write!(f, "U16"),
            FieldType::U32 => write!(f, "U32"),
            FieldType::U64 => write!(f, "U64"),
            FieldType::F32 => write!(f, "F32"),
            FieldType::F64 => write!(f, "F64"),
            FieldType::Text => write!(f, "Text"),
            FieldType::Seq(elem) => write!(f, "Seq({elem:?})"),
            FieldType::Array(elem, len) => write!(f, "Array({elem:?}, {len})"),
            FieldType::Record(schema) => write!(f, "Record({})", schema.name()),
            FieldType::Ptr(inner) => write!(f, "Ptr({inner:?})"),
            FieldType::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Resolves a builtin identifier to its byte width.
///
/// These are the reserved names usable inside size expressions:
/// `int8`/`uint8` through `int64`/`uint64`.
pub fn builtin_width(name: &str) -> Option<i64> {
    let width = match name {
        "int8" | "uint8" => 1,
        "int16" | "uint16" => 2,
        "int32" | "uint32" => 4,
        "int64" | "uint64" => 8,
        _ => return None,
    };
    Some(width)
}

/// Returns the fixed wire width of a type in bytes.
///
/// Defined for fixed-width primitives and fixed arrays of them; used by
/// skip (`_`) fields to know how many bytes to discard.
pub fn size_of(ty: &FieldType) -> Result<usize> {
    match ty {
        FieldType::Bool | FieldType::I8 | FieldType::U8 => Ok(1),
        FieldType::I16 | FieldType::U16 => Ok(2),
        FieldType::I32 | FieldType::U32 | FieldType::F32 => Ok(4),
        FieldType::I64 | FieldType::U64 | FieldType::F64 => Ok(8),
        FieldType::Array(elem, len) => {
            let elem_size = size_of(elem).map_err(|e| {
                Error::unsupported_type(format!("array element has no fixed size: {e}"))
            })?;
            Ok(elem_size * len)
        }
        other => Err(Error::unsupported_type(format!(
            "{other:?} has no fixed size"
        ))),
    }
}

/// A single compiled field descriptor
#[derive(Debug)]
pub struct FieldSchema {
    /// Field name; `_` marks a skip field
    pub name: String,
    /// The field's runtime type
    pub ty: FieldType,
    /// Compiled directive, if the field carries one
    pub directive: Option<Directive>,
}

impl FieldSchema {
    /// Returns true for the blank (`_`) skip marker
    pub fn is_skip(&self) -> bool {
        self.name == "_"
    }

    /// The field's directive kind, if any
    pub fn kind(&self) -> Option<Kind> {
        self.directive.as_ref().and_then(|d| d.kind)
    }
}

/// The one-time-compiled schema for a record type.
///
/// Immutable after construction; wrap in [`Arc`] (which [`RecordBuilder`]
/// already does) and share freely between threads.
#[derive(Debug)]
pub struct RecordSchema {
    name: String,
    fields: Vec<Arc<FieldSchema>>,
}

impl RecordSchema {
    /// Starts building a schema for the named record type
    pub fn builder(name: impl Into<String>) -> RecordBuilder {
        RecordBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// The record type's name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field descriptors in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &Arc<FieldSchema>> {
        self.fields.iter()
    }

    /// Number of declared fields (skip fields included)
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }
}

/// Builder for [`RecordSchema`] values
#[derive(Debug)]
pub struct RecordBuilder {
    name: String,
    fields: Vec<(String, FieldType, Option<String>)>,
}

impl RecordBuilder {
    /// Appends a field without a directive
    pub fn field(self, name: impl Into<String>, ty: FieldType) -> Self {
        self.push(name.into(), ty, None)
    }

    /// Appends a field with a directive string (parsed at build time)
    pub fn field_with(
        self,
        name: impl Into<String>,
        ty: FieldType,
        directive: impl Into<String>,
    ) -> Self {
        self.push(name.into(), ty, Some(directive.into()))
    }

    /// Appends a blank (`_`) skip field of the given type
    pub fn skip(self, ty: FieldType) -> Self {
        self.push("_".into(), ty, None)
    }

    fn push(mut self, name: String, ty: FieldType, directive: Option<String>) -> Self {
        self.fields.push((name, ty, directive));
        self
    }

    /// Compiles the schema: parses every directive and applies field-level
    /// validation. Directive errors surface here, once, and are permanent
    /// for the type.
    pub fn build(self) -> Result<Arc<RecordSchema>> {
        let mut fields = Vec::with_capacity(self.fields.len());
        for (name, ty, raw) in self.fields {
            let directive = match raw {
                Some(text) => Some(Directive::parse(&text)?),
                None => None,
            };
            let field = FieldSchema {
                name,
                ty,
                directive,
            };
            check_field(&field)?;
            fields.push(Arc::new(field));
        }
        debug!(record = %self.name, fields = fields.len(), "compiled record schema");
        Ok(Arc::new(RecordSchema {
            name: self.name,
            fields,
        }))
    }
}

/// Field-level validation applied at schema build time.
///
/// A text field must carry a directive, and a size expression unless its
/// kind is `dynstring`.
fn check_field(field: &FieldSchema) -> Result<()> {
    if matches!(field.ty, FieldType::Text) {
        let Some(dir) = &field.directive else {
            return Err(Error::MissingDirective {
                field: field.name.clone(),
            });
        };
        if dir.size.is_none() && !dir.is_dyn_string() {
            return Err(Error::MissingSize {
                field: field.name.clone(),
            });
        }
    }
    Ok(())
}

/// Concurrent cache of compiled record schemas, keyed by record name.
///
/// Replaces a bare global map: first use compiles, later lookups return the
/// shared descriptor, and concurrent first-use from several threads is safe
/// (both builders run, one result wins, both callers get the same `Arc`
/// content semantics).
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    cache: RwLock<HashMap<String, Arc<RecordSchema>>>,
}

impl SchemaRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-global registry
    pub fn global() -> &'static SchemaRegistry {
        static GLOBAL: OnceLock<SchemaRegistry> = OnceLock::new();
        GLOBAL.get_or_init(SchemaRegistry::new)
    }

    /// Looks up a cached schema by record name
    pub fn get(&self, name: &str) -> Option<Arc<RecordSchema>> {
        self.cache
            .read()
            .ok()
            .and_then(|cache| cache.get(name).cloned())
    }

    /// Returns the cached schema for `name`, building and caching it on
    /// first use. The builder closure runs outside the lock.
    pub fn get_or_build<F>(&self, name: &str, build: F) -> Result<Arc<RecordSchema>>
    where
        F: FnOnce() -> Result<Arc<RecordSchema>>,
    {
        if let Some(schema) = self.get(name) {
            return Ok(schema);
        }
        let schema = build()?;
        let mut cache = self
            .cache
            .write()
            .map_err(|_| Error::internal("schema registry lock poisoned"))?;
        // lost the race: keep the first published schema
        let entry = cache
            .entry(name.to_string())
            .or_insert_with(|| schema.clone());
        Ok(entry.clone())
    }

    /// Number of cached schemas
    pub fn len(&self) -> usize {
        self.cache.read().map(|cache| cache.len()).unwrap_or(0)
    }

    /// Returns true if nothing is cached yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
