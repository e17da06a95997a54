//! Error types for the binform-core library.
//!
//! This module provides comprehensive error handling using the `thiserror` crate,
//! with detailed error variants for each failure mode: directive and expression
//! syntax problems (detected once, at schema build time), evaluation and type
//! errors, resource limits, and I/O failures (detected per field during decode).

use thiserror::Error;

/// Result type alias for binform operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all binform operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Malformed directive or expression text
    #[error("syntax error: {0}")]
    Syntax(String),

    /// Directive key that is not `type`, `size`, `if`, `ptrs` or `$name`
    #[error("unknown directive option: '{key}'")]
    UnknownOption {
        /// The unrecognized key
        key: String,
    },

    /// Invalid value for the `type` directive key
    #[error("invalid directive kind '{value}': expected dynarray, holeyarray or dynstring")]
    InvalidKind {
        /// The rejected `type=` value
        value: String,
    },

    /// A text field is missing its required directive
    #[error("field '{field}': text fields require a directive")]
    MissingDirective {
        /// Name of the offending field
        field: String,
    },

    /// A text field's directive is missing its required size expression
    #[error("field '{field}': missing size expression")]
    MissingSize {
        /// Name of the offending field
        field: String,
    },

    /// Field reference did not resolve against the enclosing record
    #[error("field not found: '{0}'")]
    FieldNotFound(String),

    /// Variable reference did not resolve in any scope frame
    #[error("variable not defined: '{0}'")]
    VarNotDefined(String),

    /// Identifier is not a builtin type-size constant
    #[error("unknown identifier: '{0}'")]
    UnknownIdent(String),

    /// Call expressions parse but have no evaluation rule
    #[error("unsupported call expression: '{0}()'")]
    UnsupportedCall(String),

    /// A value had the wrong shape for the operation applied to it
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Comparison between kinds with no common ordering
    #[error("cannot compare {lhs} with {rhs}")]
    Incomparable {
        /// Kind of the left operand
        lhs: &'static str,
        /// Kind of the right operand
        rhs: &'static str,
    },

    /// Sequence count was negative or at/above the allocation limit
    #[error("sequence size {size} out of bounds (max {max})")]
    SizeLimit {
        /// The requested element count
        size: i64,
        /// Maximum permitted element count
        max: usize,
    },

    /// Length-prefix width outside the supported set {1, 2, 4}
    #[error("invalid length-prefix width {width}: must be 1, 2 or 4 bytes")]
    InvalidLengthWidth {
        /// The rejected width
        width: i64,
    },

    /// Type that the generic dispatch cannot decode in this position
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// Underlying byte source failure (short read, stream error)
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    /// Failure propagated verbatim from a custom decode hook
    #[error("custom decode hook failed: {0}")]
    Hook(String),

    /// Violated internal invariant (a bug in the caller or the library)
    #[error("internal error: {0}")]
    Internal(String),

    /// Decode failure annotated with the dotted field path and byte offset
    #[error("decoding error at {path} (offset {offset}): {source}")]
    Decode {
        /// Dotted field-name path, innermost field last
        path: String,
        /// Byte offset at the original point of failure
        offset: u64,
        /// The underlying error
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Creates a new syntax error
    pub fn syntax(msg: impl Into<String>) -> Self {
        Self::Syntax(msg.into())
    }

    /// Creates a new unknown-option error
    pub fn unknown_option(key: impl Into<String>) -> Self {
        Self::UnknownOption { key: key.into() }
    }

    /// Creates a new invalid-kind error
    pub fn invalid_kind(value: impl Into<String>) -> Self {
        Self::InvalidKind {
            value: value.into(),
        }
    }

    /// Creates a new type mismatch error
    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        Self::TypeMismatch(msg.into())
    }

    /// Creates a new resource limit error
    pub fn size_limit(size: i64, max: usize) -> Self {
        Self::SizeLimit { size, max }
    }

    /// Creates a new unsupported-type error
    pub fn unsupported_type(msg: impl Into<String>) -> Self {
        Self::UnsupportedType(msg.into())
    }

    /// Creates a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Wraps this error with field-path context.
    ///
    /// Called as a failure bubbles outward through nested records: the
    /// innermost field wraps first (capturing the byte offset at the point
    /// of failure), every enclosing record prepends its own field name.
    pub fn at_field(self, name: &str, offset: u64) -> Self {
        match self {
            Self::Decode {
                path,
                offset,
                source,
            } => Self::Decode {
                path: format!("{name}.{path}"),
                offset,
                source,
            },
            other => Self::Decode {
                path: name.to_string(),
                offset,
                source: Box::new(other),
            },
        }
    }

    /// Returns true if this error was detected at schema build time.
    ///
    /// Schema errors are permanent for the type: retrying the decode cannot
    /// help, the annotation itself must be fixed.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Self::Syntax(_)
                | Self::UnknownOption { .. }
                | Self::InvalidKind { .. }
                | Self::MissingDirective { .. }
                | Self::MissingSize { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::VarNotDefined("count".into());
        assert!(err.to_string().contains("variable not defined"));
        assert!(err.to_string().contains("count"));
    }

    #[test]
    fn test_at_field_wraps_once() {
        let err = Error::size_limit(2_000_000, 1_000_000).at_field("Data", 42);
        match err {
            Error::Decode { path, offset, .. } => {
                assert_eq!(path, "Data");
                assert_eq!(offset, 42);
            }
            other => panic!("expected Decode, got {other:?}"),
        }
    }

    #[test]
    fn test_at_field_prepends_outer_name() {
        let err = Error::VarNotDefined("size".into())
            .at_field("Data", 7)
            .at_field("Inner", 9);
        match err {
            Error::Decode { path, offset, .. } => {
                assert_eq!(path, "Inner.Data");
                // offset stays at the innermost failure
                assert_eq!(offset, 7);
            }
            other => panic!("expected Decode, got {other:?}"),
        }
    }

    #[test]
    fn test_is_schema_error() {
        assert!(Error::invalid_kind("blob").is_schema_error());
        assert!(!Error::size_limit(-1, 1_000_000).is_schema_error());
    }
}
