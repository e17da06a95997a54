//! # binform-core
//!
//! A library for decoding binary data into dynamic record values driven by
//! compiled schemas.
//!
//! This crate provides the core functionality for:
//! - Describing record layouts with an explicit schema builder
//! - Annotating fields with directives (`size`, `if`, `ptrs`, `$name`,
//!   `type=dynarray|holeyarray|dynstring`)
//! - Decoding little-endian byte streams into [`RecordValue`] trees
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`expr`]: The directive expression language (tokenizer, parser, evaluator)
//! - [`directive`]: Compiled per-field annotations
//! - [`schema`]: Schema compilation and the shared registry
//! - [`decoder`]: The streaming decode engine
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use binform_core::{decode, FieldType, RecordSchema};
//! use std::fs::File;
//!
//! let schema = RecordSchema::builder("Header")
//!     .field("Magic", FieldType::U32)
//!     .field_with("Name", FieldType::Text, "type=dynstring,size=uint16")
//!     .field_with("Entries", FieldType::Seq(Box::new(FieldType::U64)), "type=dynarray,size=uint32")
//!     .build()?;
//!
//! let mut file = File::open("./data.bin")?;
//! let record = decode(&mut file, &schema)?;
//! println!("{record}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extensibility
//!
//! The library provides traits for customization:
//!
//! - [`DecodeHook`]: Let a type own its wire format entirely
//! - [`Resolver`]: Supply field, variable and identifier values to the
//!   expression evaluator

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod decoder;
pub mod directive;
pub mod error;
pub mod expr;
pub mod schema;
pub mod value;

// Re-export primary types for convenience
pub use decoder::{decode, DecodeHook, Decoder};
pub use directive::{Directive, Kind};
pub use error::{Error, Result};
pub use expr::eval::{eval, truthy, EmptyResolver, Resolver};
pub use expr::{parse, Expr};
pub use schema::{
    builtin_width, size_of, FieldSchema, FieldType, RecordBuilder, RecordSchema, SchemaRegistry,
};
pub use value::{RecordValue, Value};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum element count accepted for any decoded sequence or string.
/// Sizes at or above this limit (or below zero) abort the decode.
pub const MAX_SEQ_LEN: usize = 1_000_000;
