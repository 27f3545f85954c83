//! Schema model and content validation for Collecta.
//!
//! A [`Schema`] is a small recursive type system (structs, lists, enums,
//! literals, typed document references, files) that describes the content of
//! every document in a collection:
//! - [`TypeDefinition`]: one variant per kind, with `Ref` as explicit indirection
//! - [`FormatRegistry`]: pluggable named refinements for scalar types
//! - [`ContentValidator`]: checks a JSON value against a schema and collects [`Issue`]s
//! - [`proto_refs`]: finds and substitutes proto ids inside schemas and content
//!
//! Issues describe bad content and are never fatal. A malformed schema
//! (unknown root type or `Ref` target) is a [`SchemaStructureError`].

mod error;
pub mod file;
mod format;
mod issue;
mod model;
pub mod proto_refs;
mod validate;
pub mod walk;

pub use error::SchemaStructureError;
pub use file::FileValue;
pub use format::{FnFormat, Format, FormatRegistry, FormatTarget, builtin_format_ids};
pub use issue::{Issue, IssueKind, PathKey, PathSegment};
pub use model::{EnumMember, EnumValue, OrderedMap, Schema, TypeDefinition};
pub use validate::{ContentValidator, DEFAULT_MAX_JSON_OBJECT_DEPTH, validate};
