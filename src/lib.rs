//! Declare the shape of a deeply nested record once; get a compiled record
//! descriptor, coercion of loosely-typed input onto it, per-field validation,
//! and a stream of random valid instances for property testing.
//!
//! Pipeline:
//! - [`SchemaBuilder`] accumulates a [`Shape`] plus overrides, defaults and
//!   calculated fields, and compiles them into an immutable [`RecordType`]
//!   (one per nesting level, children named `parent.field`).
//! - [`cast`] maps an external nested-or-flat keyed blob onto a record type,
//!   reconstructing nesting from flattened keys when asked, and reports
//!   every failure with its full dotted path in one [`CastError`].
//! - [`InstanceDraws`] composes the per-field generators into a lazy,
//!   restartable stream of instances that always satisfy validation.
//!
//! Design goals:
//! - Data-driven: record types are in-memory descriptors interpreted at
//!   runtime, never generated code; field lookup is a plain string registry.
//! - Deterministic: compilation is pure; draws derive from (seed, index).
//! - Total error reporting: a cast either yields a complete valid instance
//!   or the complete list of everything wrong — never a partial instance.
//!
//! Semantic types plug in through the three-function [`SemanticType`]
//! contract (`coerce` / `validate` / `generate`); built-ins live in
//! [`types`].

pub mod cast;
pub mod compile;
pub mod contract;
pub mod error;
pub mod generate;
pub mod lazy;
pub mod record;
pub mod shape;
pub mod types;

pub use cast::{cast, CastOptions, SplitMode};
pub use contract::{GenOptions, Reason, SemanticType, ValueStream};
pub use error::{CastError, Issue, IssueKind, SchemaError};
pub use generate::InstanceDraws;
pub use lazy::{Lazy, Staleness};
pub use record::{ElemKind, FieldKind, RecordType};
pub use shape::{FieldDecl, Prim, SchemaBuilder, Shape, TypeRef};
