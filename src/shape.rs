//! Declarative side of the pipeline: the shape tree and the schema builder.
//!
//! A [`Shape`] is the static description of one nesting level — field names
//! mapped to what they hold. Nothing here is executable; the compiler turns
//! a shape (plus overrides, defaults and calculated fields accumulated on a
//! [`SchemaBuilder`]) into an immutable [`RecordType`](crate::RecordType).
//!
//! Builders are the only mutable stage. Once `build()` returns, everything
//! downstream is read-only and safe to share across threads.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::compile;
use crate::contract::{Reason, SemanticType};
use crate::error::SchemaError;
use crate::record::RecordType;

/// A user-supplied coercion or validation function.
pub type CoerceFn = dyn Fn(&Value) -> Result<Value, Reason> + Send + Sync;

/// A guard deciding whether a guarded override applies to a raw value.
pub type GuardFn = dyn Fn(&Value) -> bool + Send + Sync;

/// A calculated field: pure function of the rest of the instance.
pub type CalcFn = dyn Fn(&Map<String, Value>) -> Value + Send + Sync;

/// One arm of an override chain. Arms are tried in declaration order; the
/// first whose guard accepts the value wins. A chain where no arm matches
/// passes the value through unchanged.
#[derive(Clone)]
pub struct OverrideArm {
    pub(crate) guard: Option<Arc<GuardFn>>,
    pub(crate) func: Arc<CoerceFn>,
}

impl OverrideArm {
    pub(crate) fn applies(&self, raw: &Value) -> bool {
        self.guard.as_ref().map_or(true, |g| g(raw))
    }
}

/// Primitive types understood natively by bare symbolic name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prim {
    Integer,
    PositiveInteger,
    Float,
    Boolean,
    String,
    Date,
    DateTime,
    Time,
}

impl Prim {
    /// Resolve a bare symbolic name. Unknown names are a declaration-time
    /// error, surfaced by the compiler.
    pub fn parse(name: &str) -> Option<Prim> {
        match name {
            "integer" => Some(Prim::Integer),
            "positive-integer" | "positive_integer" => Some(Prim::PositiveInteger),
            "float" => Some(Prim::Float),
            "boolean" => Some(Prim::Boolean),
            "string" => Some(Prim::String),
            "date" => Some(Prim::Date),
            "datetime" => Some(Prim::DateTime),
            "time" => Some(Prim::Time),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Prim::Integer => "integer",
            Prim::PositiveInteger => "positive-integer",
            Prim::Float => "float",
            Prim::Boolean => "boolean",
            Prim::String => "string",
            Prim::Date => "date",
            Prim::DateTime => "datetime",
            Prim::Time => "time",
        }
    }
}

/// Reference to a leaf type: a primitive, an unresolved symbolic name, or a
/// semantic type object.
#[derive(Clone)]
pub enum TypeRef {
    Prim(Prim),
    /// Bare name, resolved (or rejected) at build time.
    Named(String),
    Custom(Arc<dyn SemanticType>),
}

impl std::fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeRef::Prim(p) => write!(f, "Prim({})", p.name()),
            TypeRef::Named(n) => write!(f, "Named({n})"),
            TypeRef::Custom(t) => write!(f, "Custom({})", t.name()),
        }
    }
}

impl From<Prim> for TypeRef {
    fn from(p: Prim) -> Self {
        TypeRef::Prim(p)
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        TypeRef::Named(name.to_string())
    }
}

impl From<Arc<dyn SemanticType>> for TypeRef {
    fn from(t: Arc<dyn SemanticType>) -> Self {
        TypeRef::Custom(t)
    }
}

/// What one field holds.
#[derive(Clone, Debug)]
pub enum FieldDecl {
    /// Bare primitive, e.g. `integer`.
    Simple(Prim),
    /// Unresolved symbolic name; `"constant"` resolves to a null constant,
    /// anything else must name a primitive.
    Named(String),
    /// Semantic type object implementing the contract.
    Typed(Arc<dyn SemanticType>),
    /// Homogeneous list of one leaf type.
    List(TypeRef),
    /// Fixed set of alternative leaf types, tried in order.
    OneOf(Vec<TypeRef>),
    /// Field pinned to a fixed value.
    Constant(Value),
    /// Nested sub-shape; compiles to its own child record type.
    Nested(Shape),
}

impl FieldDecl {
    pub fn integer() -> Self {
        FieldDecl::Simple(Prim::Integer)
    }
    pub fn positive_integer() -> Self {
        FieldDecl::Simple(Prim::PositiveInteger)
    }
    pub fn float() -> Self {
        FieldDecl::Simple(Prim::Float)
    }
    pub fn boolean() -> Self {
        FieldDecl::Simple(Prim::Boolean)
    }
    pub fn string() -> Self {
        FieldDecl::Simple(Prim::String)
    }
    pub fn date() -> Self {
        FieldDecl::Simple(Prim::Date)
    }
    pub fn datetime() -> Self {
        FieldDecl::Simple(Prim::DateTime)
    }
    pub fn time() -> Self {
        FieldDecl::Simple(Prim::Time)
    }

    /// Declare by bare symbolic name, resolved at build time.
    pub fn named(name: impl Into<String>) -> Self {
        FieldDecl::Named(name.into())
    }

    pub fn typed(ty: impl SemanticType + 'static) -> Self {
        FieldDecl::Typed(Arc::new(ty))
    }

    pub fn list_of(elem: impl Into<TypeRef>) -> Self {
        FieldDecl::List(elem.into())
    }

    pub fn one_of(alts: impl IntoIterator<Item = TypeRef>) -> Self {
        FieldDecl::OneOf(alts.into_iter().collect())
    }

    pub fn constant(value: Value) -> Self {
        FieldDecl::Constant(value)
    }

    pub fn nested(shape: Shape) -> Self {
        FieldDecl::Nested(shape)
    }
}

/// Declarative description of one nesting level: field name → declaration,
/// in declaration order. Duplicate names are detected at build time.
#[derive(Clone, Debug, Default)]
pub struct Shape {
    pub(crate) entries: Vec<(String, FieldDecl)>,
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chainable field declaration.
    pub fn with(mut self, name: impl Into<String>, decl: FieldDecl) -> Self {
        self.entries.push((name.into(), decl));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Mutable accumulator for one schema declaration.
///
/// Replaces any notion of process-global schema state: everything a record
/// type needs is gathered here, and `build()` is the single point where the
/// immutable compiled form is produced.
pub struct SchemaBuilder {
    name: String,
    shape: Shape,
    coerce_overrides: Vec<(String, RawOverride)>,
    validate_overrides: Vec<(String, OverrideArm)>,
    defaults: Vec<(String, Value)>,
    calculated: Vec<(String, Arc<CalcFn>)>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shape: Shape::new(),
            coerce_overrides: Vec::new(),
            validate_overrides: Vec::new(),
            defaults: Vec::new(),
            calculated: Vec::new(),
        }
    }

    /// Declare a field at this level.
    pub fn field(mut self, name: impl Into<String>, decl: FieldDecl) -> Self {
        self.shape.entries.push((name.into(), decl));
        self
    }

    /// Replace the compiled coercer at a dotted path.
    pub fn coerce_at<F>(mut self, path: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, Reason> + Send + Sync + 'static,
    {
        self.coerce_overrides.push((
            path.into(),
            RawOverride::Arm(OverrideArm {
                guard: None,
                func: Arc::new(func),
            }),
        ));
        self
    }

    /// Guarded coercion override. Arms for the same path are tried in
    /// declaration order; the first whose guard accepts wins; if none match
    /// the value passes through unchanged.
    pub fn coerce_at_if<G, F>(mut self, path: impl Into<String>, guard: G, func: F) -> Self
    where
        G: Fn(&Value) -> bool + Send + Sync + 'static,
        F: Fn(&Value) -> Result<Value, Reason> + Send + Sync + 'static,
    {
        self.coerce_overrides.push((
            path.into(),
            RawOverride::Arm(OverrideArm {
                guard: Some(Arc::new(guard)),
                func: Arc::new(func),
            }),
        ));
        self
    }

    /// Delegate form: name a built-in coercer by symbol instead of supplying
    /// a function. Unknown symbols fail at build time.
    pub fn coerce_at_named(mut self, path: impl Into<String>, builtin: impl Into<String>) -> Self {
        self.coerce_overrides
            .push((path.into(), RawOverride::Delegate(builtin.into())));
        self
    }

    /// Replace the compiled validator at a dotted path.
    pub fn validate_at<F>(mut self, path: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, Reason> + Send + Sync + 'static,
    {
        self.validate_overrides.push((
            path.into(),
            OverrideArm {
                guard: None,
                func: Arc::new(func),
            },
        ));
        self
    }

    /// Guarded validation override, same arm semantics as coercion.
    pub fn validate_at_if<G, F>(mut self, path: impl Into<String>, guard: G, func: F) -> Self
    where
        G: Fn(&Value) -> bool + Send + Sync + 'static,
        F: Fn(&Value) -> Result<Value, Reason> + Send + Sync + 'static,
    {
        self.validate_overrides.push((
            path.into(),
            OverrideArm {
                guard: Some(Arc::new(guard)),
                func: Arc::new(func),
            },
        ));
        self
    }

    /// Initial value for the field at a dotted path, used by the zero
    /// instance and by casts where the key is absent.
    pub fn default_at(mut self, path: impl Into<String>, value: Value) -> Self {
        self.defaults.push((path.into(), value));
        self
    }

    /// Declare a calculated field: recomputed as a pure function of the
    /// fully-populated instance after every successful cast or draw.
    /// Calculated outputs are not re-run through validators.
    pub fn calculated<F>(mut self, path: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Value + Send + Sync + 'static,
    {
        self.calculated.push((path.into(), Arc::new(func)));
        self
    }

    /// Compile into the immutable record type. All structural errors —
    /// duplicate fields, unknown type names, override paths that name no
    /// field — surface here and never at cast time.
    pub fn build(self) -> Result<RecordType, SchemaError> {
        compile::compile(
            self.name,
            self.shape,
            self.coerce_overrides,
            self.validate_overrides,
            self.defaults,
            self.calculated,
        )
    }
}

/// An override as declared, before build-time resolution. The delegate form
/// carries only a symbol; the compiler swaps it for the named primitive's
/// coercer, or fails the build if the symbol is unknown.
#[derive(Clone)]
pub(crate) enum RawOverride {
    Arm(OverrideArm),
    Delegate(String),
}
