//! Compiled record descriptors.
//!
//! A [`RecordType`] is the immutable output of the schema compiler for one
//! nesting level: the ordered field table, each field's resolved kind and
//! dispatch, the calculated-field list, and the zero instance. Descriptors
//! are created once at declaration time and are read-only afterwards, so
//! they are safe to share across concurrent casts and generator streams
//! without locking.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::contract::SemanticType;
use crate::shape::{CalcFn, OverrideArm, Prim};

/// Resolved leaf element type, for list items and one-of alternatives.
#[derive(Debug, Clone)]
pub enum ElemKind {
    Prim(Prim),
    Typed(Arc<dyn SemanticType>),
}

impl ElemKind {
    pub fn name(&self) -> &str {
        match self {
            ElemKind::Prim(p) => p.name(),
            ElemKind::Typed(t) => t.name(),
        }
    }
}

/// Per-field kind, the unit of dispatch for casting and generation.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// Primitive resolved from a bare symbolic name.
    Simple(Prim),
    /// Semantic type implementing the contract.
    Typed(Arc<dyn SemanticType>),
    /// Homogeneous list of one element kind.
    List(ElemKind),
    /// Alternatives tried in declaration order.
    Mixed(Vec<ElemKind>),
    /// Pinned value.
    Constant(Value),
    /// Child record type, named `parent.field`.
    Nested(Arc<RecordType>),
}

/// Everything the engines need to know about one field.
#[derive(Clone)]
pub(crate) struct FieldSpec {
    pub(crate) kind: FieldKind,
    /// Replaces the default coercer when present; arms in declaration order.
    pub(crate) coerce_override: Option<Vec<OverrideArm>>,
    /// Replaces the default validator when present.
    pub(crate) validate_override: Option<Vec<OverrideArm>>,
    /// Declared initial value; wins over the kind's zero.
    pub(crate) default: Option<Value>,
}

/// Immutable compiled descriptor for one nesting level.
#[derive(Clone)]
pub struct RecordType {
    pub(crate) name: String,
    pub(crate) fields: IndexMap<String, FieldSpec>,
    /// Recomputed after every successful cast or draw, in declaration order.
    pub(crate) calculated: Vec<(String, Arc<CalcFn>)>,
}

impl RecordType {
    /// Qualified record name (`parent.field` for nested records).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Ordered reflection over the field table, for external collaborators
    /// (flattening, transformation, diffing tools).
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldKind)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), &v.kind))
    }

    /// Kind of one field, if declared.
    pub fn field(&self, name: &str) -> Option<&FieldKind> {
        self.fields.get(name).map(|spec| &spec.kind)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Names of the calculated fields, in recomputation order.
    pub fn calculated_fields(&self) -> Vec<&str> {
        self.calculated.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// The all-defaults instance: declared defaults where given, otherwise
    /// each kind's zero (0, 0.0, "", false, [], null; nested fields get the
    /// child's zero instance). Calculated fields are computed last.
    pub fn zero_value(&self) -> Value {
        Value::Object(self.zero_map())
    }

    pub(crate) fn zero_map(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for (name, spec) in &self.fields {
            let v = match &spec.default {
                Some(v) => v.clone(),
                None => match &spec.kind {
                    FieldKind::Simple(p) => p.zero(),
                    FieldKind::Typed(_) => Value::Null,
                    FieldKind::List(_) => Value::Array(Vec::new()),
                    FieldKind::Mixed(_) => Value::Null,
                    FieldKind::Constant(v) => v.clone(),
                    FieldKind::Nested(child) => Value::Object(child.zero_map()),
                },
            };
            out.insert(name.clone(), v);
        }
        self.recompute_calculated(&mut out);
        out
    }

    /// Apply every calculated field to a fully-populated instance map.
    /// Calculated outputs are not re-validated.
    pub(crate) fn recompute_calculated(&self, instance: &mut Map<String, Value>) {
        for (name, func) in &self.calculated {
            let value = func(instance);
            instance.insert(name.clone(), value);
        }
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordType")
            .field("name", &self.name)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("calculated", &self.calculated_fields())
            .finish()
    }
}
