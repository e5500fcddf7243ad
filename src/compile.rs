//! Schema compiler: shape tree in, record-type tree out.
//!
//! Depth-first walk. Nested entries recurse into a child compilation whose
//! record is named `parent.field`; leaf entries resolve their declared type
//! reference to a [`FieldKind`]. Dotted-path overrides, defaults and
//! calculated fields are partitioned per level and routed into the child
//! compilation they belong to.
//!
//! Compilation is pure and deterministic: the same shape plus the same
//! overrides always yields structurally identical descriptors, and every
//! structural error is fatal here — never at cast time.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::SchemaError;
use crate::record::{ElemKind, FieldKind, FieldSpec, RecordType};
use crate::shape::{CalcFn, FieldDecl, OverrideArm, Prim, RawOverride, Shape, TypeRef};
use serde_json::Value;

/// Dotted-path-keyed declarations split into this level's own entries and
/// groups routed to child records by leading segment.
struct Scoped<T> {
    local: IndexMap<String, Vec<T>>,
    children: IndexMap<String, Vec<(String, T)>>,
}

fn scope<T>(items: Vec<(String, T)>) -> Scoped<T> {
    let mut local: IndexMap<String, Vec<T>> = IndexMap::new();
    let mut children: IndexMap<String, Vec<(String, T)>> = IndexMap::new();
    for (path, item) in items {
        match path.split_once('.') {
            None => local.entry(path).or_default().push(item),
            Some((head, rest)) => children
                .entry(head.to_string())
                .or_default()
                .push((rest.to_string(), item)),
        }
    }
    Scoped { local, children }
}

pub(crate) fn compile(
    name: String,
    shape: Shape,
    coerce_overrides: Vec<(String, RawOverride)>,
    validate_overrides: Vec<(String, OverrideArm)>,
    defaults: Vec<(String, Value)>,
    calculated: Vec<(String, Arc<CalcFn>)>,
) -> Result<RecordType, SchemaError> {
    let mut coerce = scope(coerce_overrides);
    let mut validate = scope(validate_overrides);
    let mut default_values = scope(defaults);
    let mut calc = scope(calculated);

    let mut fields: IndexMap<String, FieldSpec> = IndexMap::new();

    for (field_name, decl) in shape.entries {
        if fields.contains_key(&field_name) {
            return Err(SchemaError::DuplicateField {
                record: name,
                name: field_name,
            });
        }

        let kind = match decl {
            FieldDecl::Simple(p) => FieldKind::Simple(p),
            FieldDecl::Named(symbol) => resolve_named(&name, &field_name, &symbol)?,
            FieldDecl::Typed(t) => FieldKind::Typed(t),
            FieldDecl::List(elem) => FieldKind::List(resolve_ref(&name, &field_name, elem)?),
            FieldDecl::OneOf(alts) => {
                if alts.is_empty() {
                    return Err(SchemaError::EmptyOneOf {
                        record: name,
                        field: field_name,
                    });
                }
                let mut elems = Vec::with_capacity(alts.len());
                for alt in alts {
                    elems.push(resolve_ref(&name, &field_name, alt)?);
                }
                FieldKind::Mixed(elems)
            }
            FieldDecl::Constant(v) => FieldKind::Constant(v),
            FieldDecl::Nested(child_shape) => {
                let child = compile(
                    format!("{name}.{field_name}"),
                    child_shape,
                    coerce.children.shift_remove(&field_name).unwrap_or_default()
                        .into_iter()
                        .collect(),
                    validate
                        .children
                        .shift_remove(&field_name)
                        .unwrap_or_default(),
                    default_values
                        .children
                        .shift_remove(&field_name)
                        .unwrap_or_default(),
                    calc.children.shift_remove(&field_name).unwrap_or_default(),
                )?;
                FieldKind::Nested(Arc::new(child))
            }
        };

        let coerce_override = match coerce.local.shift_remove(&field_name) {
            None => None,
            Some(raw_arms) => Some(resolve_arms(&name, &field_name, raw_arms)?),
        };
        let validate_override = validate.local.shift_remove(&field_name);
        let default = default_values
            .local
            .shift_remove(&field_name)
            .and_then(|mut vs| vs.pop());

        fields.insert(
            field_name,
            FieldSpec {
                kind,
                coerce_override,
                validate_override,
                default,
            },
        );
    }

    // Any leftover path names nothing at this level.
    if let Some(path) = leftover_path(&coerce.local, &coerce.children)
        .or_else(|| leftover_path(&validate.local, &validate.children))
        .or_else(|| leftover_path(&default_values.local, &default_values.children))
    {
        return Err(SchemaError::UnknownPath { record: name, path });
    }

    let mut calc_fields: Vec<(String, Arc<CalcFn>)> = Vec::new();
    for (calc_name, mut funcs) in calc.local {
        if fields.contains_key(&calc_name) {
            return Err(SchemaError::CalculatedShadowsField {
                record: name,
                name: calc_name,
            });
        }
        if let Some(func) = funcs.pop() {
            calc_fields.push((calc_name, func));
        }
    }
    if let Some((head, group)) = calc.children.into_iter().next() {
        let rest = group
            .into_iter()
            .next()
            .map(|(p, _)| p)
            .unwrap_or_default();
        return Err(SchemaError::UnknownPath {
            record: name,
            path: format!("{head}.{rest}"),
        });
    }

    Ok(RecordType {
        name,
        fields,
        calculated: calc_fields,
    })
}

fn leftover_path<T, U>(
    local: &IndexMap<String, Vec<T>>,
    children: &IndexMap<String, Vec<(String, U)>>,
) -> Option<String> {
    if let Some(path) = local.keys().next() {
        return Some(path.clone());
    }
    children.iter().next().map(|(head, group)| {
        let rest = group.first().map(|(p, _)| p.as_str()).unwrap_or("");
        format!("{head}.{rest}")
    })
}

fn resolve_named(record: &str, field: &str, symbol: &str) -> Result<FieldKind, SchemaError> {
    if symbol == "constant" {
        return Ok(FieldKind::Constant(Value::Null));
    }
    match Prim::parse(symbol) {
        Some(p) => Ok(FieldKind::Simple(p)),
        None => Err(SchemaError::UnknownType {
            record: record.to_string(),
            field: field.to_string(),
            name: symbol.to_string(),
        }),
    }
}

fn resolve_ref(record: &str, field: &str, r: TypeRef) -> Result<ElemKind, SchemaError> {
    match r {
        TypeRef::Prim(p) => Ok(ElemKind::Prim(p)),
        TypeRef::Named(symbol) => match Prim::parse(&symbol) {
            Some(p) => Ok(ElemKind::Prim(p)),
            None => Err(SchemaError::UnknownType {
                record: record.to_string(),
                field: field.to_string(),
                name: symbol,
            }),
        },
        TypeRef::Custom(t) => Ok(ElemKind::Typed(t)),
    }
}

/// Resolve delegate arms (built-in coercer named by symbol) into callable
/// arms; unknown symbols fail the build.
fn resolve_arms(
    record: &str,
    field: &str,
    raw: Vec<RawOverride>,
) -> Result<Vec<OverrideArm>, SchemaError> {
    let mut arms = Vec::with_capacity(raw.len());
    for r in raw {
        match r {
            RawOverride::Arm(arm) => arms.push(arm),
            RawOverride::Delegate(symbol) => match Prim::parse(&symbol) {
                Some(p) => arms.push(OverrideArm {
                    guard: None,
                    func: Arc::new(move |v: &Value| p.coerce(v)),
                }),
                None => {
                    return Err(SchemaError::UnknownType {
                        record: record.to_string(),
                        field: field.to_string(),
                        name: symbol,
                    })
                }
            },
        }
    }
    Ok(arms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{FieldDecl, SchemaBuilder, Shape};
    use serde_json::json;

    #[test]
    fn duplicate_field_is_fatal_at_build_time() {
        let err = SchemaBuilder::new("dup")
            .field("x", FieldDecl::integer())
            .field("x", FieldDecl::string())
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateField {
                record: "dup".into(),
                name: "x".into()
            }
        );
    }

    #[test]
    fn unknown_type_name_is_fatal_at_build_time() {
        let err = SchemaBuilder::new("bad")
            .field("x", FieldDecl::named("intger"))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownType { ref name, .. } if name == "intger"));
    }

    #[test]
    fn named_declarations_resolve_like_explicit_ones() {
        let record = SchemaBuilder::new("named")
            .field("a", FieldDecl::named("positive-integer"))
            .field("b", FieldDecl::named("datetime"))
            .field("c", FieldDecl::named("constant"))
            .build()
            .unwrap();
        assert!(matches!(
            record.field("a"),
            Some(FieldKind::Simple(Prim::PositiveInteger))
        ));
        assert!(matches!(
            record.field("b"),
            Some(FieldKind::Simple(Prim::DateTime))
        ));
        assert!(matches!(record.field("c"), Some(FieldKind::Constant(Value::Null))));
    }

    #[test]
    fn override_path_must_name_a_field() {
        let err = SchemaBuilder::new("ovr")
            .field("x", FieldDecl::integer())
            .coerce_at("y", |v| Ok(v.clone()))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownPath {
                record: "ovr".into(),
                path: "y".into()
            }
        );
    }

    #[test]
    fn nested_override_paths_route_into_the_child_record() {
        // an override two levels down compiles; a bogus branch does not
        let ok = SchemaBuilder::new("deep")
            .field(
                "a",
                FieldDecl::nested(Shape::new().with(
                    "b",
                    FieldDecl::nested(Shape::new().with("c", FieldDecl::integer())),
                )),
            )
            .coerce_at("a.b.c", |_| Ok(json!(99)))
            .build();
        assert!(ok.is_ok());

        let err = SchemaBuilder::new("deep")
            .field(
                "a",
                FieldDecl::nested(Shape::new().with("b", FieldDecl::integer())),
            )
            .default_at("a.z", json!(1))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownPath { ref record, ref path }
            if record == "deep.a" && path == "z"));
    }

    #[test]
    fn empty_one_of_is_rejected() {
        let err = SchemaBuilder::new("alts")
            .field("x", FieldDecl::one_of([]))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::EmptyOneOf { .. }));
    }

    #[test]
    fn calculated_field_may_not_shadow_a_declared_field() {
        let err = SchemaBuilder::new("calc")
            .field("total", FieldDecl::integer())
            .calculated("total", |_| json!(0))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::CalculatedShadowsField { .. }));
    }

    #[test]
    fn compilation_is_deterministic() {
        let build = || {
            SchemaBuilder::new("det")
                .field("a", FieldDecl::integer())
                .field(
                    "b",
                    FieldDecl::nested(Shape::new().with("c", FieldDecl::string())),
                )
                .build()
                .unwrap()
        };
        let one = build();
        let two = build();
        let names = |r: &RecordType| {
            r.fields()
                .map(|(n, k)| format!("{n}:{k:?}"))
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&one), names(&two));
        assert_eq!(one.zero_value(), two.zero_value());
    }
}
