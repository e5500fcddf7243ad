//! Cast engine: map a loosely-typed, nested-or-flat keyed blob onto a
//! compiled record type.
//!
//! The walk is depth-first, in lock-step with the descriptor. A key whose
//! value is a nested object recurses directly; any other unknown key is
//! treated as possibly-flattened and run through the split policy. Every
//! failure — unknown key, rejected coercion, rejected validation — is
//! recorded with its full dotted path and processing continues, so one call
//! surfaces everything wrong with the input at once.

use serde_json::{Map, Value};

use crate::error::{CastError, Issue, IssueKind};
use crate::record::{ElemKind, FieldKind, FieldSpec, RecordType};
use crate::shape::OverrideArm;
use crate::types::kind_name;

/// How flat keys are reconstructed into nested paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SplitMode {
    /// Exact key match only; a flat key is an unknown field.
    #[default]
    Off,
    /// Try every `_`-delimited split, outer-to-inner. Prefers the split that
    /// consumes the fewest path segments (shallowest existing nesting);
    /// remaining ties fall to schema declaration order.
    Auto,
    /// Split on `delimiter` into exactly `segments` parts, left to right;
    /// the resulting path must resolve exactly.
    Exact { delimiter: String, segments: usize },
}

/// Per-cast options.
#[derive(Debug, Clone, Default)]
pub struct CastOptions {
    pub split: SplitMode,
}

impl CastOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn split_auto() -> Self {
        Self {
            split: SplitMode::Auto,
        }
    }

    pub fn split_exact(delimiter: impl Into<String>, segments: usize) -> Self {
        Self {
            split: SplitMode::Exact {
                delimiter: delimiter.into(),
                segments,
            },
        }
    }
}

/// A failure relative to the current field: empty suffix means the field
/// itself, otherwise a list index or deeper segment.
type RelIssue = (String, IssueKind, String);

/// Cast `input` against `record`. Returns the complete coerced-and-validated
/// instance, or the complete aggregated error — never a partial instance.
pub fn cast(record: &RecordType, input: &Value, options: &CastOptions) -> Result<Value, CastError> {
    let mut out = record.zero_map();
    let mut issues: Vec<Issue> = Vec::new();

    match input {
        Value::Object(map) => cast_into(record, map, options, "", &mut out, &mut issues),
        // empty input: the zero instance, not an error
        Value::Null => {}
        other => issues.push(Issue::new(
            record.name(),
            IssueKind::Coercion,
            format!("expected map input, got {}", kind_name(other)),
        )),
    }

    if issues.is_empty() {
        recompute_tree(record, &mut out);
        Ok(Value::Object(out))
    } else {
        Err(CastError::new(issues))
    }
}

impl RecordType {
    /// Convenience wrapper around [`cast`].
    pub fn cast(&self, input: &Value, options: &CastOptions) -> Result<Value, CastError> {
        cast(self, input, options)
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn cast_into(
    record: &RecordType,
    input: &Map<String, Value>,
    options: &CastOptions,
    prefix: &str,
    out: &mut Map<String, Value>,
    issues: &mut Vec<Issue>,
) {
    for (key, raw) in input {
        let path = join_path(prefix, key);

        if let Some(spec) = record.fields.get(key) {
            if let FieldKind::Nested(child) = &spec.kind {
                cast_nested(child, spec, raw, options, &path, key, out, issues);
            } else {
                match apply_leaf(spec, raw) {
                    Ok(v) => {
                        out.insert(key.clone(), v);
                    }
                    Err(rels) => push_rel_issues(issues, &path, rels),
                }
            }
            continue;
        }

        // Calculated fields round-trip through serialized instances; the
        // provided value is discarded and recomputed after the walk.
        if record.calculated.iter().any(|(n, _)| n == key) {
            continue;
        }

        // Unknown at this level: attempt flat-key resolution.
        match resolve_flat(record, key, &options.split) {
            Some((segments, spec)) => match apply_leaf(spec, raw) {
                Ok(v) => set_path(out, &segments, v),
                Err(rels) => {
                    let resolved = join_path(prefix, &segments.join("."));
                    push_rel_issues(issues, &resolved, rels);
                }
            },
            None => issues.push(Issue::new(
                path,
                IssueKind::UnknownField,
                "does not resolve to any schema path",
            )),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn cast_nested(
    child: &RecordType,
    spec: &FieldSpec,
    raw: &Value,
    options: &CastOptions,
    path: &str,
    key: &str,
    out: &mut Map<String, Value>,
    issues: &mut Vec<Issue>,
) {
    // A coercion override on a nested field reshapes the raw value before
    // the recursion sees it.
    let reshaped;
    let raw = match &spec.coerce_override {
        Some(arms) => match apply_chain(arms, raw) {
            Ok(v) => {
                reshaped = v;
                &reshaped
            }
            Err(reason) => {
                issues.push(Issue::new(path, IssueKind::Coercion, reason));
                return;
            }
        },
        None => raw,
    };

    match raw {
        Value::Object(map) => {
            if let Some(Value::Object(child_out)) = out.get_mut(key) {
                cast_into(child, map, options, path, child_out, issues);
            }
        }
        // empty input for a nested field: keep the zero sub-instance
        Value::Null => {}
        other => {
            issues.push(Issue::new(
                path,
                IssueKind::Coercion,
                format!("expected map for nested field, got {}", kind_name(other)),
            ));
            return;
        }
    }

    if let Some(arms) = &spec.validate_override {
        if let Some(current) = out.get(key) {
            match apply_chain(arms, current) {
                Ok(v) => {
                    out.insert(key.to_string(), v);
                }
                Err(reason) => issues.push(Issue::new(path, IssueKind::Validation, reason)),
            }
        }
    }
}

fn push_rel_issues(issues: &mut Vec<Issue>, path: &str, rels: Vec<RelIssue>) {
    for (suffix, kind, reason) in rels {
        let full = if suffix.is_empty() {
            path.to_string()
        } else {
            format!("{path}.{suffix}")
        };
        issues.push(Issue::new(full, kind, reason));
    }
}

/// Write a coerced value at a resolved nested path. Intermediate objects
/// always exist: the output starts from the zero instance.
fn set_path(out: &mut Map<String, Value>, segments: &[String], value: Value) {
    match segments {
        [leaf] => {
            out.insert(leaf.clone(), value);
        }
        [head, rest @ ..] => {
            if let Some(Value::Object(child)) = out.get_mut(head) {
                set_path(child, rest, value);
            }
        }
        [] => {}
    }
}

/// Flat-key resolution against the schema, per split policy.
fn resolve_flat<'a>(
    record: &'a RecordType,
    key: &str,
    mode: &SplitMode,
) -> Option<(Vec<String>, &'a FieldSpec)> {
    match mode {
        SplitMode::Off => None,
        SplitMode::Auto => {
            let parts: Vec<&str> = key.split('_').collect();
            if parts.len() < 2 {
                return None;
            }
            resolve_split(record, &parts, "_")
        }
        SplitMode::Exact {
            delimiter,
            segments,
        } => {
            if *segments < 2 || delimiter.is_empty() {
                return None;
            }
            let parts: Vec<&str> = key.splitn(*segments, delimiter.as_str()).collect();
            if parts.len() != *segments {
                return None;
            }
            resolve_exact(record, &parts)
        }
    }
}

/// Search every split of `parts` into a schema path.
///
/// The whole remainder is tried as a leaf first (fewest total segments),
/// then nested heads in ascending length (shallowest prefix first). First
/// resolution wins.
fn resolve_split<'a>(
    record: &'a RecordType,
    parts: &[&str],
    delimiter: &str,
) -> Option<(Vec<String>, &'a FieldSpec)> {
    let whole = parts.join(delimiter);
    if let Some(spec) = record.fields.get(&whole) {
        if !matches!(spec.kind, FieldKind::Nested(_)) {
            return Some((vec![whole], spec));
        }
    }

    for k in 1..parts.len() {
        let head = parts[..k].join(delimiter);
        if let Some(spec) = record.fields.get(&head) {
            if let FieldKind::Nested(child) = &spec.kind {
                if let Some((mut sub, leaf)) = resolve_split(child, &parts[k..], delimiter) {
                    sub.insert(0, head);
                    return Some((sub, leaf));
                }
            }
        }
    }
    None
}

/// Deterministic resolution: each part except the last must name a nested
/// field, the last must name a leaf.
fn resolve_exact<'a>(
    record: &'a RecordType,
    parts: &[&str],
) -> Option<(Vec<String>, &'a FieldSpec)> {
    match parts {
        [] => None,
        [leaf] => {
            let spec = record.fields.get(*leaf)?;
            if matches!(spec.kind, FieldKind::Nested(_)) {
                None
            } else {
                Some((vec![leaf.to_string()], spec))
            }
        }
        [head, rest @ ..] => match &record.fields.get(*head)?.kind {
            FieldKind::Nested(child) => {
                let (mut sub, leaf) = resolve_exact(child, rest)?;
                sub.insert(0, head.to_string());
                Some((sub, leaf))
            }
            _ => None,
        },
    }
}

/// Coerce then validate one leaf field. Overrides replace the defaults;
/// list element failures come back individually with their index suffix.
fn apply_leaf(spec: &FieldSpec, raw: &Value) -> Result<Value, Vec<RelIssue>> {
    let coerced = match &spec.coerce_override {
        Some(arms) => apply_chain(arms, raw)
            .map_err(|r| vec![(String::new(), IssueKind::Coercion, r)])?,
        None => default_coerce(&spec.kind, raw)?,
    };

    match &spec.validate_override {
        Some(arms) => apply_chain(arms, &coerced)
            .map_err(|r| vec![(String::new(), IssueKind::Validation, r)]),
        None => default_validate(&spec.kind, &coerced),
    }
}

/// Run an override chain: first arm whose guard accepts wins; no match
/// passes the value through unchanged.
fn apply_chain(arms: &[OverrideArm], raw: &Value) -> Result<Value, String> {
    for arm in arms {
        if arm.applies(raw) {
            return (arm.func)(raw);
        }
    }
    Ok(raw.clone())
}

fn default_coerce(kind: &FieldKind, raw: &Value) -> Result<Value, Vec<RelIssue>> {
    match kind {
        FieldKind::Simple(p) => p
            .coerce(raw)
            .map_err(|r| vec![(String::new(), IssueKind::Coercion, r)]),
        FieldKind::Typed(t) => t
            .coerce(raw)
            .map_err(|r| vec![(String::new(), IssueKind::Coercion, r)]),
        FieldKind::Constant(c) => {
            if raw == c {
                Ok(raw.clone())
            } else {
                Err(vec![(
                    String::new(),
                    IssueKind::Coercion,
                    format!("expected constant {c}, got {raw}"),
                )])
            }
        }
        FieldKind::List(elem) => {
            let items = match raw {
                Value::Array(items) => items,
                other => {
                    return Err(vec![(
                        String::new(),
                        IssueKind::Coercion,
                        format!("expected list, got {}", kind_name(other)),
                    )])
                }
            };
            let mut out = Vec::with_capacity(items.len());
            let mut errs: Vec<RelIssue> = Vec::new();
            for (i, item) in items.iter().enumerate() {
                match elem_coerce(elem, item) {
                    Ok(v) => out.push(v),
                    Err(r) => errs.push((i.to_string(), IssueKind::Coercion, r)),
                }
            }
            if errs.is_empty() {
                Ok(Value::Array(out))
            } else {
                Err(errs)
            }
        }
        FieldKind::Mixed(alts) => {
            let mut reasons = Vec::with_capacity(alts.len());
            for alt in alts {
                // an alternative matches only if it both coerces and
                // validates, so a later alternative can still catch a value
                // an earlier one coerces but rejects
                match elem_coerce(alt, raw).and_then(|v| elem_validate(alt, &v)) {
                    Ok(v) => return Ok(v),
                    Err(r) => reasons.push(format!("{}: {r}", alt.name())),
                }
            }
            Err(vec![(
                String::new(),
                IssueKind::Coercion,
                format!("no alternative matched ({})", reasons.join("; ")),
            )])
        }
        FieldKind::Nested(_) => unreachable!("nested fields are cast recursively"),
    }
}

fn default_validate(kind: &FieldKind, value: &Value) -> Result<Value, Vec<RelIssue>> {
    match kind {
        FieldKind::Simple(p) => p
            .validate(value)
            .map_err(|r| vec![(String::new(), IssueKind::Validation, r)]),
        FieldKind::Typed(t) => t
            .validate(value)
            .map_err(|r| vec![(String::new(), IssueKind::Validation, r)]),
        FieldKind::List(elem) => {
            let items = match value {
                Value::Array(items) => items,
                other => {
                    return Err(vec![(
                        String::new(),
                        IssueKind::Validation,
                        format!("expected list, got {}", kind_name(other)),
                    )])
                }
            };
            let mut out = Vec::with_capacity(items.len());
            let mut errs: Vec<RelIssue> = Vec::new();
            for (i, item) in items.iter().enumerate() {
                match elem_validate(elem, item) {
                    Ok(v) => out.push(v),
                    Err(r) => errs.push((i.to_string(), IssueKind::Validation, r)),
                }
            }
            if errs.is_empty() {
                Ok(Value::Array(out))
            } else {
                Err(errs)
            }
        }
        // alternatives were validated when one was chosen
        FieldKind::Mixed(_) | FieldKind::Constant(_) => Ok(value.clone()),
        FieldKind::Nested(_) => unreachable!("nested fields are cast recursively"),
    }
}

fn elem_coerce(elem: &ElemKind, raw: &Value) -> Result<Value, String> {
    match elem {
        ElemKind::Prim(p) => p.coerce(raw),
        ElemKind::Typed(t) => t.coerce(raw),
    }
}

fn elem_validate(elem: &ElemKind, value: &Value) -> Result<Value, String> {
    match elem {
        ElemKind::Prim(p) => p.validate(value),
        ElemKind::Typed(t) => t.validate(value),
    }
}

/// Bottom-up calculated-field recomputation over the whole instance tree,
/// after all coercion and validation has finished.
pub(crate) fn recompute_tree(record: &RecordType, out: &mut Map<String, Value>) {
    for (name, spec) in &record.fields {
        if let FieldKind::Nested(child) = &spec.kind {
            if let Some(Value::Object(child_out)) = out.get_mut(name) {
                recompute_tree(child, child_out);
            }
        }
    }
    record.recompute_calculated(out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{FieldDecl, SchemaBuilder, Shape, TypeRef};
    use crate::types::{Enum, Uuid};
    use serde_json::json;

    fn address_schema() -> RecordType {
        SchemaBuilder::new("order")
            .field(
                "address",
                FieldDecl::nested(Shape::new().with(
                    "street",
                    FieldDecl::nested(Shape::new().with("house", FieldDecl::integer())),
                )),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn split_auto_reconstructs_nested_path() {
        let record = address_schema();
        let out = record
            .cast(
                &json!({"address_street_house": "5"}),
                &CastOptions::split_auto(),
            )
            .unwrap();
        assert_eq!(out, json!({"address": {"street": {"house": 5}}}));
    }

    #[test]
    fn split_off_reports_the_flat_key_unknown() {
        let record = address_schema();
        let err = record
            .cast(&json!({"address_street_house": "5"}), &CastOptions::new())
            .unwrap_err();
        assert_eq!(err.paths(), vec!["address_street_house"]);
        assert_eq!(err.issues[0].kind, IssueKind::UnknownField);
    }

    #[test]
    fn split_exact_mode_is_deterministic() {
        let record = address_schema();
        let opts = CastOptions::split_exact("_", 3);
        let out = record
            .cast(&json!({"address_street_house": 7}), &opts)
            .unwrap();
        assert_eq!(out["address"]["street"]["house"], json!(7));

        // wrong segment count does not resolve
        let err = record
            .cast(
                &json!({"address_street_house": 7}),
                &CastOptions::split_exact("_", 2),
            )
            .unwrap_err();
        assert_eq!(err.paths(), vec!["address_street_house"]);
    }

    #[test]
    fn split_prefers_the_shallowest_existing_nesting() {
        // `a` holds both a literal leaf `b_c` and a nested `b.c`; the leaf
        // consumes fewer path segments and must win.
        let record = SchemaBuilder::new("amb")
            .field(
                "a",
                FieldDecl::nested(
                    Shape::new()
                        .with("b_c", FieldDecl::integer())
                        .with(
                            "b",
                            FieldDecl::nested(Shape::new().with("c", FieldDecl::integer())),
                        ),
                ),
            )
            .build()
            .unwrap();
        let out = record
            .cast(&json!({"a_b_c": 9}), &CastOptions::split_auto())
            .unwrap();
        assert_eq!(out["a"]["b_c"], json!(9));
        assert_eq!(out["a"]["b"]["c"], json!(0), "deep path stays at zero");
    }

    #[test]
    fn errors_aggregate_across_siblings() {
        let record = SchemaBuilder::new("agg")
            .field("foo", FieldDecl::integer())
            .build()
            .unwrap();
        let err = record
            .cast(
                &json!({"foo": "not-an-int", "unknownkey": 1}),
                &CastOptions::new(),
            )
            .unwrap_err();
        let paths = err.paths();
        assert!(paths.contains(&"foo"));
        assert!(paths.contains(&"unknownkey"));
        assert_eq!(err.issues.len(), 2);
    }

    #[test]
    fn nested_errors_carry_the_full_dotted_path() {
        let record = address_schema();
        let err = record
            .cast(
                &json!({"address": {"street": {"house": "many"}}}),
                &CastOptions::new(),
            )
            .unwrap_err();
        assert_eq!(err.paths(), vec!["address.street.house"]);
    }

    #[test]
    fn empty_input_yields_the_zero_instance() {
        let record = address_schema();
        let out = record.cast(&json!({}), &CastOptions::new()).unwrap();
        assert_eq!(out, record.zero_value());
        assert_eq!(out["address"]["street"]["house"], json!(0));
    }

    #[test]
    fn nested_and_flat_keys_merge_into_one_sub_instance() {
        let record = SchemaBuilder::new("merge")
            .field(
                "address",
                FieldDecl::nested(
                    Shape::new()
                        .with("city", FieldDecl::string())
                        .with("zip", FieldDecl::integer()),
                ),
            )
            .build()
            .unwrap();
        let out = record
            .cast(
                &json!({"address": {"city": "Springfield"}, "address_zip": "10"}),
                &CastOptions::split_auto(),
            )
            .unwrap();
        assert_eq!(
            out,
            json!({"address": {"city": "Springfield", "zip": 10}})
        );
    }

    #[test]
    fn list_element_failures_are_reported_per_index() {
        let record = SchemaBuilder::new("list")
            .field("nums", FieldDecl::list_of(TypeRef::from("integer")))
            .build()
            .unwrap();
        let err = record
            .cast(&json!({"nums": [1, "x", 3, []]}), &CastOptions::new())
            .unwrap_err();
        assert_eq!(err.paths(), vec!["nums.1", "nums.3"]);

        let ok = record
            .cast(&json!({"nums": ["1", 2]}), &CastOptions::new())
            .unwrap();
        assert_eq!(ok["nums"], json!([1, 2]));
    }

    #[test]
    fn mixed_field_tries_alternatives_in_order() {
        let record = SchemaBuilder::new("mix")
            .field(
                "id",
                FieldDecl::one_of([TypeRef::from("integer"), TypeRef::from("string")]),
            )
            .build()
            .unwrap();
        // "5" coerces through the integer alternative first
        let out = record.cast(&json!({"id": "5"}), &CastOptions::new()).unwrap();
        assert_eq!(out["id"], json!(5));
        // non-numeric falls through to string
        let out = record
            .cast(&json!({"id": "abc"}), &CastOptions::new())
            .unwrap();
        assert_eq!(out["id"], json!("abc"));
        // nothing matches an object
        let err = record
            .cast(&json!({"id": {}}), &CastOptions::new())
            .unwrap_err();
        assert_eq!(err.issues[0].kind, IssueKind::Coercion);
        assert!(err.issues[0].reason.contains("no alternative matched"));
    }

    #[test]
    fn constant_fields_fill_when_absent_and_must_match_when_present() {
        let record = SchemaBuilder::new("cst")
            .field("version", FieldDecl::constant(json!(2)))
            .build()
            .unwrap();
        let out = record.cast(&json!({}), &CastOptions::new()).unwrap();
        assert_eq!(out["version"], json!(2));
        assert!(record
            .cast(&json!({"version": 2}), &CastOptions::new())
            .is_ok());
        let err = record
            .cast(&json!({"version": 3}), &CastOptions::new())
            .unwrap_err();
        assert_eq!(err.paths(), vec!["version"]);
    }

    #[test]
    fn guarded_overrides_try_arms_in_order_then_pass_through() {
        let record = SchemaBuilder::new("guards")
            .field("n", FieldDecl::integer())
            .coerce_at_if(
                "n",
                |v| v.as_str().is_some_and(|s| s.starts_with("0x")),
                |v| {
                    let s = v.as_str().unwrap_or_default();
                    i64::from_str_radix(s.trim_start_matches("0x"), 16)
                        .map(Value::from)
                        .map_err(|_| format!("bad hex: {s:?}"))
                },
            )
            .coerce_at_if(
                "n",
                |v| v.is_string(),
                |v| {
                    v.as_str()
                        .unwrap_or_default()
                        .parse::<i64>()
                        .map(Value::from)
                        .map_err(|e| e.to_string())
                },
            )
            .build()
            .unwrap();

        let out = record
            .cast(&json!({"n": "0x10"}), &CastOptions::new())
            .unwrap();
        assert_eq!(out["n"], json!(16));
        let out = record.cast(&json!({"n": "12"}), &CastOptions::new()).unwrap();
        assert_eq!(out["n"], json!(12));
        // no guard matches: the raw value passes through unchanged
        let out = record.cast(&json!({"n": 5}), &CastOptions::new()).unwrap();
        assert_eq!(out["n"], json!(5));
    }

    #[test]
    fn delegate_override_names_a_builtin_coercer() {
        let record = SchemaBuilder::new("delegate")
            .field("raw", FieldDecl::string())
            .coerce_at_named("raw", "integer")
            .build()
            .unwrap();
        let out = record
            .cast(&json!({"raw": "41"}), &CastOptions::new())
            .unwrap();
        assert_eq!(out["raw"], json!(41));
    }

    #[test]
    fn validation_override_rejects_with_its_own_reason() {
        let record = SchemaBuilder::new("vld")
            .field("age", FieldDecl::integer())
            .validate_at("age", |v| match v.as_i64() {
                Some(n) if (0..=150).contains(&n) => Ok(v.clone()),
                _ => Err("age out of range".to_string()),
            })
            .build()
            .unwrap();
        let err = record
            .cast(&json!({"age": "200"}), &CastOptions::new())
            .unwrap_err();
        assert_eq!(err.issues[0].kind, IssueKind::Validation);
        assert_eq!(err.issues[0].reason, "age out of range");
    }

    #[test]
    fn calculated_fields_are_recomputed_after_every_cast() {
        let record = SchemaBuilder::new("bill")
            .field("net", FieldDecl::integer())
            .field("tax", FieldDecl::integer())
            .calculated("gross", |m| {
                let net = m.get("net").and_then(Value::as_i64).unwrap_or(0);
                let tax = m.get("tax").and_then(Value::as_i64).unwrap_or(0);
                json!(net + tax)
            })
            .build()
            .unwrap();
        let out = record
            .cast(&json!({"net": "100", "tax": 19}), &CastOptions::new())
            .unwrap();
        assert_eq!(out["gross"], json!(119));

        // a later cast with different input never sees the old value
        let out = record
            .cast(&json!({"net": 1}), &CastOptions::new())
            .unwrap();
        assert_eq!(out["gross"], json!(1));
    }

    #[test]
    fn calculated_fields_inside_nested_records_see_flat_key_writes() {
        let record = SchemaBuilder::new("cart")
            .field(
                "totals",
                FieldDecl::nested(
                    Shape::new()
                        .with("a", FieldDecl::integer())
                        .with("b", FieldDecl::integer()),
                ),
            )
            .calculated("totals.sum", |m| {
                let a = m.get("a").and_then(Value::as_i64).unwrap_or(0);
                let b = m.get("b").and_then(Value::as_i64).unwrap_or(0);
                json!(a + b)
            })
            .build()
            .unwrap();
        let out = record
            .cast(
                &json!({"totals": {"a": 2}, "totals_b": "3"}),
                &CastOptions::split_auto(),
            )
            .unwrap();
        assert_eq!(out["totals"]["sum"], json!(5));
    }

    #[test]
    fn calculated_keys_in_input_are_accepted_and_recomputed() {
        let record = SchemaBuilder::new("bill")
            .field("net", FieldDecl::integer())
            .field("tax", FieldDecl::integer())
            .calculated("gross", |m| {
                let net = m.get("net").and_then(Value::as_i64).unwrap_or(0);
                let tax = m.get("tax").and_then(Value::as_i64).unwrap_or(0);
                json!(net + tax)
            })
            .build()
            .unwrap();
        // a stale serialized value is not an unknown field; it is replaced
        let out = record
            .cast(
                &json!({"net": 2, "tax": 1, "gross": 999}),
                &CastOptions::new(),
            )
            .unwrap();
        assert_eq!(out["gross"], json!(3));
    }

    #[test]
    fn draws_with_calculated_fields_cast_back_to_themselves() {
        let record = SchemaBuilder::new("cart")
            .field("net", FieldDecl::integer())
            .field(
                "totals",
                FieldDecl::nested(
                    Shape::new()
                        .with("a", FieldDecl::integer())
                        .with("b", FieldDecl::integer()),
                ),
            )
            .calculated("grand", |m| {
                json!(m.get("net").and_then(Value::as_i64).unwrap_or(0))
            })
            .calculated("totals.sum", |m| {
                let a = m.get("a").and_then(Value::as_i64).unwrap_or(0);
                let b = m.get("b").and_then(Value::as_i64).unwrap_or(0);
                json!(a + b)
            })
            .build()
            .unwrap();
        for (i, draw) in record.draws(11).take(50).enumerate() {
            let back = record
                .cast(&draw, &CastOptions::new())
                .unwrap_or_else(|e| panic!("draw {i} failed to cast back:\n{e}"));
            assert_eq!(back, draw, "draw {i} must round-trip unchanged");
        }
    }

    #[test]
    fn casting_a_cast_output_is_idempotent() -> anyhow::Result<()> {
        let record = SchemaBuilder::new("idem")
            .field("n", FieldDecl::integer())
            .field("when", FieldDecl::datetime())
            .field("status", FieldDecl::typed(Enum::new(["on", "off"])))
            .field("id", FieldDecl::typed(Uuid))
            .build()?;
        let input = json!({
            "n": "5",
            "when": "2024-01-01T00:00:00+01:00",
            "status": "on",
            "id": "67E55044-10B1-426F-9247-BB680E5FE0C8"
        });
        let once = record.cast(&input, &CastOptions::new())?;
        let twice = record.cast(&once, &CastOptions::new())?;
        assert_eq!(once, twice);
        Ok(())
    }

    #[test]
    fn non_map_input_is_rejected_with_the_record_name() {
        let record = address_schema();
        let err = record.cast(&json!([1, 2]), &CastOptions::new()).unwrap_err();
        assert_eq!(err.paths(), vec!["order"]);
    }
}
