//! Closed-set scaffolds: [`Enum`] and [`Tags`].
//!
//! Both are parameterized type factories rather than fixed types: the schema
//! author instantiates them with an atom set, and the instance carries its
//! own membership rules through the contract.

use rand::rngs::StdRng;
use rand::Rng;
use serde_json::Value;

use crate::contract::{GenOptions, Reason, SemanticType};
use crate::types::kind_name;

/// Atom sets are fixed at declaration time; an empty set can never coerce,
/// validate or draw anything, so it is rejected here rather than at runtime.
fn atom_list(atoms: impl IntoIterator<Item = impl Into<String>>) -> Vec<String> {
    let atoms: Vec<String> = atoms.into_iter().map(Into::into).collect();
    assert!(!atoms.is_empty(), "closed set needs at least one atom");
    atoms
}

/// Restrict an atom pool by `only`/`except` generation options. A filter
/// that would empty the pool is ignored rather than leaving the generator
/// with nothing to draw.
fn filtered_pool<'a>(atoms: &'a [String], options: &GenOptions) -> Vec<&'a str> {
    let mut pool: Vec<&str> = atoms.iter().map(String::as_str).collect();
    if let Some(only) = options.str_list("only") {
        let kept: Vec<&str> = pool
            .iter()
            .copied()
            .filter(|a| only.contains(a))
            .collect();
        if !kept.is_empty() {
            pool = kept;
        }
    }
    if let Some(except) = options.str_list("except") {
        let kept: Vec<&str> = pool
            .iter()
            .copied()
            .filter(|a| !except.contains(a))
            .collect();
        if !kept.is_empty() {
            pool = kept;
        }
    }
    pool
}

/// Closed set of atoms; a value is exactly one member.
#[derive(Debug, Clone)]
pub struct Enum {
    name: String,
    atoms: Vec<String>,
}

impl Enum {
    pub fn new(atoms: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::named("enum", atoms)
    }

    pub fn named(name: impl Into<String>, atoms: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            atoms: atom_list(atoms),
        }
    }

    pub fn atoms(&self) -> &[String] {
        &self.atoms
    }

    fn member(&self, s: &str) -> bool {
        self.atoms.iter().any(|a| a == s)
    }
}

impl SemanticType for Enum {
    fn name(&self) -> &str {
        &self.name
    }

    fn coerce(&self, raw: &Value) -> Result<Value, Reason> {
        match raw {
            Value::String(s) if self.member(s) => Ok(raw.clone()),
            Value::String(s) => Err(format!(
                "{s:?} is not one of [{}]",
                self.atoms.join(", ")
            )),
            other => Err(format!("expected atom string, got {}", kind_name(other))),
        }
    }

    fn validate(&self, value: &Value) -> Result<Value, Reason> {
        self.coerce(value)
    }

    fn generate(&self, options: &GenOptions, rng: &mut StdRng) -> Value {
        // non-empty by construction; filters that would empty it are ignored
        let pool = filtered_pool(&self.atoms, options);
        Value::String(pool[rng.gen_range(0..pool.len())].to_string())
    }
}

/// Closed set, list-valued: a value is a deduplicated list of member atoms.
/// A bare atom string coerces to a one-element list.
#[derive(Debug, Clone)]
pub struct Tags {
    name: String,
    atoms: Vec<String>,
}

impl Tags {
    pub fn new(atoms: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::named("tags", atoms)
    }

    pub fn named(name: impl Into<String>, atoms: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            atoms: atom_list(atoms),
        }
    }

    pub fn atoms(&self) -> &[String] {
        &self.atoms
    }

    fn member(&self, s: &str) -> bool {
        self.atoms.iter().any(|a| a == s)
    }
}

impl SemanticType for Tags {
    fn name(&self) -> &str {
        &self.name
    }

    fn coerce(&self, raw: &Value) -> Result<Value, Reason> {
        let items: Vec<&Value> = match raw {
            Value::Array(items) => items.iter().collect(),
            Value::String(_) => vec![raw],
            other => {
                return Err(format!(
                    "expected a list of atoms, got {}",
                    kind_name(other)
                ))
            }
        };
        let mut out: Vec<Value> = Vec::with_capacity(items.len());
        for item in items {
            let s = match item {
                Value::String(s) => s,
                other => {
                    return Err(format!("expected atom string, got {}", kind_name(other)))
                }
            };
            if !self.member(s) {
                return Err(format!(
                    "{s:?} is not one of [{}]",
                    self.atoms.join(", ")
                ));
            }
            // dedupe, first occurrence wins
            if !out.iter().any(|v| v.as_str() == Some(s)) {
                out.push(item.clone());
            }
        }
        Ok(Value::Array(out))
    }

    fn validate(&self, value: &Value) -> Result<Value, Reason> {
        match value {
            Value::Array(items) => {
                for item in items {
                    match item.as_str() {
                        Some(s) if self.member(s) => {}
                        Some(s) => {
                            return Err(format!(
                                "{s:?} is not one of [{}]",
                                self.atoms.join(", ")
                            ))
                        }
                        None => {
                            return Err(format!(
                                "expected atom string, got {}",
                                kind_name(item)
                            ))
                        }
                    }
                }
                Ok(value.clone())
            }
            other => Err(format!(
                "expected a list of atoms, got {}",
                kind_name(other)
            )),
        }
    }

    fn generate(&self, options: &GenOptions, rng: &mut StdRng) -> Value {
        // independent membership draws keep atom declaration order
        let pool = filtered_pool(&self.atoms, options);
        let picked: Vec<Value> = pool
            .iter()
            .filter(|_| rng.gen::<bool>())
            .map(|a| Value::String((*a).to_string()))
            .collect();
        Value::Array(picked)
    }
}
