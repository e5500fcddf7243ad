//! Generator composer: random valid instances for property testing.
//!
//! A composed generator is a pure function of (record type, seed, index):
//! draw `i` seeds its own `StdRng` from the pair, then threads that single
//! RNG through every field of the instance tree. That makes streams lazy,
//! effectively infinite, restartable, and safe to iterate from multiple
//! threads — there is no shared mutable generator state to race on.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};

use crate::cast::recompute_tree;
use crate::contract::{mix_seed, GenOptions};
use crate::record::{ElemKind, FieldKind, RecordType};

const MAX_LIST_LEN: usize = 5;

impl RecordType {
    /// Restartable stream of random valid instances.
    pub fn draws(&self, seed: u64) -> InstanceDraws {
        InstanceDraws {
            record: Arc::new(self.clone()),
            seed,
            index: 0,
        }
    }

    /// One instance drawn from a caller-threaded RNG.
    pub fn generate_one(&self, rng: &mut StdRng) -> Value {
        let mut out = draw_record(self, rng);
        recompute_tree(self, &mut out);
        Value::Object(out)
    }
}

/// Lazy, infinite, restartable instance stream. Cloning or restarting costs
/// nothing but an `Arc` bump; draws are independent, so two streams with the
/// same seed agree at every position.
#[derive(Clone)]
pub struct InstanceDraws {
    record: Arc<RecordType>,
    seed: u64,
    index: u64,
}

impl InstanceDraws {
    pub fn restart(&self) -> Self {
        Self {
            record: Arc::clone(&self.record),
            seed: self.seed,
            index: 0,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Iterator for InstanceDraws {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let mut rng = StdRng::seed_from_u64(mix_seed(self.seed, self.index));
        self.index += 1;
        Some(self.record.generate_one(&mut rng))
    }
}

/// Draw every field independently; nested records recurse with the same RNG.
fn draw_record(record: &RecordType, rng: &mut StdRng) -> Map<String, Value> {
    let mut out = Map::new();
    for (name, spec) in &record.fields {
        let v = match &spec.kind {
            FieldKind::Simple(p) => p.generate(rng),
            FieldKind::Typed(t) => t.generate(&GenOptions::new(), rng),
            FieldKind::List(elem) => {
                let len = rng.gen_range(0..=MAX_LIST_LEN);
                Value::Array((0..len).map(|_| draw_elem(elem, rng)).collect())
            }
            FieldKind::Mixed(alts) => {
                let pick = rng.gen_range(0..alts.len());
                draw_elem(&alts[pick], rng)
            }
            FieldKind::Constant(c) => c.clone(),
            FieldKind::Nested(child) => Value::Object(draw_record(child, rng)),
        };
        out.insert(name.clone(), v);
    }
    out
}

fn draw_elem(elem: &ElemKind, rng: &mut StdRng) -> Value {
    match elem {
        ElemKind::Prim(p) => p.generate(rng),
        ElemKind::Typed(t) => t.generate(&GenOptions::new(), rng),
    }
}
