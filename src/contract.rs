//! The type contract: what a semantic type must expose to plug into the
//! schema compiler, the cast engine, and the generator composer.
//!
//! Three functions, no more:
//! - `coerce` bridges loosely-typed wire data (often string-encoded) to the
//!   type's canonical in-memory value;
//! - `validate` judges an already-coerced value;
//! - `generate` draws one canonical value from a caller-threaded RNG.
//!
//! [`ValueStream`] adapts `generate` into the lazy, infinite, restartable
//! stream shape used for property testing. Each position derives its own RNG
//! from (seed, index), so streams can be restarted or iterated concurrently
//! without shared mutable counters.

use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{Map, Value};

/// Why a value was rejected. Plain prose; the cast engine prefixes the path.
pub type Reason = String;

/// The contract every semantic type (built-in or user-defined) satisfies.
///
/// Implementations must be pure: no I/O, no interior mutability. The same
/// input always coerces/validates the same way, and `generate` depends only
/// on the RNG state and options handed in.
pub trait SemanticType: Send + Sync {
    /// Short stable name, used in error messages and reflection.
    fn name(&self) -> &str;

    /// Map a raw external value onto this type's canonical representation.
    fn coerce(&self, raw: &Value) -> Result<Value, Reason>;

    /// Judge an already-coerced value. Default: everything passes.
    fn validate(&self, value: &Value) -> Result<Value, Reason> {
        Ok(value.clone())
    }

    /// Draw one canonical, valid value. The caller threads the RNG so a whole
    /// record draw shares a single random source.
    fn generate(&self, options: &GenOptions, rng: &mut StdRng) -> Value;
}

impl fmt::Debug for dyn SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SemanticType({})", self.name())
    }
}

/// Type-specific generation options, e.g. `only`/`except` for closed-set
/// types or `schemes`/`with_path` for URIs. Map-backed and data-driven so
/// user types can define their own keys.
#[derive(Debug, Clone, Default)]
pub struct GenOptions(Map<String, Value>);

impl GenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// A list-of-strings option (`only`, `except`, `schemes`, ...).
    pub fn str_list(&self, key: &str) -> Option<Vec<&str>> {
        self.0.get(key)?.as_array().map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<&str>>()
        })
    }

    /// A boolean option, absent meaning `false`.
    pub fn flag(&self, key: &str) -> bool {
        self.0
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Lazy, effectively-infinite, restartable stream of values from one type.
///
/// Draw `i` always sees `StdRng::seed_from_u64(mix(seed, i))`, so two streams
/// with the same seed yield identical values regardless of how far either has
/// been advanced.
#[derive(Clone)]
pub struct ValueStream {
    ty: Arc<dyn SemanticType>,
    options: GenOptions,
    seed: u64,
    index: u64,
}

impl ValueStream {
    pub fn new(ty: Arc<dyn SemanticType>, options: GenOptions, seed: u64) -> Self {
        Self {
            ty,
            options,
            seed,
            index: 0,
        }
    }

    /// A fresh stream positioned at the start, same seed.
    pub fn restart(&self) -> Self {
        Self {
            ty: Arc::clone(&self.ty),
            options: self.options.clone(),
            seed: self.seed,
            index: 0,
        }
    }
}

impl Iterator for ValueStream {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let mut rng = StdRng::seed_from_u64(mix_seed(self.seed, self.index));
        self.index += 1;
        Some(self.ty.generate(&self.options, &mut rng))
    }
}

/// Derive the per-index seed. SplitMix64 finalizer: cheap, well-distributed,
/// and stable across platforms.
pub(crate) fn mix_seed(seed: u64, index: u64) -> u64 {
    let mut z = seed ^ index.wrapping_mul(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
