//! Identifier types.

use rand::rngs::StdRng;
use rand::Rng;
use serde_json::Value;

use crate::contract::{GenOptions, Reason, SemanticType};
use crate::types::kind_name;

/// UUID, canonicalized to lowercase hyphenated form.
#[derive(Debug, Clone, Copy, Default)]
pub struct Uuid;

impl SemanticType for Uuid {
    fn name(&self) -> &str {
        "uuid"
    }

    fn coerce(&self, raw: &Value) -> Result<Value, Reason> {
        match raw {
            Value::String(s) => uuid::Uuid::parse_str(s.trim())
                .map(|u| Value::String(u.hyphenated().to_string()))
                .map_err(|_| format!("not a valid UUID: {s:?}")),
            other => Err(format!("expected UUID string, got {}", kind_name(other))),
        }
    }

    fn validate(&self, value: &Value) -> Result<Value, Reason> {
        match value {
            Value::String(s) if uuid::Uuid::parse_str(s).is_ok() => Ok(value.clone()),
            Value::String(s) => Err(format!("not a valid UUID: {s:?}")),
            other => Err(format!("expected UUID string, got {}", kind_name(other))),
        }
    }

    fn generate(&self, _options: &GenOptions, rng: &mut StdRng) -> Value {
        // random bytes from the threaded RNG, stamped as v4
        let u = uuid::Builder::from_random_bytes(rng.gen::<[u8; 16]>()).into_uuid();
        Value::String(u.hyphenated().to_string())
    }
}
