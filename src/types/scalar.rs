//! Coercion, validation and generation for the primitive kinds.
//!
//! Coercion is the bridge from string-encoded wire data: every primitive
//! accepts both its native JSON form and the canonical string encoding.

use rand::rngs::StdRng;
use rand::Rng;
use serde_json::{Number, Value};

use crate::contract::Reason;
use crate::shape::Prim;
use crate::types::{kind_name, temporal};

// Generator ranges. Kept modest so drawn instances stay readable in test
// failure output.
const INT_MAGNITUDE: i64 = 1_000_000;
const FLOAT_MAGNITUDE: f64 = 1.0e6;
const MAX_STRING_LEN: usize = 12;

impl Prim {
    pub fn coerce(&self, raw: &Value) -> Result<Value, Reason> {
        match self {
            Prim::Integer | Prim::PositiveInteger => coerce_integer(raw),
            Prim::Float => coerce_float(raw),
            Prim::Boolean => coerce_boolean(raw),
            Prim::String => coerce_string(raw),
            Prim::Date => temporal::coerce_date(raw),
            Prim::DateTime => temporal::coerce_datetime(raw),
            Prim::Time => temporal::coerce_time(raw),
        }
    }

    pub fn validate(&self, value: &Value) -> Result<Value, Reason> {
        match self {
            Prim::PositiveInteger => match value.as_i64() {
                Some(n) if n > 0 => Ok(value.clone()),
                Some(n) => Err(format!("expected a positive integer, got {n}")),
                None => Err(format!(
                    "expected a positive integer, got {}",
                    kind_name(value)
                )),
            },
            _ => Ok(value.clone()),
        }
    }

    pub fn generate(&self, rng: &mut StdRng) -> Value {
        match self {
            Prim::Integer => Value::from(rng.gen_range(-INT_MAGNITUDE..=INT_MAGNITUDE)),
            Prim::PositiveInteger => Value::from(rng.gen_range(1..=INT_MAGNITUDE)),
            Prim::Float => {
                // from_f64 only fails on non-finite input; the range is finite
                let f = rng.gen_range(-FLOAT_MAGNITUDE..FLOAT_MAGNITUDE);
                Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
            }
            Prim::Boolean => Value::Bool(rng.gen::<bool>()),
            Prim::String => Value::String(random_token(rng)),
            Prim::Date => temporal::generate_date(rng),
            Prim::DateTime => temporal::generate_datetime(rng),
            Prim::Time => temporal::generate_time(rng),
        }
    }

    /// Default instance value when neither the input nor a declared default
    /// provides one.
    pub fn zero(&self) -> Value {
        match self {
            Prim::Integer | Prim::PositiveInteger => Value::from(0),
            Prim::Float => Value::from(0.0),
            Prim::Boolean => Value::Bool(false),
            Prim::String => Value::String(String::new()),
            Prim::Date | Prim::DateTime | Prim::Time => Value::Null,
        }
    }
}

fn coerce_integer(raw: &Value) -> Result<Value, Reason> {
    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::from(i))
            } else if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                    Ok(Value::from(f as i64))
                } else {
                    Err(format!("expected integer, got non-integral number {f}"))
                }
            } else {
                Err("expected integer, number out of range".to_string())
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("expected integer, got {s:?}")),
        other => Err(format!("expected integer, got {}", kind_name(other))),
    }
}

fn coerce_float(raw: &Value) -> Result<Value, Reason> {
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    };
    match parsed {
        Some(f) => Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| "expected a finite number".to_string()),
        None => Err(format!("expected float, got {}", kind_name(raw))),
    }
}

fn coerce_boolean(raw: &Value) -> Result<Value, Reason> {
    match raw {
        Value::Bool(b) => Ok(Value::Bool(*b)),
        Value::String(s) => match s.trim() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            other => Err(format!("expected boolean, got {other:?}")),
        },
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(Value::Bool(false)),
            Some(1) => Ok(Value::Bool(true)),
            _ => Err(format!("expected boolean, got number {n}")),
        },
        other => Err(format!("expected boolean, got {}", kind_name(other))),
    }
}

fn coerce_string(raw: &Value) -> Result<Value, Reason> {
    match raw {
        Value::String(s) => Ok(Value::String(s.clone())),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        other => Err(format!("expected string, got {}", kind_name(other))),
    }
}

pub(crate) fn random_token(rng: &mut StdRng) -> String {
    use rand::distributions::Alphanumeric;
    let len = rng.gen_range(1..=MAX_STRING_LEN);
    (0..len).map(|_| rng.sample(Alphanumeric) as char).collect()
}
