//! Temporal primitives: date, datetime, time.
//!
//! Canonical forms are strict and UTC-only for datetimes — `YYYY-MM-DD`,
//! `YYYY-MM-DDTHH:MM:SSZ`, `HH:MM:SS`. Coercion accepts offset datetimes and
//! converts them to UTC; the canonical output always carries the `Z` suffix
//! so casting is idempotent.

use chrono::{DateTime as ChronoDateTime, Duration, NaiveDate, NaiveTime, SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::Rng;
use serde_json::Value;

use crate::contract::{GenOptions, Reason, SemanticType};
use crate::types::kind_name;

const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M:%S";

pub(crate) fn coerce_date(raw: &Value) -> Result<Value, Reason> {
    match raw {
        Value::String(s) => NaiveDate::parse_from_str(s.trim(), DATE_FMT)
            .map(|d| Value::String(d.format(DATE_FMT).to_string()))
            .map_err(|_| format!("expected date as YYYY-MM-DD, got {s:?}")),
        other => Err(format!("expected date string, got {}", kind_name(other))),
    }
}

pub(crate) fn coerce_time(raw: &Value) -> Result<Value, Reason> {
    match raw {
        Value::String(s) => NaiveTime::parse_from_str(s.trim(), TIME_FMT)
            .map(|t| Value::String(t.format(TIME_FMT).to_string()))
            .map_err(|_| format!("expected time as HH:MM:SS, got {s:?}")),
        other => Err(format!("expected time string, got {}", kind_name(other))),
    }
}

pub(crate) fn coerce_datetime(raw: &Value) -> Result<Value, Reason> {
    match raw {
        Value::String(s) => ChronoDateTime::parse_from_rfc3339(s.trim())
            .map(|dt| {
                let utc = dt.with_timezone(&Utc);
                Value::String(utc.to_rfc3339_opts(SecondsFormat::Secs, true))
            })
            .map_err(|_| format!("expected RFC 3339 datetime, got {s:?}")),
        other => Err(format!(
            "expected datetime string, got {}",
            kind_name(other)
        )),
    }
}

pub(crate) fn generate_date(rng: &mut StdRng) -> Value {
    // 1970-01-01 .. ~2081
    let base = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    let d = base + Duration::days(rng.gen_range(0..=40_000));
    Value::String(d.format(DATE_FMT).to_string())
}

pub(crate) fn generate_time(rng: &mut StdRng) -> Value {
    let t = NaiveTime::from_num_seconds_from_midnight_opt(rng.gen_range(0..86_400), 0)
        .unwrap_or_default();
    Value::String(t.format(TIME_FMT).to_string())
}

pub(crate) fn generate_datetime(rng: &mut StdRng) -> Value {
    let secs = rng.gen_range(0..=2_000_000_000i64);
    match ChronoDateTime::<Utc>::from_timestamp(secs, 0) {
        Some(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
        None => Value::String("1970-01-01T00:00:00Z".to_string()),
    }
}

/// Calendar date, canonical `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Date;

impl SemanticType for Date {
    fn name(&self) -> &str {
        "date"
    }
    fn coerce(&self, raw: &Value) -> Result<Value, Reason> {
        coerce_date(raw)
    }
    fn generate(&self, _options: &GenOptions, rng: &mut StdRng) -> Value {
        generate_date(rng)
    }
}

/// Instant, canonical RFC 3339 UTC with `Z` suffix and whole seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTime;

impl SemanticType for DateTime {
    fn name(&self) -> &str {
        "datetime"
    }
    fn coerce(&self, raw: &Value) -> Result<Value, Reason> {
        coerce_datetime(raw)
    }
    fn generate(&self, _options: &GenOptions, rng: &mut StdRng) -> Value {
        generate_datetime(rng)
    }
}

/// Wall-clock time, canonical `HH:MM:SS`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Time;

impl SemanticType for Time {
    fn name(&self) -> &str {
        "time"
    }
    fn coerce(&self, raw: &Value) -> Result<Value, Reason> {
        coerce_time(raw)
    }
    fn generate(&self, _options: &GenOptions, rng: &mut StdRng) -> Value {
        generate_time(rng)
    }
}
