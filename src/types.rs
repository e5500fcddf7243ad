//! Built-in semantic types and the primitive coercion/validation/generation
//! glue behind bare symbolic names.
//!
//! Everything here satisfies the same [`SemanticType`](crate::SemanticType)
//! contract user-defined types implement; the compiler does not treat
//! built-ins specially beyond resolving their names.

pub mod closed;
pub mod ident;
pub mod net;
pub mod scalar;
pub mod temporal;

pub use closed::{Enum, Tags};
pub use ident::Uuid;
pub use net::{IpAddress, Uri};
pub use temporal::{Date, DateTime, Time};

use serde_json::Value;

/// Short name for a JSON value's kind, for error messages.
pub(crate) fn kind_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
