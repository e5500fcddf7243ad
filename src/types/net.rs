//! Network-facing semantic types: URI and IP address.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::Rng;
use regex::Regex;
use serde_json::Value;

use crate::contract::{GenOptions, Reason, SemanticType};
use crate::types::{kind_name, scalar};

// Scheme, authority, then anything non-space. Deliberately permissive:
// this is a shape check, not an RFC 3986 parser.
static URI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9+.-]*://[^\s/]+(/[^\s]*)?$").unwrap());

const DEFAULT_SCHEMES: [&str; 2] = ["https", "http"];

/// URI with scheme and authority.
///
/// Generation options: `schemes` (list of strings, default https/http) and
/// `with_path` (bool, append a random path segment).
#[derive(Debug, Clone, Copy, Default)]
pub struct Uri;

impl SemanticType for Uri {
    fn name(&self) -> &str {
        "uri"
    }

    fn coerce(&self, raw: &Value) -> Result<Value, Reason> {
        match raw {
            Value::String(s) => Ok(Value::String(s.trim().to_string())),
            other => Err(format!("expected URI string, got {}", kind_name(other))),
        }
    }

    fn validate(&self, value: &Value) -> Result<Value, Reason> {
        match value {
            Value::String(s) if URI_RE.is_match(s) => Ok(value.clone()),
            Value::String(s) => Err(format!("not a valid URI: {s:?}")),
            other => Err(format!("expected URI string, got {}", kind_name(other))),
        }
    }

    fn generate(&self, options: &GenOptions, rng: &mut StdRng) -> Value {
        let schemes = options.str_list("schemes");
        let pool: Vec<&str> = match &schemes {
            Some(list) if !list.is_empty() => list.clone(),
            _ => DEFAULT_SCHEMES.to_vec(),
        };
        let scheme = pool[rng.gen_range(0..pool.len())];
        let host = scalar::random_token(rng).to_lowercase();
        let mut uri = format!("{scheme}://{host}.example");
        if options.flag("with_path") {
            uri.push('/');
            uri.push_str(&scalar::random_token(rng).to_lowercase());
        }
        Value::String(uri)
    }
}

/// IPv4 or IPv6 address, canonicalized via the standard parser's display
/// form (lowercased, compressed v6).
#[derive(Debug, Clone, Copy, Default)]
pub struct IpAddress;

impl SemanticType for IpAddress {
    fn name(&self) -> &str {
        "ip-address"
    }

    fn coerce(&self, raw: &Value) -> Result<Value, Reason> {
        match raw {
            Value::String(s) => s
                .trim()
                .parse::<IpAddr>()
                .map(|ip| Value::String(ip.to_string()))
                .map_err(|_| format!("not a valid IP address: {s:?}")),
            other => Err(format!(
                "expected IP address string, got {}",
                kind_name(other)
            )),
        }
    }

    fn validate(&self, value: &Value) -> Result<Value, Reason> {
        match value {
            Value::String(s) if s.parse::<IpAddr>().is_ok() => Ok(value.clone()),
            Value::String(s) => Err(format!("not a valid IP address: {s:?}")),
            other => Err(format!(
                "expected IP address string, got {}",
                kind_name(other)
            )),
        }
    }

    fn generate(&self, _options: &GenOptions, rng: &mut StdRng) -> Value {
        // mostly v4, occasionally v6
        let ip = if rng.gen_range(0..4) == 0 {
            IpAddr::V6(Ipv6Addr::new(
                rng.gen(),
                rng.gen(),
                rng.gen(),
                rng.gen(),
                rng.gen(),
                rng.gen(),
                rng.gen(),
                rng.gen(),
            ))
        } else {
            IpAddr::V4(Ipv4Addr::new(rng.gen(), rng.gen(), rng.gen(), rng.gen()))
        };
        Value::String(ip.to_string())
    }
}
