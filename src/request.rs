//! Request decoding.
//!
//! The transport hands the gateway an event shaped like
//!
//! ```json
//! {
//!   "body": { "a": 5, "b": 10 },
//!   "params": {
//!     "path": { "method": "add" },
//!     "header": { "Content-Type": "application/json" },
//!     "querystring": {}
//!   },
//!   "context": { "request-id": "55066e03-19f7-11e6-8e97-231379f58d27", "stage": "prod" }
//! }
//! ```
//!
//! Only the outer shape is checked here. The body stays an opaque JSON value until
//! the target method (and therefore its input shape) is known.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::GatewayError;

/// Treat an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decoded inbound event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Opaque body; `null` when absent
    #[serde(default)]
    pub body: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub params: Params,
    /// Transport metadata, passed through untouched
    #[serde(default, deserialize_with = "null_as_default")]
    pub context: RequestContext,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params {
    #[serde(default, deserialize_with = "null_as_default")]
    pub path: PathParams,
    #[serde(default, deserialize_with = "null_as_default")]
    pub header: HashMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub querystring: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathParams {
    /// Raw RPC method name, in whatever spelling the caller used
    #[serde(default, deserialize_with = "null_as_default")]
    pub method: String,
}

impl Request {
    /// Build a request for `method` carrying `body`.
    pub fn new(method: impl Into<String>, body: Value) -> Self {
        Self {
            body,
            params: Params {
                path: PathParams {
                    method: method.into(),
                },
                ..Params::default()
            },
            context: RequestContext::default(),
        }
    }

    /// Parse a raw payload.
    ///
    /// # Errors
    ///
    /// [`GatewayError::MalformedRequest`] if the bytes are not JSON or do not have
    /// the request shape.
    pub fn decode(raw: &[u8]) -> Result<Self, GatewayError> {
        let value: Value = serde_json::from_slice(raw).map_err(GatewayError::MalformedRequest)?;
        Self::from_value(value)
    }

    /// Interpret an already-parsed JSON value as a request.
    ///
    /// # Errors
    ///
    /// [`GatewayError::MalformedRequest`] if the value does not have the request shape.
    pub fn from_value(value: Value) -> Result<Self, GatewayError> {
        // derived struct impls also accept arrays, matched to fields by position
        if !value.is_object() {
            return Err(GatewayError::MalformedRequest(serde::de::Error::custom(
                "request must be a JSON object",
            )));
        }
        serde_json::from_value(value).map_err(GatewayError::MalformedRequest)
    }

    #[inline]
    #[must_use]
    pub fn method_name(&self) -> &str {
        &self.params.path.method
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.params
            .header
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.params.querystring.get(name).map(String::as_str)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.header.insert(name.into(), value.into());
        self
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }
}

/// Flat record of transport-supplied metadata.
///
/// Kept exactly as received. Accessors match keys ignoring ASCII case and
/// treating `-` and `_` alike, so `request_id` finds `request-id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestContext(pub Map<String, Value>);

impl RequestContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Look up a field as a non-empty string.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        let wanted = key.as_bytes();
        self.0
            .iter()
            .find(|(k, _)| {
                k.len() == wanted.len()
                    && k.bytes().zip(wanted.iter().copied()).all(|(a, b)| {
                        let norm = |c: u8| if c == b'-' { b'_' } else { c.to_ascii_lowercase() };
                        norm(a) == norm(b)
                    })
            })
            .and_then(|(_, v)| v.as_str())
            .filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.get("request_id")
    }

    #[must_use]
    pub fn source_ip(&self) -> Option<&str> {
        self.get("source_ip")
    }

    #[must_use]
    pub fn stage(&self) -> Option<&str> {
        self.get("stage")
    }

    #[must_use]
    pub fn caller(&self) -> Option<&str> {
        self.get("caller")
    }

    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.get("user_agent")
    }

    #[must_use]
    pub fn http_method(&self) -> Option<&str> {
        self.get("http_method")
    }

    #[must_use]
    pub fn resource_path(&self) -> Option<&str> {
        self.get("resource_path")
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
