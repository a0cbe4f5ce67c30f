//! Response envelope and normalization of invocation outcomes.
//!
//! Every dispatch ends in exactly one [`Response`]. Operations may shape it
//! themselves by returning (or failing with) a value that implements
//! [`Responder`]; everything else goes through the default mapping in
//! [`Outcome::into_response`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::GatewayError;

/// Uniform `{status, body}` envelope handed back to the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    /// Success payload, or a plain diagnostic string on failure
    #[serde(default)]
    pub body: Value,
}

impl Response {
    /// Create a response with the given status and body
    #[must_use]
    pub fn new(status: u16, body: impl Into<Value>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// `200` with the given body
    #[must_use]
    pub fn ok(body: impl Into<Value>) -> Self {
        Self::new(200, body)
    }

    /// `200` with a `null` body
    #[must_use]
    pub fn empty() -> Self {
        Self::new(200, Value::Null)
    }

    /// Build the envelope a [`Responder`] describes
    #[must_use]
    pub fn from_responder<R: Responder + ?Sized>(responder: &R) -> Self {
        Self::new(responder.status(), responder.body())
    }

    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capability to override the default status/body mapping.
///
/// Implement it on a success type to answer with something other than
/// `200`, or on an error type to surface a status and body to the caller
/// instead of the generic `500 Internal Server Error`.
pub trait Responder {
    fn status(&self) -> u16;
    fn body(&self) -> Value;
}

impl Responder for Response {
    fn status(&self) -> u16 {
        self.status
    }

    fn body(&self) -> Value {
        self.body.clone()
    }
}

impl<R: Responder + ?Sized> Responder for Box<R> {
    fn status(&self) -> u16 {
        (**self).status()
    }

    fn body(&self) -> Value {
        (**self).body()
    }
}

/// Ready-made error that carries its own status and message.
///
/// The message becomes the response body verbatim.
///
/// ```
/// use rpcgate::{Responder, StatusError};
///
/// let err = StatusError::new(422, "bad");
/// assert_eq!(err.status(), 422);
/// assert_eq!(err.body(), serde_json::json!("bad"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusError {
    status: u16,
    message: String,
}

impl StatusError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(422, message)
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.message)
    }
}

impl std::error::Error for StatusError {}

impl Responder for StatusError {
    fn status(&self) -> u16 {
        self.status
    }

    fn body(&self) -> Value {
        Value::String(self.message.clone())
    }
}

/// Classified result of one invocation, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The operation produced no value.
    Empty,
    /// Plain success value.
    Value(Value),
    /// Success value that implements [`Responder`].
    Responded(Response),
    /// Error value that implements [`Responder`].
    Rejected(Response),
    /// Error value without [`Responder`]. The text is for logs only.
    Failed(String),
}

impl Outcome {
    /// Plain success. A value that cannot be serialized becomes a failure.
    pub fn success<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => Outcome::Value(v),
            Err(e) => Outcome::Failed(format!("failed to serialize result: {e}")),
        }
    }

    /// Success value that answers for itself.
    pub fn responder<R: Responder + ?Sized>(value: &R) -> Self {
        Outcome::Responded(Response::from_responder(value))
    }

    /// Error value that answers for itself.
    pub fn rejection<R: Responder + ?Sized>(error: &R) -> Self {
        Outcome::Rejected(Response::from_responder(error))
    }

    /// Opaque error.
    pub fn failure<E: fmt::Display + ?Sized>(error: &E) -> Self {
        Outcome::Failed(error.to_string())
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Rejected(_) | Outcome::Failed(_))
    }

    /// Map the outcome onto the response envelope.
    ///
    /// Unclassified failures never leak their detail into the body.
    #[must_use]
    pub fn into_response(self) -> Response {
        match self {
            Outcome::Empty => Response::empty(),
            Outcome::Value(v) => Response::ok(v),
            Outcome::Responded(r) | Outcome::Rejected(r) => r,
            Outcome::Failed(detail) => {
                Response::from_responder(&GatewayError::OperationFailed(detail))
            }
        }
    }
}
