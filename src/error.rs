use serde_json::Value;
use std::fmt;

use crate::response::Responder;

/// Dispatch-time failures.
///
/// Each variant maps to a fixed envelope through its [`Responder`] impl, so the
/// dispatcher can absorb every failure into a response instead of propagating it.
#[derive(Debug)]
pub enum GatewayError {
    /// The raw payload could not be parsed into a request.
    MalformedRequest(serde_json::Error),
    /// No registered method matches the requested name.
    MethodNotFound(String),
    /// The request body does not fit the resolved method's input shape.
    MalformedRequestBody {
        /// Canonical name of the resolved method
        method: String,
        source: serde_json::Error,
    },
    /// The operation failed with an error that carries no response of its own.
    ///
    /// The detail is only ever logged.
    OperationFailed(String),
}

impl GatewayError {
    /// Body text sent to the caller.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self {
            GatewayError::MalformedRequest(_) => "Malformed Request",
            GatewayError::MethodNotFound(_) => "Not Found",
            GatewayError::MalformedRequestBody { .. } => "Malformed Request Body",
            GatewayError::OperationFailed(_) => "Internal Server Error",
        }
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::MalformedRequest(_) | GatewayError::MalformedRequestBody { .. } => 400,
            GatewayError::MethodNotFound(_) => 404,
            GatewayError::OperationFailed(_) => 500,
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::MalformedRequest(e) => write!(f, "malformed request: {e}"),
            GatewayError::MethodNotFound(name) => write!(f, "method not found: {name:?}"),
            GatewayError::MalformedRequestBody { method, source } => {
                write!(f, "malformed request body for {method}: {source}")
            }
            GatewayError::OperationFailed(detail) => write!(f, "operation failed: {detail}"),
        }
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GatewayError::MalformedRequest(e) => Some(e),
            GatewayError::MalformedRequestBody { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl Responder for GatewayError {
    fn status(&self) -> u16 {
        self.status_code()
    }

    fn body(&self) -> Value {
        Value::String(self.public_message().to_string())
    }
}
