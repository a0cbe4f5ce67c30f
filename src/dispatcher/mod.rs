//! # Dispatcher Module
//!
//! The dispatcher turns one raw payload into exactly one [`Response`](crate::Response).
//!
//! ## Request Flow
//!
//! 1. Parse the payload into a [`Request`](crate::Request). Failure gives
//!    `400 Malformed Request`.
//! 2. Resolve the method name through the registry. A miss gives `404 Not Found`.
//! 3. Decode the body into the method's input shape, only if it has one.
//!    Failure gives `400 Malformed Request Body`.
//! 4. Invoke the method.
//! 5. Normalize the outcome: plain values become `200`, responders answer for
//!    themselves, every other error becomes `500 Internal Server Error`.
//!
//! ```rust
//! use rpcgate::{service, Gateway, StatusError};
//!
//! pub struct Math;
//!
//! #[service]
//! impl Math {
//!     pub fn no_input(&self) -> Result<i64, StatusError> {
//!         Ok(5)
//!     }
//! }
//!
//! let gateway = Gateway::new(Math);
//! let resp = gateway.handle(br#"{"body": {}, "params": {"path": {"method": "no_input"}}}"#);
//! assert_eq!(resp.status, 200);
//! assert_eq!(resp.body, 5);
//! ```
//!
//! ## Error Handling
//!
//! - Failures never escape [`Gateway::handle`]; each one is logged and mapped
//!   to its envelope.
//! - Panics inside a method are caught and answered with `500`.
//! - Error detail from opaque errors is logged, never returned.
//!
//! ## Logging
//!
//! Each dispatch runs inside an `info_span!("dispatch")` carrying the request id
//! (from the request context, or a fresh ULID) and the raw method name.

mod core;

pub use core::Gateway;
