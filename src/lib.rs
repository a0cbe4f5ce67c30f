//! # rpcgate
//!
//! **rpcgate** exposes the methods of an ordinary Rust value as RPC operations
//! addressable by name, behind an event-style invocation:
//!
//! ```json
//! {"body": {"a": 5, "b": 10}, "params": {"path": {"method": "add"}}, "context": {}}
//! ```
//!
//! Every invocation produces exactly one `{status, body}` envelope.
//!
//! ## Quick Start
//!
//! ```rust
//! use rpcgate::{service, Gateway, StatusError};
//! use serde::Deserialize;
//!
//! pub struct Math;
//!
//! #[derive(Deserialize)]
//! pub struct AddInput {
//!     a: i64,
//!     b: i64,
//! }
//!
//! #[service]
//! impl Math {
//!     pub fn add(&self, input: &AddInput) -> Result<i64, StatusError> {
//!         Ok(input.a + input.b)
//!     }
//!
//!     pub fn check(&self, input: &AddInput) -> Result<(), StatusError> {
//!         if input.b == 0 {
//!             return Err(StatusError::unprocessable("bad"));
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let gateway = Gateway::new(Math);
//! let resp = gateway.handle(br#"{"body": {"a": 5, "b": 10}, "params": {"path": {"method": "add"}}}"#);
//! assert_eq!((resp.status, resp.body), (200, serde_json::json!(15)));
//!
//! let resp = gateway.handle(br#"{"body": {"a": 5, "b": 0}, "params": {"path": {"method": "CHECK"}}}"#);
//! assert_eq!((resp.status, resp.body), (422, serde_json::json!("bad")));
//! ```
//!
//! ## Architecture
//!
//! - **[`naming`]** - canonical (PascalCase) method names
//! - **[`registry`]** - the table of dispatchable methods, built once per service
//! - **[`request`]** - decoding of the inbound event
//! - **[`dispatcher`]** - resolve, decode, invoke, normalize
//! - **[`response`]** - the envelope, [`Responder`] and outcome normalization
//! - **[`transport`]** - stdio event loop and HTTP adapter
//! - **[`config`]**, **[`logging`]**, **[`cli`]** - process plumbing for service binaries
//!
//! ## Status Mapping
//!
//! | Situation | Status | Body |
//! |-----------|--------|------|
//! | payload is not a request | 400 | `"Malformed Request"` |
//! | unknown method | 404 | `"Not Found"` |
//! | body does not fit the input | 400 | `"Malformed Request Body"` |
//! | error implementing [`Responder`] | its status | its body |
//! | any other error, or a panic | 500 | `"Internal Server Error"` |
//! | success implementing [`Responder`] | its status | its body |
//! | plain success | 200 | the value |
//! | no return value | 200 | `null` |

extern crate self as rpcgate;

pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod logging;
pub mod naming;
pub mod registry;
pub mod request;
pub mod response;
pub mod transport;

#[doc(hidden)]
#[path = "private.rs"]
pub mod __private;

pub use config::GatewayConfig;
pub use dispatcher::Gateway;
pub use error::GatewayError;
pub use registry::{Exclusion, InputShape, MethodDef, MethodDescriptor, Outputs, Registry, Service};
pub use request::{Request, RequestContext};
pub use response::{Outcome, Responder, Response, StatusError};
pub use rpcgate_macros::service;
