//! # Registry Module
//!
//! The registry turns a service value into a table of dispatchable methods.
//!
//! ## Overview
//!
//! A service is any `Send + Sync + 'static` type that implements [`Service`].
//! The usual way to get that impl is the [`service`](crate::service) attribute:
//!
//! ```rust
//! use rpcgate::{service, Registry};
//! use serde::Deserialize;
//! use std::sync::Arc;
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
//!     pub fn add(&self, input: &AddInput) -> Result<i64, std::io::Error> {
//!         Ok(input.a + input.b)
//!     }
//!
//!     pub fn answer(&self) -> i64 {
//!         42
//!     }
//! }
//!
//! let registry = Registry::build(Arc::new(Math));
//! assert_eq!(registry.len(), 1);
//! assert!(registry.lookup("add").is_some());
//! assert_eq!(registry.exclusions()[0].name(), "answer");
//! ```
//!
//! ## Calling Convention
//!
//! A method is admitted when it is `pub`, takes `&self`, takes at most one
//! deserializable input, and returns nothing, `Result<(), E>` or `Result<T, E>`.
//! Methods that do not fit are recorded as [`Exclusion`]s and never fail the
//! build. With verbose logging enabled each exclusion is logged with its reason.
//!
//! ## Lookup
//!
//! Keys are canonical PascalCase names (see [`naming`](crate::naming)). A lookup
//! canonicalizes the requested name first and falls back to a case-folded index,
//! so `add_some_numbers`, `AddSomeNumbers` and `addsomenumbers` all resolve to
//! the same method.
//!
//! ## Concurrency
//!
//! The registry is built once and never mutated afterwards. Lookups take `&self`
//! and need no locking.

mod core;

pub use core::{
    DecodeError, Exclusion, InputShape, MethodDef, MethodDescriptor, Outputs, Registry, Service,
};
