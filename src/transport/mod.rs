//! # Transports
//!
//! Thin adapters that deliver events to a [`Gateway`](crate::Gateway) and write
//! the envelopes back. Neither adapter interprets the envelope.
//!
//! - [`stdio`]: newline-delimited JSON invocations on a reader/writer pair, the
//!   shape a function runtime feeds its handler process.
//! - [`http`]: a `may_minihttp` service mapping `<VERB> /{method}` onto an event.

pub mod http;
pub mod stdio;

pub use http::{GatewayService, HttpServer, ServerHandle};
