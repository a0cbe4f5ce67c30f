//! Support items for code generated by `#[service]`. Not public API.
//!
//! Return values are classified with autoref-based specialization: the
//! generated adapter calls `(&value).rpcgate_value_kind()`. Method probing
//! tries the by-reference receiver first, which only the [`Responder`] impls
//! accept, and falls back to the auto-referenced receiver accepted by the
//! [`Serialize`] (or [`Display`](std::fmt::Display)) impls.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;

use crate::response::{Outcome, Responder};

pub use serde_json::Value;

/// Decode a request body into a method's input type. A missing body decodes
/// as `null`.
#[inline]
pub fn decode_input<T: DeserializeOwned>(input: Option<Value>) -> Result<T, serde_json::Error> {
    serde_json::from_value(input.unwrap_or(Value::Null))
}

pub struct ResponderTag;
pub struct SerializeTag;
pub struct DisplayTag;

impl ResponderTag {
    #[inline]
    pub fn success<T: Responder + ?Sized>(self, value: &T) -> Outcome {
        Outcome::responder(value)
    }

    #[inline]
    pub fn failure<E: Responder + ?Sized>(self, error: &E) -> Outcome {
        Outcome::rejection(error)
    }
}

impl SerializeTag {
    #[inline]
    pub fn success<T: Serialize + ?Sized>(self, value: &T) -> Outcome {
        Outcome::success(value)
    }
}

impl DisplayTag {
    #[inline]
    pub fn failure<E: Display + ?Sized>(self, error: &E) -> Outcome {
        Outcome::failure(error)
    }
}

pub trait ValueResponderKind {
    #[inline]
    fn rpcgate_value_kind(&self) -> ResponderTag {
        ResponderTag
    }
}

impl<T: Responder> ValueResponderKind for T {}

pub trait ValueSerializeKind {
    #[inline]
    fn rpcgate_value_kind(&self) -> SerializeTag {
        SerializeTag
    }
}

impl<T: Serialize> ValueSerializeKind for &T {}

pub trait ErrorResponderKind {
    #[inline]
    fn rpcgate_error_kind(&self) -> ResponderTag {
        ResponderTag
    }
}

impl<E: Responder> ErrorResponderKind for E {}

pub trait ErrorDisplayKind {
    #[inline]
    fn rpcgate_error_kind(&self) -> DisplayTag {
        DisplayTag
    }
}

impl<E: Display> ErrorDisplayKind for &E {}
