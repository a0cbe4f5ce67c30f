//! Request correlation identifiers.

use std::fmt;
use std::str::FromStr;

/// Request identifier minted by the gateway, backed by a ULID.
///
/// Transports usually supply their own id (API gateways put one in the event
/// context). A fresh `RequestId` is only generated when none was supplied.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(ulid::Ulid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    #[must_use]
    pub fn as_ulid(&self) -> ulid::Ulid {
        self.0
    }

    /// Correlation id for a request: the supplied id verbatim when present and
    /// non-empty, otherwise a freshly minted ULID.
    #[must_use]
    pub fn resolve(supplied: Option<&str>) -> String {
        match supplied.map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Self::new().to_string(),
        }
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ulid::Ulid::from_string(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ids_are_unique_ulids() {
        let a = RequestId::new();
        let b = RequestId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 26);
        assert_eq!(a.to_string().parse::<RequestId>().unwrap(), a);
    }

    #[test]
    fn test_resolve_prefers_supplied() {
        assert_eq!(
            RequestId::resolve(Some("55066e03-19f7-11e6-8e97-231379f58d27")),
            "55066e03-19f7-11e6-8e97-231379f58d27"
        );
        let minted = RequestId::resolve(Some("  "));
        assert!(minted.parse::<RequestId>().is_ok());
        assert!(RequestId::resolve(None).parse::<RequestId>().is_ok());
    }

    #[test]
    fn test_invalid_parse() {
        assert!("not-a-ulid".parse::<RequestId>().is_err());
    }
}
