//! Helpers shared by the signing crates.

use std::fmt::{Debug, Formatter};

/// Redact hides a secret when it is printed with `{:?}`.
///
/// Values shorter than 12 bytes are fully hidden. Longer values keep their
/// first and last three bytes, enough to tell two keys apart in logs.
pub struct Redact<'a>(&'a str);

impl<'a> From<&'a str> for Redact<'a> {
    fn from(value: &'a str) -> Self {
        Redact(value)
    }
}

impl<'a> From<&'a String> for Redact<'a> {
    fn from(value: &'a String) -> Self {
        Redact(value)
    }
}

impl<'a> From<&'a Option<String>> for Redact<'a> {
    fn from(value: &'a Option<String>) -> Self {
        Redact(value.as_deref().unwrap_or_default())
    }
}

impl<'a> From<&'a http::HeaderValue> for Redact<'a> {
    /// Values that are not visible ASCII are treated as fully secret.
    fn from(value: &'a http::HeaderValue) -> Self {
        Redact(value.to_str().unwrap_or("opaque"))
    }
}

impl Debug for Redact<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let v = self.0;
        match v.len() {
            0 => f.write_str("EMPTY"),
            n if n < 12 => f.write_str("***"),
            n => match (v.get(..3), v.get(n - 3..)) {
                (Some(head), Some(tail)) => write!(f, "{head}***{tail}"),
                // Not on a char boundary, hide everything.
                _ => f.write_str("***"),
            },
        }
    }
}
