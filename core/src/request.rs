use crate::{Error, Result};
use http::header::HOST;
use http::uri::Authority;
use http::HeaderMap;
use http::HeaderValue;
use http::Method;

/// Signing view of a request.
///
/// Built from `http::request::Parts` without touching them: signers compute
/// what to add and leave it to the caller to apply the result.
#[derive(Debug)]
pub struct SigningRequest {
    /// HTTP method.
    pub method: Method,
    /// Host used for signing, taken from the `Host` header or the uri authority.
    pub host: String,
    /// HTTP path as it appears on the wire (still percent encoded).
    pub path: String,
    /// HTTP query parameters, percent decoded.
    pub query: Vec<(String, String)>,
    /// HTTP headers.
    pub headers: HeaderMap,
}

impl SigningRequest {
    /// Build a signing context from http::request::Parts.
    pub fn build(parts: &http::request::Parts) -> Result<Self> {
        let host = match parts.headers.get(HOST) {
            Some(v) => v.to_str()?.to_string(),
            None => parts
                .uri
                .authority()
                .map(Authority::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    Error::request_invalid("request without authority is invalid for signing")
                })?,
        };

        let path = match parts.uri.path() {
            "" => "/".to_string(),
            v => v.to_string(),
        };

        Ok(SigningRequest {
            method: parts.method.clone(),
            host,
            path,
            query: parts
                .uri
                .query()
                .map(|v| {
                    form_urlencoded::parse(v.as_bytes())
                        .map(|(k, v)| (k.into_owned(), v.into_owned()))
                        .collect()
                })
                .unwrap_or_default(),
            headers: parts.headers.clone(),
        })
    }

    /// Get the path percent decoded.
    pub fn path_percent_decoded(&self) -> Result<String> {
        let path = percent_encoding::percent_decode_str(&self.path).decode_utf8()?;
        Ok(path.into_owned())
    }

    /// Normalize header value over its raw bytes.
    ///
    /// Leading and trailing spaces are trimmed, and sequential spaces inside
    /// the value are collapsed into a single space. Bytes outside visible
    /// ASCII are kept as they are, AWS signs them verbatim.
    pub fn header_value_normalize(v: &HeaderValue) -> Vec<u8> {
        let mut normalized = Vec::with_capacity(v.len());
        for word in v
            .as_bytes()
            .split(u8::is_ascii_whitespace)
            .filter(|w| !w.is_empty())
        {
            if !normalized.is_empty() {
                normalized.push(b' ');
            }
            normalized.extend_from_slice(word);
        }

        normalized
    }

    /// Get header value by name with all values joined by `,`.
    ///
    /// Every value is normalized via [`SigningRequest::header_value_normalize`].
    pub fn header_value_joined(&self, name: &str) -> Vec<u8> {
        self.headers
            .get_all(name)
            .iter()
            .map(Self::header_value_normalize)
            .collect::<Vec<_>>()
            .join(&b',')
    }

    /// Get header names as sorted vector.
    pub fn header_name_to_vec_sorted(&self) -> Vec<&str> {
        let mut h = self
            .headers
            .keys()
            .map(|k| k.as_str())
            .collect::<Vec<&str>>();
        h.sort_unstable();

        h
    }
}
