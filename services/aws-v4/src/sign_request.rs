use crate::constants::{
    AWS4_HMAC_SHA256, AWS4_REQUEST, AWS_QUERY_ENCODE_SET, AWS_URI_ENCODE_SET, IGNORED_HEADERS,
    PAYLOAD_HASH_SERVICES, SINGLE_ENCODE_PATH_SERVICES, X_AMZ_CONTENT_SHA_256, X_AMZ_DATE,
    X_AMZ_SECURITY_TOKEN,
};
use crate::Credential;
use http::request::Parts;
use http::{header, HeaderMap, HeaderValue};
use log::debug;
use percent_encoding::utf8_percent_encode;
use proxysign_core::hash::{hex_hmac_sha256, hex_sha256, hmac_sha256};
use proxysign_core::time::{format_date, format_iso8601, DateTime};
use proxysign_core::{Error, Result, SigningRequest};
use std::fmt::Write as _;
use std::io::Write as _;

/// RequestSigner that implement AWS SigV4.
///
/// - [Signature Version 4 signing process](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
///
/// The signer never touches the request: [`RequestSigner::sign`] returns the
/// headers to add and leaves applying them to the caller.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    service: String,
    region: String,
}

impl RequestSigner {
    /// Create a new signer for the given service and region.
    pub fn new(service: &str, region: &str) -> Self {
        Self {
            service: service.into(),
            region: region.into(),
        }
    }

    /// Service this signer signs for.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Region this signer signs for.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Compute the signature headers of a request.
    ///
    /// `body` must be the exact bytes that will be sent. The returned map
    /// contains `authorization`, `x-amz-date`, `x-amz-security-token` when the
    /// credential carries a session token and `x-amz-content-sha256` for
    /// services that require it. Same inputs always give the same headers.
    pub fn sign(
        &self,
        parts: &Parts,
        body: &[u8],
        cred: &Credential,
        now: DateTime,
    ) -> Result<HeaderMap> {
        if cred.access_key_id.is_empty() {
            return Err(Error::credential_invalid("access key id is empty"));
        }
        if cred.secret_access_key.is_empty() {
            return Err(Error::credential_invalid("secret access key is empty"));
        }

        let mut signing_req = SigningRequest::build(parts)?;

        // A caller provided payload hash wins, it may be `UNSIGNED-PAYLOAD`.
        let payload_hash = match parts.headers.get(X_AMZ_CONTENT_SHA_256) {
            Some(v) => v.to_str()?.to_string(),
            None => hex_sha256(body),
        };

        let mut output = HeaderMap::new();
        output.insert(X_AMZ_DATE, HeaderValue::try_from(format_iso8601(now))?);
        if let Some(token) = &cred.session_token {
            let mut value = HeaderValue::from_str(token)?;
            // Set token value sensitive to avoid leaking.
            value.set_sensitive(true);
            output.insert(X_AMZ_SECURITY_TOKEN, value);
        }
        if PAYLOAD_HASH_SERVICES.contains(&self.service.as_str()) {
            output.insert(X_AMZ_CONTENT_SHA_256, HeaderValue::from_str(&payload_hash)?);
        }

        canonicalize_header(&mut signing_req, &output)?;

        // build canonical request and string to sign.
        let signed_headers = signing_req.header_name_to_vec_sorted().join(";");
        let creq = self.canonical_request(&signing_req, &signed_headers, &payload_hash)?;
        let encoded_req = hex_sha256(&creq);

        // Scope: "20220313/<region>/<service>/aws4_request"
        let scope = format!(
            "{}/{}/{}/{AWS4_REQUEST}",
            format_date(now),
            self.region,
            self.service
        );
        debug!("calculated scope: {scope}");

        // StringToSign:
        //
        // AWS4-HMAC-SHA256
        // 20220313T072004Z
        // 20220313/<region>/<service>/aws4_request
        // <hashed_canonical_request>
        let string_to_sign = {
            let mut f = String::new();
            writeln!(f, "{AWS4_HMAC_SHA256}")?;
            writeln!(f, "{}", format_iso8601(now))?;
            writeln!(f, "{scope}")?;
            write!(f, "{encoded_req}")?;
            f
        };
        debug!("calculated string to sign: {string_to_sign}");

        let signing_key =
            generate_signing_key(&cred.secret_access_key, now, &self.region, &self.service);
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        let mut authorization = HeaderValue::from_str(&format!(
            "{AWS4_HMAC_SHA256} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            cred.access_key_id,
        ))?;
        authorization.set_sensitive(true);
        output.insert(header::AUTHORIZATION, authorization);

        Ok(output)
    }

    /// Canonical request as raw bytes, header values are not required to be
    /// valid utf-8.
    fn canonical_request(
        &self,
        req: &SigningRequest,
        signed_headers: &str,
        payload_hash: &str,
    ) -> Result<Vec<u8>> {
        // 256 is specially chosen to avoid reallocation for most requests.
        let mut f = Vec::with_capacity(256);

        // Insert method
        writeln!(f, "{}", req.method)?;
        // Insert encoded path
        writeln!(f, "{}", self.canonical_path(req)?)?;
        // Insert query
        writeln!(f, "{}", canonical_query(req))?;
        // Insert signed headers
        for name in req.header_name_to_vec_sorted() {
            write!(f, "{name}:")?;
            f.extend_from_slice(&req.header_value_joined(name));
            writeln!(f)?;
        }
        writeln!(f)?;
        writeln!(f, "{signed_headers}")?;
        write!(f, "{payload_hash}")?;

        Ok(f)
    }

    fn canonical_path(&self, req: &SigningRequest) -> Result<String> {
        // S3 signs the path it stores objects under, every other service
        // escapes the already escaped path once more.
        if SINGLE_ENCODE_PATH_SERVICES.contains(&self.service.as_str()) {
            let path = req.path_percent_decoded()?;
            Ok(utf8_percent_encode(&path, &AWS_URI_ENCODE_SET).to_string())
        } else {
            Ok(utf8_percent_encode(&req.path, &AWS_URI_ENCODE_SET).to_string())
        }
    }
}

/// Prepare the headers that take part in the signature.
///
/// Ignored headers are dropped, signature headers are merged in and `host`
/// is always present.
fn canonicalize_header(req: &mut SigningRequest, output: &HeaderMap) -> Result<()> {
    for name in IGNORED_HEADERS {
        req.headers.remove(*name);
    }

    for (name, value) in output {
        req.headers.insert(name.clone(), value.clone());
    }

    let host = HeaderValue::from_str(&req.host)?;
    req.headers.insert(header::HOST, host);

    Ok(())
}

fn canonical_query(req: &SigningRequest) -> String {
    let mut query = req.query.clone();
    // Sort by param name, then by value.
    query.sort();

    query
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                utf8_percent_encode(k, &AWS_QUERY_ENCODE_SET),
                utf8_percent_encode(v, &AWS_QUERY_ENCODE_SET)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn generate_signing_key(secret: &str, time: DateTime, region: &str, service: &str) -> Vec<u8> {
    // Sign secret
    let secret = format!("AWS4{secret}");
    // Sign date
    let sign_date = hmac_sha256(secret.as_bytes(), format_date(time).as_bytes());
    // Sign region
    let sign_region = hmac_sha256(sign_date.as_slice(), region.as_bytes());
    // Sign service
    let sign_service = hmac_sha256(sign_region.as_slice(), service.as_bytes());
    // Sign request
    hmac_sha256(sign_service.as_slice(), AWS4_REQUEST.as_bytes())
}
