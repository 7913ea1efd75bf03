//! Cross-check signatures against the `aws-sigv4` reference implementation.

mod reference;

use http::Request;
use proxysign_aws_v4::{Credential, RequestSigner};
use proxysign_core::time::DateTime;

/// Request builder shared by every case.
pub type RequestFn = fn() -> Request<&'static str>;

/// Sign with proxysign and apply the headers onto a fresh request.
pub fn sign_with_proxysign(
    service: &str,
    region: &str,
    cred: &Credential,
    now: DateTime,
    req_fn: RequestFn,
) -> Request<&'static str> {
    let (mut parts, body) = req_fn().into_parts();

    let headers = RequestSigner::new(service, region)
        .sign(&parts, body.as_bytes(), cred, now)
        .expect("sign must succeed");
    for (name, value) in headers.iter() {
        parts.headers.insert(name.clone(), value.clone());
    }

    Request::from_parts(parts, body)
}

#[track_caller]
pub fn compare_request(name: &str, l: &Request<&str>, r: &Request<&str>) {
    fn format_headers(req: &Request<&str>) -> Vec<String> {
        let mut hs = req
            .headers()
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v.to_str().expect("must be valid")))
            .collect::<Vec<_>>();
        hs.sort();
        hs
    }

    pretty_assertions::assert_eq!(
        format_headers(l),
        format_headers(r),
        "{name} header mismatch"
    );
    assert_eq!(l.uri(), r.uri(), "{name} uri mismatch");
    assert_eq!(l.method(), r.method(), "{name} method mismatch");
}
