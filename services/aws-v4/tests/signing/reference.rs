use super::{compare_request, sign_with_proxysign, RequestFn};
use anyhow::Result;
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{
    PayloadChecksumKind, PercentEncodingMode, SignableBody, SignableRequest, SigningSettings,
};
use aws_sigv4::sign::v4;
use http::{header, HeaderValue, Method, Request};
use proxysign_aws_v4::Credential;
use proxysign_core::time::now;
use sha2::{Digest, Sha256};
use std::time::SystemTime;

fn cases() -> Vec<(&'static str, RequestFn)> {
    vec![
        ("get_request", get_request),
        ("get_request_with_query", get_request_with_query),
        ("get_request_with_headers", get_request_with_headers),
        ("put_request", put_request),
        ("put_request_with_body_digest", put_request_with_body_digest),
        ("post_request_with_json", post_request_with_json),
    ]
}

fn get_request() -> Request<&'static str> {
    let mut req = Request::new("");
    *req.method_mut() = Method::GET;
    *req.uri_mut() = "http://127.0.0.1:9000/hello"
        .parse()
        .expect("url must be valid");
    req
}

fn get_request_with_query() -> Request<&'static str> {
    let mut req = Request::new("");
    *req.method_mut() = Method::GET;
    *req.uri_mut() =
        "http://127.0.0.1:9000/hello?list-type=2&max-keys=3&prefix=CI/&start-after=ExampleGuide.pdf"
            .parse()
            .expect("url must be valid");
    req
}

fn get_request_with_headers() -> Request<&'static str> {
    let mut req = get_request();
    req.headers_mut()
        .insert("x-amz-meta-owner", HeaderValue::from_static("  team   a "));
    req.headers_mut()
        .insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    req
}

fn put_request() -> Request<&'static str> {
    let content = "Hello,World!";
    let mut req = Request::new(content);
    *req.method_mut() = Method::PUT;
    *req.uri_mut() = "http://127.0.0.1:9000/hello"
        .parse()
        .expect("url must be valid");
    req.headers_mut().insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&content.len().to_string()).expect("must be valid"),
    );
    req
}

fn put_request_with_body_digest() -> Request<&'static str> {
    let mut req = put_request();
    let digest = hex::encode(Sha256::digest(req.body().as_bytes()));
    req.headers_mut().insert(
        "x-amz-content-sha256",
        HeaderValue::from_str(&digest).expect("must be valid"),
    );
    req
}

fn post_request_with_json() -> Request<&'static str> {
    let content = r#"{"query":{"match_all":{}}}"#;
    let mut req = Request::new(content);
    *req.method_mut() = Method::POST;
    *req.uri_mut() = "http://127.0.0.1:9200/index/_search?size=10"
        .parse()
        .expect("url must be valid");
    req.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    req
}

fn sign_with_aws_sigv4(
    service: &str,
    region: &str,
    token: Option<&str>,
    now: SystemTime,
    req_fn: RequestFn,
) -> Result<Request<&'static str>> {
    let mut req = req_fn();

    let mut ss = SigningSettings::default();
    if service == "s3" {
        ss.percent_encoding_mode = PercentEncodingMode::Single;
        ss.payload_checksum_kind = PayloadChecksumKind::XAmzSha256;
    } else {
        ss.percent_encoding_mode = PercentEncodingMode::Double;
        ss.payload_checksum_kind = PayloadChecksumKind::NoHeader;
    }

    let id = Credentials::new(
        "access_key_id",
        "secret_access_key",
        token.map(str::to_string),
        None,
        "hardcoded-credentials",
    )
    .into();
    let sp = v4::SigningParams::builder()
        .identity(&id)
        .region(region)
        .name(service)
        .time(now)
        .settings(ss)
        .build()?;

    let output = aws_sigv4::http_request::sign(
        SignableRequest::new(
            req.method().as_str(),
            req.uri().to_string(),
            req.headers()
                .iter()
                .map(|(k, v)| (k.as_str(), std::str::from_utf8(v.as_bytes()).unwrap())),
            SignableBody::Bytes(req.body().as_bytes()),
        )?,
        &sp.into(),
    )?;
    let (instructions, _) = output.into_parts();
    instructions.apply_to_request_http1x(&mut req);

    Ok(req)
}

async fn check(service: &str, region: &str, token: Option<&str>) -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    for (name, req_fn) in cases() {
        let now = now();

        let expected = sign_with_aws_sigv4(service, region, token, SystemTime::from(now), req_fn)?;

        let mut cred = Credential::new("access_key_id", "secret_access_key");
        if let Some(token) = token {
            cred = cred.with_session_token(token);
        }
        let actual = sign_with_proxysign(service, region, &cred, now, req_fn);

        compare_request(&format!("{service} {name}"), &expected, &actual);
    }

    Ok(())
}

#[tokio::test]
async fn test_s3() -> Result<()> {
    check("s3", "us-east-1", None).await
}

#[tokio::test]
async fn test_s3_with_token() -> Result<()> {
    check("s3", "us-east-1", Some("security_token")).await
}

#[tokio::test]
async fn test_es() -> Result<()> {
    check("es", "eu-central-1", None).await
}

#[tokio::test]
async fn test_es_with_token() -> Result<()> {
    check("es", "eu-central-1", Some("security_token")).await
}
