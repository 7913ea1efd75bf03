use crate::constants::{AWS_EC2_METADATA_DISABLED, AWS_EC2_METADATA_SERVICE_ENDPOINT};
use crate::provide_credential::utils::parse_imds_error;
use crate::Credential;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::Method;
use log::debug;
use proxysign_core::time::{now, parse_rfc3339, DateTime};
use proxysign_core::{Context, Error, ProvideCredential, Result};
use serde::Deserialize;
use std::sync::{Arc, Mutex};

const DEFAULT_ENDPOINT: &str = "http://169.254.169.254";
// 21600s (6h) is recommended by AWS.
const TOKEN_TTL_SECONDS: i64 = 21600;
// Refresh the token 10 minutes before it expires.
const TOKEN_REFRESH_BUFFER_SECONDS: i64 = 600;

/// IMDSv2CredentialProvider loads the role credentials of an EC2 instance
/// from the instance metadata service.
///
/// The session token is cached until shortly before it expires, the
/// credentials themselves are fetched on every call.
#[derive(Debug, Clone)]
pub struct IMDSv2CredentialProvider {
    endpoint: Option<String>,
    token: Arc<Mutex<(String, DateTime)>>,
}

impl Default for IMDSv2CredentialProvider {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: Arc::new(Mutex::new((String::new(), DateTime::default()))),
        }
    }
}

impl IMDSv2CredentialProvider {
    /// Create a new `IMDSv2CredentialProvider` instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint for the metadata service.
    ///
    /// Takes precedence over `AWS_EC2_METADATA_SERVICE_ENDPOINT`.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    fn get_endpoint(&self, ctx: &Context) -> String {
        let endpoint = self.endpoint.clone().unwrap_or_else(|| {
            ctx.env_var(AWS_EC2_METADATA_SERVICE_ENDPOINT)
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
        });

        endpoint.trim_end_matches('/').to_string()
    }

    async fn load_ec2_metadata_token(&self, ctx: &Context, endpoint: &str) -> Result<String> {
        {
            let (token, expires_in) = self.token.lock().expect("lock poisoned").clone();
            if expires_in > now() {
                return Ok(token);
            }
        }

        let url = format!("{endpoint}/latest/api/token");
        let req = http::Request::builder()
            .uri(&url)
            .method(Method::PUT)
            .header(CONTENT_LENGTH, "0")
            .header(
                "x-aws-ec2-metadata-token-ttl-seconds",
                TOKEN_TTL_SECONDS.to_string(),
            )
            .body(Bytes::new())?;

        let resp = ctx.http_send_as_string(req).await?;
        if resp.status() != http::StatusCode::OK {
            return Err(parse_imds_error(
                "fetch_token",
                resp.status(),
                resp.body(),
            ));
        }
        let ec2_token = resp.into_body();
        let expires_in = now()
            + chrono::TimeDelta::try_seconds(TOKEN_TTL_SECONDS - TOKEN_REFRESH_BUFFER_SECONDS)
                .expect("in bounds");

        {
            *self.token.lock().expect("lock poisoned") = (ec2_token.clone(), expires_in);
        }

        Ok(ec2_token)
    }

    async fn get(&self, ctx: &Context, url: &str, token: &str, operation: &str) -> Result<String> {
        let req = http::Request::builder()
            .uri(url)
            .method(Method::GET)
            .header("x-aws-ec2-metadata-token", token)
            .body(Bytes::new())?;

        let resp = ctx.http_send_as_string(req).await?;
        if resp.status() != http::StatusCode::OK {
            return Err(parse_imds_error(operation, resp.status(), resp.body()));
        }

        Ok(resp.into_body())
    }
}

#[async_trait]
impl ProvideCredential for IMDSv2CredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        if ctx.env_var(AWS_EC2_METADATA_DISABLED).as_deref() == Some("true") {
            debug!("instance metadata is disabled, skip");
            return Ok(None);
        }

        let endpoint = self.get_endpoint(ctx);
        let token = self.load_ec2_metadata_token(ctx, &endpoint).await?;

        // List all credentials that node has.
        let url = format!("{endpoint}/latest/meta-data/iam/security-credentials/");
        let profiles = self
            .get(ctx, &url, &token, "list_instance_profiles")
            .await?;

        let Some(profile_name) = profiles.lines().map(str::trim).find(|v| !v.is_empty()) else {
            return Err(Error::config_invalid(
                "no IAM role attached to EC2 instance",
            ));
        };

        // Get the credentials via role_name.
        let url = format!("{endpoint}/latest/meta-data/iam/security-credentials/{profile_name}");
        let content = self.get(ctx, &url, &token, "fetch_credentials").await?;

        let resp: Ec2MetadataIamSecurityCredentials =
            serde_json::from_str(&content).map_err(|e| {
                Error::unexpected(format!(
                    "failed to parse IMDS credentials of role {profile_name}"
                ))
                .with_source(e)
            })?;

        match resp.code.as_str() {
            "Success" => {}
            "AssumeRoleUnauthorizedAccess" => {
                return Err(Error::credential_denied(format!(
                    "EC2 instance not authorized to assume role {profile_name}: {}",
                    resp.message
                )));
            }
            code if code.contains("Expired") => {
                return Err(Error::credential_expired(format!(
                    "IMDS credentials expired: {}",
                    resp.message
                )));
            }
            _ => {
                return Err(Error::unexpected(format!(
                    "IMDS returned error: [{}] {}",
                    resp.code, resp.message
                )));
            }
        }

        let cred = Credential {
            access_key_id: resp.access_key_id,
            secret_access_key: resp.secret_access_key,
            session_token: Some(resp.token),
            expires_in: Some(parse_rfc3339(&resp.expiration)?),
        };

        Ok(Some(cred))
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Ec2MetadataIamSecurityCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: String,
    expiration: String,

    code: String,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use pretty_assertions::assert_eq;
    use proxysign_core::{ErrorKind, HttpSend, StaticEnv};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CREDENTIALS: &str = r#"{
        "Code": "Success",
        "LastUpdated": "2024-01-01T00:00:00Z",
        "Type": "AWS-HMAC",
        "AccessKeyId": "ASIAEXAMPLE",
        "SecretAccessKey": "imds_secret",
        "Token": "imds_token",
        "Expiration": "2124-01-01T06:00:00Z"
    }"#;

    /// Fake metadata service answering from canned responses.
    #[derive(Debug, Clone)]
    struct MockImds {
        role: (StatusCode, &'static str),
        credentials: (StatusCode, &'static str),
        token_requests: Arc<AtomicUsize>,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl MockImds {
        fn new(credentials: &'static str) -> Self {
            Self {
                role: (StatusCode::OK, "my-role\n"),
                credentials: (StatusCode::OK, credentials),
                token_requests: Arc::default(),
                requests: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl HttpSend for MockImds {
        async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
            self.requests.lock().unwrap().push(req.uri().to_string());

            let (status, body) = match (req.method(), req.uri().path()) {
                (&Method::PUT, "/latest/api/token") => {
                    assert_eq!(
                        req.headers()["x-aws-ec2-metadata-token-ttl-seconds"],
                        "21600"
                    );
                    self.token_requests.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::OK, "session-token")
                }
                (&Method::GET, "/latest/meta-data/iam/security-credentials/") => {
                    assert_eq!(req.headers()["x-aws-ec2-metadata-token"], "session-token");
                    self.role
                }
                (&Method::GET, "/latest/meta-data/iam/security-credentials/my-role") => {
                    assert_eq!(req.headers()["x-aws-ec2-metadata-token"], "session-token");
                    self.credentials
                }
                _ => (StatusCode::NOT_FOUND, "not found"),
            };

            Ok(http::Response::builder()
                .status(status)
                .body(Bytes::from_static(body.as_bytes()))
                .expect("response must be valid"))
        }
    }

    fn context(imds: &MockImds, envs: &[(&str, &str)]) -> Context {
        Context::new()
            .with_http_send(imds.clone())
            .with_env(StaticEnv::from_pairs(envs.iter().copied()))
    }

    #[tokio::test]
    async fn test_imds_credential_provider() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();

        let imds = MockImds::new(CREDENTIALS);
        let ctx = context(&imds, &[]);
        let provider = IMDSv2CredentialProvider::new();

        let cred = provider
            .provide_credential(&ctx)
            .await?
            .expect("credential must be loaded");
        assert_eq!(cred.access_key_id, "ASIAEXAMPLE");
        assert_eq!(cred.secret_access_key, "imds_secret");
        assert_eq!(cred.session_token.as_deref(), Some("imds_token"));
        assert_eq!(
            cred.expires_in,
            Some(parse_rfc3339("2124-01-01T06:00:00Z")?)
        );
        assert_eq!(
            imds.requests.lock().unwrap()[0],
            "http://169.254.169.254/latest/api/token"
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_imds_token_is_cached() -> anyhow::Result<()> {
        let imds = MockImds::new(CREDENTIALS);
        let ctx = context(&imds, &[]);
        let provider = IMDSv2CredentialProvider::new();

        provider.provide_credential(&ctx).await?;
        provider.provide_credential(&ctx).await?;

        assert_eq!(imds.token_requests.load(Ordering::SeqCst), 1);
        // token, role, credentials, role, credentials
        assert_eq!(imds.requests.lock().unwrap().len(), 5);

        Ok(())
    }

    #[tokio::test]
    async fn test_imds_endpoint_override() -> anyhow::Result<()> {
        let imds = MockImds::new(CREDENTIALS);

        let ctx = context(
            &imds,
            &[(AWS_EC2_METADATA_SERVICE_ENDPOINT, "http://[fd00:ec2::254]/")],
        );
        IMDSv2CredentialProvider::new()
            .provide_credential(&ctx)
            .await?;
        assert_eq!(
            imds.requests.lock().unwrap()[0],
            "http://[fd00:ec2::254]/latest/api/token"
        );

        imds.requests.lock().unwrap().clear();
        IMDSv2CredentialProvider::new()
            .with_endpoint("http://127.0.0.1:1338")
            .provide_credential(&ctx)
            .await?;
        assert_eq!(
            imds.requests.lock().unwrap()[0],
            "http://127.0.0.1:1338/latest/api/token"
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_imds_disabled() -> anyhow::Result<()> {
        let imds = MockImds::new(CREDENTIALS);
        let ctx = context(&imds, &[(AWS_EC2_METADATA_DISABLED, "true")]);

        let cred = IMDSv2CredentialProvider::new()
            .provide_credential(&ctx)
            .await?;
        assert!(cred.is_none());
        assert!(imds.requests.lock().unwrap().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_imds_without_role() {
        let imds = MockImds {
            role: (StatusCode::OK, ""),
            ..MockImds::new(CREDENTIALS)
        };
        let ctx = context(&imds, &[]);

        let err = IMDSv2CredentialProvider::new()
            .provide_credential(&ctx)
            .await
            .expect_err("must fail without role");
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[tokio::test]
    async fn test_imds_role_not_found() {
        let imds = MockImds {
            credentials: (StatusCode::NOT_FOUND, "not found"),
            ..MockImds::new(CREDENTIALS)
        };
        let ctx = context(&imds, &[]);

        let err = IMDSv2CredentialProvider::new()
            .provide_credential(&ctx)
            .await
            .expect_err("must fail on 404");
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert!(err.to_string().contains("fetch_credentials"));
    }

    #[tokio::test]
    async fn test_imds_error_codes() {
        let cases: [(&'static str, ErrorKind); 3] = [
            (
                r#"{"Code": "AssumeRoleUnauthorizedAccess", "Message": "denied"}"#,
                ErrorKind::CredentialDenied,
            ),
            (
                r#"{"Code": "CredentialsExpired", "Message": "expired"}"#,
                ErrorKind::CredentialExpired,
            ),
            (
                r#"{"Code": "InternalError", "Message": "boom"}"#,
                ErrorKind::Unexpected,
            ),
        ];

        for (body, kind) in cases {
            let imds = MockImds::new(body);
            let ctx = context(&imds, &[]);

            let err = IMDSv2CredentialProvider::new()
                .provide_credential(&ctx)
                .await
                .expect_err("must fail on error code");
            assert_eq!(err.kind(), kind, "{body}");
        }
    }

    #[tokio::test]
    async fn test_imds_invalid_json() {
        let imds = MockImds::new("<html>");
        let ctx = context(&imds, &[]);

        let err = IMDSv2CredentialProvider::new()
            .provide_credential(&ctx)
            .await
            .expect_err("must fail on invalid json");
        assert_eq!(err.kind(), ErrorKind::Unexpected);
    }
}
