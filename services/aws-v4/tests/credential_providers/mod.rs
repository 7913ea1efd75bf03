use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, StatusCode};
use proxysign_aws_v4::{
    DefaultCredentialProvider, EnvCredentialProvider, IMDSv2CredentialProvider,
    StaticCredentialProvider,
};
use proxysign_core::{Context, HttpSend, ProvideCredential, ProvideCredentialChain, StaticEnv};

/// Instance metadata service that always hands out the same role.
#[derive(Debug)]
struct FakeImds;

#[async_trait]
impl HttpSend for FakeImds {
    async fn http_send(
        &self,
        req: http::Request<Bytes>,
    ) -> proxysign_core::Result<http::Response<Bytes>> {
        let body = match (req.method(), req.uri().path()) {
            (&Method::PUT, "/latest/api/token") => "token".to_string(),
            (&Method::GET, "/latest/meta-data/iam/security-credentials/") => "role".to_string(),
            (&Method::GET, "/latest/meta-data/iam/security-credentials/role") => {
                r#"{"Code":"Success","AccessKeyId":"imds_ak","SecretAccessKey":"imds_sk","Token":"imds_token","Expiration":"2124-01-01T00:00:00Z"}"#.to_string()
            }
            _ => {
                return Ok(http::Response::builder()
                    .status(StatusCode::NOT_FOUND)
                    .body(Bytes::new())?)
            }
        };

        Ok(http::Response::new(Bytes::from(body)))
    }
}

#[tokio::test]
async fn test_default_provider_prefers_env() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let ctx = Context::new()
        .with_http_send(FakeImds)
        .with_env(StaticEnv::from_pairs([
            ("AWS_ACCESS_KEY_ID", "env_ak"),
            ("AWS_SECRET_ACCESS_KEY", "env_sk"),
        ]));

    let cred = DefaultCredentialProvider::new()
        .provide_credential(&ctx)
        .await?
        .expect("credential must be loaded");
    assert_eq!(cred.access_key_id, "env_ak");
    assert!(cred.session_token.is_none());

    Ok(())
}

#[tokio::test]
async fn test_default_provider_falls_back_to_imds() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let ctx = Context::new()
        .with_http_send(FakeImds)
        .with_env(StaticEnv::default());

    let cred = DefaultCredentialProvider::new()
        .provide_credential(&ctx)
        .await?
        .expect("credential must be loaded");
    assert_eq!(cred.access_key_id, "imds_ak");
    assert_eq!(cred.secret_access_key, "imds_sk");
    assert_eq!(cred.session_token.as_deref(), Some("imds_token"));
    assert!(cred.expires_in.is_some());

    Ok(())
}

#[tokio::test]
async fn test_chain_skips_failing_provider() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    // No http client: the metadata provider errors and the chain moves on.
    let ctx = Context::new().with_env(StaticEnv::default());

    let chain = ProvideCredentialChain::new()
        .push(EnvCredentialProvider::new())
        .push(IMDSv2CredentialProvider::new())
        .push(StaticCredentialProvider::new("static_ak", "static_sk"));
    assert_eq!(chain.len(), 3);

    let cred = chain
        .provide_credential(&ctx)
        .await?
        .expect("credential must be loaded");
    assert_eq!(cred.access_key_id, "static_ak");

    Ok(())
}
