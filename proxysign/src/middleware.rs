use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use http::header::{AUTHORIZATION, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderValue, Request, Response, StatusCode};
use log::{debug, warn};
use proxysign_aws_v4::{Credential, EnvCredentialProvider, RequestSigner};
use proxysign_core::time::now;
use proxysign_core::utils::Redact;
use proxysign_core::{Context, Error, OsEnv, ProvideCredential, Result};

use crate::{Body, Config, ConfigError, Deadline, Handle};

/// SigningMiddleware signs every request with AWS SigV4 before handing it to
/// the next stage.
///
/// Credentials are fetched from the configured provider for every request,
/// so rotated credentials are used as soon as the provider returns them.
pub struct SigningMiddleware<N> {
    name: String,
    signer: RequestSigner,
    next: N,

    ctx: Context,
    provider: Arc<dyn ProvideCredential<Credential = Credential>>,
}

impl<N: Handle> SigningMiddleware<N> {
    /// Create a new middleware named `name` in front of `next`.
    ///
    /// The config is validated here, an invalid one never serves requests.
    /// Credentials are read from the process environment by default, see
    /// [`SigningMiddleware::with_credential_provider`].
    pub fn new(
        config: Config,
        next: N,
        name: impl Into<String>,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let name = name.into();
        debug!(
            "signing middleware {name} created for service {} in region {}",
            config.service, config.region
        );

        Ok(Self {
            name,
            signer: RequestSigner::new(&config.service, &config.region),
            next,

            ctx: Context::new().with_env(OsEnv),
            provider: Arc::new(EnvCredentialProvider::new()),
        })
    }

    /// Replace the context used to load credentials.
    pub fn with_context(mut self, ctx: Context) -> Self {
        self.ctx = ctx;
        self
    }

    /// Replace the credential provider.
    pub fn with_credential_provider(
        mut self,
        provider: impl ProvideCredential<Credential = Credential>,
    ) -> Self {
        self.provider = Arc::new(provider);
        self
    }

    /// Name of this middleware.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Service requests are signed for.
    pub fn service(&self) -> &str {
        self.signer.service()
    }

    /// Region requests are signed for.
    pub fn region(&self) -> &str {
        self.signer.region()
    }

    async fn sign(&self, req: Request<Body>) -> Result<Request<Body>> {
        let cred = self
            .provider
            .provide_credential(&self.ctx)
            .await?
            .ok_or_else(|| Error::credential_invalid("no valid credential found"))?;

        let (mut parts, body) = req.into_parts();
        let body = body.collect_bytes().await.map_err(|e| {
            Error::unexpected(format!("error reading request's body: {e}")).with_source(e)
        })?;

        let headers = self
            .signer
            .sign(&parts, &body, &cred, now())
            .map_err(|e| {
                Error::new(e.kind(), format!("error signing the request: {e}")).with_source(e)
            })?;
        for (name, value) in headers.iter() {
            parts.headers.insert(name.clone(), value.clone());
        }

        Ok(Request::from_parts(parts, Body::from(body)))
    }
}

#[async_trait]
impl<N: Handle> Handle for SigningMiddleware<N> {
    async fn handle(&self, req: Request<Body>) -> Response<Body> {
        if deadline_exceeded(&req) {
            warn!("{}: request deadline exceeded before signing", self.name);
            return error_response(StatusCode::GATEWAY_TIMEOUT, "request deadline exceeded");
        }

        let req = match self.sign(req).await {
            Ok(req) => req,
            Err(err) => {
                warn!("{}: failed to sign request: {err}", self.name);
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string());
            }
        };

        // Loading credentials may have taken the rest of the budget.
        if deadline_exceeded(&req) {
            warn!("{}: request deadline exceeded before forwarding", self.name);
            return error_response(StatusCode::GATEWAY_TIMEOUT, "request deadline exceeded");
        }

        debug!(
            "{}: signed {} {} with {:?}",
            self.name,
            req.method(),
            req.uri(),
            req.headers().get(AUTHORIZATION).map(Redact::from)
        );
        self.next.handle(req).await
    }
}

impl<N> Debug for SigningMiddleware<N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningMiddleware")
            .field("name", &self.name)
            .field("signer", &self.signer)
            .field("ctx", &self.ctx)
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

fn deadline_exceeded(req: &Request<Body>) -> bool {
    req.extensions()
        .get::<Deadline>()
        .is_some_and(Deadline::is_expired)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response<Body> {
    let mut resp = Response::new(Body::from(message.into()));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    resp.headers_mut()
        .insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    resp
}
