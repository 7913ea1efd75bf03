use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{Error, Result};

/// Context is everything a credential provider may reach outside itself:
/// an http client and the environment.
///
/// Nothing is wired in by default. A fresh context can't send requests and
/// sees an empty environment, so tests never leak into the host.
///
/// ```
/// use proxysign_core::{Context, StaticEnv};
///
/// let ctx = Context::new().with_env(StaticEnv::from_pairs([("AWS_REGION", "eu-central-1")]));
/// assert_eq!(ctx.env_var("AWS_REGION").as_deref(), Some("eu-central-1"));
/// ```
#[derive(Clone)]
pub struct Context {
    http: Arc<dyn HttpSend>,
    env: Arc<dyn Env>,
}

impl Context {
    /// Context without http client and with an empty environment.
    pub fn new() -> Self {
        Context {
            http: Arc::new(NoopHttpSend),
            env: Arc::new(NoopEnv),
        }
    }

    /// Use `http` to send requests.
    pub fn with_http_send(self, http: impl HttpSend) -> Self {
        Context {
            http: Arc::new(http),
            ..self
        }
    }

    /// Read variables from `env`.
    pub fn with_env(self, env: impl Env) -> Self {
        Context {
            env: Arc::new(env),
            ..self
        }
    }

    /// Send `req` with the configured client.
    #[inline]
    pub async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        self.http.http_send(req).await
    }

    /// Like [`Context::http_send`], decoding the body as lossy utf-8.
    pub async fn http_send_as_string(
        &self,
        req: http::Request<Bytes>,
    ) -> Result<http::Response<String>> {
        let resp = self.http.http_send(req).await?;
        Ok(resp.map(|body| String::from_utf8_lossy(&body).into_owned()))
    }

    /// Value of `key`, `None` when unset or not utf-8.
    #[inline]
    pub fn env_var(&self, key: &str) -> Option<String> {
        self.env.var(key)
    }

    /// Every variable visible to this context.
    #[inline]
    pub fn env_vars(&self) -> HashMap<String, String> {
        self.env.vars()
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("http", &self.http)
            .field("env", &self.env)
            .finish()
    }
}

/// HttpSend sends the few requests credential providers need, for example
/// to the EC2 instance metadata service.
///
/// Signed requests never go through it.
#[async_trait]
pub trait HttpSend: Debug + Send + Sync + 'static {
    /// Send `req` and wait for the whole response.
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>>;
}

/// Env gives read access to environment variables.
pub trait Env: Debug + Send + Sync + 'static {
    /// Value of `key`, `None` when unset or not utf-8.
    fn var(&self, key: &str) -> Option<String>;

    /// Every variable with a utf-8 name and value.
    fn vars(&self) -> HashMap<String, String>;
}

/// Env of the running process.
#[derive(Debug, Copy, Clone)]
pub struct OsEnv;

impl Env for OsEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn vars(&self) -> HashMap<String, String> {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }
}

/// Env backed by a fixed map, mostly for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticEnv {
    /// Variables of this env.
    pub envs: HashMap<String, String>,
}

impl StaticEnv {
    /// Build from `(name, value)` pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let envs = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        StaticEnv { envs }
    }
}

impl Env for StaticEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.envs.get(key).cloned()
    }

    fn vars(&self) -> HashMap<String, String> {
        self.envs.clone()
    }
}

/// HttpSend that fails every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHttpSend;

#[async_trait]
impl HttpSend for NoopHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        Err(Error::unexpected(format!(
            "no http client configured to send {} {}",
            req.method(),
            req.uri()
        )))
    }
}

/// Env without any variable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEnv;

impl Env for NoopEnv {
    fn var(&self, _: &str) -> Option<String> {
        None
    }

    fn vars(&self) -> HashMap<String, String> {
        HashMap::new()
    }
}
