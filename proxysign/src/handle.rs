use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use http::{Request, Response};

use crate::Body;

/// Handle is one stage of a proxy chain.
///
/// A stage receives the request, may act on it and either answers itself or
/// delegates to the next stage. Failures are expressed as responses, never as
/// errors, so every stage can be composed with any other.
#[async_trait]
pub trait Handle: Send + Sync + 'static {
    /// Handle a request and produce its response.
    async fn handle(&self, req: Request<Body>) -> Response<Body>;
}

#[async_trait]
impl<H: Handle + ?Sized> Handle for Arc<H> {
    async fn handle(&self, req: Request<Body>) -> Response<Body> {
        self.as_ref().handle(req).await
    }
}

/// Create a [`Handle`] from an async closure.
///
/// ```
/// use http::Response;
/// use proxysign::{handle_fn, Body};
///
/// let next = handle_fn(|_req| async { Response::new(Body::from("ok")) });
/// ```
pub fn handle_fn<F, Fut>(f: F) -> HandleFn<F>
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response<Body>> + Send + 'static,
{
    HandleFn(f)
}

/// [`Handle`] returned by [`handle_fn`].
#[derive(Clone)]
pub struct HandleFn<F>(F);

impl<F> std::fmt::Debug for HandleFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleFn").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> Handle for HandleFn<F>
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response<Body>> + Send + 'static,
{
    async fn handle(&self, req: Request<Body>) -> Response<Body> {
        (self.0)(req).await
    }
}

/// Deadline of a request, carried in its extensions.
///
/// Stages check it before starting work: once it has passed, nobody is
/// waiting for the answer anymore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(pub Instant);

impl Deadline {
    /// Deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now() + timeout)
    }

    /// Check if this deadline has already passed.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.0
    }
}
