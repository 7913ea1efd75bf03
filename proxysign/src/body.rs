//! Body type flowing through the proxy chain.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body as HttpBody, Frame, SizeHint};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};

/// Request and response body used by every [`Handle`](crate::Handle).
///
/// Wraps any [`HttpBody`] yielding [`Bytes`], so the host can hand
/// over its own streaming body and the middleware can hand a buffered one
/// downstream.
#[derive(Debug)]
pub struct Body(BoxBody<Bytes, anyhow::Error>);

impl Body {
    /// Wrap any body yielding [`Bytes`].
    pub fn new<B>(body: B) -> Self
    where
        B: HttpBody<Data = Bytes> + Send + Sync + 'static,
        B::Error: Into<anyhow::Error>,
    {
        Self(body.map_err(Into::into).boxed())
    }

    /// Create an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Empty::<Bytes>::new())
    }

    /// Create a buffered body from bytes.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::new(Full::new(data.into()))
    }

    /// Read the whole body into memory.
    pub async fn collect_bytes(self) -> anyhow::Result<Bytes> {
        Ok(self.0.collect().await?.to_bytes())
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Bytes> for Body {
    fn from(value: Bytes) -> Self {
        Self::from_bytes(value)
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Self::from_bytes(value)
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Self::from_bytes(value)
    }
}

impl From<&'static str> for Body {
    fn from(value: &'static str) -> Self {
        Self::from_bytes(value)
    }
}

impl HttpBody for Body {
    type Data = Bytes;
    type Error = anyhow::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.get_mut().0).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.0.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.0.size_hint()
    }
}
