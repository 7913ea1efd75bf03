//! Sign proxied requests with AWS SigV4.
//!
//! proxysign provides [`SigningMiddleware`], a stage of a proxy chain that
//! signs every request it sees for a configured AWS service and region and
//! then hands it to the next stage. The upstream caller never deals with
//! signing.
//!
//! ## Example
//!
//! ```no_run
//! use http::{Request, Response};
//! use proxysign::{handle_fn, Body, Config, Handle, SigningMiddleware};
//!
//! # async fn example() -> anyhow::Result<()> {
//! // The stage that actually forwards requests to the service.
//! let upstream = handle_fn(|_req: Request<Body>| async { Response::new(Body::empty()) });
//!
//! let signer = SigningMiddleware::new(Config::new("es", "eu-central-1"), upstream, "aws-signer")?;
//!
//! let req = Request::builder()
//!     .method("POST")
//!     .uri("https://search.eu-central-1.es.amazonaws.com/index/_doc")
//!     .body(Body::from(r#"{"title":"hello"}"#))?;
//! let resp = signer.handle(req).await;
//! # Ok(())
//! # }
//! ```
//!
//! Credentials come from `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and
//! `AWS_SESSION_TOKEN` unless another provider is set with
//! [`SigningMiddleware::with_credential_provider`].

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

mod body;
pub use body::Body;

mod config;
pub use config::Config;

mod error;
pub use error::ConfigError;

mod handle;
pub use handle::{handle_fn, Deadline, Handle, HandleFn};

mod middleware;
pub use middleware::SigningMiddleware;
