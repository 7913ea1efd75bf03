//! AWS SigV4 signing for proxied requests.
//!
//! This crate signs requests for AWS services with [Signature Version 4].
//! It contains three pieces:
//!
//! - [`endpoints`]: the service/region catalog used to reject misconfiguration
//!   before any request is signed.
//! - [`RequestSigner`]: computes the signature headers of a request.
//! - Credential providers: [`EnvCredentialProvider`], [`StaticCredentialProvider`],
//!   [`IMDSv2CredentialProvider`] and the [`DefaultCredentialProvider`] chain.
//!
//! ## Example
//!
//! ```no_run
//! use proxysign_aws_v4::{endpoints, Credential, EnvCredentialProvider, RequestSigner};
//! use proxysign_core::time::now;
//! use proxysign_core::{Context, OsEnv, ProvideCredential};
//!
//! # async fn example() -> anyhow::Result<()> {
//! endpoints::validate("eu-central-1", "es")?;
//!
//! let ctx = Context::new().with_env(OsEnv);
//! let cred: Credential = EnvCredentialProvider::new()
//!     .provide_credential(&ctx)
//!     .await?
//!     .expect("credential must be set");
//!
//! let (mut parts, body) = http::Request::builder()
//!     .method("POST")
//!     .uri("https://search.eu-central-1.es.amazonaws.com/index/_doc")
//!     .body(b"{}".to_vec())?
//!     .into_parts();
//!
//! let signer = RequestSigner::new("es", "eu-central-1");
//! let headers = signer.sign(&parts, &body, &cred, now())?;
//! parts.headers.extend(headers);
//! # Ok(())
//! # }
//! ```
//!
//! [Signature Version 4]: https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

mod constants;
pub use constants::{AWS_DEFAULT_REGION, AWS_REGION};

mod credential;
pub use credential::Credential;

pub mod endpoints;
pub use endpoints::{validate, Catalog, ValidationError};

mod sign_request;
pub use sign_request::RequestSigner;

mod provide_credential;
pub use provide_credential::*;
