//! Core components for signing proxied requests.
//!
//! This crate provides the foundational types and traits shared by the proxysign
//! crates. It does not know about any particular cloud service: service crates
//! build their credentials and signers on top of it.
//!
//! ## Overview
//!
//! The crate is built around a few key concepts:
//!
//! - **Context**: A container that holds implementations for HTTP sending and environment access
//! - **Traits**: Abstract interfaces for credential loading ([`ProvideCredential`]) and credential validation ([`SigningCredential`])
//! - **Chain**: [`ProvideCredentialChain`] tries several credential providers in order
//!
//! ## Example
//!
//! ```no_run
//! use async_trait::async_trait;
//! use proxysign_core::{Context, OsEnv, ProvideCredential, Result, SigningCredential};
//!
//! #[derive(Clone, Debug)]
//! struct MyCredential {
//!     key: String,
//!     secret: String,
//! }
//!
//! impl SigningCredential for MyCredential {
//!     fn is_valid(&self) -> bool {
//!         !self.key.is_empty() && !self.secret.is_empty()
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct MyProvider;
//!
//! #[async_trait]
//! impl ProvideCredential for MyProvider {
//!     type Credential = MyCredential;
//!
//!     async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
//!         let (Some(key), Some(secret)) = (ctx.env_var("MY_KEY"), ctx.env_var("MY_SECRET")) else {
//!             return Ok(None);
//!         };
//!         Ok(Some(MyCredential { key, secret }))
//!     }
//! }
//!
//! # async fn example() -> Result<()> {
//! let ctx = Context::new().with_env(OsEnv);
//! let cred = MyProvider.provide_credential(&ctx).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Utilities
//!
//! - [`hash`]: Cryptographic hashing utilities
//! - [`time`]: Time formatting and parsing utilities
//! - [`utils`]: General utilities including data redaction

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod context;
pub use context::{Context, Env, HttpSend, NoopEnv, NoopHttpSend, OsEnv, StaticEnv};

mod error;
pub use error::{Error, ErrorKind, Result};

mod api;
pub use api::{ProvideCredential, SigningCredential};
mod chain;
pub use chain::ProvideCredentialChain;
mod request;
pub use request::SigningRequest;
