use proxysign_aws_v4::ValidationError;
use thiserror::Error;

/// Errors returned when a [`SigningMiddleware`](crate::SigningMiddleware)
/// cannot be built from its [`Config`](crate::Config).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `service` is empty.
    #[error("service cannot be empty")]
    EmptyService,
    /// `region` is empty.
    #[error("region cannot be empty")]
    EmptyRegion,
    /// The service/region pair is not a known endpoint.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
