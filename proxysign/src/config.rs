use proxysign_aws_v4::{endpoints, AWS_DEFAULT_REGION, AWS_REGION};
use proxysign_core::Context;
use serde::Deserialize;

use crate::ConfigError;

/// Config of a signing middleware, deserialized from the host's config.
///
/// ```
/// use proxysign::Config;
///
/// let cfg: Config = serde_json::from_str(r#"{"service": "es", "region": "eu-central-1"}"#).unwrap();
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Clone, Default, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Endpoint prefix of the AWS service, for example `es` or `s3`.
    pub service: String,
    /// Region code, for example `eu-central-1`.
    pub region: String,
}

impl Config {
    /// Create a config for the given service and region.
    pub fn new(service: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            region: region.into(),
        }
    }

    /// Fill an empty region from `AWS_REGION`, then `AWS_DEFAULT_REGION`.
    pub fn from_env(mut self, ctx: &Context) -> Self {
        if self.region.is_empty() {
            if let Some(v) = ctx
                .env_var(AWS_REGION)
                .or_else(|| ctx.env_var(AWS_DEFAULT_REGION))
            {
                self.region = v;
            }
        }

        self
    }

    /// Check that both fields are set and name a known endpoint.
    ///
    /// `service` is checked before `region`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.is_empty() {
            return Err(ConfigError::EmptyService);
        }
        if self.region.is_empty() {
            return Err(ConfigError::EmptyRegion);
        }

        endpoints::validate(&self.region, &self.service)?;
        Ok(())
    }
}
