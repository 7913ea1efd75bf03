mod default;
pub use default::DefaultCredentialProvider;

mod env;
pub use env::EnvCredentialProvider;

mod imds;
pub use imds::IMDSv2CredentialProvider;

mod r#static;
pub use r#static::StaticCredentialProvider;

mod utils;
