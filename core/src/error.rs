use std::fmt;
use thiserror::Error;

/// Error returned while loading credentials or signing a request.
///
/// Only the message is displayed. The kind tells callers how to react and
/// the optional source keeps the lower level failure for debugging.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<anyhow::Error>,
}

/// ErrorKind classifies an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The credential is missing a field or was rejected as malformed.
    CredentialInvalid,
    /// The credential is past its expiration.
    CredentialExpired,
    /// The credential source refused to hand out a credential.
    CredentialDenied,
    /// The request can't be signed as is, for example it has no host.
    RequestInvalid,
    /// A setting is missing or points at something that doesn't exist.
    ConfigInvalid,
    /// Anything else: network, body reads, malformed responses.
    Unexpected,
}

impl Error {
    /// Build an error of `kind`.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the error that caused this one.
    pub fn with_source(self, source: impl Into<anyhow::Error>) -> Self {
        Error {
            source: Some(source.into()),
            ..self
        }
    }

    /// Kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Whether the failure comes from the credential itself.
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::CredentialInvalid
                | ErrorKind::CredentialExpired
                | ErrorKind::CredentialDenied
        )
    }

    /// Shorthand for [`ErrorKind::CredentialInvalid`].
    pub fn credential_invalid(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::CredentialInvalid, message)
    }

    /// Shorthand for [`ErrorKind::CredentialExpired`].
    pub fn credential_expired(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::CredentialExpired, message)
    }

    /// Shorthand for [`ErrorKind::CredentialDenied`].
    pub fn credential_denied(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::CredentialDenied, message)
    }

    /// Shorthand for [`ErrorKind::RequestInvalid`].
    pub fn request_invalid(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::RequestInvalid, message)
    }

    /// Shorthand for [`ErrorKind::ConfigInvalid`].
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::ConfigInvalid, message)
    }

    /// Shorthand for [`ErrorKind::Unexpected`].
    pub fn unexpected(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::CredentialInvalid => "credential invalid",
            ErrorKind::CredentialExpired => "credential expired",
            ErrorKind::CredentialDenied => "credential denied",
            ErrorKind::RequestInvalid => "request invalid",
            ErrorKind::ConfigInvalid => "config invalid",
            ErrorKind::Unexpected => "unexpected",
        };
        f.write_str(s)
    }
}

/// Result carrying an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::ToStrError> for Error {
    fn from(err: http::header::ToStrError) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}
