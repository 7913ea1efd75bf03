use http::StatusCode;
use proxysign_core::Error;

/// Map a failed instance metadata response into an error.
///
/// `operation` names the step that failed, it ends up in the message.
pub fn parse_imds_error(operation: &str, status: StatusCode, body: &str) -> Error {
    let message = format!("IMDS {operation} failed with status {status}: {}", body.trim());

    match status {
        StatusCode::BAD_REQUEST => Error::request_invalid(message),
        StatusCode::UNAUTHORIZED => Error::credential_invalid(message),
        StatusCode::FORBIDDEN => Error::credential_denied(message),
        // No role attached, or not an EC2 instance at all.
        StatusCode::NOT_FOUND => Error::config_invalid(message),
        _ => Error::unexpected(message),
    }
}
