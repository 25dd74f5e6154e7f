/// Credential extraction from the `Authorization` header.
///
/// The prefix match is exact: scheme case, the single separating space and
/// the token itself are taken as-is with no trimming.

use actix_web::http::header::{HeaderMap, AUTHORIZATION};

use crate::error::AuthError;

/// Authorization scheme expected by an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// `Authorization: Bearer <token>` (access and refresh tokens)
    Bearer,
    /// `Authorization: ApiKey <key>` (service-to-service webhooks)
    ApiKey,
}

impl Scheme {
    pub fn prefix(&self) -> &'static str {
        match self {
            Scheme::Bearer => "Bearer ",
            Scheme::ApiKey => "ApiKey ",
        }
    }
}

/// Return the credential following `"<Scheme> "` in a raw header value.
///
/// # Errors
/// - `MissingCredential`: header absent or empty
/// - `MalformedCredential`: header lacks the exact expected prefix
pub fn extract_credential(header: Option<&str>, scheme: Scheme) -> Result<&str, AuthError> {
    let value = match header {
        Some(value) if !value.is_empty() => value,
        _ => return Err(AuthError::MissingCredential),
    };

    value
        .strip_prefix(scheme.prefix())
        .ok_or(AuthError::MalformedCredential)
}

/// Extract a credential from request headers.
///
/// Header lookup is case-insensitive on the name. A value that is not
/// visible ASCII counts as malformed.
pub fn extract_from_headers(headers: &HeaderMap, scheme: Scheme) -> Result<String, AuthError> {
    let header = match headers.get(AUTHORIZATION) {
        None => None,
        Some(value) => Some(value.to_str().map_err(|_| AuthError::MalformedCredential)?),
    };

    extract_credential(header, scheme).map(str::to_string)
}
