/// Authorization Guard
///
/// Resolves the caller of a protected request and enforces ownership.

use std::sync::Arc;

use actix_web::http::header::HeaderMap;
use secrecy::{ExposeSecret, Secret};

use crate::auth::credential::{extract_credential, extract_from_headers, Scheme};
use crate::auth::identity::Identity;
use crate::auth::jwt::AccessTokenIssuer;
use crate::error::{AppError, AuthError, DatabaseError};

/// Anything that records the identity that owns it
pub trait Owned {
    fn owner(&self) -> Identity;
}

#[derive(Clone)]
pub struct AuthorizationGuard {
    issuer: Arc<AccessTokenIssuer>,
}

impl AuthorizationGuard {
    pub fn new(issuer: Arc<AccessTokenIssuer>) -> Self {
        Self { issuer }
    }

    /// Resolve the caller from a raw `Authorization` header value
    ///
    /// Propagates the most specific failure: missing or malformed
    /// credential, invalid or expired token.
    pub fn authenticate_header(&self, header: Option<&str>) -> Result<Identity, AuthError> {
        let token = extract_credential(header, Scheme::Bearer)?;
        self.issuer.verify(token)
    }

    /// Resolve the caller from request headers
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, AuthError> {
        let token = extract_from_headers(headers, Scheme::Bearer)?;
        self.issuer.verify(&token)
    }
}

/// Succeeds only when the caller is the resource owner
pub fn authorize_ownership(identity: Identity, owner: Identity) -> Result<(), AuthError> {
    if identity == owner {
        Ok(())
    } else {
        tracing::warn!(user_id = %identity, owner = %owner, "Ownership check failed");
        Err(AuthError::Forbidden)
    }
}

/// Existence check first, ownership second.
///
/// A missing resource is reported as not found even to a caller who would
/// not own it, so the response never reveals whether it exists.
pub fn authorize_existing<T: Owned>(identity: Identity, resource: Option<T>) -> Result<T, AppError> {
    let resource = resource
        .ok_or_else(|| AppError::Database(DatabaseError::NotFound("Resource not found".to_string())))?;
    authorize_ownership(identity, resource.owner())?;
    Ok(resource)
}

/// Check an `Authorization: ApiKey <key>` header against the configured key.
///
/// Plain comparison: the key is a shared operational secret, not a user
/// credential.
pub fn verify_api_key(headers: &HeaderMap, expected: &Secret<String>) -> Result<(), AuthError> {
    let key = extract_from_headers(headers, Scheme::ApiKey)?;
    if key == *expected.expose_secret() {
        Ok(())
    } else {
        tracing::warn!("API key mismatch");
        Err(AuthError::InvalidCredential)
    }
}
