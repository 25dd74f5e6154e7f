/// JWT Claims structure
///
/// Payload of an access token: the registered claims `sub`, `iat`, `exp`
/// and `iss` (RFC 7519), nothing else.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::identity::Identity;
use crate::error::AuthError;

/// JWT Claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (identity as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
}

impl Claims {
    /// Build claims for `identity` valid for `ttl` from `issued_at`
    pub fn new(identity: Identity, issued_at: DateTime<Utc>, ttl: Duration, issuer: &str) -> Self {
        let iat = issued_at.timestamp();
        Self {
            sub: identity.to_string(),
            iat,
            exp: iat + ttl.num_seconds(),
            iss: issuer.to_string(),
        }
    }

    /// Parse the subject back into an identity
    ///
    /// # Errors
    /// `InvalidToken` if the subject is not a well-formed identity
    pub fn identity(&self) -> Result<Identity, AuthError> {
        self.sub.parse().map_err(|_| {
            tracing::warn!("Access token subject is not a valid identity");
            AuthError::InvalidToken
        })
    }

    /// Expired once `now` reaches `exp`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_creation() {
        let identity = Identity::generate();
        let now = Utc::now();
        let claims = Claims::new(identity, now, Duration::seconds(3600), "chirpy");

        assert_eq!(claims.sub, identity.to_string());
        assert_eq!(claims.iss, "chirpy");
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(!claims.is_expired_at(now));
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let claims = Claims::new(Identity::generate(), now, Duration::seconds(60), "chirpy");

        assert!(!claims.is_expired_at(now + Duration::seconds(59)));
        assert!(claims.is_expired_at(now + Duration::seconds(60)));
    }

    #[test]
    fn test_identity_extraction() {
        let identity = Identity::generate();
        let claims = Claims::new(identity, Utc::now(), Duration::seconds(3600), "chirpy");

        assert_eq!(claims.identity().unwrap(), identity);
    }

    #[test]
    fn test_invalid_subject() {
        let mut claims = Claims::new(Identity::generate(), Utc::now(), Duration::seconds(3600), "chirpy");
        claims.sub = "invalid-uuid".to_string();

        assert_eq!(claims.identity(), Err(AuthError::InvalidToken));
    }
}
