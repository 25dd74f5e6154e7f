/// Access Token Issuance and Verification
///
/// Access tokens are stateless HS256 JWTs. Nothing is persisted: a token is
/// valid exactly while its signature checks out and `now < exp`. They cannot
/// be revoked individually, which is why their TTL stays short (one hour by
/// default) and long-lived sessions go through refresh tokens instead.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, Secret};

use crate::auth::claims::Claims;
use crate::auth::identity::Identity;
use crate::configuration::AuthSettings;
use crate::error::{AppError, AuthError};

/// Issuer claim stamped on every token unless configured otherwise
pub const DEFAULT_ISSUER: &str = "chirpy";

/// Documented default lifetime of an access token
pub const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 60 * 60;

/// Signs and verifies access tokens with a process-wide secret.
///
/// Built once at startup and shared read-only; the keys are never rotated
/// while the process runs.
#[derive(Clone)]
pub struct AccessTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl AccessTokenIssuer {
    pub fn new(secret: &Secret<String>, issuer: impl Into<String>) -> Self {
        let key = secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(key),
            decoding_key: DecodingKey::from_secret(key),
            issuer: issuer.into(),
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(&settings.jwt_secret, settings.issuer.clone())
    }

    /// Issue a token for `identity` that expires `ttl` from now
    ///
    /// # Errors
    /// Only if the signing library fails internally
    pub fn issue(&self, identity: Identity, ttl: Duration) -> Result<String, AppError> {
        self.issue_at(identity, Utc::now(), ttl)
    }

    /// Same as [`issue`](Self::issue) with an explicit issuance time
    pub fn issue_at(
        &self,
        identity: Identity,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, AppError> {
        let claims = Claims::new(identity, issued_at, ttl, &self.issuer);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Verify a token and return the identity it was issued for
    ///
    /// # Errors
    /// - `InvalidToken`: bad signature, wrong issuer, malformed token or subject
    /// - `ExpiredToken`: signature is fine but `exp` has passed
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        self.verify_at(token, Utc::now())
    }

    /// Same as [`verify`](Self::verify) against an explicit clock reading
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::warn!(error = %e, "Access token rejected");
                AuthError::InvalidToken
            })?;

        // Expiry is judged apart from the signature, with no leeway
        if claims.is_expired_at(now) {
            tracing::info!(subject = %claims.sub, "Access token expired");
            return Err(AuthError::ExpiredToken);
        }

        claims.identity()
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub", "iss"]);
        validation.set_issuer(&[&self.issuer]);
        validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    fn issuer_with(secret: &str) -> AccessTokenIssuer {
        AccessTokenIssuer::new(&Secret::new(secret.to_string()), DEFAULT_ISSUER)
    }

    fn one_hour() -> Duration {
        Duration::seconds(DEFAULT_ACCESS_TOKEN_TTL_SECONDS)
    }

    #[test]
    fn test_issue_and_verify_token() {
        let issuer = issuer_with("test-secret-key-at-least-32-characters-long");
        let identity = Identity::generate();

        let token = issuer.issue(identity, one_hour()).expect("Failed to issue token");
        let verified = issuer.verify(&token).expect("Failed to verify token");

        assert_eq!(verified, identity);
    }

    #[test]
    fn test_token_has_three_parts() {
        let issuer = issuer_with("test-secret");
        let token = issuer.issue(Identity::generate(), one_hour()).unwrap();

        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_valid_until_ttl_elapses() {
        let issuer = issuer_with("test-secret");
        let identity = Identity::generate();
        let issued_at = Utc::now() - Duration::seconds(30);
        let token = issuer
            .issue_at(identity, issued_at, Duration::seconds(60))
            .unwrap();

        assert_eq!(
            issuer.verify_at(&token, issued_at + Duration::seconds(59)),
            Ok(identity)
        );
        assert_eq!(
            issuer.verify_at(&token, issued_at + Duration::seconds(60)),
            Err(AuthError::ExpiredToken)
        );
    }

    #[test]
    fn test_expired_token_with_valid_signature() {
        let issuer = issuer_with("test-secret");
        let issued_at = Utc::now() - Duration::hours(2);
        let token = issuer
            .issue_at(Identity::generate(), issued_at, one_hour())
            .unwrap();

        assert_eq!(issuer.verify(&token), Err(AuthError::ExpiredToken));
    }

    #[test]
    fn test_wrong_secret() {
        let token = issuer_with("correct-secret")
            .issue(Identity::generate(), one_hour())
            .unwrap();

        let result = issuer_with("wrong-secret").verify(&token);

        assert_eq!(result, Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_invalid_token() {
        let issuer = issuer_with("test-secret");

        assert_eq!(issuer.verify("invalid.token.here"), Err(AuthError::InvalidToken));
        assert_eq!(issuer.verify(""), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_tampered_token() {
        let issuer = issuer_with("test-secret");
        let token = issuer.issue(Identity::generate(), one_hour()).unwrap();

        let tampered = format!("{}X", token);

        assert_eq!(issuer.verify(&tampered), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_wrong_issuer() {
        let secret = Secret::new("shared-secret".to_string());
        let token = AccessTokenIssuer::new(&secret, "someone-else")
            .issue(Identity::generate(), one_hour())
            .unwrap();

        let result = AccessTokenIssuer::new(&secret, DEFAULT_ISSUER).verify(&token);

        assert_eq!(result, Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_subject_that_is_not_an_identity() {
        let issuer = issuer_with("test-secret");
        let mut claims = Claims::new(Identity::generate(), Utc::now(), one_hour(), DEFAULT_ISSUER);
        claims.sub = "not-a-uuid".to_string();
        let token = encode(&Header::default(), &claims, &issuer.encoding_key).unwrap();

        assert_eq!(issuer.verify(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_missing_subject() {
        #[derive(Serialize)]
        struct Anonymous {
            iat: i64,
            exp: i64,
            iss: String,
        }

        let issuer = issuer_with("test-secret");
        let now = Utc::now().timestamp();
        let claims = Anonymous {
            iat: now,
            exp: now + 3600,
            iss: DEFAULT_ISSUER.to_string(),
        };
        let token = encode(&Header::default(), &claims, &issuer.encoding_key).unwrap();

        assert_eq!(issuer.verify(&token), Err(AuthError::InvalidToken));
    }
}
