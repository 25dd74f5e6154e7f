/// Authentication module
///
/// Password hashing, credential extraction, access token issuance,
/// refresh token lifecycle and request authorization.

mod claims;
mod credential;
mod guard;
mod identity;
mod jwt;
mod password;
mod refresh_token;

pub use claims::Claims;
pub use credential::{extract_credential, extract_from_headers, Scheme};
pub use guard::{authorize_existing, authorize_ownership, verify_api_key, AuthorizationGuard, Owned};
pub use identity::Identity;
pub use jwt::{AccessTokenIssuer, DEFAULT_ACCESS_TOKEN_TTL_SECONDS, DEFAULT_ISSUER};
pub use password::{
    hash_password, reject_unknown_user, validate_password_strength, verify_password,
};
pub use refresh_token::{
    generate_refresh_token, RefreshToken, RefreshTokenManager, DEFAULT_REFRESH_TOKEN_TTL_DAYS,
};
