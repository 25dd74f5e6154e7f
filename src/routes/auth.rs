/// Authentication Routes
///
/// Login, access token refresh and refresh token revocation.
///
/// Every credential or token failure is answered with the same generic 401;
/// the precise reason only appears in the logs.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{
    extract_from_headers, reject_unknown_user, verify_password, AccessTokenIssuer, Identity,
    RefreshTokenManager, Scheme,
};
use crate::configuration::AuthSettings;
use crate::error::{AppError, AuthError, ErrorContext};
use crate::routes::users::UserResponse;
use crate::store::CredentialStore;

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response: the user plus a fresh token pair
#[derive(Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub token: String,
    pub refresh_token: String,
}

/// Refresh response with a new access token
#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// POST /api/login
///
/// Verifies the password, then issues an access token and creates a
/// refresh token.
///
/// # Errors
/// - 401: Unknown email or wrong password (indistinguishable)
/// - 503: Credential or refresh token storage unavailable
pub async fn login(
    form: web::Json<LoginRequest>,
    users: web::Data<dyn CredentialStore>,
    issuer: web::Data<AccessTokenIssuer>,
    refresh_tokens: web::Data<RefreshTokenManager>,
    settings: web::Data<AuthSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");
    let email = form.email.trim();

    let user = users
        .find_by_email(email)
        .await
        .map_err(AuthError::from_storage)?;

    let user = match user {
        Some(user) => user,
        None => return Err(reject_unknown_user(&form.password).into()),
    };

    verify_password(&form.password, &user.password_digest)?;

    let token = issuer.issue(user.id, settings.access_token_ttl())?;
    let refresh_token = refresh_tokens.create(user.id).await?;

    tracing::info!(
        request_id = %context.request_id,
        operation = %context.operation,
        user_id = %user.id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok().json(LoginResponse {
        user: UserResponse::from(&user),
        token,
        refresh_token: refresh_token.token,
    }))
}

/// POST /api/refresh
///
/// Exchanges the refresh token in `Authorization: Bearer <token>` for a new
/// access token. The refresh token itself is left untouched.
///
/// # Errors
/// - 401: Missing, unknown, expired or revoked refresh token
/// - 503: Refresh token storage unavailable
pub async fn refresh(
    req: HttpRequest,
    issuer: web::Data<AccessTokenIssuer>,
    refresh_tokens: web::Data<RefreshTokenManager>,
    settings: web::Data<AuthSettings>,
) -> Result<HttpResponse, AppError> {
    let presented = extract_from_headers(req.headers(), Scheme::Bearer)?;
    let identity = refresh_tokens.validate(&presented).await?;

    let token = issuer.issue(identity, settings.access_token_ttl())?;

    tracing::info!(user_id = %identity, "Access token refreshed");

    Ok(HttpResponse::Ok().json(TokenResponse { token }))
}

/// POST /api/revoke
///
/// Revokes the refresh token in `Authorization: Bearer <token>`. Succeeds
/// for unknown and already revoked tokens.
///
/// # Errors
/// - 401: No bearer credential in the request
/// - 503: Refresh token storage unavailable
pub async fn revoke(
    req: HttpRequest,
    refresh_tokens: web::Data<RefreshTokenManager>,
) -> Result<HttpResponse, AppError> {
    let presented = extract_from_headers(req.headers(), Scheme::Bearer)?;
    refresh_tokens.revoke(&presented).await?;

    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/revoke_all
///
/// Logs the caller out everywhere. Requires the access token middleware.
pub async fn revoke_all(
    identity: web::ReqData<Identity>,
    refresh_tokens: web::Data<RefreshTokenManager>,
) -> Result<HttpResponse, AppError> {
    refresh_tokens.revoke_all(identity.into_inner()).await?;

    Ok(HttpResponse::NoContent().finish())
}
