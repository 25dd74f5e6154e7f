/// User Credential Routes
///
/// Registration and wholesale replacement of a user's email and password.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{
    authorize_existing, hash_password, validate_password_strength, AuthorizationGuard, Identity,
};
use crate::error::{AppError, DatabaseError, ErrorContext};
use crate::store::{CredentialStore, UserRecord};
use crate::validators::is_valid_email;

/// Email and password pair for registration or credential replacement
#[derive(Deserialize)]
pub struct CredentialRequest {
    pub email: String,
    pub password: String,
}

/// Public view of a user; never includes the password digest
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub is_chirpy_red: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&UserRecord> for UserResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            is_chirpy_red: user.is_chirpy_red,
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

/// POST /api/users
///
/// # Errors
/// - 400: Invalid email or password policy violation
/// - 409: Email already registered
pub async fn create_user(
    form: web::Json<CredentialRequest>,
    users: web::Data<dyn CredentialStore>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");

    let email = is_valid_email(&form.email)?;
    validate_password_strength(&form.password)?;
    let password_digest = hash_password(&form.password)?;

    let user = users.insert_user(&email, &password_digest).await?;

    tracing::info!(
        request_id = %context.request_id,
        operation = %context.operation,
        user_id = %user.id,
        "User registered successfully"
    );

    Ok(HttpResponse::Created().json(UserResponse::from(&user)))
}

/// PUT /api/users
///
/// Replaces the caller's credential. The caller is resolved from the
/// `Authorization: Bearer` access token.
///
/// # Errors
/// - 401: Missing, malformed, invalid or expired access token
/// - 400: Invalid email or password policy violation
pub async fn update_user(
    req: HttpRequest,
    form: web::Json<CredentialRequest>,
    users: web::Data<dyn CredentialStore>,
    guard: web::Data<AuthorizationGuard>,
) -> Result<HttpResponse, AppError> {
    let identity = guard.authenticate(req.headers())?;

    let user = replace_credential(users.get_ref(), identity, &form).await?;

    Ok(HttpResponse::Ok().json(UserResponse::from(&user)))
}

/// PUT /api/users/{user_id}
///
/// Same as `PUT /api/users` with the target named explicitly. Requires the
/// access token middleware.
///
/// # Errors
/// - 404: No such user (checked before ownership)
/// - 403: Target is not the caller
pub async fn update_user_by_id(
    path: web::Path<String>,
    identity: web::ReqData<Identity>,
    form: web::Json<CredentialRequest>,
    users: web::Data<dyn CredentialStore>,
) -> Result<HttpResponse, AppError> {
    let caller = identity.into_inner();
    let target: Identity = path
        .parse()
        .map_err(|_| AppError::Database(DatabaseError::NotFound("User not found".to_string())))?;

    let existing = users.find_by_id(target).await?;
    let target = authorize_existing(caller, existing)?;

    let user = replace_credential(users.get_ref(), target.id, &form).await?;

    Ok(HttpResponse::Ok().json(UserResponse::from(&user)))
}

async fn replace_credential(
    users: &dyn CredentialStore,
    identity: Identity,
    form: &CredentialRequest,
) -> Result<UserRecord, AppError> {
    let context = ErrorContext::new("credential_update");

    let email = is_valid_email(&form.email)?;
    validate_password_strength(&form.password)?;
    let password_digest = hash_password(&form.password)?;

    let user = users
        .update_credential(identity, &email, &password_digest)
        .await?;

    tracing::info!(
        request_id = %context.request_id,
        operation = %context.operation,
        user_id = %identity,
        "Credential replaced"
    );

    Ok(user)
}
