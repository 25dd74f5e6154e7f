use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::auth::{verify_api_key, Identity};
use crate::configuration::AuthSettings;
use crate::error::{AppError, DatabaseError, ValidationError};
use crate::store::CredentialStore;

const USER_UPGRADED: &str = "user.upgraded";

#[derive(Deserialize)]
pub struct PolkaEvent {
    pub event: String,
    pub data: PolkaEventData,
}

#[derive(Deserialize)]
pub struct PolkaEventData {
    pub user_id: String,
}

/// POST /api/polka/webhooks
///
/// Payment provider callback, authenticated with `Authorization: ApiKey`.
/// The key is checked before the body is parsed. Events other than
/// `user.upgraded` are acknowledged and ignored.
///
/// # Errors
/// - 401: Missing or wrong API key
/// - 400: Body is not a valid event
/// - 404: Event names an unknown user
pub async fn polka_webhook(
    req: HttpRequest,
    body: web::Bytes,
    users: web::Data<dyn CredentialStore>,
    settings: web::Data<AuthSettings>,
) -> Result<HttpResponse, AppError> {
    verify_api_key(req.headers(), &settings.polka_key)?;

    let event: PolkaEvent = serde_json::from_slice(&body)
        .map_err(|_| ValidationError::InvalidFormat("webhook payload".to_string()))?;

    if event.event != USER_UPGRADED {
        tracing::debug!(event = %event.event, "Ignoring webhook event");
        return Ok(HttpResponse::NoContent().finish());
    }

    let user_id: Identity = event
        .data
        .user_id
        .parse()
        .map_err(|_| AppError::Database(DatabaseError::NotFound("User not found".to_string())))?;

    users.upgrade_user(user_id).await?;

    tracing::info!(user_id = %user_id, "User upgraded to Chirpy Red");

    Ok(HttpResponse::NoContent().finish())
}
