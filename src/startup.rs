use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{AccessTokenIssuer, AuthorizationGuard, RefreshTokenManager};
use crate::configuration::AuthSettings;
use crate::logger::LoggerMiddleware;
use crate::middleware::RequireAuth;
use crate::routes::{
    create_user, health_check, login, polka_webhook, refresh, revoke, revoke_all, update_user,
    update_user_by_id,
};
use crate::store::{CredentialStore, RefreshTokenStore};

/// Build the HTTP server around the authentication core.
///
/// The signing secret is read from `settings` exactly once, here.
pub fn run(
    listener: TcpListener,
    users: Arc<dyn CredentialStore>,
    refresh_token_store: Arc<dyn RefreshTokenStore>,
    settings: AuthSettings,
) -> Result<Server, std::io::Error> {
    let issuer = Arc::new(AccessTokenIssuer::from_settings(&settings));
    let guard = AuthorizationGuard::new(issuer.clone());
    let refresh_tokens = RefreshTokenManager::new(refresh_token_store, settings.refresh_token_ttl());

    let users_data = web::Data::from(users);
    let issuer_data = web::Data::from(issuer);
    let guard_data = web::Data::new(guard.clone());
    let refresh_tokens_data = web::Data::new(refresh_tokens);
    let settings_data = web::Data::new(settings);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(users_data.clone())
            .app_data(issuer_data.clone())
            .app_data(guard_data.clone())
            .app_data(refresh_tokens_data.clone())
            .app_data(settings_data.clone())

            .service(
                web::scope("/api")
                    .route("/healthz", web::get().to(health_check))
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/revoke", web::post().to(revoke))
                    .route("/polka/webhooks", web::post().to(polka_webhook))
                    .service(
                        web::resource("/users")
                            .route(web::post().to(create_user))
                            .route(web::put().to(update_user)),
                    )
                    // Protected resources (require an access token)
                    .service(
                        web::resource("/users/{user_id}")
                            .wrap(RequireAuth::new(guard.clone()))
                            .route(web::put().to(update_user_by_id)),
                    )
                    .service(
                        web::resource("/revoke_all")
                            .wrap(RequireAuth::new(guard.clone()))
                            .route(web::post().to(revoke_all)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
