mod auth;
mod health_check;
mod users;
mod webhooks;

pub use auth::{login, refresh, revoke, revoke_all};
pub use health_check::health_check;
pub use users::{create_user, update_user, update_user_by_id};
pub use webhooks::polka_webhook;
