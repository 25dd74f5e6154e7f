use chrono::Duration;
use secrecy::{ExposeSecret, Secret};

use crate::auth::{DEFAULT_ACCESS_TOKEN_TTL_SECONDS, DEFAULT_ISSUER, DEFAULT_REFRESH_TOKEN_TTL_DAYS};
use crate::error::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    /// Required when `storage.backend` is `postgres`
    pub database: Option<DatabaseSettings>,
    pub auth: AuthSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[derive(serde::Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(serde::Deserialize, Clone, Default)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: Secret<String>,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> Secret<String> {
        Secret::new(format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username,
            self.password.expose_secret(),
            self.host,
            self.port,
            self.database_name
        ))
    }
}

/// Authentication settings
///
/// Loaded once at startup and handed to every component that needs them.
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    /// HMAC key for access tokens
    pub jwt_secret: Secret<String>,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl_seconds: i64,
    #[serde(default = "default_refresh_token_ttl")]
    pub refresh_token_ttl_days: i64,
    /// Shared key of the payment provider's webhook
    pub polka_key: Secret<String>,
}

fn default_issuer() -> String {
    DEFAULT_ISSUER.to_string()
}

fn default_access_token_ttl() -> i64 {
    DEFAULT_ACCESS_TOKEN_TTL_SECONDS
}

fn default_refresh_token_ttl() -> i64 {
    DEFAULT_REFRESH_TOKEN_TTL_DAYS
}

impl AuthSettings {
    pub fn access_token_ttl(&self) -> Duration {
        Duration::seconds(self.access_token_ttl_seconds)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::days(self.refresh_token_ttl_days)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.expose_secret().is_empty() {
            return Err(ConfigError::MissingRequired("auth.jwt_secret".to_string()));
        }
        if self.polka_key.expose_secret().is_empty() {
            return Err(ConfigError::MissingRequired("auth.polka_key".to_string()));
        }
        if self.access_token_ttl_seconds <= 0 {
            return Err(ConfigError::InvalidValue(
                "auth.access_token_ttl_seconds must be positive".to_string(),
            ));
        }
        if self.refresh_token_ttl_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "auth.refresh_token_ttl_days must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read `configuration.{yaml,toml,json}` if present, then apply
/// `APP_<SECTION>__<KEY>` environment overrides.
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}
