use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;

use chirpy_auth::configuration::{get_configuration, StorageBackend};
use chirpy_auth::startup::run;
use chirpy_auth::store::{CredentialStore, InMemoryStore, PostgresStore, RefreshTokenStore};
use chirpy_auth::telemetry::init_telemetry;

type Stores = (Arc<dyn CredentialStore>, Arc<dyn RefreshTokenStore>);

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    if let Err(e) = configuration.auth.validate() {
        tracing::error!("Invalid auth configuration: {}", e);
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Configuration error",
        ));
    }

    let (users, refresh_tokens): Stores = match configuration.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; nothing survives a restart");
            let store = Arc::new(InMemoryStore::new());
            let users: Arc<dyn CredentialStore> = store.clone();
            let refresh_tokens: Arc<dyn RefreshTokenStore> = store;
            (users, refresh_tokens)
        }
        StorageBackend::Postgres => {
            let database = configuration.database.as_ref().ok_or_else(|| {
                tracing::error!("storage.backend is postgres but no database section is configured");
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "Configuration error")
            })?;

            tracing::info!("Attempting to connect to database");
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database.connection_string().expose_secret())
                .await
                .map_err(|e| {
                    tracing::error!("Failed to create connection pool: {}", e);
                    std::io::Error::new(
                        std::io::ErrorKind::ConnectionRefused,
                        "Database connection error",
                    )
                })?;

            sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
                tracing::error!("Failed to migrate the database: {}", e);
                std::io::Error::new(std::io::ErrorKind::Other, "Database migration error")
            })?;

            tracing::info!("Database connection pool created successfully");
            let store = Arc::new(PostgresStore::new(pool));
            let users: Arc<dyn CredentialStore> = store.clone();
            let refresh_tokens: Arc<dyn RefreshTokenStore> = store;
            (users, refresh_tokens)
        }
    };

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, users, refresh_tokens, configuration.auth)?;
    tracing::info!("Server started successfully");

    server.await
}
