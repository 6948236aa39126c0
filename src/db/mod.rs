use sqlx::migrate::Migrator;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};

// Embedded at build time so the binary runs from any working directory
static POSTGRES_MIGRATOR: Migrator = sqlx::migrate!("./migrations/postgres");
static SQLITE_MIGRATOR: Migrator = sqlx::migrate!("./migrations/sqlite");

#[derive(Clone, Debug)]
pub enum DatabasePool {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

impl DatabasePool {
    pub async fn new(config: &DatabaseConfig) -> AppResult<Self> {
        let database_url = &config.url;

        if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
            let ssl_mode = if config.ssl {
                PgSslMode::Require
            } else {
                PgSslMode::Prefer
            };
            let options = PgConnectOptions::from_str(database_url)?.ssl_mode(ssl_mode);

            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect_with(options)
                .await?;

            Ok(DatabasePool::Postgres(pool))
        } else if database_url.starts_with("sqlite:") {
            let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

            // An in-memory database lives and dies with its single connection
            let in_memory = database_url.contains(":memory:");
            let max_connections = if in_memory { 1 } else { config.max_connections };

            let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
            if in_memory {
                pool_options = pool_options.idle_timeout(None).max_lifetime(None);
            }

            let pool = pool_options.connect_with(options).await?;

            Ok(DatabasePool::Sqlite(pool))
        } else {
            Err(AppError::ConfigError(config::ConfigError::Message(
                "Invalid database URL. Must start with postgres:// or sqlite:".to_string(),
            )))
        }
    }

    /// Creates the `containers` table if it does not exist yet.
    pub async fn migrate(&self) -> AppResult<()> {
        match self {
            DatabasePool::Postgres(pool) => POSTGRES_MIGRATOR.run(pool).await?,
            DatabasePool::Sqlite(pool) => SQLITE_MIGRATOR.run(pool).await?,
        }
        Ok(())
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            DatabasePool::Postgres(_) => "postgres",
            DatabasePool::Sqlite(_) => "sqlite",
        }
    }
}
