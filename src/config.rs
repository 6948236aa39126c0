use config::ConfigError;
use std::env;
use std::fmt;
use std::str::FromStr;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub store: StoreConfig,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
    /// Require TLS for PostgreSQL connections. Ignored for SQLite.
    pub ssl: bool,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// The connection URL with any password masked, safe for logs.
    pub fn redacted_url(&self) -> String {
        match Url::parse(&self.url) {
            Ok(mut url) => {
                if url.password().is_some() && url.set_password(Some("***")).is_err() {
                    return "<redacted>".to_string();
                }
                url.to_string()
            }
            Err(_) => "<unparseable>".to_string(),
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.redacted_url())
            .field("ssl", &self.ssl)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub store_type: StoreType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreType {
    Memory,
    Database,
}

impl StoreType {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_lowercase().as_str() {
            "memory" => Ok(StoreType::Memory),
            "database" | "db" => Ok(StoreType::Database),
            other => Err(ConfigError::Message(format!(
                "Unknown STORAGE_BACKEND '{}'. Expected 'memory' or 'database'",
                other
            ))),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parses an optional numeric variable, rejecting malformed values.
fn parse_number<T: FromStr>(
    name: &str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Message(format!("Invalid {} value '{}'", name, raw))),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://rolloff.db".to_string());

        // Hosted PostgreSQL in production wants TLS unless told otherwise
        let ssl = match env::var("DATABASE_SSL") {
            Ok(value) => parse_bool(&value).ok_or_else(|| {
                ConfigError::Message(format!("Invalid DATABASE_SSL value '{}'", value))
            })?,
            Err(_) => run_mode == "production",
        };

        let max_connections = parse_number(
            "DATABASE_MAX_CONNECTIONS",
            env::var("DATABASE_MAX_CONNECTIONS").ok(),
            DEFAULT_MAX_CONNECTIONS,
        )?;

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let server_port = match env::var("SERVER_PORT") {
            Ok(value) => parse_number("SERVER_PORT", Some(value), DEFAULT_PORT)?,
            Err(_) => parse_number("PORT", env::var("PORT").ok(), DEFAULT_PORT)?,
        };

        let store_type = match env::var("STORAGE_BACKEND") {
            Ok(value) => StoreType::parse(&value)?,
            Err(_) => StoreType::Database,
        };

        Ok(Config {
            database: DatabaseConfig {
                url: database_url,
                ssl,
                max_connections,
            },
            server: ServerConfig {
                host: server_host,
                port: server_port,
            },
            store: StoreConfig { store_type },
        })
    }
}
