use anyhow::{bail, Context};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, from `RUST_LOG`.
    pub filter: String,
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());
        let parse_or = |key: &str, default: u64| {
            get(key)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(default)
        };
        let parse_u32_or = |key: &str, default: u32| {
            get(key)
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(default)
        };

        let port = get("APP_PORT")
            .or_else(|| get("PORT"))
            .unwrap_or_else(|| "8080".into());
        let server = ServerConfig {
            host: get_or("APP_HOST", "0.0.0.0"),
            port: port
                .parse()
                .with_context(|| format!("invalid server port {port:?}"))?,
            request_timeout_secs: parse_or("REQUEST_TIMEOUT_SECS", 15),
            shutdown_timeout_secs: parse_or("SHUTDOWN_TIMEOUT_SECS", 10),
        };

        let url = match get("DATABASE_URL") {
            Some(url) => url,
            None => {
                let host = get_or("DB_HOST", "localhost");
                let user = get_or("DB_USER", "postgres");
                let name = get_or("DB_NAME", "testdb");
                format!(
                    "postgres://{}:{}@{}:{}/{}?sslmode={}",
                    user,
                    get_or("DB_PASSWORD", "password"),
                    host,
                    get_or("DB_PORT", "5432"),
                    name,
                    get_or("DB_SSLMODE", "disable"),
                )
            }
        };
        let database = DatabaseConfig {
            url,
            max_connections: parse_u32_or("DB_MAX_CONNS", 5),
            min_connections: parse_u32_or("DB_MIN_CONNS", 1),
            acquire_timeout_secs: parse_or("DB_ACQUIRE_TIMEOUT_SECS", 5),
        };

        let logging = LoggingConfig {
            filter: get_or("RUST_LOG", "users_api=debug,axum=info,tower_http=info"),
            json: get("LOG_FORMAT").is_some_and(|v| v == "json"),
        };

        let config = Self {
            server,
            database,
            logging,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let db = &self.database;
        if db.max_connections == 0 {
            bail!("max connections must be at least 1");
        }
        if db.max_connections < db.min_connections {
            bail!(
                "max connections ({}) cannot be less than min connections ({})",
                db.max_connections,
                db.min_connections
            );
        }
        Ok(())
    }
}
