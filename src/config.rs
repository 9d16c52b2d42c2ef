use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

use clap::ValueEnum;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::pipeline::loader::CommitMode;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Everything a run needs, read once from the environment and passed into each stage.
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub nus_api: NusApiConfig,
    pub sources: SourcePaths,
    pub commit_mode: CommitMode,
    pub http_timeout: Duration,
    pub log_dir: PathBuf,
    pub otlp_endpoint: Option<String>,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    /// Takes precedence over the individual connection parts.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub name: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub ssl_mode: PgSslMode,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct NusApiConfig {
    pub base_url: String,
    pub username: String,
    /// Only needed by the commands that fetch.
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SourcePaths {
    pub public_stops: PathBuf,
    pub bus_routes: PathBuf,
    pub reconciliation: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| dotenvy::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let db_timeout = Duration::from_secs(parse_or(&var, "DB_TIMEOUT_SECS", 30)?);

        let database = DatabaseConfig {
            url: var("DATABASE_URL"),
            host: var("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: parse_or(&var, "DB_PORT", 5432)?,
            name: var("DB_NAME"),
            user: var("DB_USER"),
            password: var("DB_PASSWORD"),
            ssl_mode: parse_or(&var, "DB_SSLMODE", PgSslMode::Require)?,
            timeout: db_timeout,
        };

        let commit_mode = match var("LOAD_COMMIT_MODE") {
            Some(value) => {
                CommitMode::from_str(&value, true).map_err(|_| ConfigError::Invalid {
                    key: "LOAD_COMMIT_MODE",
                    value,
                })?
            }
            None => CommitMode::default(),
        };

        Ok(Config {
            database,
            nus_api: NusApiConfig {
                base_url: var("NUSNEXTBUS_BASE_URL")
                    .unwrap_or_else(|| "https://nnextbus.nus.edu.sg".to_string()),
                username: var("NUSNEXTBUS_USERNAME").unwrap_or_else(|| "NUSnextbus".to_string()),
                password: var("NUSNEXTBUS_PASSWORD"),
            },
            sources: SourcePaths {
                public_stops: var("PUBLIC_STOPS_PATH")
                    .unwrap_or_else(|| "public_bus_stops.json".to_string())
                    .into(),
                bus_routes: var("BUS_ROUTES_PATH")
                    .unwrap_or_else(|| "bus-routes.datamall.json".to_string())
                    .into(),
                reconciliation: var("RECONCILIATION_PATH")
                    .unwrap_or_else(|| "data/reconciliation.json".to_string())
                    .into(),
            },
            commit_mode,
            http_timeout: Duration::from_secs(parse_or(&var, "HTTP_TIMEOUT_SECS", 30)?),
            log_dir: var("LOG_DIR").unwrap_or_else(|| "./logs".to_string()).into(),
            otlp_endpoint: var("OTLP_ENDPOINT"),
        })
    }
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        let options = match &self.url {
            Some(url) => PgConnectOptions::from_str(url).map_err(|_| ConfigError::Invalid {
                key: "DATABASE_URL",
                value: "<redacted>".to_string(),
            })?,
            None => {
                let mut options = PgConnectOptions::new()
                    .host(&self.host)
                    .port(self.port)
                    .database(self.name.as_deref().ok_or(ConfigError::Missing("DB_NAME"))?)
                    .username(self.user.as_deref().ok_or(ConfigError::Missing("DB_USER"))?)
                    .ssl_mode(self.ssl_mode);
                if let Some(password) = &self.password {
                    options = options.password(password);
                }
                options
            }
        };

        Ok(options.options([("statement_timeout", self.timeout.as_millis().to_string())]))
    }
}

impl NusApiConfig {
    pub fn require_password(&self) -> Result<&str, ConfigError> {
        self.password
            .as_deref()
            .ok_or(ConfigError::Missing("NUSNEXTBUS_PASSWORD"))
    }
}

fn parse_or<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("ssl_mode", &self.ssl_mode)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for NusApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NusApiConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}
