use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::metrics::ranking::{BaselinePolicy, RankingSettings, DEFAULT_SMOOTHING};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub database: DatabaseConfig,
    pub ranking: RankingSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(raw) => match raw.trim().parse::<u32>() {
                Ok(size) if size > 0 => size,
                _ => return Err(ConfigError::InvalidPoolSize { value: raw }),
            },
            Err(_) => 5,
        };

        let smoothing = match env::var("RANKING_SMOOTHING") {
            Ok(raw) => match raw.trim().parse::<f64>() {
                Ok(value) if value.is_finite() && value > 0.0 => value,
                _ => return Err(ConfigError::InvalidSmoothing { value: raw }),
            },
            Err(_) => DEFAULT_SMOOTHING,
        };

        let baseline = match env::var("RANKING_BASELINE_SCOPE") {
            Ok(raw) => {
                parse_baseline(&raw).ok_or(ConfigError::InvalidBaselineScope { value: raw })?
            }
            Err(_) => BaselinePolicy::Store,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            database: DatabaseConfig {
                universe_url: non_blank_var("UNIVERSE_DATABASE_URL"),
                local_url: non_blank_var("LOCAL_DATABASE_URL"),
                max_connections,
            },
            ranking: RankingSettings {
                smoothing,
                baseline,
            },
        })
    }
}

fn non_blank_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_baseline(value: &str) -> Option<BaselinePolicy> {
    match value.trim().to_ascii_lowercase().as_str() {
        "store" | "global" => Some(BaselinePolicy::Store),
        "configuration" | "cfg_t" => Some(BaselinePolicy::Configuration),
        _ => None,
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Connection settings for the two Postgres stores. Either URL may be absent when the service
/// runs from a snapshot.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub universe_url: Option<String>,
    pub local_url: Option<String>,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn universe_url(&self) -> Result<&str, ConfigError> {
        self.universe_url
            .as_deref()
            .ok_or(ConfigError::MissingDatabaseUrl {
                key: "UNIVERSE_DATABASE_URL",
            })
    }

    pub fn local_url(&self) -> Result<&str, ConfigError> {
        self.local_url
            .as_deref()
            .ok_or(ConfigError::MissingDatabaseUrl {
                key: "LOCAL_DATABASE_URL",
            })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPoolSize { value: String },
    InvalidSmoothing { value: String },
    InvalidBaselineScope { value: String },
    MissingDatabaseUrl { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPoolSize { value } => write!(
                f,
                "DATABASE_MAX_CONNECTIONS must be a positive integer, got '{}'",
                value
            ),
            ConfigError::InvalidSmoothing { value } => write!(
                f,
                "RANKING_SMOOTHING must be a finite number greater than zero, got '{}'",
                value
            ),
            ConfigError::InvalidBaselineScope { value } => write!(
                f,
                "RANKING_BASELINE_SCOPE must be 'store' or 'configuration', got '{}'",
                value
            ),
            ConfigError::MissingDatabaseUrl { key } => {
                write!(f, "{} is required when no snapshot is given", key)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidPoolSize { .. }
            | ConfigError::InvalidSmoothing { .. }
            | ConfigError::InvalidBaselineScope { .. }
            | ConfigError::MissingDatabaseUrl { .. } => None,
        }
    }
}
