use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::matching::WeightTable;

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
    pub matching: MatchingConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            matching: MatchingConfig::from_env()?,
        })
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

/// Ranking knobs and collaborator wiring.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingConfig {
    /// Length of the ranked list returned to callers.
    pub top_n: usize,
    /// Upper bound for a single text-interpretation or narrative call.
    pub collaborator_timeout: Duration,
    pub weights: WeightTable,
    pub catalog: CatalogConfig,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            top_n: 3,
            collaborator_timeout: Duration::from_millis(8_000),
            weights: WeightTable::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

impl MatchingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let top_n = match env::var("MATCH_TOP_N") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(value) if value > 0 => value,
                _ => return Err(ConfigError::InvalidNumber { key: "MATCH_TOP_N" }),
            },
            Err(_) => defaults.top_n,
        };

        let collaborator_timeout = match env::var("MATCH_COLLABORATOR_TIMEOUT_MS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidNumber {
                    key: "MATCH_COLLABORATOR_TIMEOUT_MS",
                })?,
            Err(_) => defaults.collaborator_timeout,
        };

        let weights = WeightTable {
            very_important: weight_from_env(
                "MATCH_WEIGHT_VERY_IMPORTANT",
                defaults.weights.very_important,
            )?,
            important: weight_from_env("MATCH_WEIGHT_IMPORTANT", defaults.weights.important)?,
            low_preference: weight_from_env(
                "MATCH_WEIGHT_LOW_PREFERENCE",
                defaults.weights.low_preference,
            )?,
            not_important: weight_from_env(
                "MATCH_WEIGHT_NOT_IMPORTANT",
                defaults.weights.not_important,
            )?,
        };

        let catalog = CatalogConfig {
            candidates_path: env::var_os("CATALOG_CANDIDATES_PATH").map(PathBuf::from),
            metrics_path: env::var_os("CATALOG_METRICS_PATH").map(PathBuf::from),
        };

        Ok(Self {
            top_n,
            collaborator_timeout,
            weights,
            catalog,
        })
    }
}

fn weight_from_env(key: &'static str, default: f64) -> Result<f64, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
            _ => Err(ConfigError::InvalidWeight { key }),
        },
        Err(_) => Ok(default),
    }
}

/// Optional CSV exports backing the candidate catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogConfig {
    pub candidates_path: Option<PathBuf>,
    pub metrics_path: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    InvalidWeight { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a positive integer")
            }
            ConfigError::InvalidWeight { key } => {
                write!(f, "{key} must be a non-negative number")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidWeight { .. } => None,
        }
    }
}
