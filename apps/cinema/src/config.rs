//! Configuration module for the cinema API.
//!
//! Loads configuration from `config.toml` with environment variable overrides.

use config::{Config as ConfigLoader, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

use crate::error::AppError;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

/// Server configuration
#[derive(Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub jwt_secret: Option<String>,
    /// Lifetime of issued tokens, in hours.
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u64,
}

// Keeps jwt_secret out of logs
impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field(
                "jwt_secret",
                &self.jwt_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_ttl_hours", &self.token_ttl_hours)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            jwt_secret: None,
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Longest token lifetime accepted from configuration (one year).
pub const MAX_TOKEN_TTL_HOURS: u64 = 24 * 365;

fn default_token_ttl_hours() -> u64 {
    24
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/cinema.db")
}

/// Uploaded media configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// Directory uploaded images are written to and served from.
    #[serde(default = "default_media_root")]
    pub root: PathBuf,
    /// Largest accepted image upload, in bytes.
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: default_media_root(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

fn default_media_root() -> PathBuf {
    PathBuf::from("./media")
}

fn default_max_image_bytes() -> usize {
    10 * 1024 * 1024
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. `config.toml` in current directory (optional)
    /// 3. Environment variables with `CINEMA_` prefix
    ///
    /// Environment variables use double underscore for nesting:
    /// - `CINEMA_SERVER__PORT=9000` sets `server.port`
    /// - `CINEMA_MEDIA__ROOT=/srv/media` sets `media.root`
    pub fn load() -> Result<Self, AppError> {
        Self::load_from("config.toml")
    }

    /// Load configuration from a specific file path.
    pub fn load_from(config_path: &str) -> Result<Self, AppError> {
        let config = ConfigLoader::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.token_ttl_hours", 24)?
            .set_default("database.path", "./data/cinema.db")?
            .set_default("media.root", "./media")?
            .set_default("media.max_image_bytes", 10 * 1024 * 1024)?
            .add_source(File::with_name(config_path).required(false))
            // CINEMA_SERVER__PORT=9000 -> server.port = 9000
            .add_source(
                Environment::with_prefix("CINEMA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.server.token_ttl_hours == 0 {
            return Err(AppError::Config(config::ConfigError::Message(
                "server.token_ttl_hours must be greater than zero".to_string(),
            )));
        }

        if self.server.token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            return Err(AppError::Config(config::ConfigError::Message(format!(
                "server.token_ttl_hours must be at most {}",
                MAX_TOKEN_TTL_HOURS
            ))));
        }

        if self.media.max_image_bytes == 0 {
            return Err(AppError::Config(config::ConfigError::Message(
                "media.max_image_bytes must be greater than zero".to_string(),
            )));
        }

        Ok(())
    }

    pub fn token_ttl(&self) -> std::time::Duration {
        let hours = self.server.token_ttl_hours.min(MAX_TOKEN_TTL_HOURS);
        std::time::Duration::from_secs(hours * 60 * 60)
    }

    /// Get the server socket address
    pub fn server_addr(&self) -> std::net::SocketAddr {
        use std::net::{IpAddr, Ipv4Addr, SocketAddr};
        let ip: IpAddr = self.server.host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid host '{}', using 0.0.0.0", self.server.host);
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        });
        SocketAddr::new(ip, self.server.port)
    }
}
