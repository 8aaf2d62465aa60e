use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub pocdesk: PocdeskConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
}

/// Storage and runtime paths
#[derive(Debug, Clone, Deserialize)]
pub struct PocdeskConfig {
    pub db_path: PathBuf,
    /// Directory for scoped upload files; created on startup if missing.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_http_port(),
            allowed_origins: Vec::new(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("temp")
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    8081
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in POCDESK_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("POCDESK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        Self::from_file(&config_path)
    }

    /// Load and validate a configuration file at an explicit path
    pub fn from_file(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.http_server.port == 0 {
            anyhow::bail!("http_server.port must be greater than 0");
        }

        if self.http_server.max_upload_bytes == 0 {
            anyhow::bail!("http_server.max_upload_bytes must be greater than 0");
        }

        if self.pocdesk.log_level.parse::<log::LevelFilter>().is_err() {
            anyhow::bail!(
                "log_level must be one of off, error, warn, info, debug, trace (got '{}')",
                self.pocdesk.log_level
            );
        }

        if self.pocdesk.temp_dir.is_file() {
            anyhow::bail!(
                "temp_dir must be a directory, not a file: {}",
                self.pocdesk.temp_dir.display()
            );
        }

        Ok(())
    }

    /// Create the upload temp directory if it does not exist yet
    pub fn ensure_temp_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.pocdesk.temp_dir).with_context(|| {
            format!("Failed to create temp_dir: {}", self.pocdesk.temp_dir.display())
        })
    }

    /// Default log filter for binaries; `RUST_LOG` still takes precedence
    pub fn log_level(&self) -> &str {
        &self.pocdesk.log_level
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.pocdesk.db_path
    }

    /// Get the directory holding scoped upload files
    pub fn temp_dir(&self) -> &Path {
        &self.pocdesk.temp_dir
    }

    /// Get the SQL migrations directory
    pub fn migrations_dir(&self) -> &Path {
        &self.pocdesk.migrations_dir
    }
}
