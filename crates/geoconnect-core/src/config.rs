//! GeoConnect Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with sensible defaults for development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Search engine connection (posts and credentials)
    pub search: SearchConfig,

    /// Blob storage for post images
    pub storage: StorageConfig,

    /// Authentication settings
    pub auth: AuthConfig,

    /// Post handling
    pub posts: PostConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Built-in signing secret; only good for local development
pub const DEV_JWT_SECRET: &str = "development-secret-key-change-in-production";

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overwrite every field that has a variable set in `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(host) = lookup("API_HOST") {
            self.server.host = host;
        }
        // PORT is what most hosting platforms inject; API_PORT wins when both are set
        for key in ["PORT", "API_PORT"] {
            if let Some(port) = lookup(key) {
                self.server.port = parse_value(key, &port)?;
            }
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.server.cors_origins = split_list(&origins);
        }
        if let Some(dir) = lookup("STATIC_DIR") {
            self.server.static_dir = Some(PathBuf::from(dir));
        }

        // Elasticsearch
        if let Some(url) = lookup("ES_URL") {
            self.search.url = url;
        }
        if let Some(user) = lookup("ES_USER") {
            self.search.username = Some(user);
        }
        if let Some(pass) = lookup("ES_PASSWORD") {
            self.search.password = Some(pass);
        }
        if let Some(index) = lookup("ES_POSTS_INDEX") {
            self.search.posts_index = index;
        }
        if let Some(index) = lookup("ES_USERS_INDEX") {
            self.search.users_index = index;
        }

        // Cloud Storage
        if let Some(bucket) = lookup("GCS_BUCKET") {
            self.storage.bucket = bucket;
        }
        if let Some(token) = lookup("GCS_ACCESS_TOKEN") {
            self.storage.access_token = Some(token);
        }

        // Auth
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(issuer) = lookup("JWT_ISSUER") {
            self.auth.issuer = issuer;
        }
        if let Some(ttl) = lookup("JWT_TTL_SECS") {
            self.auth.token_ttl_secs = parse_value("JWT_TTL_SECS", &ttl)?;
        }
        if let Some(admins) = lookup("ADMIN_USERS") {
            self.auth.admins = split_list(&admins);
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("LOG_JSON") {
            self.logging.json_format = parse_flag("LOG_JSON", &json)?;
        }

        Ok(())
    }

    /// Load from the TOML file named by `GEOCONNECT_CONFIG` with env overrides,
    /// or from the environment alone when it is unset
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var("GEOCONNECT_CONFIG") {
            Ok(path) => Self::from_file(path)?.with_env_override(),
            Err(_) => Self::from_env(),
        }
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_env(|key| std::env::var(key).ok())?;
        Ok(self)
    }

    /// Reject configurations the server cannot safely run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret == DEV_JWT_SECRET {
            return Err(ConfigError::MissingRequired(
                "JWT_SECRET (the built-in development secret is public)".to_string(),
            ));
        }
        if self.auth.jwt_secret.len() < 16 {
            return Err(ConfigError::InvalidValue {
                key: "JWT_SECRET".to_string(),
                value: "<at least 16 bytes required>".to_string(),
            });
        }
        if self.auth.token_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "JWT_TTL_SECS".to_string(),
                value: "0".to_string(),
            });
        }
        if self.search.posts_index.is_empty() || self.search.users_index.is_empty() {
            return Err(ConfigError::MissingRequired("search index name".to_string()));
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Parse a boolean switch; accepts true/false, 1/0, yes/no and on/off
fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Split a comma-separated list, dropping blanks
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes (multipart uploads included)
    pub max_body_size: usize,

    /// Allowed origins for CORS; empty allows any origin
    pub cors_origins: Vec<String>,

    /// Directory with the web frontend, served for unmatched paths
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            max_body_size: 32 * 1024 * 1024, // 32MB
            cors_origins: vec![],
            static_dir: None,
        }
    }
}

/// Elasticsearch connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Base URL of the cluster
    pub url: String,

    /// Basic auth user
    pub username: Option<String>,

    /// Basic auth password
    pub password: Option<String>,

    /// Index holding posts
    pub posts_index: String,

    /// Index holding credentials, keyed by username
    pub users_index: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            username: None,
            password: None,
            posts_index: "posts".to_string(),
            users_index: "users".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Cloud Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Bucket receiving uploaded images
    pub bucket: String,

    /// JSON API upload endpoint
    pub upload_base_url: String,

    /// Public read endpoint used to build image URLs
    pub public_base_url: String,

    /// OAuth2 bearer token for uploads
    pub access_token: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: "geoconnect-post-images".to_string(),
            upload_base_url: "https://storage.googleapis.com/upload/storage/v1".to_string(),
            public_base_url: "https://storage.googleapis.com".to_string(),
            access_token: None,
            timeout_secs: 60,
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for signing tokens
    pub jwt_secret: String,

    /// Token issuer identifier
    pub issuer: String,

    /// Token lifetime in seconds (default: 24 hours)
    pub token_ttl_secs: u64,

    /// Usernames with admin authority
    pub admins: Vec<String>,

    /// Password hashing cost
    pub hashing: HashingConfig,

    /// Longest accepted password in bytes
    pub max_password_bytes: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            issuer: "geoconnect".to_string(),
            token_ttl_secs: 24 * 60 * 60,
            admins: vec![],
            hashing: HashingConfig::default(),
            max_password_bytes: 1024,
        }
    }
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
    /// Memory cost in KiB (default: 19456 = 19 MiB)
    pub memory_kib: u32,

    /// Iterations
    pub iterations: u32,

    /// Lanes
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Post handling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostConfig {
    /// Radius used when a search omits `range`
    pub default_range_km: f64,

    /// Maximum number of hits returned by a search
    pub search_limit: usize,

    /// Words that cause a post to be rejected (case-insensitive)
    pub filtered_words: Vec<String>,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            default_range_km: 200.0,
            search_limit: 100,
            filtered_words: vec![
                "spam".to_string(),
                "advertisement".to_string(),
                "politics".to_string(),
            ],
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
