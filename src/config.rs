use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;

/// Placeholder session secret used when neither `SECRET_KEY` nor
/// `FLASK_SECRET_KEY` is set.
pub const DEFAULT_SECRET_KEY: &str = "defaultsecret";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    /// `None` disables the request body limit entirely.
    pub max_upload_bytes: Option<usize>,
}

#[derive(Clone, Deserialize)]
pub struct StorageConfig {
    pub provider: String,
    pub bucket: String,
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub endpoint: Option<String>,
}

// Credentials stay out of the logs.
impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("provider", &self.provider)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id.as_ref().map(|_| "***"))
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "***"))
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[derive(Clone, Deserialize)]
pub struct AppConfig {
    pub secret_key: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("secret_key", &"***")
            .field("uses_default_secret", &self.uses_default_secret())
            .finish()
    }
}

impl AppConfig {
    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }
}

impl Config {
    /// Load configuration from the process environment, after reading `.env`
    /// if one exists.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Storage values are only checked for presence; missing ones are passed
    /// through empty and surface as errors on the first storage call.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        Ok(Self {
            server: ServerConfig {
                port: lookup("PORT")
                    .unwrap_or_else(|| "5000".to_string())
                    .parse()
                    .context("PORT must be a valid port number")?,
                host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                cors_allowed_origins: lookup("ALLOWED_ORIGINS")
                    .unwrap_or_else(|| "*".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                max_upload_bytes: non_empty("MAX_UPLOAD_BYTES")
                    .map(|v| v.parse())
                    .transpose()
                    .context("MAX_UPLOAD_BYTES must be a byte count")?,
            },
            storage: StorageConfig {
                provider: lookup("STORAGE_PROVIDER").unwrap_or_else(|| "s3".to_string()),
                bucket: lookup("AWS_BUCKET").unwrap_or_default(),
                region: lookup("AWS_DEFAULT_REGION").unwrap_or_default(),
                access_key_id: non_empty("AWS_ACCESS_KEY_ID"),
                secret_access_key: non_empty("AWS_SECRET_ACCESS_KEY"),
                session_token: non_empty("AWS_SESSION_TOKEN"),
                endpoint: non_empty("S3_ENDPOINT"),
            },
            app: AppConfig {
                secret_key: non_empty("SECRET_KEY")
                    .or_else(|| non_empty("FLASK_SECRET_KEY"))
                    .unwrap_or_else(|| DEFAULT_SECRET_KEY.to_string()),
            },
        })
    }
}
