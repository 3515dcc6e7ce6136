use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub web: WebConfig,
    pub cache_path: String,
    pub media_path: String,
    pub allowed_origins: String,
    pub log_level: String,
    pub session_secret_key: String,
    pub use_secure_cookies: bool,
    pub max_upload_mb: u64,
    // Empty strings mean "no remote backend configured"; see `remote()`.
    pub remote_backend_url: String,
    pub remote_backend_anon_key: String,
    pub remote_storage_bucket: String,
}

/// Connection settings for the managed remote backend, present only when
/// both the URL and the anon key are configured.
#[derive(Debug, Clone)]
pub struct RemoteSettings {
    pub url: String,
    pub anon_key: String,
    pub storage_bucket: String,
}

impl Config {
    pub fn from_env(env_path: &Path) -> Result<Self, config::ConfigError> {
        dotenvy::from_path(env_path).map_err(|e| {
            config::ConfigError::Message(format!(
                "FATAL: Failed to load .env file from '{}'. Error: {}",
                env_path.display(),
                e
            ))
        })?;

        let cache_path = env::var("CACHE_PATH").map_err(|_| {
            config::ConfigError::Message(
                "FATAL: Environment variable 'CACHE_PATH' is not set in your .env file.".to_string(),
            )
        })?;

        let media_path = env::var("MEDIA_PATH").map_err(|_| {
            config::ConfigError::Message(
                "FATAL: Environment variable 'MEDIA_PATH' is not set in your .env file.".to_string(),
            )
        })?;

        let session_secret_key = env::var("SESSION_SECRET_KEY").map_err(|_| {
            config::ConfigError::Message(
                "FATAL: Environment variable 'SESSION_SECRET_KEY' is not set in your .env file."
                    .to_string(),
            )
        })?;

        // The cookie key must decode to 64 bytes, i.e. 128 hex characters.
        if session_secret_key.len() != 128
            || !session_secret_key.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(config::ConfigError::Message(
                "FATAL: 'SESSION_SECRET_KEY' must be 128 hexadecimal characters long (64 bytes). \
                 Run 'setup_cli secret generate' to create one."
                    .to_string(),
            ));
        }

        if Path::new(&cache_path).is_relative() {
            return Err(config::ConfigError::Message(format!(
                "FATAL: The 'CACHE_PATH' in your .env file is a relative path ('{}'). It MUST be an absolute path.",
                cache_path
            )));
        }

        if Path::new(&media_path).is_relative() {
            return Err(config::ConfigError::Message(format!(
                "FATAL: The 'MEDIA_PATH' in your .env file is a relative path ('{}'). It MUST be an absolute path.",
                media_path
            )));
        }

        let allowed_origins = env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "".to_string());
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let use_secure_cookies = env::var("USE_SECURE_COOKIES")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);

        let max_upload_mb = env::var("MAX_UPLOAD_MB")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u64>()
            .unwrap_or(10);

        // Remote backend settings are optional: with no URL/key the server
        // runs in local mode against the on-disk cache only.
        let remote_backend_url = env::var("REMOTE_BACKEND_URL").unwrap_or_else(|_| "".to_string());
        let remote_backend_anon_key =
            env::var("REMOTE_BACKEND_ANON_KEY").unwrap_or_else(|_| "".to_string());
        let remote_storage_bucket =
            env::var("REMOTE_STORAGE_BUCKET").unwrap_or_else(|_| "media".to_string());

        let builder = config::Config::builder()
            .add_source(config::File::new(
                "config/default.toml",
                config::FileFormat::Toml,
            ))
            .set_override("cache_path", cache_path)?
            .set_override("media_path", media_path)?
            .set_override("session_secret_key", session_secret_key)?
            .set_override("allowed_origins", allowed_origins)?
            .set_override("log_level", log_level)?
            .set_override("use_secure_cookies", use_secure_cookies)?
            .set_override("max_upload_mb", max_upload_mb)?
            .set_override("remote_backend_url", remote_backend_url)?
            .set_override("remote_backend_anon_key", remote_backend_anon_key)?
            .set_override("remote_storage_bucket", remote_storage_bucket)?
            .build()?;

        builder.try_deserialize()
    }

    /// Returns the full path to the key-value cache database file.
    pub fn cache_db_path(&self) -> PathBuf {
        PathBuf::from(&self.cache_path).join("cache.db")
    }

    /// Remote backend settings, if the deployment configured any.
    pub fn remote(&self) -> Option<RemoteSettings> {
        if self.remote_backend_url.trim().is_empty()
            || self.remote_backend_anon_key.trim().is_empty()
        {
            return None;
        }
        Some(RemoteSettings {
            url: self.remote_backend_url.trim_end_matches('/').to_string(),
            anon_key: self.remote_backend_anon_key.clone(),
            storage_bucket: self.remote_storage_bucket.clone(),
        })
    }
}
