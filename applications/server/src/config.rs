/// Server configuration
use crate::error::{Result, ServerError};
use refrain_core::Topics;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_server")]
    pub server: ServerSettings,

    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    #[serde(default = "default_auth")]
    pub auth: AuthSettings,

    #[serde(default)]
    pub refill: RefillSettings,

    #[serde(default)]
    pub messaging: MessagingSettings,

    #[serde(default)]
    pub ingress: IngressSettings,

    #[serde(default)]
    pub bootstrap: BootstrapSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthSettings {
    pub jwt_secret: String,

    #[serde(default = "default_jwt_expiration_hours")]
    pub jwt_expiration_hours: u64,
}

/// Queue refill policy
///
/// Manual checks (HTTP) and event-driven backfill use different batch caps.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RefillSettings {
    pub min_size: i64,
    pub manual_max_batch: i64,
    pub event_max_batch: i64,
    pub default_genre: String,
    /// Placeholders older than this stop counting as in-flight
    pub reservation_ttl_secs: u64,
    /// Songs sampled into a new user's queue
    pub initial_seed_size: usize,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MessagingSettings {
    /// Broker bridge base URL; outbound messages are only logged when unset
    pub broker_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub topics: Topics,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IngressSettings {
    pub workers: usize,
    /// Messages waiting for a worker before the push endpoint answers 503
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BootstrapSettings {
    pub default_username: String,
}

impl RefillSettings {
    pub fn reservation_ttl(&self) -> Duration {
        Duration::from_secs(self.reservation_ttl_secs)
    }
}

impl MessagingSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(10))
    }
}

impl ServerConfig {
    /// Load configuration from file and environment
    ///
    /// Environment variables use the `REFRAIN_` prefix and `__` between
    /// nesting levels, e.g. `REFRAIN_AUTH__JWT_SECRET`.
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder();

        // Load from config file if it exists
        let config_path = PathBuf::from("config.toml");
        if config_path.exists() {
            settings = settings.add_source(config::File::from(config_path));
        }

        settings = settings.add_source(
            config::Environment::with_prefix("REFRAIN")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            return Err(ServerError::Config(
                "JWT secret is required (set REFRAIN_AUTH__JWT_SECRET)".to_string(),
            ));
        }

        if self.refill.min_size < 0 {
            return Err(ServerError::Config("refill.min_size must be >= 0".to_string()));
        }

        if self.refill.manual_max_batch < 1 || self.refill.event_max_batch < 1 {
            return Err(ServerError::Config(
                "refill batch sizes must be at least 1".to_string(),
            ));
        }

        if self.ingress.workers == 0 {
            return Err(ServerError::Config(
                "ingress.workers must be at least 1".to_string(),
            ));
        }

        if self.ingress.queue_capacity == 0 {
            return Err(ServerError::Config(
                "ingress.queue_capacity must be at least 1".to_string(),
            ));
        }

        if self.bootstrap.default_username.trim().is_empty() {
            return Err(ServerError::Config(
                "bootstrap.default_username cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

// Default values
fn default_server() -> ServerSettings {
    ServerSettings {
        host: default_host(),
        port: default_port(),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_storage() -> StorageSettings {
    StorageSettings {
        database_url: default_database_url(),
    }
}

fn default_database_url() -> String {
    "sqlite://./data/refrain.db".to_string()
}

fn default_auth() -> AuthSettings {
    AuthSettings {
        jwt_secret: String::new(),
        jwt_expiration_hours: default_jwt_expiration_hours(),
    }
}

fn default_jwt_expiration_hours() -> u64 {
    24
}

impl Default for RefillSettings {
    fn default() -> Self {
        Self {
            min_size: 10,
            manual_max_batch: 10,
            event_max_batch: 1,
            default_genre: "hisa".to_string(),
            reservation_ttl_secs: 600,
            initial_seed_size: 10,
        }
    }
}

impl Default for IngressSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 256,
        }
    }
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            default_username: "admin".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            storage: default_storage(),
            auth: default_auth(),
            refill: RefillSettings::default(),
            messaging: MessagingSettings::default(),
            ingress: IngressSettings::default(),
            bootstrap: BootstrapSettings::default(),
        }
    }
}
