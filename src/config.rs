use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Simple upload endpoint limit; larger files need an upload session.
pub const SMALL_FILE_LIMIT: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub basic: BasicConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
}

impl Config {
    /// Defaults overlaid with `AUTODOC_*` variables, e.g.
    /// `AUTODOC_DATABASE__MAX_CONNECTIONS=10`. A malformed variable is an
    /// error; the caller decides whether to stop.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("AUTODOC_").split("__"))
            .extract()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub loglevel: String,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:5000".to_string(),
            loglevel: "info".to_string(),
        }
    }
}

/// Connection pool settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
    /// Total acquisition attempts before the pool reports exhaustion.
    pub connect_retries: u32,
    pub connect_timeout_secs: u64,
    pub retry_backoff_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://autodoc.db".to_string(),
            min_connections: 1,
            max_connections: 5,
            connect_retries: 3,
            connect_timeout_secs: 10,
            retry_backoff_ms: 1000,
        }
    }
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteConfig {
    pub graph_base_url: String,
    pub site_id: String,
    pub drive_id: String,
    pub tenant_id: String,
    /// Overrides the tenant-derived token endpoint when non-empty.
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
    pub small_file_limit: usize,
    pub request_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            graph_base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            site_id: String::new(),
            drive_id: String::new(),
            tenant_id: String::new(),
            token_url: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            scope: DEFAULT_GRAPH_SCOPE.to_string(),
            small_file_limit: SMALL_FILE_LIMIT,
            request_timeout_secs: 30,
        }
    }
}

impl RemoteConfig {
    pub fn token_endpoint(&self) -> String {
        if self.token_url.is_empty() {
            format!(
                "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
                self.tenant_id
            )
        } else {
            self.token_url.clone()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
