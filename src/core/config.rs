use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const CONFIG_FILE_NAME: &str = "botdeck.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DashboardConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_url")]
    pub url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Six-field cron (seconds first), as the scheduler expects.
    #[serde(default = "default_schedule")]
    pub schedule: String,
    #[serde(default = "default_quiet_period_secs")]
    pub quiet_period_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Relative paths resolve against the data directory.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    17900
}
fn default_gateway_url() -> String {
    "http://127.0.0.1:18789".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_schedule() -> String {
    "0/30 * * * * *".to_string()
}
fn default_quiet_period_secs() -> i64 {
    crate::core::reconcile::DEFAULT_QUIET_PERIOD_SECS
}
fn default_db_path() -> String {
    "botdeck.db".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            token: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            schedule: default_schedule(),
            quiet_period_secs: default_quiet_period_secs(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl DashboardConfig {
    pub async fn load<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let config_path = data_dir.as_ref().join(CONFIG_FILE_NAME);
        let mut config = if config_path.exists() {
            let content = tokio::fs::read_to_string(&config_path).await?;
            let config: DashboardConfig = toml::from_str(&content)?;
            info!("Loaded config from {}", config_path.display());
            config
        } else {
            info!("No {} found, using defaults.", CONFIG_FILE_NAME);
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Environment wins over the file. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = lookup("BOTDECK_GATEWAY_URL") {
            self.gateway.url = url;
        }
        if let Some(token) = lookup("BOTDECK_GATEWAY_TOKEN") {
            self.gateway.token = token;
        }
    }

    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        let path = Path::new(&self.database.path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            data_dir.join(path)
        }
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway.timeout_secs)
    }

    /// Negative values mean no quiet period; values past the `TimeDelta` range saturate.
    pub fn quiet_period(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::try_seconds(self.sync.quiet_period_secs.max(0))
            .unwrap_or(chrono::TimeDelta::MAX)
    }
}
