//! Poller configuration loaded from YAML.
//!
//! Every section and field is optional; a missing file section falls back to
//! the defaults below.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use ingestion::source::DEFAULT_DISCOVERY_URL;
use ingestion::SourceConfig;
use serde::Deserialize;
use tracing::debug;

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PollerConfig {
    #[serde(default)]
    pub source: SourceSection,
    #[serde(default)]
    pub schedule: ScheduleSection,
    #[serde(default)]
    pub server: ServerSection,
}

/// Upstream endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSection {
    #[serde(default = "default_discovery_url")]
    pub discovery_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_discovery_url() -> String {
    DEFAULT_DISCOVERY_URL.to_string()
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            discovery_url: default_discovery_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSection {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Number of cycle records kept for the status API.
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

fn default_poll_interval() -> u64 {
    300
}

fn default_history_size() -> usize {
    50
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            history_size: default_history_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_enabled() -> bool {
    true
}

fn default_port() -> u16 {
    8090
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            port: default_port(),
        }
    }
}

impl PollerConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: PollerConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        debug!(path = %path.display(), "Loaded poller config");
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.schedule.poll_interval_secs == 0 {
            bail!("schedule.poll_interval_secs must be greater than zero");
        }
        if self.source.request_timeout_secs == 0 {
            bail!("source.request_timeout_secs must be greater than zero");
        }
        if self.source.discovery_url.trim().is_empty() {
            bail!("source.discovery_url must not be empty");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.schedule.poll_interval_secs)
    }

    /// HTTP source settings for the given API key.
    pub fn source_config(&self, api_key: &str) -> SourceConfig {
        SourceConfig {
            discovery_url: self.source.discovery_url.clone(),
            api_key: api_key.to_string(),
            request_timeout: Duration::from_secs(self.source.request_timeout_secs),
        }
    }
}
