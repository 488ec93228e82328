use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Maximum number of pending events submitted in a single flush.
pub const DEFAULT_EVENT_BATCH_SIZE: usize = 750;

/// Platform configuration loaded from `config.yml`
///
/// Contains the store credential, scheduling cadence and worker pool size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub schedule: ScheduleSettings,

    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default)]
    pub debug_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Webstore secret key. Empty means the integration is not set up.
    #[serde(default)]
    pub secret_key: String,

    /// Behind a proxy the backend server authenticates players, so UUIDs are stable.
    #[serde(default)]
    pub proxy_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    #[serde(default = "default_catalog_refresh_secs")]
    pub catalog_refresh_secs: u64,

    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,

    #[serde(default = "default_event_flush_secs")]
    pub event_flush_secs: u64,

    #[serde(default = "default_event_batch_size")]
    pub event_batch_size: usize,

    /// Delay before retrying a connect that failed on a network or server error
    #[serde(default = "default_connect_retry_secs")]
    pub connect_retry_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            proxy_mode: false,
        }
    }
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            catalog_refresh_secs: default_catalog_refresh_secs(),
            heartbeat_secs: default_heartbeat_secs(),
            event_flush_secs: default_event_flush_secs(),
            event_batch_size: default_event_batch_size(),
            connect_retry_secs: default_connect_retry_secs(),
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            schedule: ScheduleSettings::default(),
            workers: default_workers(),
            debug_mode: false,
        }
    }
}

fn default_catalog_refresh_secs() -> u64 {
    30 * 60
}

fn default_heartbeat_secs() -> u64 {
    10 * 60
}

fn default_event_flush_secs() -> u64 {
    60
}

fn default_event_batch_size() -> usize {
    DEFAULT_EVENT_BATCH_SIZE
}

fn default_connect_retry_secs() -> u64 {
    60
}

fn default_workers() -> usize {
    4
}

impl ScheduleSettings {
    pub fn catalog_refresh_period(&self) -> Duration {
        Duration::from_secs(self.catalog_refresh_secs)
    }

    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }

    pub fn event_flush_period(&self) -> Duration {
        Duration::from_secs(self.event_flush_secs)
    }

    pub fn connect_retry_delay(&self) -> Duration {
        Duration::from_secs(self.connect_retry_secs)
    }
}

impl PlatformConfig {
    /// Whether a secret key has been entered at all.
    pub fn has_secret_key(&self) -> bool {
        !self.server.secret_key.trim().is_empty()
    }

    /// Reject values that would stall or spin the scheduler.
    pub fn validate(&self) -> anyhow::Result<()> {
        let schedule = &self.schedule;
        if schedule.event_batch_size == 0 {
            anyhow::bail!("schedule.event_batch_size must be greater than zero");
        }
        if schedule.catalog_refresh_secs == 0
            || schedule.heartbeat_secs == 0
            || schedule.event_flush_secs == 0
            || schedule.connect_retry_secs == 0
        {
            anyhow::bail!("schedule periods must be greater than zero seconds");
        }
        if self.workers == 0 {
            anyhow::bail!("workers must be greater than zero");
        }
        Ok(())
    }
}
