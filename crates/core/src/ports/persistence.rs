use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use std::collections::BTreeSet;
use std::time::Duration;

/// Configuration store interface
pub trait ConfigStore: Send + Sync {
    /// Load configuration; a missing file yields the defaults
    fn load(&self) -> Result<AppConfig>;
}

/// Application configuration, immutable once loaded
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Local refresh interval, zero disables the timer
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "auto_refresh_seconds")]
    pub auto_refresh: Duration,

    /// Fetch interval, zero disables the timer
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "auto_fetch_seconds")]
    pub auto_fetch: Duration,

    pub scan_depth: usize,

    pub ignore_repos: BTreeSet<String>,

    /// GUI git client, started as `<gui_command> <repo path>`
    pub gui_command: String,

    /// Upper bound on concurrently running probes
    pub probe_workers: usize,

    /// A fetch still running after this long is killed
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "fetch_timeout_seconds")]
    pub fetch_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            auto_refresh: Duration::from_secs(30),
            auto_fetch: Duration::from_secs(300),
            scan_depth: 2,
            ignore_repos: BTreeSet::new(),
            gui_command: "github".to_string(),
            probe_workers: 8,
            fetch_timeout: Duration::from_secs(60),
        }
    }
}

impl AppConfig {
    /// Check constraints serde cannot express
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.probe_workers == 0 {
            return Err("probe_workers must be at least 1".to_string());
        }
        if self.gui_command.trim().is_empty() {
            return Err("gui_command must not be empty".to_string());
        }
        if self.fetch_timeout.is_zero() {
            return Err("fetch_timeout_seconds must be at least 1".to_string());
        }
        Ok(())
    }
}
