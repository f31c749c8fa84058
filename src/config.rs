use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, StoreError};
use crate::install::InstallPolicy;
use crate::models::ExtensionId;

pub const DEFAULT_CRX_URL: &str = "https://clients2.google.com/service/update2/crx";
pub const DEFAULT_UPDATE_URL: &str = "https://update.googleapis.com/service/update2/json";

/// Runtime configuration. Every field has a default so a TOML file only needs
/// to name what it overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub extensions_dir: PathBuf,
    /// Browser version reported to the store as `prodversion`.
    pub chrome_version: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub crx_url: String,
    pub update_url: String,
    /// `manifest.update_url` values whose extensions may be auto-updated.
    pub trusted_update_urls: Vec<String>,
    pub allowlist: Option<Vec<ExtensionId>>,
    pub denylist: Vec<ExtensionId>,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Period of the background timer.
    pub check_interval_seconds: u64,
    /// Minimum spacing between two update checks, whatever triggered them.
    pub min_interval_seconds: u64,
    /// Idle threshold handed to the host idle probe.
    pub idle_threshold_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            extensions_dir: default_extensions_dir(),
            chrome_version: "130.0.0.0".to_string(),
            user_agent: format!("extstore/{}", env!("CARGO_PKG_VERSION")),
            timeout_seconds: 30,
            crx_url: DEFAULT_CRX_URL.to_string(),
            update_url: DEFAULT_UPDATE_URL.to_string(),
            trusted_update_urls: vec![DEFAULT_CRX_URL.to_string()],
            allowlist: None,
            denylist: Vec::new(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: 5 * 60 * 60,
            min_interval_seconds: 3 * 60 * 60,
            idle_threshold_seconds: 10 * 60,
        }
    }
}

impl StoreConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| StoreError::Config(e.to_string()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn policy(&self) -> InstallPolicy {
        InstallPolicy::new(
            self.allowlist
                .as_ref()
                .map(|ids| ids.iter().cloned().collect::<HashSet<_>>()),
            self.denylist.iter().cloned().collect(),
        )
    }

    pub fn is_trusted_update_url(&self, url: &str) -> bool {
        let url = url.trim_end_matches('/');
        self.trusted_update_urls
            .iter()
            .any(|trusted| trusted.trim_end_matches('/') == url)
    }
}

impl SchedulerConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_seconds)
    }

    pub fn idle_threshold(&self) -> Duration {
        Duration::from_secs(self.idle_threshold_seconds)
    }
}

fn default_extensions_dir() -> PathBuf {
    std::env::var_os("EXTSTORE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("Extensions"))
}
