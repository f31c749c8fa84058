pub mod discovery;
pub mod policy;

pub use discovery::{
    dedupe, discover, find_install, find_install_async, installed_extensions,
    installed_extensions_async, sweep_staging,
};
pub use policy::InstallPolicy;

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::crx;
use crate::download::{Downloader, HttpDownloader, crx_download_url};
use crate::error::{Result, StoreError};
use crate::models::{
    ExtensionId, InstallEvent, InstallOrigin, InstallReport, InstalledExtension, compare_versions,
};
use crate::unpack::unpack_async;
use crate::update::UpdateAvailable;

/// Chrome only accepts one to four dot-separated integers.
static VERSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(\.\d+){0,3}$").unwrap());

const EVENT_CAPACITY: usize = 64;

/// Single entry point for on-demand and update-driven installs.
///
/// Packages land in `<root>/<id>/<version>_0`. Each attempt unpacks into a
/// UUID-named sibling first and is renamed into place only once complete, so
/// the versioned path never holds a partial install.
pub struct InstallCoordinator {
    root: PathBuf,
    crx_url: String,
    chrome_version: String,
    policy: InstallPolicy,
    downloader: Arc<dyn Downloader>,
    installing: Arc<Mutex<HashSet<ExtensionId>>>,
    events: broadcast::Sender<InstallEvent>,
}

/// Marks an ID as installing until dropped.
struct InstallGuard {
    id: ExtensionId,
    installing: Arc<Mutex<HashSet<ExtensionId>>>,
}

impl Drop for InstallGuard {
    fn drop(&mut self) {
        lock(&self.installing).remove(&self.id);
    }
}

/// Staging directory removed on drop unless committed.
struct StagingDir {
    path: PathBuf,
    committed: bool,
}

impl StagingDir {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: false,
        }
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if !self.committed && self.path.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                warn!("failed to remove staging directory {}: {}", self.path.display(), e);
            }
        }
    }
}

fn lock(set: &Mutex<HashSet<ExtensionId>>) -> MutexGuard<'_, HashSet<ExtensionId>> {
    set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl InstallCoordinator {
    pub fn new(config: &StoreConfig, downloader: Arc<dyn Downloader>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            root: config.extensions_dir.clone(),
            crx_url: config.crx_url.clone(),
            chrome_version: config.chrome_version.clone(),
            policy: config.policy(),
            downloader,
            installing: Arc::new(Mutex::new(HashSet::new())),
            events,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Ok(Self::new(config, Arc::new(HttpDownloader::new(config)?)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InstallEvent> {
        self.events.subscribe()
    }

    pub fn is_installing(&self, id: &ExtensionId) -> bool {
        lock(&self.installing).contains(id)
    }

    /// Install `id` from the store, or return the existing install untouched.
    pub async fn install(&self, id: &ExtensionId) -> Result<InstalledExtension> {
        self.policy.check(id)?;
        let _guard = self.begin(id)?;

        let result = self.install_locked(id).await;
        match &result {
            Ok(installed) => self.emit(InstallEvent::Installed {
                id: id.clone(),
                version: installed.version().to_string(),
                path: installed.path.clone(),
            }),
            Err(e) => self.emit_failure(id, e),
        }
        result
    }

    /// [`install`](Self::install) with the outcome folded into a report.
    pub async fn install_report(&self, id: &ExtensionId) -> InstallReport {
        InstallReport::from_result(id, self.install(id).await)
    }

    async fn install_locked(&self, id: &ExtensionId) -> Result<InstalledExtension> {
        sweep_staging(&self.root.join(id.as_str())).await?;

        if let Some(existing) = find_install_async(id, &self.root).await? {
            debug!("{} already installed at {}", id, existing.path.display());
            return Ok(existing);
        }

        let url = crx_download_url(&self.crx_url, id, &self.chrome_version);
        let installed = self.fetch_and_stage(id, &url, None, None).await?;
        info!("Extension {} {} installed", id, installed.version());
        Ok(installed)
    }

    /// Install the version advertised by `update` next to `current`.
    pub async fn install_update(
        &self,
        current: &InstalledExtension,
        update: &UpdateAvailable,
    ) -> Result<InstalledExtension> {
        let id = &update.id;
        self.policy.check(id)?;
        let _guard = self.begin(id)?;

        if compare_versions(&update.version, current.version()).is_le() {
            debug!("{} is already at {}", id, current.version());
            return Ok(current.clone());
        }

        sweep_staging(&self.root.join(id.as_str())).await?;
        let result = self
            .fetch_and_stage(
                id,
                &update.url,
                update.sha256.as_deref(),
                Some(&update.version),
            )
            .await;

        match &result {
            Ok(installed) => {
                info!("Extension {} updated {} -> {}", id, current.version(), installed.version());
                self.emit(InstallEvent::Updated {
                    id: id.clone(),
                    from: current.version().to_string(),
                    to: installed.version().to_string(),
                    path: installed.path.clone(),
                });
            }
            Err(e) => self.emit_failure(id, e),
        }
        result
    }

    /// Remove every installed version of `id`. Returns whether anything existed.
    pub async fn uninstall(&self, id: &ExtensionId) -> Result<bool> {
        let _guard = self.begin(id)?;

        let dir = self.root.join(id.as_str());
        if !tokio::fs::try_exists(&dir).await? {
            warn!("Extension {} not found", id);
            return Ok(false);
        }

        tokio::fs::remove_dir_all(&dir).await?;
        info!("Extension {} uninstalled", id);
        self.emit(InstallEvent::Uninstalled { id: id.clone() });
        Ok(true)
    }

    fn begin(&self, id: &ExtensionId) -> Result<InstallGuard> {
        if !lock(&self.installing).insert(id.clone()) {
            return Err(StoreError::InstallInProgress(id.clone()));
        }
        Ok(InstallGuard {
            id: id.clone(),
            installing: Arc::clone(&self.installing),
        })
    }

    async fn fetch_and_stage(
        &self,
        id: &ExtensionId,
        url: &str,
        expected_sha256: Option<&str>,
        expected_version: Option<&str>,
    ) -> Result<InstalledExtension> {
        let id_dir = self.root.join(id.as_str());
        tokio::fs::create_dir_all(&id_dir).await?;

        // Deleted when it goes out of scope, whatever happens below.
        let crx_file = tempfile::Builder::new()
            .prefix(id.as_str())
            .suffix(".crx")
            .tempfile()?
            .into_temp_path();

        self.emit(InstallEvent::Downloading {
            id: id.clone(),
            url: url.to_string(),
        });
        let size = self.downloader.download(url, &crx_file).await?;
        debug!("downloaded {} bytes for {}", size, id);

        let data = tokio::fs::read(&crx_file).await?;
        if let Some(expected) = expected_sha256 {
            verify_sha256(&data, expected)?;
        }

        let package = crx::parse(&data)?;
        drop(data);
        if package.id != *id {
            return Err(StoreError::IdentityMismatch {
                expected: id.clone(),
                actual: package.id,
            });
        }

        let staging = StagingDir::new(id_dir.join(Uuid::new_v4().to_string()));
        let manifest = unpack_async(package, staging.path.clone()).await?;

        let version = manifest
            .version
            .clone()
            .ok_or_else(|| StoreError::Manifest("manifest has no version".to_string()))?;
        if !VERSION_RE.is_match(&version) {
            return Err(StoreError::Manifest(format!("invalid version: {}", version)));
        }
        if let Some(expected) = expected_version
            && compare_versions(&version, expected) != Ordering::Equal
        {
            return Err(StoreError::Manifest(format!(
                "package version {} does not match advertised {}",
                version, expected
            )));
        }

        let final_path = id_dir.join(format!("{}_0", version));
        if tokio::fs::try_exists(&final_path).await? {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", final_path.display()),
            )));
        }
        tokio::fs::rename(&staging.path, &final_path).await?;
        staging.commit();

        Ok(InstalledExtension {
            path: final_path,
            manifest,
            origin: InstallOrigin::Store { id: id.clone() },
        })
    }

    fn emit(&self, event: InstallEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn emit_failure(&self, id: &ExtensionId, error: &StoreError) {
        warn!("Extension {} failed: {}", id, error);
        self.emit(InstallEvent::Failed {
            id: id.clone(),
            kind: error.kind(),
            message: error.to_string(),
        });
    }
}

fn verify_sha256(data: &[u8], expected: &str) -> Result<()> {
    let actual = format!("{:x}", Sha256::digest(data));
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(StoreError::Format(format!(
            "checksum mismatch: expected {}, got {}",
            expected, actual
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_pattern() {
        assert!(VERSION_RE.is_match("1"));
        assert!(VERSION_RE.is_match("1.2.3.4"));
        assert!(!VERSION_RE.is_match("1.2.3.4.5"));
        assert!(!VERSION_RE.is_match("../../evil"));
        assert!(!VERSION_RE.is_match(""));
    }

    #[test]
    fn test_verify_sha256() {
        // sha256("abc")
        let digest = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
        assert!(verify_sha256(b"abc", digest).is_ok());
        assert!(verify_sha256(b"abc", &digest.to_uppercase()).is_ok());
        assert!(verify_sha256(b"abd", digest).is_err());
    }
}
