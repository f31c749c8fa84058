use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::io;
use std::path::Path;
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::{Result, StoreError};
use crate::identity::id_from_manifest_key;
use crate::models::{ExtensionId, InstallOrigin, InstalledExtension, compare_versions};
use crate::unpack::{MANIFEST_FILE, read_manifest};

/// `<root>/<id>/<version>_0` is two levels below the root.
pub const MAX_DEPTH: usize = 2;

/// Find every extension directory under `root`.
///
/// A directory holding `manifest.json` is a leaf: nothing below it is
/// visited. Staging directories of in-flight installs are ignored.
pub fn discover(root: &Path) -> Vec<InstalledExtension> {
    let mut found = Vec::new();
    if !root.is_dir() {
        return found;
    }

    let mut walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(MAX_DEPTH)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        if is_staging_dir(entry.file_name()) {
            walker.skip_current_dir();
            continue;
        }
        if !entry.path().join(MANIFEST_FILE).is_file() {
            continue;
        }
        walker.skip_current_dir();

        match classify(entry.path()) {
            Ok(record) => found.push(record),
            Err(e) => warn!("ignoring {}: {}", entry.path().display(), e),
        }
    }

    found
}

fn classify(dir: &Path) -> Result<InstalledExtension> {
    let manifest = read_manifest(dir)?;
    let origin = match manifest.key.as_deref() {
        Some(key) => InstallOrigin::Store {
            id: id_from_manifest_key(key)?,
        },
        None => InstallOrigin::Unpacked,
    };

    Ok(InstalledExtension {
        path: dir.to_path_buf(),
        manifest,
        origin,
    })
}

/// Keep one store record per ID: the highest version, then the greatest path.
/// Unpacked records always pass through.
pub fn dedupe(records: Vec<InstalledExtension>) -> Vec<InstalledExtension> {
    let mut result = Vec::new();
    let mut newest: BTreeMap<ExtensionId, InstalledExtension> = BTreeMap::new();

    for record in records {
        let InstallOrigin::Store { id } = &record.origin else {
            result.push(record);
            continue;
        };
        match newest.get(id) {
            Some(current) if !supersedes(&record, current) => {}
            _ => {
                newest.insert(id.clone(), record);
            }
        }
    }

    result.extend(newest.into_values());
    result
}

fn supersedes(candidate: &InstalledExtension, current: &InstalledExtension) -> bool {
    compare_versions(candidate.version(), current.version())
        .then_with(|| candidate.path.cmp(&current.path))
        == Ordering::Greater
}

/// The current store install of `id`, if one exists under `root`.
pub fn find_install(id: &ExtensionId, root: &Path) -> Option<InstalledExtension> {
    dedupe(discover(&root.join(id.as_str())))
        .into_iter()
        .find(|record| record.id() == Some(id))
}

/// All current installs under `root`, one per store ID.
pub fn installed_extensions(root: &Path) -> Vec<InstalledExtension> {
    dedupe(discover(root))
}

/// [`find_install`] on the blocking pool.
pub async fn find_install_async(
    id: &ExtensionId,
    root: &Path,
) -> Result<Option<InstalledExtension>> {
    let (id, root) = (id.clone(), root.to_path_buf());
    tokio::task::spawn_blocking(move || find_install(&id, &root))
        .await
        .map_err(|e| StoreError::Io(io::Error::other(e)))
}

/// [`installed_extensions`] on the blocking pool.
pub async fn installed_extensions_async(root: &Path) -> Result<Vec<InstalledExtension>> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || installed_extensions(&root))
        .await
        .map_err(|e| StoreError::Io(io::Error::other(e)))
}

pub(crate) fn is_staging_dir(name: &OsStr) -> bool {
    name.to_str().is_some_and(|n| Uuid::parse_str(n).is_ok())
}

/// Remove staging directories left behind by interrupted installs of one ID.
/// Callers must hold that ID's install guard.
pub async fn sweep_staging(id_dir: &Path) -> Result<usize> {
    let mut entries = match tokio::fs::read_dir(id_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        if is_staging_dir(&entry.file_name()) && entry.file_type().await?.is_dir() {
            debug!("removing orphaned staging directory {}", entry.path().display());
            tokio::fs::remove_dir_all(entry.path()).await?;
            removed += 1;
        }
    }
    Ok(removed)
}
