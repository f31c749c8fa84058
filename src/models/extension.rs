use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::StoreError;

static EXTENSION_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-p]{32}$").unwrap());

/// Canonical 32-character extension identifier over the alphabet `a`..=`p`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExtensionId(String);

impl ExtensionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build an ID from characters already known to be in the ID alphabet.
    pub(crate) fn from_trusted(id: String) -> Self {
        debug_assert!(EXTENSION_ID_RE.is_match(&id));
        Self(id)
    }
}

impl FromStr for ExtensionId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if EXTENSION_ID_RE.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(StoreError::Config(format!("Invalid extension ID: {}", s)))
        }
    }
}

impl TryFrom<String> for ExtensionId {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ExtensionId> for String {
    fn from(id: ExtensionId) -> Self {
        id.0
    }
}

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl AsRef<str> for ExtensionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Typed view over `manifest.json`. Unknown fields are ignored here; the
/// unpacker edits the raw JSON so nothing is lost on disk.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Manifest {
    pub name: Option<String>,
    pub version: Option<String>,
    pub manifest_version: Option<u8>,
    pub description: Option<String>,
    pub key: Option<String>,
    pub update_url: Option<String>,
    pub background: Option<Background>,
}

impl Manifest {
    pub fn parse(json: &str) -> Result<Self, StoreError> {
        serde_json::from_str(json).map_err(|e| StoreError::Manifest(e.to_string()))
    }
}

/// Background context: MV3 service worker or MV2 scripts/page.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Background {
    ServiceWorker {
        service_worker: String,
        #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
    },
    Scripts {
        #[serde(default)]
        scripts: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        page: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        persistent: Option<bool>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InstallOrigin {
    /// Installed from the store; the ID comes from `manifest.key`.
    Store { id: ExtensionId },
    /// Developer directory without a key, identified by path only.
    Unpacked,
}

/// An extension found on disk.
#[derive(Debug, Clone, Serialize)]
pub struct InstalledExtension {
    pub path: PathBuf,
    pub manifest: Manifest,
    pub origin: InstallOrigin,
}

impl InstalledExtension {
    pub fn id(&self) -> Option<&ExtensionId> {
        match &self.origin {
            InstallOrigin::Store { id } => Some(id),
            InstallOrigin::Unpacked => None,
        }
    }

    pub fn version(&self) -> &str {
        self.manifest.version.as_deref().unwrap_or("0")
    }

    pub fn name(&self) -> &str {
        self.manifest.name.as_deref().unwrap_or("Unknown Extension")
    }

    pub fn is_store(&self) -> bool {
        matches!(self.origin, InstallOrigin::Store { .. })
    }
}
