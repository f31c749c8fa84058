use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{ExtensionId, InstalledExtension};
use crate::error::{ErrorKind, StoreError};

/// Lifecycle notifications published by the install coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InstallEvent {
    Downloading {
        id: ExtensionId,
        url: String,
    },
    Installed {
        id: ExtensionId,
        version: String,
        path: PathBuf,
    },
    Updated {
        id: ExtensionId,
        from: String,
        to: String,
        path: PathBuf,
    },
    Failed {
        id: ExtensionId,
        kind: ErrorKind,
        message: String,
    },
    Uninstalled {
        id: ExtensionId,
    },
}

/// Serialisable install outcome for UI hosts that should not see raw errors.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum InstallReport {
    Installed {
        id: ExtensionId,
        version: String,
        path: PathBuf,
    },
    Failed {
        id: ExtensionId,
        kind: ErrorKind,
        message: String,
    },
}

impl InstallReport {
    pub fn from_result(id: &ExtensionId, result: Result<InstalledExtension, StoreError>) -> Self {
        match result {
            Ok(installed) => InstallReport::Installed {
                id: id.clone(),
                version: installed.version().to_string(),
                path: installed.path,
            },
            Err(e) => InstallReport::Failed {
                id: id.clone(),
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, InstallReport::Installed { .. })
    }
}
