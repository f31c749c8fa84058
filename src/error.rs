use serde::{Deserialize, Serialize};

use crate::models::ExtensionId;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Errors produced while acquiring, installing or updating a package.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Invalid CRX container: {0}")]
    Format(String),

    #[error("Extension ID mismatch: requested {expected}, package is {actual}")]
    IdentityMismatch {
        expected: ExtensionId,
        actual: ExtensionId,
    },

    #[error("Invalid manifest: {0}")]
    Manifest(String),

    #[error("Failed to unpack extension: {0}")]
    Unpack(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Extension {0} is already being installed")]
    InstallInProgress(ExtensionId),

    #[error("Extension {0} is blocked by policy")]
    PolicyBlocked(ExtensionId),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Stable, serialisable classification of a [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Format,
    IdentityMismatch,
    Manifest,
    Unpack,
    Network,
    InstallInProgress,
    PolicyBlocked,
    Config,
    Io,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Format(_) => ErrorKind::Format,
            StoreError::IdentityMismatch { .. } => ErrorKind::IdentityMismatch,
            StoreError::Manifest(_) | StoreError::Json(_) => ErrorKind::Manifest,
            StoreError::Unpack(_) => ErrorKind::Unpack,
            StoreError::Network(_) => ErrorKind::Network,
            StoreError::InstallInProgress(_) => ErrorKind::InstallInProgress,
            StoreError::PolicyBlocked(_) => ErrorKind::PolicyBlocked,
            StoreError::Config(_) => ErrorKind::Config,
            StoreError::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Network(err.to_string())
    }
}

impl From<zip::result::ZipError> for StoreError {
    fn from(err: zip::result::ZipError) -> Self {
        StoreError::Unpack(err.to_string())
    }
}
