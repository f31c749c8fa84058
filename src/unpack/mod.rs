use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

use crate::crx::CrxPackage;
use crate::error::{Result, StoreError};
use crate::models::Manifest;

pub const MANIFEST_FILE: &str = "manifest.json";

/// Extract the package payload into `output_dir` and stamp its public key into
/// `manifest.json`. `output_dir` should be a fresh staging directory.
pub fn unpack(package: &CrxPackage, output_dir: &Path) -> Result<Manifest> {
    extract_zip(&package.payload, output_dir)?;
    inject_manifest_key(output_dir, &package.public_key)
}

/// Runs [`unpack`] on the blocking pool.
pub async fn unpack_async(package: CrxPackage, output_dir: PathBuf) -> Result<Manifest> {
    tokio::task::spawn_blocking(move || unpack(&package, &output_dir))
        .await
        .map_err(|e| StoreError::Unpack(format!("unpack task failed: {}", e)))?
}

pub fn extract_zip(data: &[u8], output_dir: &Path) -> Result<()> {
    let cursor = Cursor::new(data);
    let mut archive = ZipArchive::new(cursor)
        .map_err(|e| StoreError::Unpack(format!("Failed to read ZIP from CRX: {}", e)))?;

    archive
        .extract(output_dir)
        .map_err(|e| StoreError::Unpack(format!("Failed to extract CRX contents: {}", e)))?;

    Ok(())
}

/// Rewrite `manifest.json` with `key` set, keeping every other field as-is.
pub fn inject_manifest_key(extension_dir: &Path, public_key: &[u8]) -> Result<Manifest> {
    let manifest_path = extension_dir.join(MANIFEST_FILE);
    let raw = fs::read_to_string(&manifest_path).map_err(|e| {
        StoreError::Manifest(format!("cannot read {}: {}", manifest_path.display(), e))
    })?;
    // Some store packages ship a UTF-8 BOM.
    let raw = raw.trim_start_matches('\u{feff}');

    let mut value: Value =
        serde_json::from_str(raw).map_err(|e| StoreError::Manifest(e.to_string()))?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| StoreError::Manifest("manifest is not a JSON object".to_string()))?;
    object.insert(
        "key".to_string(),
        Value::String(STANDARD.encode(public_key)),
    );

    fs::write(&manifest_path, serde_json::to_string_pretty(&value)?)?;

    serde_json::from_value(value).map_err(|e| StoreError::Manifest(e.to_string()))
}

pub fn read_manifest(extension_dir: &Path) -> Result<Manifest> {
    let raw = fs::read_to_string(extension_dir.join(MANIFEST_FILE))?;
    Manifest::parse(raw.trim_start_matches('\u{feff}'))
}
