//! Extension ID derivation.
//!
//! An ID is the first 128 bits of SHA-256 over the DER-encoded public key,
//! written as hex with every nibble shifted into `a..=p` so it never looks
//! like a numeric host component.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

use crate::error::{Result, StoreError};
use crate::models::ExtensionId;

/// Number of digest bytes that make up an ID (32 nibbles).
pub const ID_BYTES: usize = 16;

pub fn id_from_public_key(public_key: &[u8]) -> ExtensionId {
    let digest = Sha256::digest(public_key);
    encode_id(&digest[..ID_BYTES])
}

pub fn id_from_public_key_base64(key: &str) -> Result<ExtensionId> {
    let der = STANDARD
        .decode(key.trim())
        .map_err(|e| StoreError::Manifest(format!("Invalid base64 public key: {}", e)))?;
    Ok(id_from_public_key(&der))
}

/// Same derivation, for an install that exposes its key via `manifest.json`.
pub fn id_from_manifest_key(manifest_key: &str) -> Result<ExtensionId> {
    id_from_public_key_base64(manifest_key)
}

/// Render the 16-byte `crx_id` asserted by a CRX3 signed header.
pub fn id_from_crx_id(crx_id: &[u8]) -> Result<ExtensionId> {
    if crx_id.len() != ID_BYTES {
        return Err(StoreError::Format(format!(
            "crx_id must be {} bytes, got {}",
            ID_BYTES,
            crx_id.len()
        )));
    }
    Ok(encode_id(crx_id))
}

fn encode_id(bytes: &[u8]) -> ExtensionId {
    let id: String = bytes
        .iter()
        .flat_map(|b| [b >> 4, b & 0x0f])
        .map(|nibble| (b'a' + nibble) as char)
        .collect();
    ExtensionId::from_trusted(id)
}
