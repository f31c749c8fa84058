//! CRX container parsing.
//!
//! Every CRX starts with:
//! - Magic: "Cr24" (4 bytes)
//! - Version: 2 or 3 (4 bytes, little-endian)
//!
//! followed by a version-specific header and then the ZIP payload.

mod v2;
mod v3;

pub use v3::{AsymmetricKeyProof, CrxFileHeader, SignedData};

use crate::error::{Result, StoreError};
use crate::models::ExtensionId;

pub const CRX_MAGIC: &[u8; 4] = b"Cr24";

/// Size of magic plus version plus the first length field, shared by both formats.
const PREFIX_LEN: usize = 12;

/// Version-specific header contents.
#[derive(Debug, Clone, PartialEq)]
pub enum CrxHeader {
    V2 {
        signature: Vec<u8>,
    },
    V3 {
        /// Undecoded header bytes as they appeared in the file.
        raw: Vec<u8>,
        proofs: Vec<AsymmetricKeyProof>,
    },
}

/// A parsed CRX file. The payload is a ZIP archive.
#[derive(Debug, Clone)]
pub struct CrxPackage {
    pub id: ExtensionId,
    pub public_key: Vec<u8>,
    pub header: CrxHeader,
    pub payload: Vec<u8>,
}

impl CrxPackage {
    pub fn format_version(&self) -> u32 {
        match self.header {
            CrxHeader::V2 { .. } => 2,
            CrxHeader::V3 { .. } => 3,
        }
    }
}

pub fn parse(data: &[u8]) -> Result<CrxPackage> {
    if data.len() < 4 || &data[..4] != CRX_MAGIC {
        return Err(StoreError::Format("missing Cr24 magic".to_string()));
    }
    if data.len() < PREFIX_LEN {
        return Err(StoreError::Format("CRX file too small".to_string()));
    }

    match read_u32(data, 4)? {
        2 => v2::parse(data),
        3 => v3::parse(data),
        other => Err(StoreError::Format(format!(
            "unsupported CRX version: {}",
            other
        ))),
    }
}

pub(crate) fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    data.get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| StoreError::Format(format!("truncated at offset {}", offset)))
}

/// Slice `len` bytes at `start`, failing instead of panicking on overflow.
pub(crate) fn section(data: &[u8], start: usize, len: u32, what: &str) -> Result<std::ops::Range<usize>> {
    let end = start
        .checked_add(len as usize)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| StoreError::Format(format!("{} runs past end of file", what)))?;
    Ok(start..end)
}
