// CRX3 layout:
// - Magic: "Cr24" (4 bytes)
// - Version: 3 (4 bytes, little-endian)
// - Header length (4 bytes, little-endian)
// - Header (CrxFileHeader protobuf, variable length)
// - ZIP data

use prost::Message;

use super::{CrxHeader, CrxPackage, PREFIX_LEN, read_u32, section};
use crate::error::{Result, StoreError};
use crate::identity::{id_from_crx_id, id_from_public_key};

#[derive(Clone, PartialEq, Message)]
pub struct AsymmetricKeyProof {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub public_key: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub signature: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CrxFileHeader {
    #[prost(message, repeated, tag = "2")]
    pub sha256_with_rsa: Vec<AsymmetricKeyProof>,
    #[prost(message, repeated, tag = "3")]
    pub sha256_with_ecdsa: Vec<AsymmetricKeyProof>,
    #[prost(bytes = "vec", optional, tag = "10000")]
    pub signed_header_data: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct SignedData {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub crx_id: Option<Vec<u8>>,
}

pub(super) fn parse(data: &[u8]) -> Result<CrxPackage> {
    let header_len = read_u32(data, 8)?;
    let header_range = section(data, PREFIX_LEN, header_len, "header")?;
    let raw = &data[header_range.clone()];

    let header = CrxFileHeader::decode(raw)
        .map_err(|e| StoreError::Format(format!("undecodable CRX3 header: {}", e)))?;

    let signed = header
        .signed_header_data
        .as_deref()
        .ok_or_else(|| StoreError::Format("missing signed_header_data".to_string()))?;
    let crx_id = SignedData::decode(signed)
        .map_err(|e| StoreError::Format(format!("undecodable signed header: {}", e)))?
        .crx_id
        .ok_or_else(|| StoreError::Format("missing crx_id".to_string()))?;
    let declared = id_from_crx_id(&crx_id)?;

    // Several keys may sign a CRX3; at least one must prove the declared ID.
    let public_key = header
        .sha256_with_rsa
        .iter()
        .chain(header.sha256_with_ecdsa.iter())
        .filter_map(|proof| proof.public_key.as_ref())
        .find(|key| id_from_public_key(key) == declared)
        .cloned()
        .ok_or_else(|| {
            StoreError::Format(format!("no key proof matches declared ID {}", declared))
        })?;

    let proofs = header
        .sha256_with_rsa
        .into_iter()
        .chain(header.sha256_with_ecdsa)
        .collect();

    Ok(CrxPackage {
        id: declared,
        public_key,
        header: CrxHeader::V3 {
            raw: raw.to_vec(),
            proofs,
        },
        payload: data[header_range.end..].to_vec(),
    })
}
