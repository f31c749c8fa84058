// CRX2 layout:
// - Magic: "Cr24" (4 bytes)
// - Version: 2 (4 bytes, little-endian)
// - Public key length (4 bytes, little-endian)
// - Signature length (4 bytes, little-endian)
// - Public key, then signature
// - ZIP data

use super::{CrxHeader, CrxPackage, read_u32, section};
use crate::error::Result;
use crate::identity::id_from_public_key;

const HEADER_LEN: usize = 16;

pub(super) fn parse(data: &[u8]) -> Result<CrxPackage> {
    let key_len = read_u32(data, 8)?;
    let sig_len = read_u32(data, 12)?;

    let key = section(data, HEADER_LEN, key_len, "public key")?;
    let sig = section(data, key.end, sig_len, "signature")?;

    let public_key = data[key].to_vec();

    Ok(CrxPackage {
        // CRX2 has no declared ID to cross-check.
        id: id_from_public_key(&public_key),
        public_key,
        header: CrxHeader::V2 {
            signature: data[sig.clone()].to_vec(),
        },
        payload: data[sig.end..].to_vec(),
    })
}
