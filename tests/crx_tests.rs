mod common;

use common::*;
use extstore::StoreError;
use extstore::crx::{CrxHeader, parse};
use extstore::identity::{id_from_public_key, id_from_public_key_base64};

#[test]
fn test_crx3_round_trip_identity() {
    let key = test_key(1);
    let payload = manifest_zip("1.0.0");
    let package = parse(&build_crx3(&key, &payload)).unwrap();

    assert_eq!(package.format_version(), 3);
    assert_eq!(package.id, key_id(&key));
    assert_eq!(package.public_key, key);
    assert_eq!(id_from_public_key(&package.public_key), package.id);
    assert_eq!(
        id_from_public_key_base64(&key_base64(&package.public_key)).unwrap(),
        package.id
    );
    assert_eq!(package.payload, payload);
}

#[test]
fn test_crx3_picks_matching_proof() {
    let declared = test_key(2);
    let other = test_key(3);
    let data = build_crx3_with(&declared, &[other.clone(), declared.clone()], b"zip");

    let package = parse(&data).unwrap();
    assert_eq!(package.public_key, declared);
    match package.header {
        CrxHeader::V3 { proofs, .. } => assert_eq!(proofs.len(), 2),
        other => panic!("expected V3 header, got {:?}", other),
    }
}

#[test]
fn test_crx3_matching_key_in_ecdsa_proofs() {
    let declared = test_key(9);
    let data = build_crx3_proofs(&declared, &[test_key(10)], &[declared.clone()], b"zip");

    let package = parse(&data).unwrap();
    assert_eq!(package.public_key, declared);
    assert_eq!(package.id, key_id(&declared));
}

#[test]
fn test_crx3_without_matching_proof_rejected() {
    let data = build_crx3_with(&test_key(4), &[test_key(5)], b"zip");
    let err = parse(&data).unwrap_err();
    assert!(matches!(err, StoreError::Format(_)), "got {:?}", err);
}

#[test]
fn test_crx3_garbage_header_rejected() {
    let mut data = b"Cr24".to_vec();
    data.extend_from_slice(&3u32.to_le_bytes());
    data.extend_from_slice(&4u32.to_le_bytes());
    data.extend_from_slice(&[0xff, 0xff, 0xff, 0xff]);
    data.extend_from_slice(b"zip");
    assert!(matches!(parse(&data), Err(StoreError::Format(_))));
}

#[test]
fn test_crx3_header_length_past_end() {
    let mut data = build_crx3(&test_key(6), b"");
    data[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
    assert!(matches!(parse(&data), Err(StoreError::Format(_))));
}

#[test]
fn test_crx2_derives_id_from_key() {
    let key = test_key(7);
    let payload = manifest_zip("2.0");
    let package = parse(&build_crx2(&key, &[9u8; 128], &payload)).unwrap();

    assert_eq!(package.format_version(), 2);
    assert_eq!(package.id, key_id(&key));
    assert_eq!(package.payload, payload);
    assert_eq!(package.header, CrxHeader::V2 { signature: vec![9u8; 128] });
}

#[test]
fn test_crx2_truncated_signature() {
    let mut data = build_crx2(&test_key(8), &[1u8; 16], b"");
    data.truncate(data.len() - 1);
    assert!(matches!(parse(&data), Err(StoreError::Format(_))));
}

#[test]
fn test_non_crx_rejected() {
    let zip = manifest_zip("1.0");
    let inputs: [&[u8]; 4] = [&zip, b"Cr2", b"", b"cr24\x03\x00\x00\x00\x00\x00\x00\x00"];
    for data in inputs {
        assert!(matches!(parse(data), Err(StoreError::Format(_))));
    }
}
