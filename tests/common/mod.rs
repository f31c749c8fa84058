#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use prost::Message;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Notify;

use extstore::config::StoreConfig;
use extstore::crx::{AsymmetricKeyProof, CrxFileHeader, SignedData};
use extstore::download::Downloader;
use extstore::identity::id_from_public_key;
use extstore::{ExtensionId, Result};

/// Deterministic stand-in for a DER public key.
pub fn test_key(seed: u8) -> Vec<u8> {
    (0..162u16).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

pub fn key_id(key: &[u8]) -> ExtensionId {
    id_from_public_key(key)
}

pub fn key_base64(key: &[u8]) -> String {
    STANDARD.encode(key)
}

pub fn build_zip(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in files {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn manifest_zip(version: &str) -> Vec<u8> {
    let manifest = format!(
        r#"{{"name": "Fixture", "version": "{}", "manifest_version": 3,
            "update_url": "https://clients2.google.com/service/update2/crx",
            "background": {{"service_worker": "sw.js"}}}}"#,
        version
    );
    build_zip(&[("manifest.json", &manifest), ("sw.js", "console.log('hi');")])
}

/// Assemble a CRX3 file. `crx_id_key` decides the declared ID; `proof_keys`
/// are the keys carried as RSA proofs.
pub fn build_crx3_with(crx_id_key: &[u8], proof_keys: &[Vec<u8>], payload: &[u8]) -> Vec<u8> {
    build_crx3_proofs(crx_id_key, proof_keys, &[], payload)
}

/// Like [`build_crx3_with`], with separate RSA and ECDSA proof lists.
pub fn build_crx3_proofs(
    crx_id_key: &[u8],
    rsa_keys: &[Vec<u8>],
    ecdsa_keys: &[Vec<u8>],
    payload: &[u8],
) -> Vec<u8> {
    let proofs = |keys: &[Vec<u8>], signature_len: usize| -> Vec<AsymmetricKeyProof> {
        keys.iter()
            .map(|key| AsymmetricKeyProof {
                public_key: Some(key.clone()),
                signature: Some(vec![0xAB; signature_len]),
            })
            .collect()
    };
    let digest = <sha2::Sha256 as sha2::Digest>::digest(crx_id_key);
    let signed = SignedData {
        crx_id: Some(digest[..16].to_vec()),
    };
    let header = CrxFileHeader {
        sha256_with_rsa: proofs(rsa_keys, 256),
        sha256_with_ecdsa: proofs(ecdsa_keys, 72),
        signed_header_data: Some(signed.encode_to_vec()),
    };
    let header = header.encode_to_vec();

    let mut data = b"Cr24".to_vec();
    data.extend_from_slice(&3u32.to_le_bytes());
    data.extend_from_slice(&(header.len() as u32).to_le_bytes());
    data.extend_from_slice(&header);
    data.extend_from_slice(payload);
    data
}

pub fn build_crx3(key: &[u8], payload: &[u8]) -> Vec<u8> {
    build_crx3_with(key, &[key.to_vec()], payload)
}

pub fn build_crx2(key: &[u8], signature: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut data = b"Cr24".to_vec();
    data.extend_from_slice(&2u32.to_le_bytes());
    data.extend_from_slice(&(key.len() as u32).to_le_bytes());
    data.extend_from_slice(&(signature.len() as u32).to_le_bytes());
    data.extend_from_slice(key);
    data.extend_from_slice(signature);
    data.extend_from_slice(payload);
    data
}

pub fn test_config(root: &Path) -> StoreConfig {
    StoreConfig {
        extensions_dir: root.to_path_buf(),
        ..Default::default()
    }
}

/// Write a store install by hand, as a previous run would have left it.
pub fn write_store_install(root: &Path, key: &[u8], version: &str) -> PathBuf {
    let dir = root
        .join(key_id(key).as_str())
        .join(format!("{}_0", version));
    std::fs::create_dir_all(&dir).unwrap();
    let manifest = serde_json::json!({
        "name": "Fixture",
        "version": version,
        "manifest_version": 3,
        "key": key_base64(key),
        "update_url": "https://clients2.google.com/service/update2/crx",
    });
    std::fs::write(dir.join("manifest.json"), manifest.to_string()).unwrap();
    dir
}

/// Serves the same body for every URL and records what was asked for.
pub struct FakeDownloader {
    body: Vec<u8>,
    pub requests: Mutex<Vec<String>>,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl FakeDownloader {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            requests: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Signal `started` on entry, then wait for `release` before writing.
    pub fn gated(body: Vec<u8>, started: Arc<Notify>, release: Arc<Notify>) -> Self {
        Self {
            gate: Some((started, release)),
            ..Self::new(body)
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        self.requests.lock().unwrap().push(url.to_string());
        if let Some((started, release)) = &self.gate {
            started.notify_one();
            release.notified().await;
        }
        tokio::fs::write(dest, &self.body).await?;
        Ok(self.body.len() as u64)
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub head: String,
    pub body: Vec<u8>,
}

pub struct TestServer {
    pub base: String,
    pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Minimal HTTP/1.1 server on loopback. Routes match on path without query.
pub async fn serve(routes: Vec<(&str, u16, Vec<u8>)>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let routes: Arc<Vec<(String, u16, Vec<u8>)>> = Arc::new(
        routes
            .into_iter()
            .map(|(path, status, body)| (path.to_string(), status, body))
            .collect(),
    );
    let requests = Arc::new(Mutex::new(Vec::new()));

    let recorded = Arc::clone(&requests);
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let routes = Arc::clone(&routes);
            let recorded = Arc::clone(&recorded);
            tokio::spawn(async move {
                let Some(request) = read_request(&mut socket).await else {
                    return;
                };
                let path = request.path.split('?').next().unwrap_or("/").to_string();
                let (status, body) = routes
                    .iter()
                    .find(|(p, _, _)| *p == path)
                    .map(|(_, status, body)| (*status, body.clone()))
                    .unwrap_or((404, b"not found".to_vec()));
                recorded.lock().unwrap().push(request);

                let head = format!(
                    "HTTP/1.1 {} Test\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    body.len()
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    TestServer { base, requests }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let mut request_line = head.lines().next()?.split_whitespace();
    Some(RecordedRequest {
        method: request_line.next()?.to_string(),
        path: request_line.next()?.to_string(),
        head: head.clone(),
        body: buf[header_end..].to_vec(),
    })
}

pub fn loopback_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
