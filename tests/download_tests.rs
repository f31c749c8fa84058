mod common;

use common::*;
use extstore::StoreError;
use extstore::config::DEFAULT_CRX_URL;
use extstore::download::{Downloader, HttpDownloader, crx_download_url};

#[test]
fn test_chrome_download_url_generation() {
    let id = "nkbihfbeogaeaoehlefnkodbefgpgknn".parse().unwrap();
    let url = crx_download_url(DEFAULT_CRX_URL, &id, "130.0.0.0");

    assert_eq!(
        url,
        "https://clients2.google.com/service/update2/crx?response=redirect\
         &acceptformat=crx2,crx3&x=id%3Dnkbihfbeogaeaoehlefnkodbefgpgknn%26uc\
         &prodversion=130.0.0.0"
    );
}

#[tokio::test]
async fn test_download_streams_body_to_file() {
    let body: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    let server = serve(vec![("/ext.crx", 200, body.clone())]).await;
    let downloader = HttpDownloader::with_client(loopback_client());
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.crx");

    let written = downloader
        .download(&format!("{}/ext.crx", server.base), &dest)
        .await
        .unwrap();

    assert_eq!(written, body.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), body);
}

#[tokio::test]
async fn test_download_error_status() {
    let server = serve(vec![]).await;
    let downloader = HttpDownloader::with_client(loopback_client());
    let dir = tempfile::tempdir().unwrap();

    let err = downloader
        .download(&format!("{}/missing.crx", server.base), &dir.path().join("x"))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Network(_)));
    assert!(err.to_string().contains("404"));
}
