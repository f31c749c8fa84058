use super::Downloader;
use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::models::ExtensionId;

/// Build the store URL that redirects to the latest CRX for `extension_id`.
pub fn crx_download_url(base: &str, extension_id: &ExtensionId, chrome_version: &str) -> String {
    format!(
        "{}?response=redirect&acceptformat=crx2,crx3&x=id%3D{}%26uc&prodversion={}",
        base, extension_id, chrome_version
    )
}

/// Create the HTTP client shared by downloads and update checks.
pub fn build_http_client(config: &StoreConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout())
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| StoreError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Streams response bodies straight to disk. No retries.
#[derive(Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StoreError::Network(format!("Failed to send download request: {}", e)))?;

        if !response.status().is_success() {
            return Err(StoreError::Network(format!(
                "Download failed with status {}: {}",
                response.status(),
                url
            )));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| StoreError::Network(format!("Failed to read response body: {}", e)))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!("downloaded {} bytes from {}", written, url);
        Ok(written)
    }
}
