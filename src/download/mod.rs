pub mod chrome;

pub use chrome::{HttpDownloader, crx_download_url};

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;

/// Fetches a package into a local file.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Write the body at `url` to `dest`, returning the number of bytes written.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}
