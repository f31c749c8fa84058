use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, StoreError};
use crate::models::ExtensionId;

static STORE_ID_EXTRACT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/([a-p]{32})(?:[/?#]|$)").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub enum InputType {
    ExtensionId(ExtensionId),
    StoreUrl(String),
    Unknown(String),
}

pub fn detect_input(input: &str) -> InputType {
    let input = input.trim();
    let input_lower = input.to_lowercase();

    if let Ok(id) = input.parse::<ExtensionId>() {
        return InputType::ExtensionId(id);
    }

    // Check for Chrome Web Store URL (case-insensitive)
    if input_lower.contains("chromewebstore.google.com")
        || input_lower.contains("chrome.google.com/webstore")
    {
        return InputType::StoreUrl(input.to_string());
    }

    InputType::Unknown(input.to_string())
}

pub fn extract_id_from_url(url: &str) -> Option<ExtensionId> {
    STORE_ID_EXTRACT_RE
        .captures(url)
        .and_then(|c| c[1].parse().ok())
}

/// Accept a bare extension ID or a web-store detail URL.
pub fn resolve_extension_id(input: &str) -> Result<ExtensionId> {
    match detect_input(input) {
        InputType::ExtensionId(id) => Ok(id),
        InputType::StoreUrl(url) => extract_id_from_url(&url)
            .ok_or_else(|| StoreError::Config(format!("No extension ID in URL: {}", url))),
        InputType::Unknown(other) => Err(StoreError::Config(format!(
            "Not an extension ID or web store URL: {}",
            other
        ))),
    }
}
