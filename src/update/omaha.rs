//! Wire types for the Omaha `update2/json` protocol, version 3.1.

use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "3.1";

/// Anti-JSON-hijacking prefix that precedes every response body.
pub const SAFETY_PREFIX: &str = ")]}'\n";

#[derive(Debug, Serialize)]
pub struct RequestEnvelope<'a> {
    pub request: Request<'a>,
}

#[derive(Debug, Serialize)]
pub struct Request<'a> {
    #[serde(rename = "@updater")]
    pub updater: &'a str,
    pub acceptformat: &'static str,
    pub app: Vec<AppRequest<'a>>,
    pub os: OsInfo,
    pub prodversion: &'a str,
    pub protocol: &'static str,
    pub requestid: String,
    pub sessionid: &'a str,
}

#[derive(Debug, Serialize)]
pub struct AppRequest<'a> {
    pub appid: &'a str,
    pub version: &'a str,
    pub updatecheck: UpdateCheckRequest,
}

#[derive(Debug, Default, Serialize)]
pub struct UpdateCheckRequest {}

#[derive(Debug, Serialize)]
pub struct OsInfo {
    pub platform: &'static str,
    pub arch: &'static str,
}

impl OsInfo {
    pub fn current() -> Self {
        let platform = match std::env::consts::OS {
            "macos" => "mac",
            "windows" => "win",
            "linux" => "linux",
            "android" => "android",
            "openbsd" => "openbsd",
            _ => "unknown",
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => "x64",
            "x86" => "x86",
            "aarch64" => "arm64",
            "arm" => "arm",
            _ => "unknown",
        };
        Self { platform, arch }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResponseEnvelope {
    pub response: Response,
}

#[derive(Debug, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub app: Vec<AppResponse>,
}

#[derive(Debug, Deserialize)]
pub struct AppResponse {
    pub appid: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub updatecheck: Option<UpdateCheckResponse>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCheckResponse {
    pub status: String,
    #[serde(default)]
    pub urls: Option<Urls>,
    #[serde(default)]
    pub manifest: Option<UpdateManifest>,
}

#[derive(Debug, Deserialize)]
pub struct Urls {
    #[serde(default)]
    pub url: Vec<UrlEntry>,
}

#[derive(Debug, Deserialize)]
pub struct UrlEntry {
    pub codebase: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateManifest {
    pub version: String,
    #[serde(default)]
    pub packages: Option<Packages>,
}

#[derive(Debug, Deserialize)]
pub struct Packages {
    #[serde(default)]
    pub package: Vec<Package>,
}

#[derive(Debug, Deserialize)]
pub struct Package {
    pub name: Option<String>,
    pub hash_sha256: Option<String>,
    pub size: Option<u64>,
}
