pub mod omaha;
pub mod scheduler;

pub use scheduler::{AlwaysActive, IdleProbe, IdleState, TickOutcome, UpdateScheduler, UpdaterState};

use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::download::chrome::build_http_client;
use crate::error::{Result, StoreError};
use crate::models::{ExtensionId, InstalledExtension, compare_versions};
use omaha::{
    AppRequest, OsInfo, PROTOCOL_VERSION, Request, RequestEnvelope, ResponseEnvelope,
    SAFETY_PREFIX, UpdateCheckRequest,
};

/// A newer version offered by the update server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateAvailable {
    pub id: ExtensionId,
    pub version: String,
    pub url: String,
    pub sha256: Option<String>,
}

pub struct UpdateChecker {
    client: reqwest::Client,
    url: String,
    chrome_version: String,
    updater: String,
}

impl UpdateChecker {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        Ok(Self::with_client(config, build_http_client(config)?))
    }

    pub fn with_client(config: &StoreConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            url: config.update_url.clone(),
            chrome_version: config.chrome_version.clone(),
            updater: format!("extstore-{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Ask the update server about every store install in one batch.
    ///
    /// Transport failures are errors. A malformed response is logged and
    /// yields no updates, so nothing from it gets applied.
    pub async fn check_updates(
        &self,
        state: &UpdaterState,
        installed: &[InstalledExtension],
    ) -> Result<Vec<UpdateAvailable>> {
        let apps: Vec<(&ExtensionId, &InstalledExtension)> = installed
            .iter()
            .filter_map(|record| record.id().map(|id| (id, record)))
            .collect();
        if apps.is_empty() {
            return Ok(Vec::new());
        }

        let body = self.build_request(state, &apps);
        let app_ids = apps
            .iter()
            .map(|(id, _)| id.as_str())
            .collect::<Vec<_>>()
            .join(",");

        debug!("checking {} extensions for updates", apps.len());
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("X-Goog-Update-Interactivity", "bg")
            .header("X-Goog-Update-Updater", &self.updater)
            .header("X-Goog-Update-AppId", app_ids)
            .body(serde_json::to_vec(&body)?)
            .send()
            .await
            .map_err(|e| StoreError::Network(format!("Failed to send update check: {}", e)))?;

        if !response.status().is_success() {
            return Err(StoreError::Network(format!(
                "Update check failed with status {}",
                response.status()
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Network(format!("Failed to read update response: {}", e)))?;

        match parse_update_response(&text, installed) {
            Ok(updates) => {
                info!("{} update(s) available", updates.len());
                Ok(updates)
            }
            Err(e) => {
                warn!("discarding update response: {}", e);
                Ok(Vec::new())
            }
        }
    }

    fn build_request<'a>(
        &'a self,
        state: &'a UpdaterState,
        apps: &[(&'a ExtensionId, &'a InstalledExtension)],
    ) -> RequestEnvelope<'a> {
        RequestEnvelope {
            request: Request {
                updater: &self.updater,
                acceptformat: "crx3",
                app: apps
                    .iter()
                    .map(|&(id, record)| AppRequest {
                        appid: id.as_str(),
                        version: record.version(),
                        updatecheck: UpdateCheckRequest::default(),
                    })
                    .collect(),
                os: OsInfo::current(),
                prodversion: &self.chrome_version,
                protocol: PROTOCOL_VERSION,
                requestid: format!("{{{}}}", Uuid::new_v4()),
                sessionid: state.session_id(),
            },
        }
    }
}

/// Extract strictly newer versions for extensions in `installed`.
pub fn parse_update_response(
    body: &str,
    installed: &[InstalledExtension],
) -> Result<Vec<UpdateAvailable>> {
    let json = body
        .strip_prefix(SAFETY_PREFIX)
        .ok_or_else(|| StoreError::Network("response lacks the safety prefix".to_string()))?;
    let envelope: ResponseEnvelope = serde_json::from_str(json)
        .map_err(|e| StoreError::Network(format!("malformed update response: {}", e)))?;

    let mut updates = Vec::new();
    for app in envelope.response.app {
        let Ok(id) = app.appid.parse::<ExtensionId>() else {
            debug!("ignoring unknown appid {}", app.appid);
            continue;
        };
        let Some(current) = installed.iter().find(|record| record.id() == Some(&id)) else {
            continue;
        };
        let Some(check) = app.updatecheck else {
            debug!("{}: no updatecheck (status {:?})", id, app.status);
            continue;
        };
        if check.status != "ok" {
            continue;
        }
        let Some(manifest) = check.manifest else {
            continue;
        };
        if compare_versions(&manifest.version, current.version()) != Ordering::Greater {
            debug!("{}: {} is not newer than {}", id, manifest.version, current.version());
            continue;
        }

        let Some(codebase) = check
            .urls
            .into_iter()
            .flat_map(|urls| urls.url)
            .find_map(|entry| entry.codebase)
        else {
            warn!("{}: update {} has no codebase", id, manifest.version);
            continue;
        };
        let package = manifest
            .packages
            .and_then(|packages| packages.package.into_iter().next());
        let (name, sha256) = match package {
            Some(package) => (package.name, package.hash_sha256),
            None => (None, None),
        };

        updates.push(UpdateAvailable {
            id,
            version: manifest.version,
            url: package_url(&codebase, name.as_deref()),
            sha256,
        });
    }

    Ok(updates)
}

fn package_url(codebase: &str, name: Option<&str>) -> String {
    match name {
        Some(name) if !name.is_empty() => {
            format!("{}/{}", codebase.trim_end_matches('/'), name)
        }
        _ => codebase.to_string(),
    }
}
