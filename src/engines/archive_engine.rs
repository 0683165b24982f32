// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::domain::models::fetch::Tier;
use crate::engines::http_client::HttpClient;
use crate::engines::request_customizer::{OutgoingRequest, RequestCustomizer};
use crate::engines::traits::{EngineError, TierEngine, TierRequest, TierResponse};
use crate::engines::user_agents::RandomAgentPicker;
use crate::utils::url_utils::{apply_query_mods, strip_scheme};

static TOOLBAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<!-- BEGIN WAYBACK TOOLBAR INSERT -->.*?<!-- END WAYBACK TOOLBAR INSERT -->")
        .expect("valid toolbar regex")
});

static SNAPSHOT_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://web\.archive\.org/web/\d+(?:[a-z]{2}_)?/").expect("valid prefix regex")
});

#[derive(Debug, Deserialize)]
struct Availability {
    #[serde(default)]
    archived_snapshots: ArchivedSnapshots,
}

#[derive(Debug, Default, Deserialize)]
struct ArchivedSnapshots {
    closest: Option<ClosestSnapshot>,
}

#[derive(Debug, Deserialize)]
struct ClosestSnapshot {
    url: String,
    #[serde(default)]
    available: Option<bool>,
}

/// 存档获取引擎
///
/// 先查询快照可用性，再下载最近的快照并去掉存档服务注入的工具栏和地址前缀
pub struct ArchiveEngine {
    availability_url: String,
    http: Arc<HttpClient>,
    customizer: Arc<RequestCustomizer>,
    agents: RandomAgentPicker,
}

impl ArchiveEngine {
    pub fn new(
        availability_url: impl Into<String>,
        http: Arc<HttpClient>,
        customizer: Arc<RequestCustomizer>,
        agents: RandomAgentPicker,
    ) -> Self {
        Self {
            availability_url: availability_url.into(),
            http,
            customizer,
            agents,
        }
    }

    fn outgoing(&self, url: Url, request: &TierRequest<'_>) -> OutgoingRequest {
        let agent = self.agents.pick();
        let mut outgoing = OutgoingRequest::bare(url, &agent.user_agent);
        outgoing.proxy = self.customizer.proxy_for(request.rule);
        outgoing
    }

    async fn closest_snapshot(&self, request: &TierRequest<'_>) -> Result<String, EngineError> {
        let mods = request.rule.map(|r| r.query_mods()).unwrap_or_default();
        let target = apply_query_mods(request.url.as_url(), mods);
        let lookup = format!(
            "{}?url={}",
            self.availability_url,
            urlencoding::encode(strip_scheme(target.as_str()))
        );
        let lookup = Url::parse(&lookup)
            .map_err(|e| EngineError::Other(format!("Invalid availability URL: {}", e)))?;

        let response = self.http.get(&self.outgoing(lookup, request)).await?;
        let status_code = response.status().as_u16();
        if status_code != 200 {
            return Err(EngineError::HttpStatus(status_code));
        }

        let availability: Availability = response.json().await?;
        match availability.archived_snapshots.closest {
            Some(snapshot) if snapshot.available != Some(false) && !snapshot.url.is_empty() => {
                Ok(snapshot.url)
            }
            _ => Err(EngineError::NoSnapshot),
        }
    }
}

/// 去掉存档工具栏和快照地址前缀
pub fn strip_archive_artifacts(html: &str) -> String {
    let without_toolbar = TOOLBAR.replace_all(html, "");
    SNAPSHOT_PREFIX.replace_all(&without_toolbar, "").into_owned()
}

#[async_trait]
impl TierEngine for ArchiveEngine {
    async fn fetch(&self, request: &TierRequest<'_>) -> Result<TierResponse, EngineError> {
        let snapshot_url = self.closest_snapshot(request).await?;
        debug!("Archive snapshot for {}: {}", request.url, snapshot_url);

        let snapshot = Url::parse(&snapshot_url)
            .map_err(|e| EngineError::Other(format!("Invalid snapshot URL: {}", e)))?;
        let response = self.http.get(&self.outgoing(snapshot, request)).await?;
        let status_code = response.status().as_u16();
        if status_code != 200 {
            return Err(EngineError::HttpStatus(status_code));
        }

        let content = response.text().await?;
        if content.is_empty() {
            return Err(EngineError::EmptyBody);
        }

        Ok(TierResponse {
            html: strip_archive_artifacts(&content),
            final_url: snapshot_url,
        })
    }

    fn tier(&self) -> Tier {
        Tier::Archive
    }

    fn name(&self) -> &'static str {
        "archive"
    }
}

#[cfg(test)]
#[path = "archive_engine_test.rs"]
mod tests;
