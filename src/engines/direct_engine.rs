// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::domain::models::fetch::Tier;
use crate::engines::http_client::HttpClient;
use crate::engines::request_customizer::{OutgoingRequest, RequestCustomizer};
use crate::engines::traits::{EngineError, TierEngine, TierRequest, TierResponse};
use crate::engines::user_agents::UserAgentProfile;

/// 直接获取引擎
///
/// 以轮换的 User-Agent 直接请求源站，只接受 200 且非空的响应
pub struct DirectEngine {
    http: Arc<HttpClient>,
    customizer: Arc<RequestCustomizer>,
}

impl DirectEngine {
    pub fn new(http: Arc<HttpClient>, customizer: Arc<RequestCustomizer>) -> Self {
        Self { http, customizer }
    }
}

#[async_trait]
impl TierEngine for DirectEngine {
    /// 执行直接请求
    ///
    /// # 参数
    ///
    /// * `request` - 层级请求，携带本次尝试的 User-Agent
    ///
    /// # 返回值
    ///
    /// * `Ok(TierResponse)` - 源站内容
    /// * `Err(EngineError)` - 传输失败、非 200 状态或空响应
    async fn fetch(&self, request: &TierRequest<'_>) -> Result<TierResponse, EngineError> {
        let fallback;
        let agent = match request.user_agent {
            Some(agent) => agent,
            None => {
                fallback = UserAgentProfile::fallback();
                &fallback
            }
        };

        let outgoing = self.customizer.customize(
            OutgoingRequest::new(request.url.as_url().clone(), agent),
            request.rule,
        );
        debug!(
            "Direct attempt #{} for {} (proxy: {})",
            request.attempt + 1,
            outgoing.url,
            outgoing.proxy.is_some()
        );

        let response = self.http.get(&outgoing).await?;
        let status_code = response.status().as_u16();
        if status_code != 200 {
            return Err(EngineError::HttpStatus(status_code));
        }

        let final_url = response.url().to_string();
        let content = response.text().await?;
        if content.is_empty() {
            return Err(EngineError::EmptyBody);
        }

        Ok(TierResponse {
            html: content,
            final_url,
        })
    }

    fn tier(&self) -> Tier {
        Tier::Direct
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}

#[cfg(test)]
#[path = "direct_engine_test.rs"]
mod tests;
