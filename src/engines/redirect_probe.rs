// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::engines::http_client::HttpClient;
use crate::engines::request_customizer::OutgoingRequest;
use crate::engines::user_agents::RandomAgentPicker;

/// 重定向探测结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RedirectProbe {
    pub final_url: String,
    pub has_redirect: bool,
    /// 探测失败时为 0
    pub http_status: u16,
}

/// 重定向探测器
///
/// 用 HEAD 请求跟随重定向，交互入口据此把短链接换成最终地址
pub struct RedirectProber {
    http: Arc<HttpClient>,
    agents: RandomAgentPicker,
}

impl RedirectProber {
    pub fn new(http: Arc<HttpClient>, agents: RandomAgentPicker) -> Self {
        Self { http, agents }
    }

    /// 探测重定向，任何失败都视为无重定向
    pub async fn probe(&self, url: &url::Url) -> RedirectProbe {
        let agent = self.agents.pick();
        let request = OutgoingRequest::bare(url.clone(), &agent.user_agent);

        match self.http.head(&request).await {
            Ok(response) => {
                let final_url = response.url().to_string();
                RedirectProbe {
                    has_redirect: final_url != url.as_str(),
                    final_url,
                    http_status: response.status().as_u16(),
                }
            }
            Err(e) => {
                debug!("Redirect probe for {} failed: {}", url, e);
                RedirectProbe {
                    final_url: url.to_string(),
                    has_redirect: false,
                    http_status: 0,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::FetchSettings;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn prober() -> RedirectProber {
        let settings = FetchSettings {
            max_attempts: 1,
            timeout_secs: 5,
            retry_delay_ms: 0,
            max_redirects: 2,
            dns_servers: vec![],
        };
        RedirectProber::new(
            Arc::new(HttpClient::new(&settings)),
            RandomAgentPicker::new(Vec::new()),
        )
    }

    #[tokio::test]
    async fn test_probe_follows_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/short"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", format!("{}/article", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/article"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let url = url::Url::parse(&format!("{}/short", server.uri())).unwrap();
        let probe = prober().probe(&url).await;

        assert!(probe.has_redirect);
        assert_eq!(probe.final_url, format!("{}/article", server.uri()));
        assert_eq!(probe.http_status, 200);
    }

    #[tokio::test]
    async fn test_probe_without_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let url = url::Url::parse(&format!("{}/article", server.uri())).unwrap();
        let probe = prober().probe(&url).await;

        assert!(!probe.has_redirect);
        assert_eq!(probe.http_status, 200);
    }

    #[tokio::test]
    async fn test_probe_failure_keeps_url() {
        let url = url::Url::parse("http://127.0.0.1:9/x").unwrap();
        let probe = prober().probe(&url).await;

        assert_eq!(probe.final_url, "http://127.0.0.1:9/x");
        assert!(!probe.has_redirect);
        assert_eq!(probe.http_status, 0);
    }
}
