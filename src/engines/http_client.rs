// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use reqwest::redirect::Policy;
use std::sync::Arc;
use std::time::Duration;

use crate::config::settings::FetchSettings;
use crate::engines::dns::NameserverResolver;
use crate::engines::request_customizer::OutgoingRequest;
use crate::engines::traits::EngineError;

/// HTTP 客户端工厂
///
/// 共享超时、重定向和 DNS 配置，每次请求构建新的 reqwest 客户端
#[derive(Clone)]
pub struct HttpClient {
    timeout: Duration,
    max_redirects: usize,
    resolver: Option<Arc<NameserverResolver>>,
}

impl HttpClient {
    pub fn new(settings: &FetchSettings) -> Self {
        Self {
            timeout: settings.timeout(),
            max_redirects: settings.max_redirects,
            resolver: NameserverResolver::from_servers(&settings.dns_servers).map(Arc::new),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn client(&self, request: &OutgoingRequest) -> Result<reqwest::Client, EngineError> {
        // Each request gets a fresh client for cookie isolation
        let mut builder = reqwest::Client::builder()
            .user_agent(request.user_agent.as_str())
            .timeout(self.timeout)
            .redirect(Policy::limited(self.max_redirects))
            .danger_accept_invalid_certs(true);

        if let Some(proxy_url) = &request.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| EngineError::Other(format!("Invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        if let Some(resolver) = &self.resolver {
            builder = builder.dns_resolver(resolver.clone());
        }

        Ok(builder.build()?)
    }

    fn headers(request: &OutgoingRequest) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (k, v) in request.headers() {
            if let (Ok(k), Ok(v)) = (
                HeaderName::from_bytes(k.as_bytes()),
                HeaderValue::from_str(v),
            ) {
                headers.insert(k, v);
            }
        }
        if let Some(cookie) = request.cookie_header() {
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                headers.insert(COOKIE, value);
            }
        }
        headers
    }

    /// 发送 GET 请求
    pub async fn get(&self, request: &OutgoingRequest) -> Result<reqwest::Response, EngineError> {
        let client = self.client(request)?;
        Ok(client
            .get(request.url.clone())
            .headers(Self::headers(request))
            .send()
            .await?)
    }

    /// 发送 HEAD 请求
    pub async fn head(&self, request: &OutgoingRequest) -> Result<reqwest::Response, EngineError> {
        let client = self.client(request)?;
        Ok(client
            .head(request.url.clone())
            .headers(Self::headers(request))
            .send()
            .await?)
    }
}
