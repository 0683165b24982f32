// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod devtools;
pub mod session;
pub mod webdriver;

use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use crate::config::settings::{BrowserKind, HeadlessBackend, HeadlessSettings};
use crate::domain::models::fetch::Tier;
use crate::engines::traits::{EngineError, TierEngine, TierRequest, TierResponse};
use crate::infrastructure::proxy_pool::ProxyPool;
use crate::utils::url_utils::apply_query_mods;

use self::devtools::DevtoolsFactory;
use self::session::{BrowserSession, ScopedSession, SessionFactory, SessionOptions};
use self::webdriver::WebDriverFactory;

const OUTER_HTML_SCRIPT: &str = "return document.documentElement.outerHTML;";

/// 无头浏览器引擎
///
/// 每次获取创建一个新会话，无论成功、失败还是 panic，会话都会被结束
pub struct HeadlessEngine {
    factory: Arc<dyn SessionFactory>,
    proxies: Arc<ProxyPool>,
    browser: BrowserKind,
    page_load_timeout: Duration,
    script_timeout: Duration,
}

impl HeadlessEngine {
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        proxies: Arc<ProxyPool>,
        browser: BrowserKind,
        page_load_timeout: Duration,
        script_timeout: Duration,
    ) -> Self {
        Self {
            factory,
            proxies,
            browser,
            page_load_timeout,
            script_timeout,
        }
    }

    /// 按配置构建，未启用时返回 None
    pub fn from_settings(
        settings: &HeadlessSettings,
        proxies: Arc<ProxyPool>,
    ) -> Result<Option<Self>, EngineError> {
        if !settings.enabled {
            return Ok(None);
        }
        let factory: Arc<dyn SessionFactory> = match settings.backend {
            HeadlessBackend::Webdriver => Arc::new(WebDriverFactory::new(
                settings.endpoint.clone(),
                settings.page_load_timeout() + settings.script_timeout(),
            )?),
            HeadlessBackend::Devtools => Arc::new(DevtoolsFactory::new(settings.endpoint.clone())),
        };
        Ok(Some(Self::new(
            factory,
            proxies,
            settings.browser,
            settings.page_load_timeout(),
            settings.script_timeout(),
        )))
    }

    async fn render(session: &dyn BrowserSession, url: &str) -> Result<String, EngineError> {
        session.navigate(url).await?;
        let value = session.execute_script(OUTER_HTML_SCRIPT).await?;
        match value.as_str() {
            Some(html) if !html.trim().is_empty() => Ok(html.to_string()),
            _ => Err(EngineError::EmptyContent),
        }
    }
}

#[async_trait]
impl TierEngine for HeadlessEngine {
    async fn fetch(&self, request: &TierRequest<'_>) -> Result<TierResponse, EngineError> {
        let mods = request.rule.map(|r| r.query_mods()).unwrap_or_default();
        let target = apply_query_mods(request.url.as_url(), mods);
        let proxy = match request.rule {
            Some(rule) if rule.proxy => self.proxies.random().map(str::to_string),
            _ => None,
        };

        let options = SessionOptions {
            browser: self.browser,
            proxy,
            page_load_timeout: self.page_load_timeout,
            script_timeout: self.script_timeout,
        };
        let scoped = ScopedSession::new(self.factory.create(&options).await?);
        debug!(
            "Rendering {} with {} backend",
            target,
            self.factory.backend()
        );

        // Overall bound in case the backend ignores its own timeouts
        let budget = self.page_load_timeout + self.script_timeout;
        let outcome = AssertUnwindSafe(tokio::time::timeout(
            budget,
            Self::render(scoped.session(), target.as_str()),
        ))
        .catch_unwind()
        .await;
        scoped.release().await;

        let html = match outcome {
            Ok(Ok(result)) => result?,
            Ok(Err(_)) => return Err(EngineError::Timeout),
            Err(_) => {
                error!("Browser session panicked while rendering {}", target);
                return Err(EngineError::Browser("browser session panicked".into()));
            }
        };

        Ok(TierResponse {
            html,
            final_url: target.to_string(),
        })
    }

    fn tier(&self) -> Tier {
        Tier::Headless
    }

    fn name(&self) -> &'static str {
        "headless"
    }
}

#[cfg(test)]
#[path = "headless_test.rs"]
mod tests;
