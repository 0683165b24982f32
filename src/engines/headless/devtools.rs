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
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, SetBlockedUrLsParams};
use chromiumoxide::cdp::browser_protocol::target::{CreateBrowserContextParams, CreateTargetParams};
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

use crate::engines::headless::session::{BrowserSession, SessionFactory, SessionOptions};
use crate::engines::traits::EngineError;

/// 图片请求屏蔽规则
const IMAGE_PATTERNS: [&str; 8] = [
    "*.png", "*.jpg", "*.jpeg", "*.gif", "*.webp", "*.svg", "*.ico", "*.avif",
];

/// Chrome DevTools 会话工厂
///
/// 连接到已运行的 Chrome 远程调试端口，每个会话在独立的浏览器上下文中开一个标签页，
/// 代理按上下文设置
pub struct DevtoolsFactory {
    endpoint: String,
}

impl DevtoolsFactory {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

/// 构建浏览器上下文参数
///
/// # 参数
///
/// * `proxy` - 代理 URL，无法解析时忽略
///
/// # 返回值
///
/// * `Ok(CreateBrowserContextParams)` - 上下文参数
/// * `Err(EngineError)` - 代理带有认证信息，上下文无法传递
pub fn context_params(proxy: Option<&str>) -> Result<CreateBrowserContextParams, EngineError> {
    let mut params = CreateBrowserContextParams {
        dispose_on_detach: Some(true),
        ..Default::default()
    };
    let Some(proxy) = proxy.and_then(|raw| Url::parse(raw).ok()) else {
        return Ok(params);
    };
    if !proxy.username().is_empty() || proxy.password().is_some() {
        return Err(EngineError::Browser(
            "authenticated proxies are not supported over DevTools".into(),
        ));
    }
    if let Some(host) = proxy.host_str() {
        let port = proxy.port_or_known_default().unwrap_or(80);
        params.proxy_server = Some(format!("{}://{}:{}", proxy.scheme(), host, port));
    }
    Ok(params)
}

fn blocked_images() -> SetBlockedUrLsParams {
    SetBlockedUrLsParams::new(IMAGE_PATTERNS.iter().map(|p| p.to_string()).collect())
}

async fn open_page(browser: &Browser, context: &BrowserContextId) -> Result<Page, EngineError> {
    let mut target = CreateTargetParams::new("about:blank");
    target.browser_context_id = Some(context.clone());
    let page = browser
        .new_page(target)
        .await
        .map_err(|e| EngineError::Browser(e.to_string()))?;
    page.execute(EnableParams::default())
        .await
        .map_err(|e| EngineError::Browser(e.to_string()))?;
    page.execute(blocked_images())
        .await
        .map_err(|e| EngineError::Browser(e.to_string()))?;
    Ok(page)
}

#[async_trait]
impl SessionFactory for DevtoolsFactory {
    async fn create(&self, options: &SessionOptions) -> Result<Box<dyn BrowserSession>, EngineError> {
        let params = context_params(options.proxy.as_deref())?;

        tracing::info!("Connecting to remote Chrome instance at: {}", self.endpoint);
        let (browser, mut handler) = Browser::connect(self.endpoint.as_str())
            .await
            .map_err(|e| EngineError::Browser(format!("Failed to connect to remote Chrome: {}", e)))?;

        // Spawn a handler to process browser events
        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        if let Some(proxy) = &params.proxy_server {
            debug!("Opening browser context through proxy {}", proxy);
        }
        let context = match browser.create_browser_context(params).await {
            Ok(context) => context,
            Err(e) => {
                handler_task.abort();
                return Err(EngineError::Browser(e.to_string()));
            }
        };

        let page = match open_page(&browser, &context).await {
            Ok(page) => page,
            Err(e) => {
                if let Err(dispose) = browser.dispose_browser_context(context).await {
                    warn!("Failed to dispose browser context: {}", dispose);
                }
                handler_task.abort();
                return Err(e);
            }
        };

        Ok(Box::new(DevtoolsSession {
            page: Mutex::new(Some(page)),
            browser: Mutex::new(browser),
            context,
            handler: handler_task,
            page_load_timeout: options.page_load_timeout,
            script_timeout: options.script_timeout,
        }))
    }

    fn backend(&self) -> &'static str {
        "devtools"
    }
}

/// DevTools 会话，持有一个标签页
pub struct DevtoolsSession {
    page: Mutex<Option<Page>>,
    browser: Mutex<Browser>,
    context: BrowserContextId,
    handler: JoinHandle<()>,
    page_load_timeout: Duration,
    script_timeout: Duration,
}

impl DevtoolsSession {
    async fn page(&self) -> Result<Page, EngineError> {
        self.page
            .lock()
            .await
            .clone()
            .ok_or_else(|| EngineError::Browser("session already closed".into()))
    }
}

#[async_trait]
impl BrowserSession for DevtoolsSession {
    async fn navigate(&self, url: &str) -> Result<(), EngineError> {
        let page = self.page().await?;
        // goto waits for the load event by default
        tokio::time::timeout(self.page_load_timeout, page.goto(url))
            .await
            .map_err(|_| EngineError::Timeout)?
            .map_err(|e| EngineError::Browser(e.to_string()))?;
        Ok(())
    }

    async fn execute_script(&self, script: &str) -> Result<serde_json::Value, EngineError> {
        let page = self.page().await?;
        // WebDriver scripts are function bodies, CDP expects an expression
        let expression = format!("(() => {{ {} }})()", script);
        let result = tokio::time::timeout(self.script_timeout, page.evaluate(expression))
            .await
            .map_err(|_| EngineError::Timeout)?
            .map_err(|e| EngineError::Browser(e.to_string()))?;
        result
            .into_value::<serde_json::Value>()
            .map_err(|e| EngineError::Browser(e.to_string()))
    }

    async fn quit(&self) -> Result<(), EngineError> {
        let page = self.page.lock().await.take();
        let closed = match page {
            Some(page) => page
                .close()
                .await
                .map_err(|e| EngineError::Browser(e.to_string())),
            None => Ok(()),
        };
        let disposed = self
            .browser
            .lock()
            .await
            .dispose_browser_context(self.context.clone())
            .await;
        if let Err(e) = disposed {
            warn!("Failed to dispose browser context: {}", e);
        }
        self.handler.abort();
        closed
    }
}
