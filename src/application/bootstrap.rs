// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use tracing::info;

use crate::config::settings::Settings;
use crate::domain::services::content_rewriter::{ContentRewriter, SiteIdentity};
use crate::domain::services::domain_policy::DomainPolicy;
use crate::domain::services::retrieval_service::RetrievalService;
use crate::engines::archive_engine::ArchiveEngine;
use crate::engines::direct_engine::DirectEngine;
use crate::engines::headless::HeadlessEngine;
use crate::engines::http_client::HttpClient;
use crate::engines::orchestrator::{FetchOrchestrator, OrchestratorConfig};
use crate::engines::redirect_probe::RedirectProber;
use crate::engines::request_customizer::RequestCustomizer;
use crate::engines::traits::TierEngine;
use crate::engines::user_agents::{AgentRotation, RandomAgentPicker};
use crate::infrastructure::cache::build_cache;
use crate::infrastructure::error_sink::TracingErrorSink;
use crate::infrastructure::proxy_pool::ProxyPool;
use crate::infrastructure::repositories::rule_repo_impl::StaticRuleRepository;

/// 请求处理共享的应用上下文
pub struct AppContext {
    pub settings: Arc<Settings>,
    pub service: Arc<RetrievalService>,
    pub prober: Arc<RedirectProber>,
}

impl AppContext {
    pub fn new(settings: Arc<Settings>, service: Arc<RetrievalService>, prober: Arc<RedirectProber>) -> Self {
        Self {
            settings,
            service,
            prober,
        }
    }

    /// 按配置装配完整的获取管线
    ///
    /// # 参数
    ///
    /// * `settings` - 应用配置
    ///
    /// # 返回值
    ///
    /// * `Ok(AppContext)` - 装配好的上下文
    /// * `Err(anyhow::Error)` - 规则表、缓存或无头浏览器初始化失败
    pub fn build(settings: Settings) -> anyhow::Result<Self> {
        let settings = Arc::new(settings);

        let proxies = Arc::new(ProxyPool::new(settings.proxy.pool.clone()));
        let http = Arc::new(HttpClient::new(&settings.fetch));
        let customizer = Arc::new(RequestCustomizer::new(
            proxies.clone(),
            settings.bot_user_agents.clone(),
        ));
        let picker = RandomAgentPicker::new(settings.user_agents.clone());

        let direct: Arc<dyn TierEngine> = Arc::new(DirectEngine::new(http.clone(), customizer.clone()));
        let archive: Arc<dyn TierEngine> = Arc::new(ArchiveEngine::new(
            settings.archive.availability_url.clone(),
            http.clone(),
            customizer,
            picker.clone(),
        ));
        let headless = HeadlessEngine::from_settings(&settings.headless, proxies.clone())?
            .map(|engine| Arc::new(engine) as Arc<dyn TierEngine>);
        info!(
            "Fetch tiers: direct x{}, archive, headless {}",
            settings.fetch.max_attempts,
            if headless.is_some() { "enabled" } else { "disabled" }
        );

        let orchestrator = FetchOrchestrator::new(
            direct,
            archive,
            headless,
            AgentRotation::new(settings.user_agents.clone()),
            OrchestratorConfig {
                max_attempts: settings.fetch.max_attempts,
                retry_delay: settings.fetch.retry_delay(),
            },
        );

        let rules = StaticRuleRepository::load(&settings.rules.path)?;
        let cache = build_cache(&settings.cache)?;
        let rewriter = ContentRewriter::new(SiteIdentity {
            name: settings.site.name.clone(),
            url: settings.site.url.clone(),
        });

        let service = RetrievalService::new(
            Arc::new(rules),
            DomainPolicy::from_settings(&settings.policy),
            cache,
            orchestrator,
            rewriter,
            Arc::new(TracingErrorSink),
        );
        let prober = RedirectProber::new(http, picker);

        Ok(Self::new(settings, Arc::new(service), Arc::new(prober)))
    }
}
