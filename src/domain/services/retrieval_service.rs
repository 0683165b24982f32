// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::domain::models::error_record::{ErrorKind, ErrorRecord};
use crate::domain::models::fetch::RewrittenDocument;
use crate::domain::models::url::NormalizedUrl;
use crate::domain::repositories::content_cache::ContentCache;
use crate::domain::repositories::rule_repository::RuleRepository;
use crate::domain::services::content_rewriter::ContentRewriter;
use crate::domain::services::domain_policy::DomainPolicy;
use crate::engines::orchestrator::FetchOrchestrator;
use crate::infrastructure::error_sink::ErrorSink;

/// 内容获取服务
///
/// 串联整条管线：规范化 -> 域名策略 -> 缓存 -> 规则查找 -> 分层获取 -> 改写 -> 写缓存。
/// 任何失败都以 `ErrorRecord` 返回，并在返回前交给错误去向记录。
pub struct RetrievalService {
    rules: Arc<dyn RuleRepository>,
    policy: DomainPolicy,
    cache: Arc<dyn ContentCache>,
    orchestrator: FetchOrchestrator,
    rewriter: ContentRewriter,
    sink: Arc<dyn ErrorSink>,
}

impl RetrievalService {
    pub fn new(
        rules: Arc<dyn RuleRepository>,
        policy: DomainPolicy,
        cache: Arc<dyn ContentCache>,
        orchestrator: FetchOrchestrator,
        rewriter: ContentRewriter,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            rules,
            policy,
            cache,
            orchestrator,
            rewriter,
            sink,
        }
    }

    /// 规范化原始 URL
    ///
    /// # 返回值
    ///
    /// * `Ok(NormalizedUrl)` - 规范化结果
    /// * `Err(ErrorRecord)` - INVALID_URL
    pub fn normalize(raw: &str) -> Result<NormalizedUrl, ErrorRecord> {
        NormalizedUrl::parse(raw).map_err(|e| {
            ErrorRecord::new(ErrorKind::InvalidUrl, raw, "Invalid URL provided").with_detail(e.to_string())
        })
    }

    /// 获取并改写目标页面
    ///
    /// # 参数
    ///
    /// * `raw_url` - 调用方提供的原始 URL
    ///
    /// # 返回值
    ///
    /// * `Ok(RewrittenDocument)` - 改写后的文档
    /// * `Err(ErrorRecord)` - 已记录的错误
    pub async fn retrieve(&self, raw_url: &str) -> Result<RewrittenDocument, ErrorRecord> {
        metrics::counter!("unwall_retrieval_requests_total").increment(1);
        let span = info_span!("retrieve", request_id = %Uuid::new_v4(), url = %raw_url);
        let result = self.run(raw_url).instrument(span).await;
        if let Err(record) = &result {
            self.sink.record(record);
        }
        result
    }

    /// 规范化并检查域名策略，不发起任何网络请求
    pub fn screen(&self, raw_url: &str) -> Result<NormalizedUrl, ErrorRecord> {
        let url = Self::normalize(raw_url)?;
        self.policy.check(&url).map_err(|mut record| {
            record.url = raw_url.to_string();
            record
        })?;
        Ok(url)
    }

    async fn run(&self, raw_url: &str) -> Result<RewrittenDocument, ErrorRecord> {
        // Policy applies even to content cached before the domain was listed
        let url = self.screen(raw_url)?;

        match self.cache.get(url.as_str()).await {
            Ok(Some(html)) => {
                debug!("Cache hit for {}", url);
                metrics::counter!("unwall_cache_hits_total").increment(1);
                return Ok(RewrittenDocument { html });
            }
            Ok(None) => {}
            Err(e) => warn!("Cache read failed for {}: {}", url, e),
        }

        let rule = self.rules.lookup(url.rule_key());
        if rule.is_some() {
            debug!("Applying domain rule for {}", url.rule_key());
        }

        let fetched = self.orchestrator.acquire(&url, rule).await.map_err(|failure| {
            ErrorRecord::new(failure.kind(), raw_url, failure.message()).with_detail(failure.reasons())
        })?;

        let document = self
            .rewriter
            .rewrite(&fetched.html, &url, rule)
            .map_err(|e| {
                ErrorRecord::new(ErrorKind::ContentError, raw_url, "Failed to process content")
                    .with_detail(e.to_string())
            })?;

        if let Err(e) = self.cache.set(url.as_str(), &document.html).await {
            warn!("Cache write failed for {}: {}", url, e);
        }

        info!(
            "Served {} from {} tier ({} bytes)",
            url,
            fetched.tier,
            document.html.len()
        );
        Ok(document)
    }
}

#[cfg(test)]
#[path = "retrieval_service_test.rs"]
mod tests;
