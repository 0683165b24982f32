// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::*;
use crate::config::settings::{BlockedDomain, DmcaDomain, PolicySettings};
use crate::domain::models::fetch::Tier;
use crate::domain::models::rule::DomainRule;
use crate::domain::repositories::content_cache::CacheError;
use crate::domain::services::content_rewriter::SiteIdentity;
use crate::engines::orchestrator::OrchestratorConfig;
use crate::engines::traits::{EngineError, TierEngine, TierRequest, TierResponse};
use crate::engines::user_agents::AgentRotation;
use crate::infrastructure::cache::memory_cache::MemoryCache;
use crate::infrastructure::error_sink::MemoryErrorSink;
use crate::infrastructure::repositories::rule_repo_impl::StaticRuleRepository;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

struct FixedEngine {
    tier: Tier,
    html: Option<&'static str>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl TierEngine for FixedEngine {
    async fn fetch(&self, _request: &TierRequest<'_>) -> Result<TierResponse, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.html {
            Some(html) => Ok(TierResponse {
                html: html.to_string(),
                final_url: "https://example.com/a".to_string(),
            }),
            None => Err(EngineError::HttpStatus(500)),
        }
    }

    fn tier(&self) -> Tier {
        self.tier
    }

    fn name(&self) -> &'static str {
        self.tier.as_str()
    }
}

struct BrokenCache;

#[async_trait]
impl ContentCache for BrokenCache {
    async fn exists(&self, _key: &str) -> Result<bool, CacheError> {
        Err(CacheError::Other("down".into()))
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Other("down".into()))
    }

    async fn set(&self, _key: &str, _html: &str) -> Result<(), CacheError> {
        Err(CacheError::Other("down".into()))
    }
}

struct Fixture {
    service: RetrievalService,
    sink: Arc<MemoryErrorSink>,
    calls: Arc<AtomicUsize>,
}

fn fixture(direct_html: Option<&'static str>, cache: Arc<dyn ContentCache>) -> Fixture {
    let calls = Arc::new(AtomicUsize::new(0));
    let sink = Arc::new(MemoryErrorSink::default());
    let rules = StaticRuleRepository::from_yaml(
        "example.com:\n  classElementRemove: [paywall]\n",
    )
    .unwrap();
    let policy = DomainPolicy::from_settings(&PolicySettings {
        blocked_domains: vec![BlockedDomain {
            host: "blocked.com".to_string(),
            redirect: None,
        }],
        dmca_domains: vec![DmcaDomain {
            host: "legal.com".to_string(),
            message: "Removed.".to_string(),
        }],
    });
    let orchestrator = FetchOrchestrator::new(
        Arc::new(FixedEngine {
            tier: Tier::Direct,
            html: direct_html,
            calls: calls.clone(),
        }),
        Arc::new(FixedEngine {
            tier: Tier::Archive,
            html: None,
            calls: calls.clone(),
        }),
        None,
        AgentRotation::new(Vec::new()),
        OrchestratorConfig {
            max_attempts: 2,
            retry_delay: Duration::ZERO,
        },
    );
    let service = RetrievalService::new(
        Arc::new(rules),
        policy,
        cache,
        orchestrator,
        ContentRewriter::new(SiteIdentity {
            name: "Unwall".to_string(),
            url: "https://unwall.example".to_string(),
        }),
        sink.clone(),
    );
    Fixture {
        service,
        sink,
        calls,
    }
}

const PAGE: &str =
    r#"<html><head></head><body><div class="paywall">gate</div><p>story</p></body></html>"#;

#[tokio::test]
async fn test_retrieve_applies_rule_and_rewrites() {
    let f = fixture(Some(PAGE), Arc::new(MemoryCache::new(None, 0)));

    let document = f
        .service
        .retrieve("https://www.example.com/article?utm_source=x#top")
        .await
        .unwrap();

    assert!(!document.html.contains("gate"));
    assert!(document.html.contains("<p>story</p>"));
    assert!(document
        .html
        .contains(r#"<link rel="canonical" href="https://www.example.com/article">"#));
    assert!(f.sink.records().is_empty());
}

#[tokio::test]
async fn test_second_retrieve_is_served_from_cache() {
    let f = fixture(Some(PAGE), Arc::new(MemoryCache::new(None, 0)));

    let first = f.service.retrieve("https://example.com/a").await.unwrap();
    let second = f.service.retrieve("https://example.com/a?x=1").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(f.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_invalid_url() {
    let f = fixture(Some(PAGE), Arc::new(MemoryCache::new(None, 0)));

    let err = f.service.retrieve("not a url").await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::InvalidUrl);
    assert_eq!(err.url, "not a url");
    assert_eq!(f.calls.load(Ordering::SeqCst), 0);
    assert_eq!(f.sink.records().len(), 1);
}

#[tokio::test]
async fn test_policy_refusals_skip_network() {
    let f = fixture(Some(PAGE), Arc::new(MemoryCache::new(None, 0)));

    let blocked = f.service.retrieve("https://blocked.com/x").await.unwrap_err();
    let dmca = f.service.retrieve("https://legal.com/x").await.unwrap_err();

    assert_eq!(blocked.kind, ErrorKind::BlockedDomain);
    assert_eq!(dmca.kind, ErrorKind::DmcaDomain);
    assert_eq!(dmca.detail.as_deref(), Some("Removed."));
    assert_eq!(f.calls.load(Ordering::SeqCst), 0);
    assert_eq!(f.sink.records().len(), 2);
}

#[tokio::test]
async fn test_policy_wins_over_cached_content() {
    let cache = Arc::new(MemoryCache::new(None, 0));
    cache.set("https://blocked.com/x", "<html>stale</html>").await.unwrap();
    let f = fixture(Some(PAGE), cache);

    let err = f.service.retrieve("https://blocked.com/x").await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::BlockedDomain);
}

#[tokio::test]
async fn test_exhaustion_is_generic_error() {
    let f = fixture(None, Arc::new(MemoryCache::new(None, 0)));

    let err = f.service.retrieve("https://example.com/a").await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::GenericError);
    assert_eq!(
        err.message,
        "Failed to retrieve content after 2 direct attempts and archive fallback"
    );
    let detail = err.detail.unwrap();
    assert!(detail.contains("archive: Unexpected HTTP status 500"));
    assert_eq!(detail.matches("direct #").count(), 2);
    // Two direct attempts and one archive attempt
    assert_eq!(f.calls.load(Ordering::SeqCst), 3);
    assert_eq!(f.sink.records().len(), 1);
}

#[tokio::test]
async fn test_cache_failures_are_not_fatal() {
    let f = fixture(Some(PAGE), Arc::new(BrokenCache));

    let document = f.service.retrieve("https://example.com/a").await;

    assert!(document.is_ok());
    assert!(f.sink.records().is_empty());
}
