// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::Extension;
use axum_test::TestServer;
use std::sync::Arc;
use unwall::application::bootstrap::AppContext;
use unwall::config::settings::{BlockedDomain, CacheBackend, DmcaDomain, Settings};
use unwall::presentation::routes;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SITE_URL: &str = "https://unwall.test";

pub const ARTICLE: &str = r#"<!DOCTYPE html>
<html><head><title>Story</title><link rel="canonical" href="https://amp.example/story"></head>
<body><div class="paywall">Subscribe to continue</div><p id="story">The full story.</p>
<img src="/images/lead.jpg"></body></html>"#;

/// 指向模拟站点的测试配置
pub fn settings_for(archive: &MockServer) -> Settings {
    let mut settings = Settings::defaults().unwrap();
    settings.site.url = SITE_URL.to_string();
    settings.fetch.max_attempts = 2;
    settings.fetch.retry_delay_ms = 0;
    settings.fetch.timeout_secs = 2;
    settings.fetch.dns_servers = Vec::new();
    settings.archive.availability_url = format!("{}/wayback/available", archive.uri());
    settings.rules.path = "/nonexistent/rules.yaml".to_string();
    settings.cache.backend = CacheBackend::Memory;
    settings.policy.blocked_domains = vec![
        BlockedDomain {
            host: "blocked.invalid".to_string(),
            redirect: None,
        },
        BlockedDomain {
            host: "moved.invalid".to_string(),
            redirect: Some("https://elsewhere.example/".to_string()),
        },
    ];
    settings.policy.dmca_domains = vec![DmcaDomain {
        host: "legal.invalid".to_string(),
        message: "Removed after a <DMCA> notice.".to_string(),
    }];
    settings
}

pub fn server_with(settings: Settings) -> TestServer {
    let ctx = Arc::new(AppContext::build(settings).unwrap());
    let app = routes::routes().layer(Extension(ctx));
    TestServer::new(app).unwrap()
}

/// 源站返回 `ARTICLE`
pub async fn mount_article(origin: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ARTICLE))
        .mount(origin)
        .await;
}

/// 存档服务没有任何快照
pub async fn mount_no_snapshot(archive: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/wayback/available"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "archived_snapshots": {} })),
        )
        .mount(archive)
        .await;
}
