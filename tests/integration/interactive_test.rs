// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::*;
use axum::http::StatusCode;
use scraper::{Html, Selector};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn interactive_serves_rewritten_html() {
    let origin = MockServer::start().await;
    let archive = MockServer::start().await;
    mount_article(&origin).await;
    let server = server_with(settings_for(&archive));

    let response = server.get(&format!("/p/{}/article?utm_source=feed", origin.uri())).await;

    response.assert_status_ok();
    let document = Html::parse_document(&response.text());
    let canonical = Selector::parse(r#"link[rel="canonical"]"#).unwrap();
    let links: Vec<_> = document.select(&canonical).collect();
    assert_eq!(links.len(), 1);
    assert_eq!(
        links[0].value().attr("href"),
        Some(format!("{}/article", origin.uri()).as_str())
    );

    let image = Selector::parse("img").unwrap();
    let src = document.select(&image).next().unwrap().value().attr("src");
    assert_eq!(src, Some(format!("{}/images/lead.jpg", origin.uri()).as_str()));

    let branding = Selector::parse("body > [data-unwall-branding]").unwrap();
    assert_eq!(document.select(&branding).count(), 1);
}

#[tokio::test]
async fn interactive_repairs_collapsed_scheme() {
    let origin = MockServer::start().await;
    let archive = MockServer::start().await;
    mount_article(&origin).await;
    let server = server_with(settings_for(&archive));
    let collapsed = origin.uri().replacen("://", ":/", 1);

    let response = server.get(&format!("/p/{}/article", collapsed)).await;

    response.assert_status_ok();
    assert!(response.text().contains("The full story."));
}

#[tokio::test]
async fn interactive_follows_upstream_redirect() {
    let origin = MockServer::start().await;
    let archive = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/short"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("Location", format!("{}/article", origin.uri())),
        )
        .mount(&origin)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&origin)
        .await;
    let server = server_with(settings_for(&archive));

    let response = server.get(&format!("/p/{}/short", origin.uri())).await;

    response.assert_status(StatusCode::FOUND);
    assert_eq!(
        response.header("location"),
        format!("/p/{}", urlencoding::encode(&format!("{}/article", origin.uri()))).as_str()
    );
}

#[tokio::test]
async fn interactive_ignores_redirect_to_same_page() {
    let origin = MockServer::start().await;
    let archive = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/article"))
        .and(query_param("ref", "home"))
        .respond_with(ResponseTemplate::new(200))
        .with_priority(1)
        .mount(&origin)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/article"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("Location", format!("{}/article?ref=home", origin.uri())),
        )
        .mount(&origin)
        .await;
    mount_article(&origin).await;
    let server = server_with(settings_for(&archive));

    let response = server.get(&format!("/p/{}/article", origin.uri())).await;

    response.assert_status_ok();
    assert!(response.maybe_header("location").is_none());
    assert!(response.text().contains("The full story."));
}

#[tokio::test]
async fn interactive_redirect_keeps_destination_query() {
    let origin = MockServer::start().await;
    let archive = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("Location", format!("{}/new?id=7", origin.uri())),
        )
        .mount(&origin)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&origin)
        .await;
    let server = server_with(settings_for(&archive));

    let response = server.get(&format!("/p/{}/old", origin.uri())).await;

    response.assert_status(StatusCode::FOUND);
    let location = response.header("location");
    let location = location.to_str().unwrap();
    assert!(!location.contains('?'));
    assert_eq!(
        urlencoding::decode(location.trim_start_matches("/p/")).unwrap(),
        format!("{}/new?id=7", origin.uri())
    );
}

#[tokio::test]
async fn interactive_failure_redirects_home_with_code() {
    let origin = MockServer::start().await;
    let archive = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&origin)
        .await;
    mount_no_snapshot(&archive).await;
    let server = server_with(settings_for(&archive));

    let response = server.get(&format!("/p/{}/missing", origin.uri())).await;

    response.assert_status(StatusCode::FOUND);
    assert_eq!(
        response.header("location"),
        format!("{}/?message=GENERIC_ERROR", SITE_URL).as_str()
    );
}

#[tokio::test]
async fn interactive_blocked_domain_redirects() {
    let archive = MockServer::start().await;
    let server = server_with(settings_for(&archive));

    let plain = server.get("/p/https://blocked.invalid/story").await;
    let moved = server.get("/p/https://moved.invalid/story").await;

    plain.assert_status(StatusCode::FOUND);
    assert_eq!(
        plain.header("location"),
        format!("{}/?message=BLOCKED_DOMAIN", SITE_URL).as_str()
    );
    moved.assert_status(StatusCode::FOUND);
    assert_eq!(moved.header("location"), "https://elsewhere.example/");
}

#[tokio::test]
async fn interactive_dmca_renders_notice_inline() {
    let archive = MockServer::start().await;
    let server = server_with(settings_for(&archive));

    let response = server.get("/p/https://legal.invalid/story").await;

    response.assert_status(StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS);
    let body = response.text();
    assert!(body.contains("Removed after a &lt;DMCA&gt; notice."));
    assert!(response.maybe_header("location").is_none());
}
