// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::*;
use axum::http::StatusCode;
use serde_json::Value;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn health_check_works() {
    let archive = MockServer::start().await;
    let server = server_with(settings_for(&archive));

    let response = server.get("/health").await;

    response.assert_status_ok();
    response.assert_text("OK");
}

#[tokio::test]
async fn api_returns_link_to_rewritten_page() {
    let origin = MockServer::start().await;
    let archive = MockServer::start().await;
    mount_article(&origin).await;
    let server = server_with(settings_for(&archive));

    let response = server
        .get(&format!("/api/{}/article?utm_source=feed", origin.uri()))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], 200);
    assert_eq!(body["url"], format!("{}/p/{}/article", SITE_URL, origin.uri()));
}

#[tokio::test]
async fn api_blocked_domain_is_forbidden() {
    let archive = MockServer::start().await;
    let server = server_with(settings_for(&archive));

    let response = server.get("/api/https://blocked.invalid/story").await;

    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.header("x-error-type"), "BLOCKED_DOMAIN");
    let body: Value = response.json();
    assert_eq!(body["status"], 403);
    assert_eq!(body["error"]["code"], "BLOCKED_DOMAIN");
}

#[tokio::test]
async fn api_dmca_domain_carries_notice() {
    let archive = MockServer::start().await;
    let server = server_with(settings_for(&archive));

    let response = server.get("/api/https://legal.invalid/story").await;

    response.assert_status(StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "DMCA_DOMAIN");
    assert_eq!(body["error"]["details"], "Removed after a <DMCA> notice.");
    assert_eq!(
        response.header("x-error-info"),
        "Removed after a <DMCA> notice."
    );
}

#[tokio::test]
async fn api_invalid_url_is_bad_request() {
    let archive = MockServer::start().await;
    let server = server_with(settings_for(&archive));

    let response = server.get("/api/not%20a%20host/page").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.header("x-error-type"), "INVALID_URL");
}

#[tokio::test]
async fn api_exhausted_tiers_report_every_failure() {
    let origin = MockServer::start().await;
    let archive = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&origin)
        .await;
    mount_no_snapshot(&archive).await;
    let server = server_with(settings_for(&archive));

    let response = server.get(&format!("/api/{}/article", origin.uri())).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "GENERIC_ERROR");
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("after 2 direct attempts"));
    assert!(!message.contains("direct #"));
    let details = body["error"]["details"].as_str().unwrap();
    assert_eq!(details.matches("direct #").count(), 2);
    assert!(details.contains("Archive snapshot not found"));
}

#[tokio::test]
async fn api_falls_back_to_archive_snapshot() {
    let origin = MockServer::start().await;
    let archive = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&origin)
        .await;
    let snapshot = format!("{}/web/20240101000000/article", archive.uri());
    Mock::given(method("GET"))
        .and(path("/wayback/available"))
        .and(query_param("url", format!("{}/article", origin.address())))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "archived_snapshots": { "closest": { "url": snapshot, "available": true } }
        })))
        .mount(&archive)
        .await;
    Mock::given(method("GET"))
        .and(path("/web/20240101000000/article"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ARTICLE))
        .expect(1)
        .mount(&archive)
        .await;
    let server = server_with(settings_for(&archive));

    let response = server.get(&format!("/api/{}/article", origin.uri())).await;

    response.assert_status_ok();
}
