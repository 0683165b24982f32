// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::application::bootstrap::AppContext;
use crate::application::dto::retrieve_response::RetrieveLinkDto;
use crate::domain::models::error_record::{ErrorKind, ErrorRecord};
use crate::domain::models::url::NormalizedUrl;
use crate::domain::services::retrieval_service::RetrievalService;
use crate::presentation::errors::AppError;
use crate::utils::url_utils::repair_path_url;

/// 交互入口 `GET /p/{*url}`
///
/// 先探测重定向，存在时跳转到最终地址；成功时直接返回改写后的 HTML，
/// 失败时跳回首页并携带错误码，DMCA 域名渲染说明页
pub async fn interactive_retrieve(
    Extension(ctx): Extension<Arc<AppContext>>,
    Path(path): Path<String>,
) -> Response {
    let raw = repair_path_url(&path);

    // Refused hosts are never probed
    if let Ok(target) = ctx.service.screen(&raw) {
        let probe = ctx.prober.probe(target.as_url()).await;
        // Redirects that only change the query or fragment land on the same page
        let moved = probe.has_redirect
            && NormalizedUrl::parse(&probe.final_url)
                .map(|destination| destination != target)
                .unwrap_or(false);
        if moved {
            debug!("{} redirects to {}", raw, probe.final_url);
            return found(format!("/p/{}", urlencoding::encode(&probe.final_url)));
        }
    }

    match ctx.service.retrieve(&raw).await {
        Ok(document) => Html(document.html).into_response(),
        Err(record) => interactive_error(&ctx.settings.site.url, record),
    }
}

/// API 入口 `GET /api/{*url}`
///
/// 成功时返回交互入口上的页面地址
pub async fn api_retrieve(
    Extension(ctx): Extension<Arc<AppContext>>,
    Path(path): Path<String>,
) -> Result<Json<RetrieveLinkDto>, AppError> {
    let raw = repair_path_url(&path);
    ctx.service.retrieve(&raw).await?;
    let normalized = RetrievalService::normalize(&raw)?;

    Ok(Json(RetrieveLinkDto {
        status: StatusCode::OK.as_u16(),
        url: format!("{}/p/{}", ctx.settings.site.url, normalized),
    }))
}

fn interactive_error(site_url: &str, record: ErrorRecord) -> Response {
    match (record.kind, record.detail) {
        (ErrorKind::DmcaDomain, detail) => {
            let message = detail.unwrap_or(record.message);
            (
                StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS,
                Html(dmca_notice(&message)),
            )
                .into_response()
        }
        (ErrorKind::BlockedDomain, Some(target)) => found(target),
        (kind, _) => found(format!("{}/?message={}", site_url, kind.code())),
    }
}

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

fn dmca_notice(message: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>Unavailable</title></head>\
         <body><main><h1>This page is unavailable</h1><p>{}</p></main></body></html>",
        html_escape::encode_text(message)
    )
}
