// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::application::dto::retrieve_response::RetrieveErrorDto;
use crate::domain::models::error_record::ErrorRecord;

pub const ERROR_TYPE_HEADER: &str = "x-error-type";
pub const ERROR_INFO_HEADER: &str = "x-error-info";

/// API 错误响应
///
/// 状态码由错误类型决定，错误码和详情同时写入 JSON 正文和响应头
#[derive(Debug)]
pub struct AppError(pub ErrorRecord);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let record = self.0;
        let status =
            StatusCode::from_u16(record.kind.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut headers = HeaderMap::new();
        headers.insert(ERROR_TYPE_HEADER, HeaderValue::from_static(record.kind.code()));
        if let Some(value) = record.detail.as_deref().and_then(header_safe) {
            headers.insert(ERROR_INFO_HEADER, value);
        }

        let body = Json(RetrieveErrorDto::from(&record));
        (status, headers, body).into_response()
    }
}

impl From<ErrorRecord> for AppError {
    fn from(record: ErrorRecord) -> Self {
        Self(record)
    }
}

/// 详情可能含换行或非 ASCII 字符，不能直接作为头部值
fn header_safe(detail: &str) -> Option<HeaderValue> {
    let cleaned: String = detail
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { ' ' })
        .collect();
    HeaderValue::from_str(cleaned.trim()).ok()
}
