// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

use crate::domain::models::error_record::ErrorRecord;

/// API 成功响应
///
/// `url` 指向本服务交互入口上的改写页面
#[derive(Debug, Deserialize, Serialize)]
pub struct RetrieveLinkDto {
    pub status: u16,
    pub url: String,
}

/// API 错误详情
#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorBodyDto {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

/// API 错误响应
#[derive(Debug, Deserialize, Serialize)]
pub struct RetrieveErrorDto {
    pub status: u16,
    pub error: ErrorBodyDto,
}

impl From<&ErrorRecord> for RetrieveErrorDto {
    fn from(record: &ErrorRecord) -> Self {
        Self {
            status: record.kind.http_status(),
            error: ErrorBodyDto {
                code: record.kind.code().to_string(),
                message: record.message.clone(),
                details: record.detail.clone(),
            },
        }
    }
}
