// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// 错误分类
///
/// 底层失败统一映射到的固定分类，对外暴露为稳定的错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidUrl,
    DnsFailure,
    ConnectionError,
    NotFound,
    HttpError,
    ContentError,
    BlockedDomain,
    DmcaDomain,
    GenericError,
}

impl ErrorKind {
    /// 稳定错误码
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidUrl => "INVALID_URL",
            ErrorKind::DnsFailure => "DNS_FAILURE",
            ErrorKind::ConnectionError => "CONNECTION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::HttpError => "HTTP_ERROR",
            ErrorKind::ContentError => "CONTENT_ERROR",
            ErrorKind::BlockedDomain => "BLOCKED_DOMAIN",
            ErrorKind::DmcaDomain => "DMCA_DOMAIN",
            ErrorKind::GenericError => "GENERIC_ERROR",
        }
    }

    /// 对应的 HTTP 状态码
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::InvalidUrl => 400,
            ErrorKind::BlockedDomain => 403,
            ErrorKind::DmcaDomain => 451,
            ErrorKind::NotFound => 404,
            ErrorKind::HttpError | ErrorKind::ContentError => 502,
            ErrorKind::ConnectionError => 503,
            ErrorKind::DnsFailure => 504,
            ErrorKind::GenericError => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// 错误记录
///
/// `retrieve` 对外返回的唯一错误类型，带时间戳并归属到调用方传入的原始 URL
#[derive(Error, Debug, Clone, Serialize)]
#[error("{kind}: {message}")]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
    pub detail: Option<String>,
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
            url: url.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
