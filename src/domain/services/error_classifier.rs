// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::error::Error as StdError;

use crate::domain::models::error_record::ErrorKind;
use crate::engines::traits::EngineError;

/// hyper-util 连接器在解析失败时使用的固定描述
const CONNECTOR_DNS_LABEL: &str = "dns error";

/// 将引擎错误归类为对外错误类型
///
/// 传输层错误按结构化信息判断；浏览器错误只有文本，按关键字判断
pub fn classify(error: &EngineError) -> ErrorKind {
    match error {
        EngineError::RequestFailed(e) => classify_transport(e),
        EngineError::HttpStatus(404) => ErrorKind::NotFound,
        EngineError::HttpStatus(_) | EngineError::EmptyBody => ErrorKind::HttpError,
        EngineError::NoSnapshot => ErrorKind::NotFound,
        EngineError::EmptyContent => ErrorKind::ContentError,
        EngineError::Timeout => ErrorKind::ConnectionError,
        EngineError::Browser(message) => classify_browser_message(message),
        EngineError::Other(_) => ErrorKind::GenericError,
    }
}

fn classify_transport(error: &reqwest::Error) -> ErrorKind {
    if is_resolution_failure(error) {
        return ErrorKind::DnsFailure;
    }
    if error.is_timeout() || error.is_connect() || error.is_redirect() {
        return ErrorKind::ConnectionError;
    }
    match error.status() {
        Some(status) if status.as_u16() == 404 => ErrorKind::NotFound,
        _ => ErrorKind::HttpError,
    }
}

fn is_resolution_failure(error: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = error.source();
    while let Some(err) = source {
        if err
            .downcast_ref::<hickory_resolver::error::ResolveError>()
            .is_some()
        {
            return true;
        }
        if err.to_string() == CONNECTOR_DNS_LABEL {
            return true;
        }
        source = err.source();
    }
    false
}

fn classify_browser_message(message: &str) -> ErrorKind {
    let lower = message.to_ascii_lowercase();
    if lower.contains("err_name_not_resolved") || lower.contains("dns") {
        ErrorKind::DnsFailure
    } else if lower.contains("timeout") || lower.contains("timed out") {
        ErrorKind::ConnectionError
    } else if lower.contains("not found") {
        ErrorKind::NotFound
    } else {
        ErrorKind::HttpError
    }
}
