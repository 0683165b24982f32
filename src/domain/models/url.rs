// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;
use url::Url;

static AMP_CACHE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://([^.]+)\.cdn\.ampproject\.org/v/s/([^/]+)(.*)$")
        .expect("AMP cache pattern is valid")
});

/// URL 规范化错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
    /// 无法解析
    #[error("Malformed URL: {0}")]
    Malformed(String),
    /// 缺少主机名
    #[error("URL has no host: {0}")]
    MissingHost(String),
    /// 不支持的协议
    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),
}

/// 规范化后的 URL
///
/// 仅保留 scheme、host（以及显式的非默认端口）和 path，查询参数与片段全部丢弃。
/// 同时作为缓存键使用。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedUrl(Url);

impl NormalizedUrl {
    /// 解析并规范化原始 URL
    ///
    /// # 参数
    ///
    /// * `raw` - 调用方提供的原始 URL
    ///
    /// # 返回值
    ///
    /// * `Ok(NormalizedUrl)` - 规范化结果
    /// * `Err(UrlError)` - URL 无效
    pub fn parse(raw: &str) -> Result<Self, UrlError> {
        let trimmed = raw.trim();

        // AMP cache links point at the publisher's page
        let unwrapped = match AMP_CACHE.captures(trimmed) {
            Some(caps) => format!("https://{}{}", &caps[2], &caps[3]),
            None => trimmed.to_string(),
        };

        let mut url =
            Url::parse(&unwrapped).map_err(|_| UrlError::Malformed(trimmed.to_string()))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(UrlError::UnsupportedScheme(url.scheme().to_string()));
        }
        match url.host_str() {
            Some(host) if !host.is_empty() => {}
            _ => return Err(UrlError::MissingHost(trimmed.to_string())),
        }

        url.set_query(None);
        url.set_fragment(None);
        // Infallible for http(s) URLs that carry a host
        let _ = url.set_username("");
        let _ = url.set_password(None);

        Ok(Self(url))
    }

    /// 主机名（小写）
    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }

    /// 用于规则查找和策略检查的域名：去掉前导 "www."
    pub fn rule_key(&self) -> &str {
        let host = self.host();
        host.strip_prefix("www.").unwrap_or(host)
    }

    /// scheme://host[:port]，不含结尾斜杠
    pub fn origin(&self) -> String {
        self.0.origin().ascii_serialization()
    }

    /// 字符串形式
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// 底层 URL
    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl Serialize for NormalizedUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
