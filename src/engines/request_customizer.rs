// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use rand::seq::IndexedRandom;
use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

use crate::domain::models::rule::DomainRule;
use crate::engines::user_agents::UserAgentProfile;
use crate::infrastructure::proxy_pool::ProxyPool;
use crate::utils::url_utils::apply_query_mods;

/// 每个直接请求都会带上的基础请求头
const BASE_HEADERS: [(&str, &str); 5] = [
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
    ),
    ("Accept-Language", "en-US,en;q=0.5"),
    ("Cache-Control", "no-cache"),
    ("Pragma", "no-cache"),
    ("DNT", "1"),
];

const BOT_FROM: &str = "googlebot(at)googlebot.com";

/// 待发送的请求描述
///
/// 与具体 HTTP 客户端无关，便于单独测试定制逻辑
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingRequest {
    pub url: Url,
    pub user_agent: String,
    /// 按插入顺序保存，名称大小写不敏感
    headers: Vec<(String, String)>,
    pub cookies: BTreeMap<String, String>,
    pub proxy: Option<String>,
}

impl OutgoingRequest {
    /// 以基础请求头和 User-Agent 配套请求头初始化
    pub fn new(url: Url, agent: &UserAgentProfile) -> Self {
        let mut request = Self::bare(url, &agent.user_agent);
        for (name, value) in BASE_HEADERS {
            request.set_header(name, value);
        }
        for (name, value) in &agent.headers {
            request.set_header(name, value);
        }
        request
    }

    /// 不带任何附加请求头
    pub fn bare(url: Url, user_agent: &str) -> Self {
        Self {
            url,
            user_agent: user_agent.to_string(),
            headers: Vec::new(),
            cookies: BTreeMap::new(),
            proxy: None,
        }
    }

    /// 设置请求头，同名（忽略大小写）则覆盖
    ///
    /// `User-Agent` 写入专用字段
    pub fn set_header(&mut self, name: &str, value: &str) {
        if name.eq_ignore_ascii_case("user-agent") {
            self.user_agent = value.to_string();
            return;
        }
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        if name.eq_ignore_ascii_case("user-agent") {
            return Some(&self.user_agent);
        }
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// 合并后的 Cookie 请求头
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// 请求定制器
///
/// 按域名规则修改待发送请求。优先级从低到高：基础请求头、User-Agent 配套请求头、
/// 爬虫身份、规则请求头。
#[derive(Debug, Clone)]
pub struct RequestCustomizer {
    proxies: Arc<ProxyPool>,
    bot_agents: Arc<[String]>,
}

impl RequestCustomizer {
    pub fn new(proxies: Arc<ProxyPool>, bot_agents: impl Into<Arc<[String]>>) -> Self {
        Self {
            proxies,
            bot_agents: bot_agents.into(),
        }
    }

    /// 应用域名规则
    ///
    /// # 参数
    ///
    /// * `request` - 已带基础请求头的请求
    /// * `rule` - 命中的域名规则，None 时原样返回
    ///
    /// # 返回值
    ///
    /// 定制后的请求
    pub fn customize(&self, mut request: OutgoingRequest, rule: Option<&DomainRule>) -> OutgoingRequest {
        let Some(rule) = rule else {
            return request;
        };

        if rule.bot_identity {
            if let Some(agent) = self.bot_agents.choose(&mut rand::rng()) {
                request.user_agent = agent.clone();
            }
            request.set_header("X-Forwarded-For", &random_crawler_ip());
            request.set_header("From", BOT_FROM);
        }

        for (name, value) in &rule.headers {
            request.set_header(name, value);
        }

        for (name, value) in &rule.cookies {
            match value {
                Some(value) => {
                    request.cookies.insert(name.clone(), value.clone());
                }
                None => {
                    request.cookies.remove(name);
                }
            }
        }

        request.url = apply_query_mods(&request.url, rule.query_mods());
        request.proxy = self.proxy_for(Some(rule));
        request
    }

    /// 规则要求走代理时从池中随机取一个
    pub fn proxy_for(&self, rule: Option<&DomainRule>) -> Option<String> {
        match rule {
            Some(rule) if rule.proxy => self.proxies.random().map(str::to_string),
            _ => None,
        }
    }
}

/// 搜索引擎爬虫网段内的随机地址
fn random_crawler_ip() -> String {
    format!(
        "66.249.{}.{}",
        rand::random_range(64..=95u8),
        rand::random_range(1..=254u8)
    )
}

#[cfg(test)]
#[path = "request_customizer_test.rs"]
mod tests;
