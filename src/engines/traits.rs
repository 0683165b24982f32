// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::fetch::Tier;
use crate::domain::models::rule::DomainRule;
use crate::domain::models::url::NormalizedUrl;
use crate::engines::user_agents::UserAgentProfile;

/// 引擎错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// 请求失败
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 非 200 状态码
    #[error("Unexpected HTTP status {0}")]
    HttpStatus(u16),
    /// 响应体为空
    #[error("Empty response body")]
    EmptyBody,
    /// 存档服务没有可用快照
    #[error("Archive snapshot not found")]
    NoSnapshot,
    /// 浏览器渲染结果为空
    #[error("Browser returned empty content")]
    EmptyContent,
    /// 浏览器会话错误
    #[error("Browser error: {0}")]
    Browser(String),
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

/// 单次层级请求
#[derive(Debug, Clone, Copy)]
pub struct TierRequest<'a> {
    /// 规范化后的目标 URL
    pub url: &'a NormalizedUrl,
    /// 命中的域名规则
    pub rule: Option<&'a DomainRule>,
    /// 由编排器按轮换策略选定的 User-Agent（仅直接层使用）
    pub user_agent: Option<&'a UserAgentProfile>,
    /// 层级内从 0 开始的尝试序号
    pub attempt: u32,
}

/// 层级成功时的原始内容
#[derive(Debug, Clone, PartialEq)]
pub struct TierResponse {
    pub html: String,
    /// 跟随重定向后的最终 URL
    pub final_url: String,
}

/// 获取层级引擎特质
#[async_trait]
pub trait TierEngine: Send + Sync {
    /// 执行一次获取
    async fn fetch(&self, request: &TierRequest<'_>) -> Result<TierResponse, EngineError>;

    /// 所属层级
    fn tier(&self) -> Tier;

    /// 引擎名称
    fn name(&self) -> &'static str;
}
