// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use rand::seq::IndexedRandom;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// 兜底 User-Agent，配置为空列表时使用
pub const FALLBACK_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0";

/// User-Agent 及其配套请求头
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserAgentProfile {
    pub user_agent: String,
    /// 随该 User-Agent 一起发送的请求头
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl UserAgentProfile {
    pub fn fallback() -> Self {
        Self {
            user_agent: FALLBACK_USER_AGENT.to_string(),
            headers: BTreeMap::new(),
        }
    }
}

/// 轮换选择：第 k 次尝试使用第 k mod N 个
#[derive(Debug, Clone)]
pub struct AgentRotation {
    agents: Arc<[UserAgentProfile]>,
}

impl AgentRotation {
    pub fn new(agents: impl Into<Arc<[UserAgentProfile]>>) -> Self {
        Self {
            agents: agents.into(),
        }
    }

    /// 第 `attempt` 次尝试对应的下标
    pub fn index_for(&self, attempt: u32) -> Option<usize> {
        if self.agents.is_empty() {
            None
        } else {
            Some(attempt as usize % self.agents.len())
        }
    }

    pub fn for_attempt(&self, attempt: u32) -> Option<&UserAgentProfile> {
        self.index_for(attempt).map(|i| &self.agents[i])
    }
}

/// 随机选择，存档和重定向探测使用
#[derive(Debug, Clone)]
pub struct RandomAgentPicker {
    agents: Arc<[UserAgentProfile]>,
}

impl RandomAgentPicker {
    pub fn new(agents: impl Into<Arc<[UserAgentProfile]>>) -> Self {
        Self {
            agents: agents.into(),
        }
    }

    /// 随机选一个，列表为空时返回兜底值
    pub fn pick(&self) -> UserAgentProfile {
        self.agents
            .choose(&mut rand::rng())
            .cloned()
            .unwrap_or_else(UserAgentProfile::fallback)
    }
}
