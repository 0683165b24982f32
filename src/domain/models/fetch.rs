// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::Serialize;
use std::fmt;

use crate::domain::models::error_record::ErrorKind;

/// 获取层级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// 直接请求
    Direct,
    /// 存档快照
    Archive,
    /// 无头浏览器
    Headless,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Direct => "direct",
            Tier::Archive => "archive",
            Tier::Headless => "headless",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单次尝试的结果
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success,
    Failure { kind: ErrorKind, reason: String },
}

/// 层级内的一次子尝试
#[derive(Debug, Clone, PartialEq)]
pub struct FetchAttempt {
    pub tier: Tier,
    /// 层级内从 0 开始的序号
    pub index: u32,
    pub user_agent: Option<String>,
    pub outcome: AttemptOutcome,
}

impl FetchAttempt {
    /// 失败原因，成功时为 None
    pub fn failure_reason(&self) -> Option<String> {
        match &self.outcome {
            AttemptOutcome::Success => None,
            AttemptOutcome::Failure { kind, reason } => Some(match self.tier {
                Tier::Direct => format!("direct #{}: {} ({})", self.index + 1, reason, kind.code()),
                tier => format!("{}: {} ({})", tier, reason, kind.code()),
            }),
        }
    }
}

/// 获取结果
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub html: String,
    pub tier: Tier,
    /// 跟随重定向后的最终 URL
    pub final_url: String,
}

/// 改写后的文档，管线的最终输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenDocument {
    pub html: String,
}

impl RewrittenDocument {
    pub fn into_html(self) -> String {
        self.html
    }
}
