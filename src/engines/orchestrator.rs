// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::models::error_record::ErrorKind;
use crate::domain::models::fetch::{AttemptOutcome, FetchAttempt, FetchResult, Tier};
use crate::domain::models::rule::DomainRule;
use crate::domain::models::url::NormalizedUrl;
use crate::domain::services::error_classifier::classify;
use crate::engines::traits::{TierEngine, TierRequest};
use crate::engines::user_agents::AgentRotation;

/// 所有层级都失败
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct FetchFailure {
    /// 按执行顺序记录的失败尝试
    pub attempts: Vec<FetchAttempt>,
    message: String,
}

impl FetchFailure {
    fn new(attempts: Vec<FetchAttempt>, direct_attempts: u32, headless: bool) -> Self {
        let fallbacks = if headless {
            "archive and headless fallbacks"
        } else {
            "archive fallback"
        };
        let message = format!(
            "Failed to retrieve content after {} direct attempts and {}",
            direct_attempts, fallbacks
        );
        Self { attempts, message }
    }

    /// 概要信息，不含各次失败原因
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 各次失败原因，按执行顺序以 `; ` 连接
    pub fn reasons(&self) -> String {
        let reasons: Vec<String> = self
            .attempts
            .iter()
            .filter_map(|a| a.failure_reason())
            .collect();
        reasons.join("; ")
    }

    /// 对外统一报告为 GENERIC_ERROR，各次失败的分类保留在 attempts 中
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::GenericError
    }
}

/// 编排器配置
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// 直接层最大尝试次数
    pub max_attempts: u32,
    /// 直接层两次尝试之间的固定等待
    pub retry_delay: Duration,
}

/// 编排状态
#[derive(Debug)]
enum FetchState {
    Direct { attempt: u32 },
    Archive,
    Headless,
    Succeeded(FetchResult),
    Exhausted,
}

/// 获取编排器
///
/// 状态机：Direct(0..N) -> Archive -> Headless（可选）。任一层级成功即停止，
/// 层级之间严格按顺序执行。
pub struct FetchOrchestrator {
    direct: Arc<dyn TierEngine>,
    archive: Arc<dyn TierEngine>,
    headless: Option<Arc<dyn TierEngine>>,
    agents: AgentRotation,
    config: OrchestratorConfig,
}

impl FetchOrchestrator {
    pub fn new(
        direct: Arc<dyn TierEngine>,
        archive: Arc<dyn TierEngine>,
        headless: Option<Arc<dyn TierEngine>>,
        agents: AgentRotation,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            direct,
            archive,
            headless,
            agents,
            config,
        }
    }

    /// 获取目标内容
    ///
    /// # 参数
    ///
    /// * `url` - 规范化后的目标 URL
    /// * `rule` - 命中的域名规则
    ///
    /// # 返回值
    ///
    /// * `Ok(FetchResult)` - 第一个成功层级的内容
    /// * `Err(FetchFailure)` - 所有层级都失败
    pub async fn acquire(
        &self,
        url: &NormalizedUrl,
        rule: Option<&DomainRule>,
    ) -> Result<FetchResult, FetchFailure> {
        let mut attempts = Vec::new();
        let mut state = FetchState::Direct { attempt: 0 };

        loop {
            state = match state {
                FetchState::Direct { attempt } if attempt >= self.config.max_attempts => {
                    FetchState::Archive
                }
                FetchState::Direct { attempt } => {
                    if attempt > 0 && !self.config.retry_delay.is_zero() {
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                    match self
                        .run(&self.direct, url, rule, attempt, &mut attempts)
                        .await
                    {
                        Some(result) => FetchState::Succeeded(result),
                        None => FetchState::Direct {
                            attempt: attempt + 1,
                        },
                    }
                }
                FetchState::Archive => {
                    match self.run(&self.archive, url, rule, 0, &mut attempts).await {
                        Some(result) => FetchState::Succeeded(result),
                        None if self.headless.is_some() => FetchState::Headless,
                        None => FetchState::Exhausted,
                    }
                }
                FetchState::Headless => {
                    let result = match &self.headless {
                        Some(engine) => self.run(engine, url, rule, 0, &mut attempts).await,
                        None => None,
                    };
                    match result {
                        Some(result) => FetchState::Succeeded(result),
                        None => FetchState::Exhausted,
                    }
                }
                FetchState::Succeeded(result) => {
                    info!("Retrieved {} via {} tier", url, result.tier);
                    return Ok(result);
                }
                FetchState::Exhausted => {
                    let failure = FetchFailure::new(
                        attempts,
                        self.config.max_attempts,
                        self.headless.is_some(),
                    );
                    warn!("{}", failure.message());
                    return Err(failure);
                }
            };
        }
    }

    /// 执行一次层级尝试，失败时记录并返回 None
    async fn run(
        &self,
        engine: &Arc<dyn TierEngine>,
        url: &NormalizedUrl,
        rule: Option<&DomainRule>,
        attempt: u32,
        attempts: &mut Vec<FetchAttempt>,
    ) -> Option<FetchResult> {
        let tier = engine.tier();
        let user_agent = match tier {
            Tier::Direct => self.agents.for_attempt(attempt),
            _ => None,
        };
        let request = TierRequest {
            url,
            rule,
            user_agent,
            attempt,
        };

        let start = Instant::now();
        let outcome = engine.fetch(&request).await;
        metrics::histogram!("unwall_tier_duration_seconds", "tier" => tier.as_str())
            .record(start.elapsed().as_secs_f64());

        match outcome {
            Ok(response) => {
                metrics::counter!("unwall_tier_attempts_total", "tier" => tier.as_str(), "outcome" => "success")
                    .increment(1);
                attempts.push(FetchAttempt {
                    tier,
                    index: attempt,
                    user_agent: user_agent.map(|a| a.user_agent.clone()),
                    outcome: AttemptOutcome::Success,
                });
                Some(FetchResult {
                    html: response.html,
                    tier,
                    final_url: response.final_url,
                })
            }
            Err(e) => {
                let kind = classify(&e);
                metrics::counter!("unwall_tier_attempts_total", "tier" => tier.as_str(), "outcome" => kind.code())
                    .increment(1);
                debug!(
                    "{} attempt #{} for {} failed: {} ({})",
                    engine.name(),
                    attempt + 1,
                    url,
                    e,
                    kind.code()
                );
                attempts.push(FetchAttempt {
                    tier,
                    index: attempt,
                    user_agent: user_agent.map(|a| a.user_agent.clone()),
                    outcome: AttemptOutcome::Failure {
                        kind,
                        reason: e.to_string(),
                    },
                });
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
