// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::HashMap;

use crate::config::settings::PolicySettings;
use crate::domain::models::error_record::{ErrorKind, ErrorRecord};
use crate::domain::models::url::NormalizedUrl;

/// 域名封锁策略
///
/// 按主机名精确匹配（忽略大小写），在任何网络请求之前检查。
/// "www." 前缀视为不同主机，需要时两者都列出
#[derive(Debug, Clone, Default)]
pub struct DomainPolicy {
    blocked: HashMap<String, Option<String>>,
    dmca: HashMap<String, String>,
}

fn policy_key(host: &str) -> String {
    host.trim().to_ascii_lowercase()
}

impl DomainPolicy {
    pub fn from_settings(settings: &PolicySettings) -> Self {
        Self {
            blocked: settings
                .blocked_domains
                .iter()
                .map(|d| (policy_key(&d.host), d.redirect.clone()))
                .collect(),
            dmca: settings
                .dmca_domains
                .iter()
                .map(|d| (policy_key(&d.host), d.message.clone()))
                .collect(),
        }
    }

    /// 检查目标是否允许获取
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 允许
    /// * `Err(ErrorRecord)` - BLOCKED_DOMAIN（detail 为可选跳转目标）或 DMCA_DOMAIN（detail 为说明）
    pub fn check(&self, url: &NormalizedUrl) -> Result<(), ErrorRecord> {
        let key = policy_key(url.host());

        if let Some(message) = self.dmca.get(&key) {
            return Err(ErrorRecord::new(
                ErrorKind::DmcaDomain,
                url.as_str(),
                format!("{} is unavailable due to a DMCA takedown", url.host()),
            )
            .with_detail(message.clone()));
        }

        if let Some(redirect) = self.blocked.get(&key) {
            let record = ErrorRecord::new(
                ErrorKind::BlockedDomain,
                url.as_str(),
                format!("{} is not supported", url.host()),
            );
            return Err(match redirect {
                Some(target) => record.with_detail(target.clone()),
                None => record,
            });
        }

        Ok(())
    }
}
