// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::models::rule::DomainRule;
use crate::domain::repositories::rule_repository::RuleRepository;

/// 规则加载错误
#[derive(Error, Debug)]
pub enum RuleLoadError {
    #[error("Failed to read rule file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse rule file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// 静态规则仓库
///
/// 以 "小写、去 www." 的主机名为键的不可变映射
#[derive(Debug, Default, Clone)]
pub struct StaticRuleRepository {
    rules: HashMap<String, DomainRule>,
}

fn table_key(domain: &str) -> String {
    let lower = domain.trim().to_ascii_lowercase();
    match lower.strip_prefix("www.") {
        Some(stripped) => stripped.to_string(),
        None => lower,
    }
}

impl StaticRuleRepository {
    /// 从已有映射构建
    pub fn new(rules: impl IntoIterator<Item = (String, DomainRule)>) -> Self {
        let rules = rules
            .into_iter()
            .map(|(domain, rule)| (table_key(&domain), rule))
            .collect();
        Self { rules }
    }

    /// 解析 YAML 规则表（主机名 -> 规则）
    pub fn from_yaml(source: &str) -> Result<Self, RuleLoadError> {
        if source.trim().is_empty() {
            return Ok(Self::default());
        }
        let table: HashMap<String, DomainRule> = serde_yaml::from_str(source)?;
        Ok(Self::new(table))
    }

    /// 从文件加载规则表，文件不存在时返回空表
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RuleLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Rule file {} not found, starting with an empty rule table", path.display());
            return Ok(Self::default());
        }

        let source = std::fs::read_to_string(path).map_err(|source| RuleLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let repo = Self::from_yaml(&source)?;
        info!("Loaded {} domain rules from {}", repo.len(), path.display());
        Ok(repo)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl RuleRepository for StaticRuleRepository {
    fn lookup(&self, domain: &str) -> Option<&DomainRule> {
        self.rules.get(&table_key(domain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const RULES: &str = r#"
www.Example.com:
  proxy: true
news.site.org:
  classElementRemove: [paywall]
"#;

    #[test]
    fn test_lookup_is_case_and_www_insensitive() {
        let repo = StaticRuleRepository::from_yaml(RULES).unwrap();
        assert_eq!(repo.len(), 2);
        assert!(repo.lookup("example.com").unwrap().proxy);
        assert!(repo.lookup("WWW.EXAMPLE.COM").unwrap().proxy);
        assert_eq!(
            repo.lookup("news.site.org").unwrap().class_element_remove,
            vec!["paywall".to_string()]
        );
    }

    #[test]
    fn test_lookup_is_exact_match_only() {
        let repo = StaticRuleRepository::from_yaml(RULES).unwrap();
        assert!(repo.lookup("sub.example.com").is_none());
        assert!(repo.lookup("site.org").is_none());
        assert!(repo.lookup("example.com.br").is_none());
    }

    #[test]
    fn test_load_missing_file_yields_empty_table() {
        let repo = StaticRuleRepository::load("/nonexistent/rules.yaml").unwrap();
        assert!(repo.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(RULES.as_bytes()).unwrap();
        let repo = StaticRuleRepository::load(file.path()).unwrap();
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        assert!(StaticRuleRepository::from_yaml("example.com: [1, 2").is_err());
    }

    #[test]
    fn test_shipped_rule_file_loads() {
        let repo = StaticRuleRepository::load("config/rules.yaml").unwrap();
        let wsj = repo.lookup("wsj.com").unwrap();
        assert_eq!(wsj.cookies.get("djcs_route"), Some(&None));
        assert_eq!(wsj.query_mods()[0].key, "mod");
        assert!(repo.lookup("nytimes.com").unwrap().bot_identity);
    }
}
