// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use thiserror::Error;

/// 缓存错误类型
#[derive(Error, Debug)]
pub enum CacheError {
    /// Redis错误
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    /// 其他错误
    #[error("Cache error: {0}")]
    Other(String),
}

/// 内容缓存特质
///
/// 以规范化 URL 为键保存改写后的文档。缓存故障不影响获取流程。
#[async_trait]
pub trait ContentCache: Send + Sync {
    /// 检查缓存中是否存在指定键
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// 读取缓存内容
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// 写入缓存内容
    async fn set(&self, key: &str, html: &str) -> Result<(), CacheError>;
}

/// 不缓存任何内容
#[derive(Debug, Default, Clone)]
pub struct NoopCache;

#[async_trait]
impl ContentCache for NoopCache {
    async fn exists(&self, _key: &str) -> Result<bool, CacheError> {
        Ok(false)
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _html: &str) -> Result<(), CacheError> {
        Ok(())
    }
}
