// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use redis::AsyncCommands;

use crate::domain::repositories::content_cache::{CacheError, ContentCache};

const KEY_PREFIX: &str = "unwall:page:";

/// Redis 内容缓存
///
/// 每次操作取一个复用连接，ttl 为空时永久保存
#[derive(Clone)]
pub struct RedisCache {
    /// Redis客户端
    client: redis::Client,
    ttl_seconds: Option<u64>,
}

impl RedisCache {
    /// 创建新的Redis缓存实例
    ///
    /// # 参数
    ///
    /// * `redis_url` - Redis连接URL
    /// * `ttl_seconds` - 过期时间（秒）
    ///
    /// # 返回值
    ///
    /// * `Ok(RedisCache)` - 缓存实例
    /// * `Err(CacheError)` - URL 无效
    pub fn new(redis_url: &str, ttl_seconds: Option<u64>) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            ttl_seconds,
        })
    }

    fn key(url: &str) -> String {
        format!("{}{}", KEY_PREFIX, url)
    }
}

#[async_trait]
impl ContentCache for RedisCache {
    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let exists: bool = con.exists(Self::key(key)).await?;
        Ok(exists)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = con.get(Self::key(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, html: &str) -> Result<(), CacheError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        match self.ttl_seconds {
            Some(ttl) => con.set_ex::<_, _, ()>(Self::key(key), html, ttl).await?,
            None => con.set::<_, _, ()>(Self::key(key), html).await?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_is_rejected() {
        assert!(RedisCache::new("not a redis url", None).is_err());
    }

    #[test]
    fn test_keys_are_namespaced() {
        assert_eq!(
            RedisCache::key("https://example.com/a"),
            "unwall:page:https://example.com/a"
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        let cache = RedisCache::new("redis://127.0.0.1:1/", Some(60)).unwrap();
        assert!(cache.get("https://example.com/a").await.is_err());
    }
}
