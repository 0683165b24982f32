// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 缓存模块
///
/// 提供内容缓存的实现，包括进程内缓存和Redis缓存
pub mod memory_cache;
pub mod redis_cache;

use std::sync::Arc;
use std::time::Duration;

use crate::config::settings::{CacheBackend, CacheSettings};
use crate::domain::repositories::content_cache::{CacheError, ContentCache, NoopCache};

use self::memory_cache::MemoryCache;
use self::redis_cache::RedisCache;

/// 按配置构建缓存后端
pub fn build_cache(settings: &CacheSettings) -> Result<Arc<dyn ContentCache>, CacheError> {
    let ttl = settings.ttl_secs.map(Duration::from_secs);
    Ok(match settings.backend {
        CacheBackend::None => Arc::new(NoopCache),
        CacheBackend::Memory => Arc::new(MemoryCache::new(ttl, settings.max_entries)),
        CacheBackend::Redis => {
            let url = settings
                .redis_url
                .as_deref()
                .ok_or_else(|| CacheError::Other("cache.redis_url is required for the redis backend".into()))?;
            Arc::new(RedisCache::new(url, settings.ttl_secs)?)
        }
    })
}
