// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::domain::repositories::content_cache::{CacheError, ContentCache};

#[derive(Debug, Clone)]
struct Entry {
    html: String,
    expires_at: Option<Instant>,
    /// 最近一次读写的逻辑时钟
    last_used: u64,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// 进程内缓存
///
/// 条目数超过上限时淘汰最久未使用的条目，上限为 0 表示不限制
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
    ttl: Option<Duration>,
    max_entries: usize,
    clock: AtomicU64,
}

impl MemoryCache {
    pub fn new(ttl: Option<Duration>, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries,
            clock: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn evict_if_needed(&self) {
        let current_size = self.entries.len();
        if self.max_entries == 0 || current_size <= self.max_entries {
            return;
        }
        let to_evict = current_size - self.max_entries;

        let mut usage: Vec<(String, u64)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().last_used))
            .collect();
        usage.sort_by_key(|(_, last_used)| *last_used);

        for (key, _) in usage.iter().take(to_evict) {
            self.entries.remove(key);
        }
        debug!("Evicted {} entries from memory cache", to_evict);
    }
}

#[async_trait]
impl ContentCache for MemoryCache {
    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let expired = match self.entries.get_mut(key) {
            Some(mut entry) if !entry.is_expired() => {
                entry.last_used = self.tick();
                return Ok(Some(entry.html.clone()));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, html: &str) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                html: html.to_string(),
                expires_at: self.ttl.map(|ttl| Instant::now() + ttl),
                last_used: self.tick(),
            },
        );
        self.evict_if_needed();
        Ok(())
    }
}
