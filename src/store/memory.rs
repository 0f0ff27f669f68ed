//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于内存的缓存存储实现。

use super::CacheStore;
use crate::entry::Entry;
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use moka::future::Cache;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// 内存缓存存储
///
/// 使用Moka作为底层缓存库，读取时检查条目的过期时间并惰性删除
#[derive(Clone)]
pub struct MemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    // 值: (数据, 过期时间点)
    cache: Cache<String, (V, Option<Instant>)>,
}

impl<V> MemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// 创建新的内存缓存存储
    ///
    /// # 参数
    ///
    /// * `capacity` - 最大条目数
    pub fn new(capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(capacity).build(),
        }
    }

    /// 当前条目数（近似值，等待后台任务完成后准确）
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    /// 清空所有条目
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    /// 读取未过期的值及其剩余存活时间
    async fn lookup(&self, key: &str) -> Option<(V, Option<Duration>)> {
        let (value, expire_at) = self.cache.get(key).await?;
        let remaining = match expire_at {
            Some(expire_time) => {
                let now = Instant::now();
                if now >= expire_time {
                    self.cache.remove(key).await;
                    debug!("Memory lookup: key={}, expired=true, removed", key);
                    return None;
                }
                Some(expire_time - now)
            }
            None => None,
        };
        Some((value, remaining))
    }

    fn expire_at(ttl: Option<Duration>) -> Option<Instant> {
        ttl.filter(|d| !d.is_zero()).map(|d| Instant::now() + d)
    }
}

fn check_cancelled(ctx: &CancellationToken) -> Result<()> {
    if ctx.is_cancelled() {
        return Err(CacheError::Cancelled);
    }
    Ok(())
}

#[async_trait]
impl<V> CacheStore<V> for MemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    #[instrument(skip(self, ctx), level = "debug")]
    async fn get(&self, ctx: &CancellationToken, key: &str) -> Result<Entry<V>> {
        check_cancelled(ctx)?;
        match self.lookup(key).await {
            Some((value, ttl)) => Ok(Entry::new(key, value, ttl)),
            None => Err(CacheError::NotFound(key.to_string())),
        }
    }

    #[instrument(skip(self, ctx, keys), level = "debug", fields(key_count = keys.len()))]
    async fn multi_get(
        &self,
        ctx: &CancellationToken,
        keys: &[String],
    ) -> Result<Vec<Option<Entry<V>>>> {
        check_cancelled(ctx)?;
        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            let entry = self
                .lookup(key)
                .await
                .map(|(value, ttl)| Entry::new(key.as_str(), value, ttl));
            entries.push(entry);
        }
        Ok(entries)
    }

    #[instrument(skip(self, ctx, entries), level = "debug", fields(entry_count = entries.len()))]
    async fn set(&self, ctx: &CancellationToken, entries: Vec<Entry<V>>) -> Result<()> {
        check_cancelled(ctx)?;
        for entry in entries {
            let expire_at = Self::expire_at(entry.ttl());
            let key = entry.key().to_string();
            self.cache.insert(key, (entry.into_value(), expire_at)).await;
        }
        Ok(())
    }

    #[instrument(skip(self, ctx, keys), level = "debug", fields(key_count = keys.len()))]
    async fn delete(&self, ctx: &CancellationToken, keys: &[String]) -> Result<()> {
        check_cancelled(ctx)?;
        for key in keys {
            self.cache.invalidate(key.as_str()).await;
        }
        Ok(())
    }
}
