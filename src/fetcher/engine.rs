//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于读取策略的获取器，以及与策略无关的写入、删除和刷新操作。

use super::Fetcher;
use crate::entry::Entry;
use crate::error::{CacheError, Result};
use crate::key::KeyBuilder;
use crate::loader::{BatchLoader, Loader};
use crate::metrics::{FetchStats, FetchStatsSnapshot, FetcherMetrics};
use crate::store::CacheStore;
use crate::strategy::Strategy;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// 基于读取策略的获取器
///
/// 由 [`FetcherBuilder`](super::FetcherBuilder) 构建，构建后配置不可变。
/// 除计数器外不持有可变状态，可在多个任务间共享
pub struct StrategyFetcher<K, V> {
    /// 读取策略
    pub(super) strategy: Strategy,
    /// 缓存键构建器
    pub(super) keys: KeyBuilder<K>,
    /// 缓存存储
    pub(super) store: Arc<dyn CacheStore<V>>,
    /// 单键加载器
    pub(super) loader: Arc<dyn Loader<K, V>>,
    /// 批量加载器
    pub(super) batch_loader: Arc<dyn BatchLoader<K, V>>,
    /// 空值占位
    pub(super) empty_value: V,
    /// 写入条目的过期时间
    pub(super) ttl: Option<Duration>,
    /// 命中/回源计数
    pub(super) stats: FetchStats,
    /// 指标标签
    pub(super) label: String,
    /// 构建时注册的指标句柄
    pub(super) metrics: FetcherMetrics,
}

impl<K, V> std::fmt::Debug for StrategyFetcher<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyFetcher")
            .field("label", &self.label)
            .field("strategy", &self.strategy)
            .field("namespace", &self.keys.namespace())
            .field("ttl", &self.ttl)
            .field("stats", &self.stats)
            .finish()
    }
}

impl<K, V> StrategyFetcher<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn namespace(&self) -> &str {
        self.keys.namespace()
    }

    /// 指标标签
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// 命中/回源计数快照
    pub fn stats(&self) -> FetchStatsSnapshot {
        self.stats.snapshot()
    }

    /// 构建缓存键
    pub fn build_key(&self, key: &K) -> String {
        self.keys.build_key(key)
    }

    pub(super) fn new_entry(&self, cache_key: String, value: V) -> Entry<V> {
        Entry::new(cache_key, value, self.ttl)
    }

    /// 按位置把键值对转换为条目，调用方保证长度一致
    pub(super) fn entries(&self, keys: &[K], values: Vec<V>) -> Vec<Entry<V>> {
        keys.iter()
            .zip(values)
            .map(|(key, value)| self.new_entry(self.keys.build_key(key), value))
            .collect()
    }

    async fn write_values(
        &self,
        ctx: &CancellationToken,
        keys: &[K],
        values: Vec<V>,
    ) -> Result<()> {
        if keys.len() != values.len() {
            return Err(CacheError::LengthMismatch {
                keys: keys.len(),
                values: values.len(),
            });
        }
        if keys.is_empty() {
            return Ok(());
        }
        let result = self.store.set(ctx, self.entries(keys, values)).await;
        self.metrics.cache_set.record(&result);
        result
    }

    /// 尽力回填：写入失败只记录日志，不影响调用方结果
    pub(super) async fn write_back(&self, ctx: &CancellationToken, entries: Vec<Entry<V>>) {
        if entries.is_empty() {
            return;
        }
        let count = entries.len();
        match self.store.set(ctx, entries).await {
            Ok(()) => {
                debug!("Back-filled {} entries into cache", count);
                self.metrics.cache_backfill.success.incr();
            }
            Err(e) => {
                warn!("Failed to back-fill {} entries into cache: {}", count, e);
                self.metrics.cache_backfill.error.incr();
            }
        }
    }
}

#[async_trait]
impl<K, V> Fetcher<K, V> for StrategyFetcher<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    #[instrument(skip(self, ctx, key), level = "debug", fields(fetcher = %self.label, strategy = %self.strategy))]
    async fn get(&self, ctx: &CancellationToken, key: &K) -> Result<V> {
        self.resolve_get(ctx, key).await
    }

    #[instrument(skip(self, ctx, keys), level = "debug", fields(fetcher = %self.label, strategy = %self.strategy, key_count = keys.len()))]
    async fn multi_get(&self, ctx: &CancellationToken, keys: &[K]) -> Result<Vec<V>> {
        self.resolve_multi_get(ctx, keys).await
    }

    #[instrument(skip(self, ctx, key, value), level = "debug", fields(fetcher = %self.label))]
    async fn set(&self, ctx: &CancellationToken, key: &K, value: V) -> Result<()> {
        self.write_values(ctx, std::slice::from_ref(key), vec![value])
            .await
    }

    #[instrument(skip(self, ctx, keys, values), level = "debug", fields(fetcher = %self.label, key_count = keys.len()))]
    async fn multi_set(&self, ctx: &CancellationToken, keys: &[K], values: Vec<V>) -> Result<()> {
        self.write_values(ctx, keys, values).await
    }

    #[instrument(skip(self, ctx, keys), level = "debug", fields(fetcher = %self.label, key_count = keys.len()))]
    async fn delete(&self, ctx: &CancellationToken, keys: &[K]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let result = self.store.delete(ctx, &self.keys.build_keys(keys)).await;
        self.metrics.cache_delete.record(&result);
        result
    }

    #[instrument(skip(self, ctx, keys), level = "debug", fields(fetcher = %self.label, key_count = keys.len()))]
    async fn refresh(&self, ctx: &CancellationToken, keys: &[K]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let values = match self.batch_loader.batch_load(ctx, keys).await {
            Ok(values) => values,
            Err(e) => {
                warn!("Refresh of {} keys failed at source: {}", keys.len(), e);
                self.metrics.source_refresh.error.incr();
                return Err(e);
            }
        };
        self.metrics.source_refresh.success.incr();
        self.write_values(ctx, keys, values).await
    }
}
