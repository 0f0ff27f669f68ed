//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 读取策略的解析逻辑：决定哪些键命中缓存、哪些键回源，
//! 以及批量读取时如何合并结果并回填缓存。

use super::engine::StrategyFetcher;
use crate::error::{CacheError, Result};
use crate::strategy::Strategy;
use crate::utils::redaction::redact_cache_key;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

impl<K, V> StrategyFetcher<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub(super) async fn resolve_get(&self, ctx: &CancellationToken, key: &K) -> Result<V> {
        match self.strategy {
            Strategy::CacheOnly => self.get_from_cache(ctx, key).await,
            Strategy::CacheFirst => self.get_cache_first(ctx, key).await,
            Strategy::SourceFirst => self.get_source_first(ctx, key).await,
        }
    }

    pub(super) async fn resolve_multi_get(
        &self,
        ctx: &CancellationToken,
        keys: &[K],
    ) -> Result<Vec<V>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        match self.strategy {
            Strategy::CacheOnly => self
                .multi_get_from_cache(ctx, keys)
                .await
                .map(|(values, _)| values),
            Strategy::CacheFirst => self.multi_get_cache_first(ctx, keys).await,
            Strategy::SourceFirst => self.multi_get_source_first(ctx, keys).await,
        }
    }

    async fn get_cache_first(&self, ctx: &CancellationToken, key: &K) -> Result<V> {
        match self.get_from_cache(ctx, key).await {
            Ok(value) => Ok(value),
            Err(e) => {
                debug!("Cache lookup failed, loading from source: {}", e);
                self.get_from_source(ctx, key).await
            }
        }
    }

    async fn get_source_first(&self, ctx: &CancellationToken, key: &K) -> Result<V> {
        match self.get_from_source(ctx, key).await {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!("Source load failed, falling back to cache: {}", e);
                self.get_from_cache(ctx, key).await
            }
        }
    }

    async fn get_from_cache(&self, ctx: &CancellationToken, key: &K) -> Result<V> {
        let cache_key = self.keys.build_key(key);
        match self.store.get(ctx, &cache_key).await {
            Ok(entry) => {
                self.stats.record_hits(1);
                self.metrics.cache_get_hit.incr();
                debug!("Cache hit for key: {}", redact_cache_key(&cache_key));
                Ok(entry.into_value())
            }
            Err(e) => {
                self.metrics.cache_get_miss.incr();
                debug!("Cache miss for key: {}", redact_cache_key(&cache_key));
                Err(e)
            }
        }
    }

    /// 单键回源，成功后尽力回填缓存
    async fn get_from_source(&self, ctx: &CancellationToken, key: &K) -> Result<V> {
        self.stats.record_source(1);
        let start = Instant::now();
        let result = self.loader.load(ctx, key).await;
        self.metrics.source_get_duration.record(start.elapsed());
        self.metrics.source_get.record(&result);
        let value = result?;

        let entry = self.new_entry(self.keys.build_key(key), value.clone());
        self.write_back(ctx, vec![entry]).await;
        Ok(value)
    }

    /// 批量读缓存
    ///
    /// 返回与输入对齐的结果（未命中位置为空值）以及未命中的位置列表
    async fn multi_get_from_cache(
        &self,
        ctx: &CancellationToken,
        keys: &[K],
    ) -> Result<(Vec<V>, Vec<usize>)> {
        let cache_keys = self.keys.build_keys(keys);
        let slots = self.store.multi_get(ctx, &cache_keys).await?;
        if slots.len() != keys.len() {
            return Err(CacheError::Backend(format!(
                "Cache store returned {} slots for {} keys",
                slots.len(),
                keys.len()
            )));
        }

        let mut values = Vec::with_capacity(keys.len());
        let mut misses = Vec::new();
        for (i, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(entry) => values.push(entry.into_value()),
                None => {
                    values.push(self.empty_value.clone());
                    misses.push(i);
                }
            }
        }

        let hits = (keys.len() - misses.len()) as u64;
        self.stats.record_hits(hits);
        self.metrics.cache_multi_get_hit.add(hits);
        self.metrics.cache_multi_get_miss.add(misses.len() as u64);
        debug!("Cache multi_get: {} hits, {} misses", hits, misses.len());
        Ok((values, misses))
    }

    async fn multi_get_cache_first(&self, ctx: &CancellationToken, keys: &[K]) -> Result<Vec<V>> {
        let (mut values, misses) = match self.multi_get_from_cache(ctx, keys).await {
            Ok(found) => found,
            Err(e) => {
                warn!(
                    "Cache multi_get failed, treating all {} keys as missed: {}",
                    keys.len(),
                    e
                );
                (
                    vec![self.empty_value.clone(); keys.len()],
                    (0..keys.len()).collect(),
                )
            }
        };
        if misses.is_empty() {
            return Ok(values);
        }

        let missed_keys: Vec<K> = misses.iter().map(|&i| keys[i].clone()).collect();
        let loaded = match self.load_from_source(ctx, &missed_keys).await {
            Ok(loaded) => loaded,
            Err(e) => {
                // 批量回源失败时返回部分结果，错误不向调用方暴露
                warn!(
                    "Batch source load for {} missed keys failed, returning partial result: {}",
                    missed_keys.len(),
                    e
                );
                return Ok(values);
            }
        };

        for (&pos, value) in misses.iter().zip(loaded.iter()) {
            values[pos] = value.clone();
        }
        let entries = self.entries(&missed_keys, loaded);
        self.write_back(ctx, entries).await;
        Ok(values)
    }

    async fn multi_get_source_first(&self, ctx: &CancellationToken, keys: &[K]) -> Result<Vec<V>> {
        match self.load_from_source(ctx, keys).await {
            Ok(values) => {
                let entries = self.entries(keys, values.clone());
                self.write_back(ctx, entries).await;
                Ok(values)
            }
            Err(e) => {
                warn!(
                    "Batch source load for {} keys failed, falling back to cache: {}",
                    keys.len(),
                    e
                );
                self.multi_get_from_cache(ctx, keys)
                    .await
                    .map(|(values, _)| values)
            }
        }
    }

    /// 批量回源，校验返回值数量与键数量一致
    async fn load_from_source(&self, ctx: &CancellationToken, keys: &[K]) -> Result<Vec<V>> {
        self.stats.record_source(keys.len() as u64);
        let start = Instant::now();
        let result = self.batch_loader.batch_load(ctx, keys).await;
        self.metrics.source_multi_get_duration.record(start.elapsed());

        let result = match result {
            Ok(values) if values.len() != keys.len() => Err(CacheError::Source(format!(
                "Batch loader returned {} values for {} keys",
                values.len(),
                keys.len()
            ))),
            other => other,
        };
        self.metrics.source_multi_get.record(&result);
        result
    }
}
