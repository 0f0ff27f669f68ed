//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 数据源加载器
//!
//! 提供缓存未命中时从数据源加载数据的接口、闭包适配器，
//! 以及单键/批量加载器之间的互相转换

use crate::error::{CacheError, Result};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// 单键加载器特征
#[async_trait]
pub trait Loader<K, V>: Send + Sync {
    /// 根据键从数据源加载数据
    async fn load(&self, ctx: &CancellationToken, key: &K) -> Result<V>;
}

/// 批量加载器特征
#[async_trait]
pub trait BatchLoader<K, V>: Send + Sync {
    /// 批量加载数据
    ///
    /// 成功时返回值的数量必须与键的数量一致，且按位置对应
    async fn batch_load(&self, ctx: &CancellationToken, keys: &[K]) -> Result<Vec<V>>;
}

/// 闭包形式的单键加载器
///
/// 闭包接收令牌和键的所有权，返回 `Send + 'static` 的 future
pub struct LoadFn<F>(pub F);

#[async_trait]
impl<K, V, F, Fut> Loader<K, V> for LoadFn<F>
where
    K: Clone + Send + Sync + 'static,
    V: Send + 'static,
    F: Fn(CancellationToken, K) -> Fut + Send + Sync,
    Fut: Future<Output = Result<V>> + Send + 'static,
{
    async fn load(&self, ctx: &CancellationToken, key: &K) -> Result<V> {
        (self.0)(ctx.clone(), key.clone()).await
    }
}

/// 闭包形式的批量加载器
pub struct BatchLoadFn<F>(pub F);

#[async_trait]
impl<K, V, F, Fut> BatchLoader<K, V> for BatchLoadFn<F>
where
    K: Clone + Send + Sync + 'static,
    V: Send + 'static,
    F: Fn(CancellationToken, Vec<K>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<V>>> + Send + 'static,
{
    async fn batch_load(&self, ctx: &CancellationToken, keys: &[K]) -> Result<Vec<V>> {
        (self.0)(ctx.clone(), keys.to_vec()).await
    }
}

/// 由单键加载器合成的批量加载器
///
/// 逐个加载，单个键失败时以空值占位，整体总是成功
pub(crate) struct PerKeyBatchLoader<K, V> {
    loader: Arc<dyn Loader<K, V>>,
    empty_value: V,
}

impl<K, V> PerKeyBatchLoader<K, V> {
    pub(crate) fn new(loader: Arc<dyn Loader<K, V>>, empty_value: V) -> Self {
        Self {
            loader,
            empty_value,
        }
    }
}

#[async_trait]
impl<K, V> BatchLoader<K, V> for PerKeyBatchLoader<K, V>
where
    K: Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn batch_load(&self, ctx: &CancellationToken, keys: &[K]) -> Result<Vec<V>> {
        let mut values = Vec::with_capacity(keys.len());
        for (i, key) in keys.iter().enumerate() {
            match self.loader.load(ctx, key).await {
                Ok(value) => values.push(value),
                Err(e) => {
                    debug!("Per-key load failed at position {}: {}", i, e);
                    values.push(self.empty_value.clone());
                }
            }
        }
        Ok(values)
    }
}

/// 由批量加载器合成的单键加载器
///
/// 以单元素列表调用批量加载器，结果为空时返回 NotFound
pub(crate) struct SingleKeyLoader<K, V> {
    batch_loader: Arc<dyn BatchLoader<K, V>>,
}

impl<K, V> SingleKeyLoader<K, V> {
    pub(crate) fn new(batch_loader: Arc<dyn BatchLoader<K, V>>) -> Self {
        Self { batch_loader }
    }
}

#[async_trait]
impl<K, V> Loader<K, V> for SingleKeyLoader<K, V>
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    async fn load(&self, ctx: &CancellationToken, key: &K) -> Result<V> {
        let values = self
            .batch_loader
            .batch_load(ctx, std::slice::from_ref(key))
            .await?;
        values
            .into_iter()
            .next()
            .ok_or_else(|| CacheError::NotFound("batch loader returned no value".to_string()))
    }
}
