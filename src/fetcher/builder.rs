//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 获取器构建器

use super::engine::StrategyFetcher;
use crate::config::FetcherSettings;
use crate::error::{CacheError, Result};
use crate::key::{KeyBuilder, KeyFn};
use crate::loader::{BatchLoadFn, BatchLoader, LoadFn, Loader, PerKeyBatchLoader, SingleKeyLoader};
use crate::metrics::{FetchStats, FetcherMetrics, GLOBAL_METRICS};
use crate::store::CacheStore;
use crate::strategy::Strategy;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

const DEFAULT_LABEL: &str = "default";

/// 获取器构建器
///
/// 必须提供缓存存储和至少一个加载器。只提供单键加载器时，
/// 批量加载器由逐键加载合成；只提供批量加载器时反之
pub struct FetcherBuilder<K, V> {
    store: Arc<dyn CacheStore<V>>,
    strategy: Strategy,
    namespace: String,
    name: Option<String>,
    gen_key: KeyFn<K>,
    ttl: Option<Duration>,
    empty_value: V,
    loader: Option<Arc<dyn Loader<K, V>>>,
    batch_loader: Option<Arc<dyn BatchLoader<K, V>>>,
}

impl<K, V> FetcherBuilder<K, V>
where
    K: Display + Clone + Send + Sync + 'static,
    V: Clone + Default + Send + Sync + 'static,
{
    /// 使用键的文本表示作为缓存键投影
    pub fn new<S>(store: Arc<S>) -> Self
    where
        S: CacheStore<V> + 'static,
    {
        Self::from_store(store)
    }

    /// 从类型擦除的存储创建
    pub fn from_store(store: Arc<dyn CacheStore<V>>) -> Self {
        Self::with_key_projection(store, |key: &K| key.to_string())
    }
}

impl<K, V> FetcherBuilder<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Default + Send + Sync + 'static,
{
    /// 使用自定义键投影创建，适用于没有文本表示的键类型
    pub fn with_key_projection<F>(store: Arc<dyn CacheStore<V>>, gen_key: F) -> Self
    where
        F: Fn(&K) -> String + Send + Sync + 'static,
    {
        Self {
            store,
            strategy: Strategy::default(),
            namespace: String::new(),
            name: None,
            gen_key: Arc::new(gen_key),
            ttl: None,
            empty_value: V::default(),
            loader: None,
            batch_loader: None,
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// 设置指标标签
    ///
    /// 未设置时使用命名空间，命名空间也为空时使用 `default`；
    /// 标签相同的获取器在全局指标中共享计数
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 设置写入条目的过期时间，零表示永不过期
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = if ttl.is_zero() { None } else { Some(ttl) };
        self
    }

    /// 设置空值占位，用于批量读取中未命中且未能加载的位置
    pub fn with_empty_value(mut self, empty_value: V) -> Self {
        self.empty_value = empty_value;
        self
    }

    /// 替换缓存键投影函数
    pub fn with_gen_key_fn<F>(mut self, gen_key: F) -> Self
    where
        F: Fn(&K) -> String + Send + Sync + 'static,
    {
        self.gen_key = Arc::new(gen_key);
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn Loader<K, V>>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// 以闭包设置单键加载器
    pub fn with_load_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(CancellationToken, K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        self.with_loader(Arc::new(LoadFn(f)))
    }

    pub fn with_batch_loader(mut self, batch_loader: Arc<dyn BatchLoader<K, V>>) -> Self {
        self.batch_loader = Some(batch_loader);
        self
    }

    /// 以闭包设置批量加载器
    pub fn with_batch_load_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(CancellationToken, Vec<K>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<V>>> + Send + 'static,
    {
        self.with_batch_loader(Arc::new(BatchLoadFn(f)))
    }

    /// 应用配置文件中解析出的获取器配置
    pub fn with_settings(mut self, settings: &FetcherSettings) -> Self {
        self.strategy = settings.strategy;
        self.namespace = settings.namespace.clone();
        self.ttl = settings.ttl;
        self
    }

    /// 构建获取器
    ///
    /// # 错误
    ///
    /// 单键加载器和批量加载器都未提供时返回配置错误
    pub fn build(self) -> Result<StrategyFetcher<K, V>> {
        let (loader, batch_loader): (Arc<dyn Loader<K, V>>, Arc<dyn BatchLoader<K, V>>) =
            match (self.loader, self.batch_loader) {
                (Some(loader), Some(batch_loader)) => (loader, batch_loader),
                (Some(loader), None) => {
                    let batch_loader: Arc<dyn BatchLoader<K, V>> =
                        Arc::new(PerKeyBatchLoader::new(loader.clone(), self.empty_value.clone()));
                    (loader, batch_loader)
                }
                (None, Some(batch_loader)) => {
                    let loader: Arc<dyn Loader<K, V>> =
                        Arc::new(SingleKeyLoader::new(batch_loader.clone()));
                    (loader, batch_loader)
                }
                (None, None) => {
                    return Err(CacheError::ConfigError(
                        "A loader or a batch loader is required".to_string(),
                    ))
                }
            };

        let label = match self.name {
            Some(name) if !name.is_empty() => name,
            _ if self.namespace.is_empty() => DEFAULT_LABEL.to_string(),
            _ => self.namespace.clone(),
        };
        let metrics = FetcherMetrics::register(&GLOBAL_METRICS, &label);
        info!(
            "Fetcher '{}' built with strategy {} and ttl {:?}",
            label, self.strategy, self.ttl
        );

        Ok(StrategyFetcher {
            strategy: self.strategy,
            keys: KeyBuilder::new(self.namespace, self.gen_key),
            store: self.store,
            loader,
            batch_loader,
            empty_value: self.empty_value,
            ttl: self.ttl,
            stats: FetchStats::default(),
            label,
            metrics,
        })
    }
}
