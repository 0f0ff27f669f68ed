//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了获取器的统一接口和基于读取策略的实现。

pub mod builder;
pub mod engine;
mod read;

use crate::error::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub use builder::FetcherBuilder;
pub use engine::StrategyFetcher;

/// 获取器特征
///
/// 读操作按构建时选定的策略访问缓存与数据源，写操作只作用于缓存。
/// 每个操作的第一个参数是取消令牌，原样传递给所有存储和加载器调用
#[async_trait]
pub trait Fetcher<K, V>: Send + Sync {
    /// 读取单个键
    async fn get(&self, ctx: &CancellationToken, key: &K) -> Result<V>;

    /// 批量读取，结果与输入键按位置一一对应
    async fn multi_get(&self, ctx: &CancellationToken, keys: &[K]) -> Result<Vec<V>>;

    /// 写入单个键值到缓存
    async fn set(&self, ctx: &CancellationToken, key: &K, value: V) -> Result<()>;

    /// 批量写入缓存，键与值数量必须一致
    async fn multi_set(&self, ctx: &CancellationToken, keys: &[K], values: Vec<V>) -> Result<()>;

    /// 从缓存删除键
    async fn delete(&self, ctx: &CancellationToken, keys: &[K]) -> Result<()>;

    /// 忽略读取策略，从数据源重新加载并写入缓存
    async fn refresh(&self, ctx: &CancellationToken, keys: &[K]) -> Result<()>;
}
