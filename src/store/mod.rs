//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存存储接口以及内置的存储实现。

pub mod memory;
pub mod redis_store;

use crate::entry::Entry;
use crate::error::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

/// 缓存存储特征
///
/// 由调用方提供的键值存储，引擎只依赖这四个操作
#[async_trait]
pub trait CacheStore<V>: Send + Sync {
    /// 获取单个条目
    ///
    /// 键不存在与传输失败都以错误返回，引擎不加区分
    async fn get(&self, ctx: &CancellationToken, key: &str) -> Result<Entry<V>>;

    /// 批量获取条目
    ///
    /// 必须为每个输入键返回一个槽位，未命中的槽位为 None；
    /// 只有整体调用失败时才返回错误
    async fn multi_get(
        &self,
        ctx: &CancellationToken,
        keys: &[String],
    ) -> Result<Vec<Option<Entry<V>>>>;

    /// 批量写入条目
    async fn set(&self, ctx: &CancellationToken, entries: Vec<Entry<V>>) -> Result<()>;

    /// 批量删除键
    async fn delete(&self, ctx: &CancellationToken, keys: &[String]) -> Result<()>;
}
