//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了与缓存存储交换的缓存条目。

use std::time::Duration;

/// 缓存条目
///
/// 由引擎在写入或回填时创建，缓存存储原样保存。构造后不可变。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<V> {
    key: String,
    value: V,
    ttl: Option<Duration>,
}

impl<V> Entry<V> {
    /// 创建新的缓存条目
    ///
    /// # 参数
    ///
    /// * `key` - 已经构建好的缓存键（包含命名空间）
    /// * `value` - 缓存值
    /// * `ttl` - 过期时间，None表示永不过期
    pub fn new(key: impl Into<String>, value: V, ttl: Option<Duration>) -> Self {
        Self {
            key: key.into(),
            value,
            ttl,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// 取出缓存值，消耗条目
    pub fn into_value(self) -> V {
        self.value
    }
}
