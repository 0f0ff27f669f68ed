//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了读取策略。

use serde::Deserialize;
use std::fmt;

/// 读取策略枚举
///
/// 决定 get/multi_get 时缓存与数据源的访问顺序，构建后不可更改
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// 优先缓存，未命中或出错时回源
    #[default]
    CacheFirst,
    /// 优先数据源，数据源失败时降级读取缓存
    SourceFirst,
    /// 仅读缓存，从不回源
    CacheOnly,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::CacheFirst => "cache_first",
            Strategy::SourceFirst => "source_first",
            Strategy::CacheOnly => "cache_only",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
