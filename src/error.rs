//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存门面的错误类型和处理机制。

use thiserror::Error;

/// 缓存门面错误类型枚举
///
/// 覆盖配置、缓存存储、数据源三类错误，以及底层依赖产生的错误
#[derive(Error, Debug)]
pub enum CacheError {
    /// 配置错误（未配置加载器、配置文件非法等）
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// 批量写入时键与值数量不一致
    #[error("Keys and values length not equal: {keys} keys, {values} values")]
    LengthMismatch { keys: usize, values: usize },

    /// 缓存中不存在该键
    #[error("Key not found: {0}")]
    NotFound(String),

    /// 缓存存储后端错误
    #[error("Backend error: {0}")]
    Backend(String),

    /// 数据源（加载器）错误
    #[error("Source error: {0}")]
    Source(String),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 调用方取消了本次操作
    #[error("Operation cancelled")]
    Cancelled,

    /// Redis错误
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    /// IO错误
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML解析错误
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl CacheError {
    /// 是否为"键不存在"错误
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }
}

/// 缓存操作结果类型别名
///
/// 简化错误处理，所有缓存操作都返回此类型
pub type Result<T> = std::result::Result<T, CacheError>;
