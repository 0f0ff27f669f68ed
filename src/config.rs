//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存门面的配置结构和解析逻辑。

use crate::error::{CacheError, Result};
use crate::strategy::Strategy;
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_VERSION: u32 = 1;

/// TTL上限：30天
const MAX_TTL_SECS: u64 = 86400 * 30;
const MAX_NAME_LENGTH: usize = 64;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub config_version: Option<u32>,
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub fetchers: HashMap<String, FetcherConfig>,
    /// Redis存储配置（可选）
    #[serde(default)]
    pub redis: Option<RedisStoreConfig>,
}

/// 全局配置
///
/// 定义适用于所有获取器的默认配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct GlobalConfig {
    /// 默认读取策略
    pub strategy: Strategy,
    /// 默认的缓存过期时间（秒），0表示永不过期
    pub default_ttl: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::CacheFirst,
            default_ttl: 0,
        }
    }
}

/// 单个获取器的配置
///
/// 未设置的字段回退到全局配置
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct FetcherConfig {
    /// 读取策略，可覆盖全局配置
    pub strategy: Option<Strategy>,
    /// 缓存键命名空间，未设置时使用获取器名称
    pub namespace: Option<String>,
    /// 缓存过期时间（秒），可覆盖全局配置
    pub ttl: Option<u64>,
}

/// 解析后的获取器配置
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetcherSettings {
    pub strategy: Strategy,
    pub namespace: String,
    pub ttl: Option<Duration>,
}

/// Redis存储配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct RedisStoreConfig {
    /// 连接字符串
    pub connection_string: SecretString,
    /// 连接超时时间（毫秒）
    pub connection_timeout_ms: u64,
    /// 命令执行超时时间（毫秒）
    pub command_timeout_ms: u64,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            connection_string: SecretString::new("redis://localhost:6379".to_string().into()),
            connection_timeout_ms: 5000,
            command_timeout_ms: 3000,
        }
    }
}

impl Config {
    /// 从TOML字符串解析并验证配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate().map_err(CacheError::ConfigError)?;
        Ok(config)
    }

    /// 从TOML文件加载并验证配置
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 验证配置
    ///
    /// 检查配置版本、TTL范围、命名空间格式以及Redis超时设置
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(version) = &self.config_version {
            if *version > CONFIG_VERSION {
                return Err(format!(
                    "Configuration version {} is not supported. Current version is {}.",
                    version, CONFIG_VERSION
                ));
            }
        }

        if self.global.default_ttl > MAX_TTL_SECS {
            return Err("Global default_ttl cannot exceed 30 days (2592000 seconds)".to_string());
        }

        for (name, fetcher) in &self.fetchers {
            if name.is_empty() {
                return Err("Fetcher name cannot be empty".to_string());
            }

            if name.len() > MAX_NAME_LENGTH {
                return Err(format!(
                    "Fetcher name '{}' exceeds maximum length of {} characters",
                    name, MAX_NAME_LENGTH
                ));
            }

            // 未配置命名空间时使用获取器名称，校验的是最终生效的命名空间
            let namespace = fetcher.namespace.as_deref().unwrap_or(name);
            if namespace.len() > MAX_NAME_LENGTH {
                return Err(format!(
                    "Fetcher '{}' namespace exceeds maximum length of {} characters",
                    name, MAX_NAME_LENGTH
                ));
            }
            if namespace.chars().any(char::is_whitespace) {
                return Err(format!(
                    "Fetcher '{}' namespace cannot contain whitespace",
                    name
                ));
            }

            if let Some(ttl) = fetcher.ttl {
                if ttl > MAX_TTL_SECS {
                    return Err(format!("Fetcher '{}' TTL cannot exceed 30 days", name));
                }
            }
        }

        if let Some(redis) = &self.redis {
            if !(100..=30000).contains(&redis.connection_timeout_ms) {
                return Err("Redis connection_timeout_ms must be between 100 and 30000 ms".to_string());
            }
            if !(100..=60000).contains(&redis.command_timeout_ms) {
                return Err("Redis command_timeout_ms must be between 100 and 60000 ms".to_string());
            }
        }

        Ok(())
    }

    /// 解析指定名称的获取器配置
    ///
    /// # 参数
    ///
    /// * `name` - 获取器名称
    ///
    /// # 返回值
    ///
    /// 合并全局默认值后的配置；名称不存在时返回配置错误
    pub fn fetcher(&self, name: &str) -> Result<FetcherSettings> {
        let fetcher = self.fetchers.get(name).ok_or_else(|| {
            CacheError::ConfigError(format!("Fetcher '{}' is not configured", name))
        })?;

        let ttl_secs = fetcher.ttl.unwrap_or(self.global.default_ttl);
        Ok(FetcherSettings {
            strategy: fetcher.strategy.unwrap_or(self.global.strategy),
            namespace: fetcher
                .namespace
                .clone()
                .unwrap_or_else(|| name.to_string()),
            ttl: ttl_from_secs(ttl_secs),
        })
    }
}

/// 秒数转换为TTL，0表示永不过期
pub fn ttl_from_secs(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}
