//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于Redis的缓存存储实现。

use super::CacheStore;
use crate::config::RedisStoreConfig;
use crate::entry::Entry;
use crate::error::{CacheError, Result};
use crate::serialization::{Serializer, SerializerEnum};
use crate::utils::redaction::redact_connection_string;
use ::redis::{aio::ConnectionManager, Client, RedisResult};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Redis缓存存储
///
/// 单机模式，值经序列化器编码后保存。每条命令都与取消令牌竞争，
/// 并受 `command_timeout_ms` 约束
#[derive(Clone)]
pub struct RedisStore<V> {
    manager: ConnectionManager,
    serializer: SerializerEnum,
    command_timeout_ms: u64,
    _marker: PhantomData<fn() -> V>,
}

impl<V> std::fmt::Debug for RedisStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("command_timeout_ms", &self.command_timeout_ms)
            .finish()
    }
}

impl<V> RedisStore<V> {
    /// 创建新的Redis存储
    ///
    /// # 参数
    ///
    /// * `config` - Redis存储配置
    ///
    /// # 返回值
    ///
    /// 连接建立成功后返回存储实例，超时返回后端错误
    #[instrument(skip(config), level = "info", name = "init_redis_store")]
    pub async fn new(config: &RedisStoreConfig) -> Result<Self> {
        Self::with_serializer(config, SerializerEnum::default()).await
    }

    /// 使用指定序列化器创建Redis存储
    pub async fn with_serializer(
        config: &RedisStoreConfig,
        serializer: SerializerEnum,
    ) -> Result<Self> {
        let connection_string = config.connection_string.expose_secret();
        let client = Client::open(connection_string)?;
        let manager = match timeout(
            Duration::from_millis(config.connection_timeout_ms),
            client.get_connection_manager(),
        )
        .await
        {
            Ok(res) => res?,
            Err(_) => {
                return Err(CacheError::Backend(format!(
                    "Connection timed out after {}ms. Target: {}",
                    config.connection_timeout_ms,
                    redact_connection_string(connection_string)
                )));
            }
        };
        info!(
            "Redis store connected: {}",
            redact_connection_string(connection_string)
        );
        Ok(Self {
            manager,
            serializer,
            command_timeout_ms: config.command_timeout_ms,
            _marker: PhantomData,
        })
    }

    /// 检查连接是否正常
    pub async fn ping(&self, ctx: &CancellationToken) -> Result<()> {
        let mut conn = self.manager.clone();
        let response: String = self
            .run(ctx, "PING", ::redis::cmd("PING").query_async(&mut conn))
            .await?;
        debug!("Redis ping response: {}", response);
        Ok(())
    }

    async fn run<T, F>(&self, ctx: &CancellationToken, op: &str, fut: F) -> Result<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(CacheError::Cancelled),
            res = timeout(Duration::from_millis(self.command_timeout_ms), fut) => match res {
                Ok(r) => r.map_err(CacheError::from),
                Err(_) => Err(CacheError::Backend(format!(
                    "Redis {} timed out after {}ms",
                    op, self.command_timeout_ms
                ))),
            },
        }
    }
}

/// 过期时间转换为 `PX` 毫秒数
///
/// 非零且不足1毫秒的过期时间按1毫秒处理，None或零表示永不过期
fn px_millis(ttl: Option<Duration>) -> Option<u64> {
    ttl.filter(|ttl| !ttl.is_zero())
        .map(|ttl| u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1))
}

/// `PTTL` 结果转换为剩余过期时间，-1（永不过期）和-2（不存在）返回None
fn ttl_from_pttl(pttl: i64) -> Option<Duration> {
    u64::try_from(pttl)
        .ok()
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

#[async_trait]
impl<V> CacheStore<V> for RedisStore<V>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    #[instrument(skip(self, ctx), level = "debug")]
    async fn get(&self, ctx: &CancellationToken, key: &str) -> Result<Entry<V>> {
        let mut pipe = ::redis::pipe();
        pipe.get(key).pttl(key);
        let mut conn = self.manager.clone();
        let (raw, pttl): (Option<Vec<u8>>, i64) =
            self.run(ctx, "GET", pipe.query_async(&mut conn)).await?;
        match raw {
            Some(bytes) => {
                let value = self.serializer.deserialize(&bytes)?;
                Ok(Entry::new(key, value, ttl_from_pttl(pttl)))
            }
            None => Err(CacheError::NotFound(key.to_string())),
        }
    }

    #[instrument(skip(self, ctx, keys), level = "debug", fields(key_count = keys.len()))]
    async fn multi_get(
        &self,
        ctx: &CancellationToken,
        keys: &[String],
    ) -> Result<Vec<Option<Entry<V>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut cmd = ::redis::cmd("MGET");
        for key in keys {
            cmd.arg(key);
        }
        let mut conn = self.manager.clone();
        let raw: Vec<Option<Vec<u8>>> = self
            .run(ctx, "MGET", cmd.query_async(&mut conn))
            .await?;

        // 只为命中的键查询剩余过期时间
        let mut ttl_pipe = ::redis::pipe();
        for (key, slot) in keys.iter().zip(&raw) {
            if slot.is_some() {
                ttl_pipe.pttl(key);
            }
        }
        let pttls: Vec<i64> = if raw.iter().any(Option::is_some) {
            self.run(ctx, "PTTL", ttl_pipe.query_async(&mut conn))
                .await?
        } else {
            Vec::new()
        };

        let mut pttls = pttls.into_iter();
        let mut entries = Vec::with_capacity(raw.len());
        for (key, slot) in keys.iter().zip(raw) {
            let entry = match slot {
                Some(bytes) => Some(Entry::new(
                    key.as_str(),
                    self.serializer.deserialize(&bytes)?,
                    pttls.next().and_then(ttl_from_pttl),
                )),
                None => None,
            };
            entries.push(entry);
        }
        Ok(entries)
    }

    #[instrument(skip(self, ctx, entries), level = "debug", fields(entry_count = entries.len()))]
    async fn set(&self, ctx: &CancellationToken, entries: Vec<Entry<V>>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut pipe = ::redis::pipe();
        for entry in &entries {
            let bytes = self.serializer.serialize(entry.value())?;
            match px_millis(entry.ttl()) {
                Some(ttl_ms) => {
                    pipe.set(entry.key(), bytes).arg("PX").arg(ttl_ms).ignore();
                }
                None => {
                    pipe.set(entry.key(), bytes).ignore();
                }
            }
        }
        let mut conn = self.manager.clone();
        self.run(ctx, "SET", pipe.query_async::<()>(&mut conn))
            .await
    }

    #[instrument(skip(self, ctx, keys), level = "debug", fields(key_count = keys.len()))]
    async fn delete(&self, ctx: &CancellationToken, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut cmd = ::redis::cmd("DEL");
        for key in keys {
            cmd.arg(key);
        }
        let mut conn = self.manager.clone();
        let removed: i64 = self.run(ctx, "DEL", cmd.query_async(&mut conn)).await?;
        debug!("Redis delete removed {} of {} keys", removed, keys.len());
        Ok(())
    }
}
