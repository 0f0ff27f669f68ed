//! oxfetch - 读穿/写穿缓存获取器
//!
//! 在缓存存储和数据源之间提供统一的读取入口，
//! 支持缓存优先、数据源优先和仅缓存三种读取策略，
//! 以及批量读取、写入、删除和强制刷新。

#![doc(html_root_url = "https://docs.rs/oxfetch/0.1.0")]

pub use serde;
pub use serde_json;
pub use tokio;
pub use tokio_util::sync::CancellationToken;

pub mod config;
pub mod entry;
pub mod error;
pub mod fetcher;
pub mod key;
pub mod loader;
pub mod metrics;
pub mod serialization;
pub mod store;
pub mod strategy;
pub mod telemetry;
pub mod utils;

// Re-export commonly used items
pub use config::{Config, FetcherSettings};
pub use entry::Entry;
pub use error::{CacheError, Result};
pub use fetcher::{Fetcher, FetcherBuilder, StrategyFetcher};
pub use key::KeyBuilder;
pub use loader::{BatchLoadFn, BatchLoader, LoadFn, Loader};
pub use metrics::FetchStatsSnapshot;
pub use store::{CacheStore, MemoryStore, RedisStore};
pub use strategy::Strategy;

/// oxfetch 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
